//! Core domain logic for laytime reconciliation.
//!
//! This crate contains the fundamental types and pipeline stages:
//! - Normalization: raw Statement-of-Facts events into intervals
//! - Sequencing: a gapless, clamped, chronological timeline
//! - NOR insertion: the contractual laytime start boundary
//! - Deduction reconciliation: clause applicability per interval
//! - Calculation: laytime totals and demurrage/despatch settlement

pub mod calculate;
pub mod clause;
pub mod deduction;
pub mod document;
pub mod event;
pub mod interval;
pub mod nor;
pub mod normalize;
pub mod pipeline;
pub mod sequence;
pub mod time;
pub mod types;

pub use calculate::{LaytimeSummary, Settlement, VoyageTerms, WorkingHours, summarize};
pub use deduction::{ClauseMatcher, ClauseVerdict, Deduction, MatchError, MatchRequest};
pub use document::{DocumentType, ExtractedDocument};
pub use interval::Interval;
pub use pipeline::{Collaborators, LaytimeReport, PipelineConfig, PipelineError, run_pipeline};
pub use sequence::{GapInference, GapInferenceError, SequencerConfig, sequence_timeline};
pub use types::Confidence;
