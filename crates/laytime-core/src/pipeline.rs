//! End-to-end reconciliation pipeline.
//!
//! Composes the stages in their fixed order: normalize the SoF event log,
//! sequence it into a gapless timeline, insert the NOR period from the
//! contract, reconcile deductions against the contract clauses, then
//! aggregate. Each stage consumes the previous stage's output only.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calculate::{self, LaytimeSummary, Settlement, VoyageTerms};
use crate::deduction::{ClauseMatcher, Deduction, reconcile_deductions};
use crate::document::{DocumentType, ExtractedDocument};
use crate::interval::Interval;
use crate::nor::insert_nor_period;
use crate::normalize::normalize_events;
use crate::sequence::{GapInference, SequencerConfig, sequence_timeline};

/// Pipeline failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No Statement of Facts among the supplied documents.
    #[error("no statement of facts document supplied")]
    MissingStatementOfFacts,

    /// The SoF carried an event log that normalized to nothing.
    #[error("statement of facts contained no usable events")]
    EmptyEventLog,

    /// Aggregation detected a broken timeline.
    #[error(transparent)]
    Calc(#[from] calculate::CalcError),
}

/// Tunable pipeline behavior.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Sequencer settings (holiday markers).
    pub sequencer: SequencerConfig,
}

/// External collaborators, both optional. Without them the pipeline runs
/// fully offline with its documented fallbacks.
#[derive(Default, Clone, Copy)]
pub struct Collaborators<'a> {
    /// Reason inference for unexplained gaps.
    pub gap_inference: Option<&'a dyn GapInference>,
    /// Clause applicability evaluation for deductions.
    pub clause_matcher: Option<&'a dyn ClauseMatcher>,
}

impl std::fmt::Debug for Collaborators<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("gap_inference", &self.gap_inference.is_some())
            .field("clause_matcher", &self.clause_matcher.is_some())
            .finish()
    }
}

/// The complete reconciliation outcome for one voyage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaytimeReport {
    /// The finalized timeline, NOR period first.
    pub intervals: Vec<Interval>,
    /// One audit record per evaluated interval.
    pub deductions: Vec<Deduction>,
    /// Terminal laytime figures.
    pub summary: LaytimeSummary,
    /// Demurrage/despatch outcome, when the contract carries the terms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settlement: Option<Settlement>,
    /// Count of raw events dropped during normalization.
    pub skipped_events: usize,
}

/// Runs the full pipeline over a set of extracted documents.
///
/// Requires a Statement of Facts; the contract is optional (without one the
/// NOR delay defaults to zero and no clause deductions apply).
pub fn run_pipeline(
    documents: &[ExtractedDocument],
    config: &PipelineConfig,
    collaborators: Collaborators<'_>,
) -> Result<LaytimeReport, PipelineError> {
    let sof = documents
        .iter()
        .find(|doc| doc.document_type == DocumentType::Sof)
        .ok_or(PipelineError::MissingStatementOfFacts)?;
    let contract = documents
        .iter()
        .find(|doc| doc.document_type == DocumentType::Contract);

    let report = normalize_events(sof.events());
    let skipped_events = report.skipped();
    if report.intervals.is_empty() {
        return Err(PipelineError::EmptyEventLog);
    }

    tracing::debug!(
        intervals = report.intervals.len(),
        skipped_events,
        "normalized statement of facts"
    );

    let timeline = sequence_timeline(
        report.intervals,
        &config.sequencer,
        collaborators.gap_inference,
    );

    let clause_text = contract.map(ExtractedDocument::full_text).unwrap_or_default();
    let timeline = insert_nor_period(timeline, &clause_text);

    let clauses: Vec<String> = contract.map(ExtractedDocument::clause_texts).unwrap_or_default();
    let deductions = reconcile_deductions(&timeline, &clauses, collaborators.clause_matcher);

    let summary = calculate::summarize(&timeline, &deductions)?;

    let terms = contract.map(ExtractedDocument::voyage_terms).unwrap_or_default();
    let settlement = settle_if_complete(&summary, &terms);

    Ok(LaytimeReport {
        intervals: timeline,
        deductions,
        summary,
        settlement,
        skipped_events,
    })
}

fn settle_if_complete(summary: &LaytimeSummary, terms: &VoyageTerms) -> Option<Settlement> {
    let settlement = calculate::settle(summary, terms);
    if settlement.is_none() {
        tracing::debug!("contract terms incomplete, skipping settlement");
    }
    settlement
}
