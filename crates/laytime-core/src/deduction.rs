//! Deduction reconciliation against contract clauses.
//!
//! Each timeline interval is put to the external clause-matching collaborator
//! which decides whether the span is excluded from laytime under a
//! contractual exemption. Verdicts are collected as [`Deduction`] records;
//! non-deducted entries are retained for audit and count toward laytime.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::interval::Interval;
use crate::time::parse_timestamp;
use crate::types::Confidence;

/// Error reported by the clause-matching collaborator.
#[derive(Debug, Error, Clone)]
#[error("clause matching failed: {0}")]
pub struct MatchError(pub String);

/// One interval's worth of context handed to the clause matcher.
#[derive(Debug, Clone, Serialize)]
pub struct MatchRequest<'a> {
    /// Operational remark driving the match.
    pub reason: &'a str,
    /// Interval start.
    pub start: DateTime<Utc>,
    /// Interval end.
    pub end: DateTime<Utc>,
}

/// Raw verdict returned by the clause-matching collaborator.
///
/// Field types are deliberately loose: the collaborator is an external model
/// and its numeric fields may arrive as strings. The calculator coerces them
/// defensively.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClauseVerdict {
    /// The matched clause text, if any.
    #[serde(default, rename = "Clause")]
    pub clause: Option<String>,
    /// Match confidence, clamped to \[0.0, 1.0\].
    #[serde(default)]
    pub confidence_score: Confidence,
    /// Whether the span is excluded from laytime.
    #[serde(default)]
    pub deduct: bool,
    /// Collaborator's justification.
    #[serde(default)]
    pub reason: Option<String>,
    /// Deduction window start, as reported.
    #[serde(default)]
    pub deducted_from: Option<String>,
    /// Deduction window end, as reported.
    #[serde(default)]
    pub deducted_to: Option<String>,
    /// Hours claimed, number or string.
    #[serde(default)]
    pub total_hours: Value,
}

/// External collaborator that matches an interval's remark against the
/// contract clause set.
///
/// Implementations must tolerate an empty clause list (yielding
/// `deduct = false`).
pub trait ClauseMatcher {
    /// Evaluates one interval against the clause set.
    fn evaluate(
        &self,
        request: &MatchRequest<'_>,
        clauses: &[String],
    ) -> Result<ClauseVerdict, MatchError>;
}

/// A reconciled deduction record for one interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deduction {
    /// The matched clause text, if any.
    pub matched_clause: Option<String>,
    /// The interval's operational remark.
    pub remark: String,
    /// Match confidence.
    pub confidence: Confidence,
    /// Whether the span is excluded from laytime. `false` entries are kept
    /// for audit but excluded from the deduction sum.
    pub deduct: bool,
    /// Deduction window start.
    pub deducted_from: DateTime<Utc>,
    /// Deduction window end.
    pub deducted_to: DateTime<Utc>,
    /// Hours claimed by the collaborator, kept raw (number or string) for the
    /// calculator's defensive coercion.
    pub total_hours: Value,
}

/// Reconciles a finalized timeline against the contract clause set.
///
/// Intervals are evaluated in chronological order for determinism. Intervals
/// missing a reason or either endpoint are skipped outright: incomplete data
/// cannot be reconciled, and under-counting is safer than guessing. A
/// collaborator failure (or its absence) records a `deduct = false` verdict
/// with a diagnostic reason and never aborts later intervals.
pub fn reconcile_deductions(
    intervals: &[Interval],
    clauses: &[String],
    matcher: Option<&dyn ClauseMatcher>,
) -> Vec<Deduction> {
    let mut deductions = Vec::with_capacity(intervals.len());

    for interval in intervals {
        let Some(end) = interval.end else {
            tracing::debug!(start = %interval.start, "skipping open-ended interval");
            continue;
        };
        if interval.reason.is_empty() {
            tracing::debug!(start = %interval.start, "skipping interval without remark");
            continue;
        }

        let request = MatchRequest {
            reason: &interval.reason,
            start: interval.start,
            end,
        };

        let deduction = match matcher.map(|m| m.evaluate(&request, clauses)) {
            Some(Ok(verdict)) => from_verdict(interval, end, verdict),
            Some(Err(err)) => {
                tracing::warn!(start = %interval.start, error = %err, "clause matcher failed for interval");
                fallback(interval, end, format!("clause matching failed: {err}"))
            }
            None => fallback(interval, end, "clause matcher unavailable".to_string()),
        };
        deductions.push(deduction);
    }

    deductions
}

/// Builds a deduction from a collaborator verdict, falling back to interval
/// data where the verdict's window is absent or unparseable.
fn from_verdict(interval: &Interval, end: DateTime<Utc>, verdict: ClauseVerdict) -> Deduction {
    let deducted_from = parse_reported(verdict.deducted_from.as_deref()).unwrap_or(interval.start);
    let deducted_to = parse_reported(verdict.deducted_to.as_deref()).unwrap_or(end);
    let total_hours = if verdict.total_hours.is_null() {
        hours_value(interval.start, end)
    } else {
        verdict.total_hours
    };

    Deduction {
        matched_clause: verdict.clause,
        remark: interval.reason.clone(),
        confidence: verdict.confidence_score,
        deduct: verdict.deduct,
        deducted_from,
        deducted_to,
        total_hours,
    }
}

/// Deterministic no-deduction record used when the collaborator is absent or
/// failed.
fn fallback(interval: &Interval, end: DateTime<Utc>, diagnostic: String) -> Deduction {
    Deduction {
        matched_clause: None,
        remark: diagnostic,
        confidence: Confidence::MIN,
        deduct: false,
        deducted_from: interval.start,
        deducted_to: end,
        total_hours: hours_value(interval.start, end),
    }
}

fn parse_reported(value: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = value?;
    match parse_timestamp(raw) {
        Ok(ts) => Some(ts),
        Err(err) => {
            tracing::warn!(%raw, error = %err, "ignoring unparseable verdict timestamp");
            None
        }
    }
}

fn hours_value(start: DateTime<Utc>, end: DateTime<Utc>) -> Value {
    let hours = (end - start).num_seconds() as f64 / 3600.0;
    serde_json::Number::from_f64(hours).map_or(Value::Null, Value::Number)
}
