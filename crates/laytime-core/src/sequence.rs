//! Interval sequencing.
//!
//! Turns an unordered, partially-resolved interval list into a chronological
//! timeline: sorts by start, resolves open ends against successors, clips
//! overlaps, fills temporal gaps, clamps intervals at calendar-date
//! boundaries, and collapses holidays and Sundays into single full-day
//! blocks.

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use thiserror::Error;

use crate::interval::Interval;

/// Reason assigned to a collapsed holiday.
pub const HOLIDAY_REASON: &str = "National Holiday";

/// Reason assigned to a collapsed Sunday.
pub const SUNDAY_REASON: &str = "Sunday";

/// Configuration for the sequencer.
///
/// Replaces the working-session state the source system carried implicitly
/// across calls; every knob is explicit and documented here.
#[derive(Debug, Clone)]
pub struct SequencerConfig {
    /// Case-insensitive substrings marking a date as a holiday. A date any of
    /// whose interval reasons contain a marker collapses into a single
    /// full-day block. Default: `["holiday"]`, which also covers
    /// "National Holiday".
    pub holiday_markers: Vec<String>,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            holiday_markers: vec!["holiday".to_string()],
        }
    }
}

/// Error reported by a gap-inference collaborator.
#[derive(Debug, Error, Clone)]
#[error("gap inference failed: {0}")]
pub struct GapInferenceError(pub String);

/// External collaborator that infers an operational reason for a synthesized
/// gap interval from its chronological neighbors.
///
/// The engine is callable without one: absence or failure degrades to a
/// deterministic carry-forward of the preceding reason.
pub trait GapInference {
    /// Infers a reason for the gap between `before` and `after`.
    fn infer_reason(
        &self,
        before: &Interval,
        after: &Interval,
    ) -> Result<String, GapInferenceError>;
}

/// End-of-day clamp time for date-boundary grouping.
fn day_end() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 0).expect("valid clock time")
}

/// Sequences intervals into a finalized timeline.
///
/// Stages run in order: sort, open-end resolution, overlap clipping and gap
/// filling, date-boundary clamping, special-day collapsing. Only the final
/// interval may remain open-ended.
pub fn sequence_timeline(
    mut intervals: Vec<Interval>,
    config: &SequencerConfig,
    inference: Option<&dyn GapInference>,
) -> Vec<Interval> {
    if intervals.is_empty() {
        return intervals;
    }

    intervals.sort_by_key(|iv| iv.start);
    resolve_open_ends(&mut intervals);
    let filled = fill_gaps(intervals, inference);
    let clamped = clamp_date_boundaries(filled);
    collapse_special_days(clamped, config)
}

/// Assigns each open end the start of the next interval with a differing
/// start, skipping zero-duration markers at the identical instant. An open
/// end with no qualifying successor stays open.
fn resolve_open_ends(intervals: &mut [Interval]) {
    for i in 0..intervals.len() {
        if intervals[i].end.is_some() {
            continue;
        }
        let start = intervals[i].start;
        let successor = intervals[i + 1..]
            .iter()
            .map(|iv| iv.start)
            .find(|s| *s != start);
        intervals[i].end = successor;
    }
}

/// Clips overlapping successors and synthesizes intervals over detected gaps.
fn fill_gaps(intervals: Vec<Interval>, inference: Option<&dyn GapInference>) -> Vec<Interval> {
    let mut out: Vec<Interval> = Vec::with_capacity(intervals.len());

    for mut iv in intervals {
        if let Some(prev) = out.last() {
            if let Some(prev_end) = prev.end {
                if prev_end > iv.start {
                    // Overlap: a single reason owns any given timeframe, so
                    // the later interval yields.
                    tracing::debug!(start = %iv.start, clipped_to = %prev_end, "clipping overlapping interval");
                    iv.start = prev_end;
                    if iv.end.is_some_and(|end| end < iv.start) {
                        iv.end = Some(iv.start);
                    }
                } else if prev_end < iv.start {
                    let reason = gap_reason(prev, &iv, inference);
                    tracing::debug!(from = %prev_end, to = %iv.start, %reason, "filling timeline gap");
                    out.push(Interval::new(prev_end, iv.start, reason));
                }
            }
        }
        out.push(iv);
    }

    out
}

/// Picks a reason for a synthesized gap interval.
fn gap_reason(
    before: &Interval,
    after: &Interval,
    inference: Option<&dyn GapInference>,
) -> String {
    if let Some(collaborator) = inference {
        match collaborator.infer_reason(before, after) {
            Ok(reason) if !reason.trim().is_empty() => return reason.trim().to_string(),
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(error = %err, "gap inference unavailable, carrying reason forward");
            }
        }
    }
    // Deterministic fallback: carry the preceding reason forward; an empty
    // predecessor borrows from the successor instead.
    if before.reason.is_empty() {
        after.reason.clone()
    } else {
        before.reason.clone()
    }
}

/// Clamps the last interval of each calendar date to 23:59 where it would
/// otherwise cross midnight.
fn clamp_date_boundaries(mut intervals: Vec<Interval>) -> Vec<Interval> {
    for iv in &mut intervals {
        if let Some(end) = iv.end {
            if end.date_naive() > iv.date() {
                iv.end = Some(iv.date().and_time(day_end()).and_utc());
            }
        }
    }
    intervals
}

/// Collapses any holiday- or Sunday-dated run of intervals into one full-day
/// block. Holidays take precedence when both apply.
fn collapse_special_days(intervals: Vec<Interval>, config: &SequencerConfig) -> Vec<Interval> {
    let mut out: Vec<Interval> = Vec::with_capacity(intervals.len());
    let mut i = 0;

    while i < intervals.len() {
        let date = intervals[i].date();
        let mut j = i;
        while j < intervals.len() && intervals[j].date() == date {
            j += 1;
        }
        let day = &intervals[i..j];

        if day_matches_holiday(day, config) {
            out.push(full_day(date, HOLIDAY_REASON));
        } else if date.weekday() == Weekday::Sun {
            out.push(full_day(date, SUNDAY_REASON));
        } else {
            out.extend_from_slice(day);
        }
        i = j;
    }

    out
}

fn day_matches_holiday(day: &[Interval], config: &SequencerConfig) -> bool {
    day.iter().any(|iv| {
        let reason = iv.reason.to_lowercase();
        config
            .holiday_markers
            .iter()
            .any(|marker| reason.contains(&marker.to_lowercase()))
    })
}

fn full_day(date: NaiveDate, reason: &str) -> Interval {
    Interval::new(
        date.and_hms_opt(0, 0, 0).expect("valid clock time").and_utc(),
        date.and_time(day_end()).and_utc(),
        reason,
    )
}
