//! The timeline interval, the atomic unit of laytime accounting.

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// A contiguous time span with an associated operational reason.
///
/// Within a finalized timeline, intervals are sorted by `start`,
/// non-overlapping, and contiguous except at sequence and calendar-date
/// boundaries. `end` is `None` only transiently during normalization or, at
/// most, for the final interval of a timeline; callers must handle the open
/// tail explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    /// When the interval begins.
    pub start: DateTime<Utc>,
    /// When the interval ends; open if unresolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    /// Optional phase tag (e.g. "NOR", "Commenced Discharging").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Free-text description driving clause matching. Empty when the source
    /// record carried no remark.
    #[serde(default)]
    pub reason: String,
}

impl Interval {
    /// Creates a closed interval.
    pub fn new(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            start,
            end: Some(end),
            label: None,
            reason: reason.into(),
        }
    }

    /// Creates an interval with an unresolved end.
    pub fn open(start: DateTime<Utc>, reason: impl Into<String>) -> Self {
        Self {
            start,
            end: None,
            label: None,
            reason: reason.into(),
        }
    }

    /// Attaches a phase label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The calendar date of the interval start. Always recomputed, never
    /// stored.
    pub fn date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    /// The weekday of the interval start.
    pub fn weekday(&self) -> Weekday {
        self.start.weekday()
    }

    /// Elapsed hours, or `None` while the end is unresolved.
    pub fn duration_hours(&self) -> Option<f64> {
        self.end
            .map(|end| (end - self.start).num_seconds() as f64 / 3600.0)
    }

    /// Whether the interval is an instantaneous (zero-duration) marker.
    pub fn is_instantaneous(&self) -> bool {
        self.end == Some(self.start)
    }

    /// Case-insensitive substring match of any pattern against the label or
    /// the reason. Used to locate phases like "NOR tendered" or "commenced
    /// discharging" in free-text event logs.
    pub fn matches_phase(&self, patterns: &[&str]) -> bool {
        let reason = self.reason.to_lowercase();
        let label = self.label.as_deref().map(str::to_lowercase);
        patterns.iter().any(|p| {
            let p = p.to_lowercase();
            reason.contains(&p) || label.as_deref().is_some_and(|l| l.contains(&p))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::parse_timestamp;

    fn ts(s: &str) -> DateTime<Utc> {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn duration_of_closed_interval() {
        let iv = Interval::new(ts("2025-07-01 08:00"), ts("2025-07-01 10:30"), "Arrived");
        assert!((iv.duration_hours().unwrap() - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn open_interval_has_no_duration() {
        let iv = Interval::open(ts("2025-07-01 08:00"), "Arrived");
        assert_eq!(iv.duration_hours(), None);
        assert!(!iv.is_instantaneous());
    }

    #[test]
    fn zero_duration_interval_is_instantaneous() {
        let t = ts("2025-07-01 08:00");
        let iv = Interval::new(t, t, "NOR tendered");
        assert!(iv.is_instantaneous());
        assert_eq!(iv.duration_hours(), Some(0.0));
    }

    #[test]
    fn derived_date_and_weekday() {
        let iv = Interval::open(ts("2025-07-06 09:00"), "Idle");
        assert_eq!(iv.date(), NaiveDate::from_ymd_opt(2025, 7, 6).unwrap());
        assert_eq!(iv.weekday(), Weekday::Sun);
    }

    #[test]
    fn phase_matching_is_case_insensitive() {
        let iv = Interval::open(ts("2025-07-01 08:00"), "NOR Tendered at anchorage");
        assert!(iv.matches_phase(&["nor tendered"]));
        assert!(!iv.matches_phase(&["commenced discharging"]));
    }

    #[test]
    fn phase_matching_checks_label() {
        let iv = Interval::open(ts("2025-07-01 08:00"), "as per master's advice")
            .with_label("Commenced Discharging");
        assert!(iv.matches_phase(&["commenced discharging"]));
    }

    #[test]
    fn serde_omits_absent_fields() {
        let iv = Interval::open(ts("2025-07-01 08:00"), "Arrived");
        let json = serde_json::to_value(&iv).unwrap();
        assert!(json.get("end").is_none());
        assert!(json.get("label").is_none());
    }
}
