//! Numeric parameter extraction from contract clause text.
//!
//! Charter-party clauses bury the numbers the engine needs ("laytime to
//! commence twelve (12) hours after notice of readiness...") in prose. These
//! parsers are deliberately small, isolated, and fallback-explicit so the
//! rest of the engine never touches regexes.

use std::sync::LazyLock;

use chrono::NaiveTime;
use regex::Regex;

use crate::time::parse_clock_time;

static DELAY_HOURS: LazyLock<Regex> = LazyLock::new(|| {
    // First integer immediately preceding "hours", tolerating the written-out
    // form "twelve (12) hours".
    Regex::new(r"(?i)(\d+)\s*\)?\s*hours").expect("valid regex")
});

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)").expect("valid regex"));

static HOURS_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    // "09:00-18:00", "09:00 – 18:00", "09:00 to 18:00"
    Regex::new(r"(\d{1,2}:\d{2})\s*(?:-|–|—|to)\s*(\d{1,2}:\d{2})").expect("valid regex")
});

/// Extracts the NOR delay in hours from clause text.
///
/// Returns 0 when no delay specification is found; a missing contract is not
/// fatal, laytime simply starts counting at tender.
pub fn parse_delay_hours(clause: &str) -> u32 {
    DELAY_HOURS
        .captures(clause)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(0)
}

/// Extracts the first numeric value from free text, tolerating thousands
/// separators ("50,000 MT" yields 50000.0).
pub fn extract_number(raw: &str) -> Option<f64> {
    let cleaned = raw.replace(',', "");
    NUMBER
        .captures(&cleaned)
        .and_then(|caps| caps[1].parse().ok())
}

/// Parses a working-hours clause like "09:00-18:00" or "09:00 to 18:00".
pub fn parse_hours_range(raw: &str) -> Option<(NaiveTime, NaiveTime)> {
    let caps = HOURS_RANGE.captures(raw)?;
    let from = parse_clock_time(&caps[1]).ok()?;
    let to = parse_clock_time(&caps[2]).ok()?;
    Some((from, to))
}
