//! Timestamp parsing for mixed event-log representations.
//!
//! Statements of facts arrive with whatever timestamp style the agent at the
//! port happened to use. The engine accepts the two formats the extraction
//! collaborator is contracted to emit (`YYYY-MM-DD HH:MM` and ISO 8601) plus
//! day-first dates for split date/time records. Anything else is an error
//! surfaced to the caller, never silently zeroed.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use thiserror::Error;

/// Timestamp parsing errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimestampError {
    /// The string matched none of the accepted formats.
    #[error("unrecognized timestamp: {value}")]
    Unrecognized { value: String },

    /// A day-first date string could not be parsed.
    #[error("unrecognized day-first date: {value}")]
    BadDate { value: String },

    /// A clock time string could not be parsed.
    #[error("unrecognized clock time: {value}")]
    BadTime { value: String },
}

/// Accepted `NaiveDateTime` formats, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Accepted day-first date formats, tried in order.
const DAY_FIRST_FORMATS: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%d/%m/%y"];

/// Parses a timestamp in `YYYY-MM-DD HH:MM` or ISO 8601 form.
///
/// Naive timestamps are interpreted as UTC; event logs carry local port time
/// with no offset, and the engine only ever compares timestamps against each
/// other.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, TimestampError> {
    let trimmed = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }

    Err(TimestampError::Unrecognized {
        value: value.to_string(),
    })
}

/// Parses a day-first date (`DD/MM/YYYY`) and an `HH:MM` clock time into a
/// single timestamp.
pub fn parse_day_first(date: &str, time: &str) -> Result<DateTime<Utc>, TimestampError> {
    let date = parse_day_first_date(date)?;
    let time = parse_clock_time(time)?;
    Ok(date.and_time(time).and_utc())
}

/// Parses a day-first date string.
pub fn parse_day_first_date(value: &str) -> Result<NaiveDate, TimestampError> {
    let trimmed = value.trim();
    for format in DAY_FIRST_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(date);
        }
    }
    Err(TimestampError::BadDate {
        value: value.to_string(),
    })
}

/// Parses an `HH:MM` clock time.
pub fn parse_clock_time(value: &str) -> Result<NaiveTime, TimestampError> {
    let trimmed = value.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|_| TimestampError::BadTime {
            value: value.to_string(),
        })
}
