//! Raw event records from the extraction collaborator.
//!
//! Statement-of-facts logs arrive in two shapes: a timestamp chain where each
//! entry implicitly ends at the next entry's timestamp, and self-contained
//! rows with split date/day/start/end fields. The shape is decided exactly
//! once, here at the JSON boundary; every downstream stage pattern-matches on
//! the resulting sum type instead of probing keys.

use serde_json::Value;

/// A raw event record, consumed once by the normalizer and then discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawEvent {
    /// A single-timestamp log entry whose end is implied by its successor.
    Logged {
        timestamp: String,
        event: String,
        remarks: Option<String>,
    },
    /// A self-contained row with split date and time-of-day fields.
    /// `end_time` may be absent.
    Spanned {
        date: String,
        day: Option<String>,
        start_time: String,
        end_time: Option<String>,
        remarks: Option<String>,
    },
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

impl RawEvent {
    /// Classifies a JSON object into one of the two recognized shapes.
    ///
    /// Returns `None` for anything else. The caller counts these drops; the
    /// source system discarded them silently, which is preserved as behavior
    /// but made observable.
    pub fn from_value(value: &Value) -> Option<Self> {
        if let Some(timestamp) = str_field(value, "timestamp") {
            let event = str_field(value, "event")?;
            return Some(Self::Logged {
                timestamp,
                event,
                remarks: str_field(value, "remarks"),
            });
        }

        if let (Some(date), Some(start_time)) =
            (str_field(value, "date"), str_field(value, "start_time"))
        {
            return Some(Self::Spanned {
                date,
                day: str_field(value, "day"),
                start_time,
                end_time: str_field(value, "end_time"),
                remarks: str_field(value, "remarks")
                    .or_else(|| str_field(value, "reason")),
            });
        }

        None
    }
}
