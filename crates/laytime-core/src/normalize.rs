//! Event normalization: heterogeneous raw records into uniform intervals.

use serde_json::Value;

use crate::event::RawEvent;
use crate::interval::Interval;
use crate::time::{parse_day_first, parse_timestamp};

/// Output of normalization, including the audit trail of dropped records.
#[derive(Debug, Clone, Default)]
pub struct NormalizeReport {
    /// Normalized intervals in input order. `end` may still be `None`; the
    /// sequencer resolves open ends.
    pub intervals: Vec<Interval>,
    /// Records matching neither recognized shape.
    pub skipped_shapes: usize,
    /// Records with unparseable timestamps.
    pub skipped_parse: usize,
}

impl NormalizeReport {
    /// Total records dropped during normalization.
    pub const fn skipped(&self) -> usize {
        self.skipped_shapes + self.skipped_parse
    }
}

/// Converts raw extraction-collaborator records into intervals.
///
/// Input order is preserved (it is not necessarily chronological). A parse
/// failure skips the offending record and is counted, never fatal to the
/// batch.
pub fn normalize_events(raw: &[Value]) -> NormalizeReport {
    let mut report = NormalizeReport::default();
    // True for entries whose end is implied by the next record's timestamp.
    let mut chained: Vec<bool> = Vec::new();

    for value in raw {
        let Some(event) = RawEvent::from_value(value) else {
            tracing::warn!(record = %value, "skipping unrecognized event shape");
            report.skipped_shapes += 1;
            continue;
        };

        match event {
            RawEvent::Logged {
                timestamp,
                event,
                remarks,
            } => match parse_timestamp(&timestamp) {
                Ok(start) => {
                    // The remark drives clause matching; fall back to the
                    // event text so bare log lines stay reconcilable.
                    let reason = remarks.unwrap_or_else(|| event.clone());
                    report
                        .intervals
                        .push(Interval::open(start, reason).with_label(event));
                    chained.push(true);
                }
                Err(err) => {
                    tracing::warn!(%timestamp, error = %err, "skipping event with bad timestamp");
                    report.skipped_parse += 1;
                }
            },
            RawEvent::Spanned {
                date,
                day: _,
                start_time,
                end_time,
                remarks,
            } => {
                let start = match parse_day_first(&date, &start_time) {
                    Ok(start) => start,
                    Err(err) => {
                        tracing::warn!(%date, %start_time, error = %err, "skipping event with bad start");
                        report.skipped_parse += 1;
                        continue;
                    }
                };
                // A bad end time degrades to an open end rather than dropping
                // the record; the start is still good information.
                let end = end_time.and_then(|t| match parse_day_first(&date, &t) {
                    Ok(end) => Some(end),
                    Err(err) => {
                        tracing::warn!(%date, end_time = %t, error = %err, "dropping unparseable end time");
                        None
                    }
                });
                let mut interval = Interval::open(start, remarks.unwrap_or_default());
                interval.end = end;
                report.intervals.push(interval);
                chained.push(false);
            }
        }
    }

    // Resolve implicit chain ends: each single-timestamp entry ends where the
    // next surviving record begins. The terminal entry of a chain stays open.
    for i in 0..report.intervals.len() {
        if chained[i] && report.intervals[i].end.is_none() {
            if let Some(next) = report.intervals.get(i + 1) {
                let next_start = next.start;
                report.intervals[i].end = Some(next_start);
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pairs_timestamp_chain_events() {
        let raw = vec![
            json!({"timestamp": "2025-07-01 08:00", "event": "Arrived"}),
            json!({"timestamp": "2025-07-01 10:00", "event": "Commenced Discharging"}),
            json!({"timestamp": "2025-07-01 18:00", "event": "Completed Discharging"}),
        ];

        let report = normalize_events(&raw);

        assert_eq!(report.skipped(), 0);
        assert_eq!(report.intervals.len(), 3);
        assert_eq!(
            report.intervals[0].end,
            Some(report.intervals[1].start)
        );
        assert_eq!(
            report.intervals[1].end,
            Some(report.intervals[2].start)
        );
        // Terminal chain event has no successor.
        assert_eq!(report.intervals[2].end, None);
        assert_eq!(
            report.intervals[1].label.as_deref(),
            Some("Commenced Discharging")
        );
    }

    #[test]
    fn chain_reason_prefers_remarks() {
        let raw = vec![
            json!({"timestamp": "2025-07-01 08:00", "event": "Stopped", "remarks": "Heavy rain"}),
            json!({"timestamp": "2025-07-01 09:00", "event": "Resumed"}),
        ];

        let report = normalize_events(&raw);

        assert_eq!(report.intervals[0].reason, "Heavy rain");
        assert_eq!(report.intervals[1].reason, "Resumed");
    }

    #[test]
    fn spanned_events_parse_day_first() {
        let raw = vec![json!({
            "date": "02/07/2025",
            "day": "Wednesday",
            "start_time": "09:00",
            "end_time": "11:30",
            "remarks": "Discharging"
        })];

        let report = normalize_events(&raw);

        let iv = &report.intervals[0];
        assert_eq!(iv.start.to_rfc3339(), "2025-07-02T09:00:00+00:00");
        assert_eq!(iv.end.unwrap().to_rfc3339(), "2025-07-02T11:30:00+00:00");
        assert_eq!(iv.reason, "Discharging");
    }

    #[test]
    fn spanned_event_without_end_stays_open() {
        let raw = vec![json!({
            "date": "02/07/2025",
            "start_time": "09:00",
            "remarks": "Surveyor on board"
        })];

        let report = normalize_events(&raw);
        assert_eq!(report.intervals[0].end, None);
    }

    #[test]
    fn unrecognized_shapes_are_counted_not_fatal() {
        let raw = vec![
            json!({"note": "vessel shifted"}),
            json!({"timestamp": "2025-07-01 08:00", "event": "Arrived"}),
            json!(42),
        ];

        let report = normalize_events(&raw);

        assert_eq!(report.intervals.len(), 1);
        assert_eq!(report.skipped_shapes, 2);
        assert_eq!(report.skipped_parse, 0);
    }

    #[test]
    fn bad_timestamp_skips_record_and_rechains() {
        let raw = vec![
            json!({"timestamp": "2025-07-01 08:00", "event": "Arrived"}),
            json!({"timestamp": "around noon", "event": "Shifted"}),
            json!({"timestamp": "2025-07-01 14:00", "event": "Berthed"}),
        ];

        let report = normalize_events(&raw);

        assert_eq!(report.intervals.len(), 2);
        assert_eq!(report.skipped_parse, 1);
        // The chain skips the dropped record.
        assert_eq!(
            report.intervals[0].end,
            Some(report.intervals[1].start)
        );
    }

    #[test]
    fn bad_end_time_degrades_to_open_end() {
        let raw = vec![json!({
            "date": "02/07/2025",
            "start_time": "09:00",
            "end_time": "noonish"
        })];

        let report = normalize_events(&raw);

        assert_eq!(report.intervals.len(), 1);
        assert_eq!(report.intervals[0].end, None);
        assert_eq!(report.skipped(), 0);
    }

    #[test]
    fn empty_input_is_empty_report() {
        let report = normalize_events(&[]);
        assert!(report.intervals.is_empty());
        assert_eq!(report.skipped(), 0);
    }
}
