//! Laytime aggregation and demurrage/despatch settlement.

use chrono::{DateTime, Datelike, Duration, NaiveTime, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::deduction::Deduction;
use crate::interval::Interval;

/// Calculator errors. All variants signal an upstream contract violation; a
/// total computed over such input would be meaningless.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalcError {
    /// An interval's end precedes its start.
    #[error("negative interval duration at {start}")]
    NegativeDuration { start: DateTime<Utc> },

    /// The sequence is not chronologically ordered.
    #[error("non-chronological sequence at {start}")]
    OutOfOrder { start: DateTime<Utc> },
}

/// The terminal laytime figures. Derived, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaytimeSummary {
    /// Elapsed hours from the first interval's start to the last interval's
    /// end.
    pub total_block_hours: f64,
    /// Hours excluded from laytime under deducted clauses.
    pub total_deduction_hours: f64,
    /// Net usable laytime.
    pub net_laytime_hours: f64,
}

/// Aggregates a finalized timeline and its deductions into the terminal
/// summary.
///
/// An unresolved end on the final interval contributes zero (its start is
/// substituted), preventing unbounded totals from a dangling open interval.
/// Deduction hours are coerced defensively; non-numeric values are skipped,
/// never fatal.
pub fn summarize(
    intervals: &[Interval],
    deductions: &[Deduction],
) -> Result<LaytimeSummary, CalcError> {
    let total_block_hours = total_block_hours(intervals)?;

    let total_deduction_hours: f64 = deductions
        .iter()
        .filter(|d| d.deduct)
        .filter_map(|d| coerce_hours(&d.total_hours))
        // Explicit 0.0 seed: std's `Sum for f64` uses -0.0 as its neutral
        // element, which would surface as "-0.0" in serialized summaries.
        .fold(0.0, |acc, hours| acc + hours);

    Ok(LaytimeSummary {
        total_block_hours,
        total_deduction_hours,
        net_laytime_hours: total_block_hours - total_deduction_hours,
    })
}

/// Elapsed hours over the whole block, validating chronology.
fn total_block_hours(intervals: &[Interval]) -> Result<f64, CalcError> {
    let Some(first) = intervals.first() else {
        return Ok(0.0);
    };

    let mut previous_start = first.start;
    for interval in intervals {
        if interval.start < previous_start {
            return Err(CalcError::OutOfOrder {
                start: interval.start,
            });
        }
        if interval.end.is_some_and(|end| end < interval.start) {
            return Err(CalcError::NegativeDuration {
                start: interval.start,
            });
        }
        previous_start = interval.start;
    }

    let last = intervals.last().expect("non-empty checked above");
    let span_end = last.end.unwrap_or(last.start);
    Ok((span_end - first.start).num_seconds() as f64 / 3600.0)
}

/// Coerces a collaborator-reported hours value to `f64`.
///
/// Numbers pass through; strings are trimmed, de-comma'd and parsed. Anything
/// else is skipped rather than failed.
pub fn coerce_hours(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

/// Formats fractional hours as `HH:MM`, carrying minute rounding.
pub fn format_hhmm(hours: f64) -> String {
    let mut whole = hours.trunc() as i64;
    let mut minutes = ((hours - hours.trunc()) * 60.0).round() as i64;
    if minutes == 60 {
        whole += 1;
        minutes = 0;
    }
    format!("{whole:02}:{minutes:02}")
}

// ========== Settlement ==========

/// Contract-side figures for the demurrage/despatch settlement, extracted
/// from contract metadata via the clause parsers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VoyageTerms {
    /// Cargo quantity (MT).
    pub cargo_quantity: Option<f64>,
    /// Discharge rate (MT per day).
    pub discharge_rate: Option<f64>,
    /// Demurrage rate (USD per day).
    pub demurrage_rate: Option<f64>,
    /// Despatch rate (USD per day).
    pub despatch_rate: Option<f64>,
}

/// The demurrage/despatch outcome of a voyage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Settlement {
    /// Laytime overrun: the charterer owes demurrage.
    Demurrage { days: f64, cost: f64 },
    /// Laytime underrun: the charterer is owed despatch.
    Despatch { days: f64, credit: f64 },
    /// Time used equals time allowed.
    Even,
}

/// Settles net laytime against the contractual allowance.
///
/// Time allowed = quantity / discharge rate (days); time used = net laytime /
/// 24. Returns `None` when the contract terms are incomplete or the discharge
/// rate is zero.
pub fn settle(summary: &LaytimeSummary, terms: &VoyageTerms) -> Option<Settlement> {
    let quantity = terms.cargo_quantity?;
    let rate = terms.discharge_rate?;
    if rate == 0.0 {
        return None;
    }

    let allowed_days = quantity / rate;
    let used_days = summary.net_laytime_hours / 24.0;
    // Settlements are quoted to four decimal places of a day.
    let difference = round4(used_days - allowed_days);

    if difference > 0.0 {
        Some(Settlement::Demurrage {
            days: difference,
            cost: round2(difference * terms.demurrage_rate.unwrap_or(0.0)),
        })
    } else if difference < 0.0 {
        let days = -difference;
        Some(Settlement::Despatch {
            days,
            credit: round2(days * terms.despatch_rate.unwrap_or(0.0)),
        })
    } else {
        Some(Settlement::Even)
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ========== Working-hours counting ==========

/// Declared port working hours.
///
/// Defaults match the customary discharge-port schedule: weekdays
/// 09:00-18:00, Saturdays 09:00-12:00, Sundays excluded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkingHours {
    /// Monday-Friday working window.
    pub weekday: (NaiveTime, NaiveTime),
    /// Saturday working window, if the port works Saturdays.
    pub saturday: Option<(NaiveTime, NaiveTime)>,
}

impl Default for WorkingHours {
    fn default() -> Self {
        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).expect("valid clock time");
        Self {
            weekday: (t(9, 0), t(18, 0)),
            saturday: Some((t(9, 0), t(12, 0))),
        }
    }
}

/// Counts working hours between two timestamps, hour by clock hour.
///
/// Sundays never count; Saturdays count only within the Saturday window;
/// weekdays count only within the weekday window. Each individual hour is
/// validated by clock time, never assumed from full blocks. Suspension
/// periods are deliberately not considered here; they are handled as
/// deductions.
pub fn working_hours_between(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    hours: &WorkingHours,
) -> f64 {
    if end <= start {
        return 0.0;
    }

    let mut counted = 0.0f64;
    let mut cursor = start;
    while cursor < end {
        // Step to the top of the next clock hour, never past the end.
        let next_hour = cursor
            .date_naive()
            .and_hms_opt(cursor.hour(), 0, 0)
            .expect("valid clock time")
            .and_utc()
            + Duration::hours(1);
        let next = next_hour.min(end);

        let window = match cursor.weekday() {
            Weekday::Sun => None,
            Weekday::Sat => hours.saturday,
            _ => Some(hours.weekday),
        };
        if let Some((from, to)) = window {
            let clock = cursor.time();
            if clock >= from && clock < to {
                counted += (next - cursor).num_seconds() as f64 / 3600.0;
            }
        }
        cursor = next;
    }

    counted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::parse_timestamp;
    use crate::types::Confidence;
    use serde_json::json;

    fn ts(s: &str) -> DateTime<Utc> {
        parse_timestamp(s).unwrap()
    }

    fn iv(start: &str, end: &str, reason: &str) -> Interval {
        Interval::new(ts(start), ts(end), reason)
    }

    fn deduction(deduct: bool, hours: Value) -> Deduction {
        Deduction {
            matched_clause: None,
            remark: "test".to_string(),
            confidence: Confidence::MIN,
            deduct,
            deducted_from: ts("2025-07-01 08:00"),
            deducted_to: ts("2025-07-01 10:00"),
            total_hours: hours,
        }
    }

    #[test]
    fn paired_timestamp_scenario_totals_ten_hours() {
        let intervals = vec![
            iv("2025-07-01 08:00", "2025-07-01 10:00", "Arrived"),
            iv("2025-07-01 10:00", "2025-07-01 18:00", "Commenced Discharging"),
        ];

        let summary = summarize(&intervals, &[]).unwrap();

        assert!((summary.total_block_hours - 10.0).abs() < f64::EPSILON);
        assert!((summary.net_laytime_hours - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn gap_filled_day_totals_seven_hours() {
        let intervals = vec![
            iv("2025-06-30 09:00", "2025-06-30 11:00", "Discharging"),
            iv("2025-06-30 11:00", "2025-06-30 14:00", "Discharging"),
            iv("2025-06-30 14:00", "2025-06-30 16:00", "Discharging"),
        ];

        let summary = summarize(&intervals, &[]).unwrap();
        assert!((summary.total_block_hours - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn deduct_false_entries_are_excluded_from_sum() {
        let intervals = vec![iv("2025-07-01 08:00", "2025-07-01 18:00", "Discharging")];
        let deductions = vec![
            deduction(true, json!(3.0)),
            deduction(false, json!(5.0)),
        ];

        let summary = summarize(&intervals, &deductions).unwrap();

        assert!((summary.total_deduction_hours - 3.0).abs() < f64::EPSILON);
        assert!((summary.net_laytime_hours - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn textual_hours_are_coerced_and_garbage_skipped() {
        let intervals = vec![iv("2025-07-01 08:00", "2025-07-01 18:00", "Discharging")];
        let deductions = vec![
            deduction(true, json!("2.5")),
            deduction(true, json!("1,5")),
            deduction(true, json!("n/a")),
            deduction(true, Value::Null),
        ];

        let summary = summarize(&intervals, &deductions).unwrap();
        // "2.5" parses, "1,5" de-commas to 15, "n/a" and null are skipped.
        assert!((summary.total_deduction_hours - 17.5).abs() < f64::EPSILON);
    }

    #[test]
    fn open_final_interval_contributes_zero() {
        let intervals = vec![
            iv("2025-07-01 08:00", "2025-07-01 10:00", "Discharging"),
            Interval::open(ts("2025-07-01 10:00"), "Completed"),
        ];

        let summary = summarize(&intervals, &[]).unwrap();
        assert!((summary.total_block_hours - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_timeline_totals_zero() {
        let summary = summarize(&[], &[]).unwrap();
        assert!((summary.total_block_hours).abs() < f64::EPSILON);
    }

    #[test]
    fn negative_duration_is_fatal() {
        let mut bad = iv("2025-07-01 10:00", "2025-07-01 08:00", "Discharging");
        bad.end = Some(ts("2025-07-01 08:00"));

        let err = summarize(&[bad], &[]).unwrap_err();
        assert!(matches!(err, CalcError::NegativeDuration { .. }));
    }

    #[test]
    fn out_of_order_sequence_is_fatal() {
        let intervals = vec![
            iv("2025-07-01 12:00", "2025-07-01 14:00", "B"),
            iv("2025-07-01 08:00", "2025-07-01 10:00", "A"),
        ];

        let err = summarize(&intervals, &[]).unwrap_err();
        assert!(matches!(err, CalcError::OutOfOrder { .. }));
    }

    #[test]
    fn deduction_sum_within_block_is_monotonic() {
        let intervals = vec![iv("2025-07-01 00:00", "2025-07-02 00:00", "Discharging")];
        let deductions: Vec<_> = (0..4).map(|_| deduction(true, json!(5.0))).collect();

        let summary = summarize(&intervals, &deductions).unwrap();
        assert!(summary.total_deduction_hours <= summary.total_block_hours);
    }

    #[test]
    fn format_hhmm_carries_minute_rounding() {
        assert_eq!(format_hhmm(2.5), "02:30");
        assert_eq!(format_hhmm(0.0), "00:00");
        assert_eq!(format_hhmm(9.999), "10:00");
        assert_eq!(format_hhmm(27.25), "27:15");
    }

    // ========== Settlement ==========

    fn terms() -> VoyageTerms {
        VoyageTerms {
            cargo_quantity: Some(50_000.0),
            discharge_rate: Some(5_000.0),
            demurrage_rate: Some(12_000.0),
            despatch_rate: Some(6_000.0),
        }
    }

    fn summary(net_hours: f64) -> LaytimeSummary {
        LaytimeSummary {
            total_block_hours: net_hours,
            total_deduction_hours: 0.0,
            net_laytime_hours: net_hours,
        }
    }

    #[test]
    fn overrun_incurs_demurrage() {
        // Allowed 10 days; used 12 days.
        let settlement = settle(&summary(288.0), &terms()).unwrap();
        assert_eq!(
            settlement,
            Settlement::Demurrage {
                days: 2.0,
                cost: 24_000.0
            }
        );
    }

    #[test]
    fn underrun_earns_despatch() {
        // Allowed 10 days; used 9 days.
        let settlement = settle(&summary(216.0), &terms()).unwrap();
        assert_eq!(
            settlement,
            Settlement::Despatch {
                days: 1.0,
                credit: 6_000.0
            }
        );
    }

    #[test]
    fn exact_use_is_even() {
        let settlement = settle(&summary(240.0), &terms()).unwrap();
        assert_eq!(settlement, Settlement::Even);
    }

    #[test]
    fn incomplete_terms_yield_no_settlement() {
        assert_eq!(settle(&summary(240.0), &VoyageTerms::default()), None);

        let zero_rate = VoyageTerms {
            discharge_rate: Some(0.0),
            ..terms()
        };
        assert_eq!(settle(&summary(240.0), &zero_rate), None);
    }

    // ========== Working hours ==========

    #[test]
    fn counts_only_declared_working_hours() {
        // The worked example from the original agent rules:
        // Fri 17:00-18:00 (1h), Sat 09:00-11:00 within 09:00-12:00 (2h)... here
        // simplified: Tue 17:00 through Thu 11:00 with 09:00-18:00 weekdays.
        let counted = working_hours_between(
            ts("2025-07-01 17:00"),
            ts("2025-07-03 11:00"),
            &WorkingHours::default(),
        );
        // Tue 17-18 = 1h, Wed 09-18 = 9h, Thu 09-11 = 2h.
        assert!((counted - 12.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sundays_never_count() {
        // 2025-07-06 is a Sunday.
        let counted = working_hours_between(
            ts("2025-07-06 00:00"),
            ts("2025-07-07 00:00"),
            &WorkingHours::default(),
        );
        assert!(counted.abs() < f64::EPSILON);
    }

    #[test]
    fn saturday_counts_within_saturday_window_only() {
        // 2025-07-05 is a Saturday.
        let counted = working_hours_between(
            ts("2025-07-05 08:00"),
            ts("2025-07-05 18:00"),
            &WorkingHours::default(),
        );
        assert!((counted - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn partial_hours_count_fractionally() {
        let counted = working_hours_between(
            ts("2025-07-01 09:30"),
            ts("2025-07-01 10:00"),
            &WorkingHours::default(),
        );
        assert!((counted - 0.5).abs() < f64::EPSILON);

        let counted = working_hours_between(
            ts("2025-07-01 09:30"),
            ts("2025-07-01 11:00"),
            &WorkingHours::default(),
        );
        assert!((counted - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn reversed_range_counts_zero() {
        let counted = working_hours_between(
            ts("2025-07-02 10:00"),
            ts("2025-07-01 10:00"),
            &WorkingHours::default(),
        );
        assert!(counted.abs() < f64::EPSILON);
    }
}
