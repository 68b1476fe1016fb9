//! Notice-of-Readiness period insertion.
//!
//! Laytime does not count from the first logged event; it counts from the
//! contractual boundary derived from the NOR tender plus the clause-specified
//! delay (or earlier, if discharging actually commenced first). Everything
//! before that boundary is replaced by a single synthetic NOR interval.

use chrono::{DateTime, Duration, Utc};

use crate::clause::parse_delay_hours;
use crate::interval::Interval;

/// Label carried by the synthetic NOR interval.
pub const NOR_LABEL: &str = "NOR";

const TENDER_PATTERNS: &[&str] = &["nor tendered", "notice of readiness tendered"];
const COMMENCED_PATTERNS: &[&str] = &["commenced discharging"];

/// Replaces the pre-laytime portion of a finalized timeline with a synthetic
/// NOR interval.
///
/// The operation is idempotent: re-applying it to an already-NOR-prefixed
/// timeline with the same clause text yields the same timeline. A zero-delay
/// NOR interval may be zero-duration; it is a legitimate marker and survives.
pub fn insert_nor_period(intervals: Vec<Interval>, clause_text: &str) -> Vec<Interval> {
    if intervals.is_empty() {
        return intervals;
    }

    let tender = intervals
        .iter()
        .filter(|iv| iv.matches_phase(TENDER_PATTERNS))
        .map(|iv| iv.start)
        .min()
        .unwrap_or(intervals[0].start);

    let delay_hours = parse_delay_hours(clause_text);
    let default_cutoff = tender + Duration::hours(i64::from(delay_hours));

    let commenced = intervals
        .iter()
        .filter(|iv| iv.matches_phase(COMMENCED_PATTERNS))
        .map(|iv| iv.start)
        .min();
    let laytime_start = commenced.map_or(default_cutoff, |c| default_cutoff.min(c));

    tracing::debug!(%tender, delay_hours, %laytime_start, "computed laytime start boundary");

    // Discharging commenced before tender leaves no waiting period at all;
    // the NOR marker degenerates to zero width at the boundary.
    let nor_start = tender.min(laytime_start);
    let nor = Interval::new(
        nor_start,
        laytime_start,
        format!("Notice of Readiness period ({delay_hours} h)"),
    )
    .with_label(NOR_LABEL);

    let mut out = Vec::with_capacity(intervals.len() + 1);
    out.push(nor.clone());

    for mut iv in intervals {
        // An identical NOR marker from a previous application is absorbed.
        if iv == nor {
            continue;
        }
        if iv.start >= laytime_start {
            out.push(iv);
        } else if iv.end.is_some_and(|end| end > laytime_start) {
            // Straddler: advance its start to the boundary.
            iv.start = laytime_start;
            out.push(iv);
        }
        // Entirely pre-laytime intervals are discarded.
    }

    out
}

/// The laytime start boundary of a NOR-prefixed timeline, i.e. the end of the
/// synthetic NOR interval.
pub fn laytime_start(intervals: &[Interval]) -> Option<DateTime<Utc>> {
    intervals
        .first()
        .filter(|iv| iv.label.as_deref() == Some(NOR_LABEL))
        .and_then(|iv| iv.end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::parse_timestamp;

    fn ts(s: &str) -> DateTime<Utc> {
        parse_timestamp(s).unwrap()
    }

    fn iv(start: &str, end: &str, reason: &str) -> Interval {
        Interval::new(ts(start), ts(end), reason)
    }

    const CLAUSE: &str = "Laytime to commence twelve (12) hours after NOR is tendered";

    #[test]
    fn inserts_nor_period_and_discards_prefix() {
        let timeline = insert_nor_period(
            vec![
                iv("2025-07-01 06:00", "2025-07-01 08:00", "NOR tendered"),
                iv("2025-07-01 08:00", "2025-07-01 20:00", "Awaiting berth"),
                iv("2025-07-01 20:00", "2025-07-02 04:00", "Discharging"),
            ],
            CLAUSE,
        );

        // tender 06:00 + 12h = 18:00 cutoff.
        assert_eq!(timeline[0].label.as_deref(), Some(NOR_LABEL));
        assert_eq!(timeline[0].start, ts("2025-07-01 06:00"));
        assert_eq!(timeline[0].end, Some(ts("2025-07-01 18:00")));
        assert_eq!(timeline[0].reason, "Notice of Readiness period (12 h)");

        // The straddling "Awaiting berth" interval is clipped to the boundary.
        assert_eq!(timeline[1].start, ts("2025-07-01 18:00"));
        assert_eq!(timeline[1].reason, "Awaiting berth");
        assert_eq!(timeline.len(), 3);
    }

    #[test]
    fn commenced_discharging_pulls_boundary_earlier() {
        let timeline = insert_nor_period(
            vec![
                iv("2025-07-01 06:00", "2025-07-01 10:00", "NOR tendered"),
                iv("2025-07-01 10:00", "2025-07-01 20:00", "Commenced Discharging"),
            ],
            CLAUSE,
        );

        // min(06:00 + 12h, 10:00) = 10:00.
        assert_eq!(timeline[0].end, Some(ts("2025-07-01 10:00")));
        assert_eq!(timeline[1].start, ts("2025-07-01 10:00"));
        assert_eq!(timeline[1].reason, "Commenced Discharging");
    }

    #[test]
    fn falls_back_to_first_interval_without_tender_event() {
        let timeline = insert_nor_period(
            vec![iv("2025-07-01 08:00", "2025-07-01 12:00", "Discharging")],
            "laytime 6 hours after tender",
        );
        assert_eq!(timeline[0].start, ts("2025-07-01 08:00"));
        assert_eq!(timeline[0].end, Some(ts("2025-07-01 14:00")));
    }

    #[test]
    fn zero_delay_without_commencement_yields_zero_width_marker() {
        let timeline = insert_nor_period(
            vec![iv("2025-07-01 08:00", "2025-07-01 12:00", "NOR tendered")],
            "no delay specified here",
        );

        // [T, T): a legitimate zero-length marker, not filtered out.
        assert_eq!(timeline[0].start, ts("2025-07-01 08:00"));
        assert_eq!(timeline[0].end, Some(ts("2025-07-01 08:00")));
        assert!(timeline[0].is_instantaneous());
        // The original interval survives past the boundary.
        assert_eq!(timeline.len(), 2);
    }

    #[test]
    fn idempotent_on_nor_prefixed_timeline() {
        let input = vec![
            iv("2025-07-01 06:00", "2025-07-01 08:00", "NOR tendered"),
            iv("2025-07-01 08:00", "2025-07-01 20:00", "Awaiting berth"),
            iv("2025-07-01 20:00", "2025-07-02 04:00", "Discharging"),
        ];

        let once = insert_nor_period(input, CLAUSE);
        let twice = insert_nor_period(once.clone(), CLAUSE);
        assert_eq!(once, twice);
    }

    #[test]
    fn idempotent_with_zero_delay() {
        let input = vec![iv("2025-07-01 08:00", "2025-07-01 12:00", "NOR tendered")];

        let once = insert_nor_period(input, "");
        let twice = insert_nor_period(once.clone(), "");
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_timeline_passes_through() {
        assert!(insert_nor_period(vec![], CLAUSE).is_empty());
    }

    #[test]
    fn laytime_start_reads_nor_prefix() {
        let timeline = insert_nor_period(
            vec![iv("2025-07-01 06:00", "2025-07-01 20:00", "NOR tendered")],
            CLAUSE,
        );
        assert_eq!(laytime_start(&timeline), Some(ts("2025-07-01 18:00")));
    }
}
