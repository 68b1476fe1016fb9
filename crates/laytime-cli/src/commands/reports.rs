//! Reports command for inspecting stored reconciliations.

use std::io::Write;

use anyhow::{Context, Result, bail};

use laytime_store::Store;

/// Lists stored reports, optionally filtered by voyage key prefix.
pub fn list<W: Write>(writer: &mut W, store: &Store, prefix: Option<&str>) -> Result<()> {
    let entries = store.list_reports(prefix)?;
    if entries.is_empty() {
        writeln!(writer, "No stored reports.")?;
        return Ok(());
    }

    for entry in entries {
        writeln!(writer, "- {}  {}", entry.voyage, entry.saved_at)?;
    }
    Ok(())
}

/// Prints a stored report as JSON.
pub fn show<W: Write>(writer: &mut W, store: &Store, voyage: &str) -> Result<()> {
    let Some(report) = store
        .get_report(voyage)
        .with_context(|| format!("failed to load report for {voyage}"))?
    else {
        bail!("no stored report for {voyage}");
    };

    serde_json::to_writer_pretty(&mut *writer, &report)?;
    writeln!(writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use laytime_core::LaytimeReport;
    use laytime_core::calculate::LaytimeSummary;

    fn sample_report() -> LaytimeReport {
        LaytimeReport {
            intervals: Vec::new(),
            deductions: Vec::new(),
            summary: LaytimeSummary {
                total_block_hours: 10.0,
                total_deduction_hours: 2.0,
                net_laytime_hours: 8.0,
            },
            settlement: None,
            skipped_events: 0,
        }
    }

    #[test]
    fn list_names_each_voyage() {
        let mut store = Store::open_in_memory().unwrap();
        store.put_report("MV-AURORA-2025-07", &sample_report()).unwrap();

        let mut output = Vec::new();
        list(&mut output, &store, None).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("MV-AURORA-2025-07"));
    }

    #[test]
    fn list_reports_empty_store() {
        let store = Store::open_in_memory().unwrap();

        let mut output = Vec::new();
        list(&mut output, &store, None).unwrap();

        assert_eq!(String::from_utf8(output).unwrap(), "No stored reports.\n");
    }

    #[test]
    fn show_round_trips_the_report() {
        let mut store = Store::open_in_memory().unwrap();
        store.put_report("voyage-1", &sample_report()).unwrap();

        let mut output = Vec::new();
        show(&mut output, &store, "voyage-1").unwrap();

        let parsed: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(parsed["summary"]["net_laytime_hours"], 8.0);
    }

    #[test]
    fn show_missing_voyage_errors() {
        let store = Store::open_in_memory().unwrap();
        let mut output = Vec::new();
        assert!(show(&mut output, &store, "unknown").is_err());
    }
}
