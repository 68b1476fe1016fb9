//! Calculate command for reconciling one voyage.

use std::io::Write;

use anyhow::Result;

use laytime_core::calculate::format_hhmm;
use laytime_core::{
    Collaborators, ExtractedDocument, LaytimeReport, PipelineConfig, Settlement, run_pipeline,
};

/// Runs the pipeline over the voyage's documents and renders the result.
///
/// Returns the report so the caller can persist it.
pub fn run<W: Write>(
    writer: &mut W,
    documents: &[ExtractedDocument],
    config: &PipelineConfig,
    collaborators: Collaborators<'_>,
    json: bool,
) -> Result<LaytimeReport> {
    let report = run_pipeline(documents, config, collaborators)?;

    if json {
        serde_json::to_writer_pretty(&mut *writer, &report)?;
        writeln!(writer)?;
    } else {
        render_summary(writer, &report)?;
    }

    Ok(report)
}

fn render_summary<W: Write>(writer: &mut W, report: &LaytimeReport) -> Result<()> {
    writeln!(writer, "Timeline:")?;
    for interval in &report.intervals {
        let end = interval
            .end
            .map_or_else(|| "(open)".to_string(), |end| end.to_string());
        writeln!(writer, "- {} .. {}  {}", interval.start, end, interval.reason)?;
    }

    let deducted: Vec<_> = report.deductions.iter().filter(|d| d.deduct).collect();
    if !deducted.is_empty() {
        writeln!(writer, "Deductions:")?;
        for deduction in deducted {
            writeln!(
                writer,
                "- {} .. {}  {} ({})",
                deduction.deducted_from,
                deduction.deducted_to,
                deduction.remark,
                deduction
                    .matched_clause
                    .as_deref()
                    .unwrap_or("no clause quoted"),
            )?;
        }
    }

    writeln!(
        writer,
        "Total block time:  {}",
        format_hhmm(report.summary.total_block_hours)
    )?;
    writeln!(
        writer,
        "Deductions:        {}",
        format_hhmm(report.summary.total_deduction_hours)
    )?;
    writeln!(
        writer,
        "Net laytime:       {}",
        format_hhmm(report.summary.net_laytime_hours)
    )?;

    match report.settlement {
        Some(Settlement::Demurrage { days, cost }) => {
            writeln!(writer, "Demurrage:         {days:.4} days, USD {cost:.2}")?;
        }
        Some(Settlement::Despatch { days, credit }) => {
            writeln!(writer, "Despatch:          {days:.4} days, USD {credit:.2}")?;
        }
        Some(Settlement::Even) => {
            writeln!(writer, "Settlement:        even")?;
        }
        None => {}
    }

    if report.skipped_events > 0 {
        writeln!(
            writer,
            "Warning: {} event(s) skipped during normalization",
            report.skipped_events
        )?;
    }

    Ok(())
}
