//! Batch command for reconciling a directory of voyages.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;

use laytime_core::{Collaborators, LaytimeReport, PipelineConfig, run_pipeline};

use super::util::load_documents_from_dir;

/// Reconciles every voyage subdirectory under `dir` in parallel.
///
/// Batch runs are fully offline: clause matching and gap inference use their
/// deterministic fallbacks so results are reproducible and the run never
/// stalls on a model. Use `calculate` per voyage for model-backed verdicts.
///
/// Returns the successful reports keyed by voyage directory name.
pub fn run<W: Write>(
    writer: &mut W,
    dir: &Path,
    config: &PipelineConfig,
    json: bool,
) -> Result<Vec<(String, LaytimeReport)>> {
    let mut voyages: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read {}", dir.display()))?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    voyages.sort();

    let results: Vec<(String, Result<LaytimeReport>)> = voyages
        .par_iter()
        .map(|voyage_dir| {
            let voyage = voyage_dir
                .file_name()
                .map_or_else(|| voyage_dir.display().to_string(), |name| {
                    name.to_string_lossy().into_owned()
                });
            let report = load_documents_from_dir(voyage_dir).and_then(|documents| {
                run_pipeline(&documents, config, Collaborators::default())
                    .with_context(|| format!("failed to reconcile {voyage}"))
            });
            (voyage, report)
        })
        .collect();

    let mut reports = Vec::new();
    for (voyage, result) in results {
        match result {
            Ok(report) => {
                if json {
                    let line = serde_json::json!({
                        "voyage": voyage,
                        "summary": report.summary,
                        "settlement": report.settlement,
                    });
                    writeln!(writer, "{line}")?;
                } else {
                    writeln!(
                        writer,
                        "{voyage}: net laytime {:.2} h ({} skipped events)",
                        report.summary.net_laytime_hours, report.skipped_events
                    )?;
                }
                reports.push((voyage, report));
            }
            Err(err) => {
                tracing::warn!(voyage, error = %err, "voyage failed");
                writeln!(writer, "{voyage}: FAILED ({err:#})")?;
            }
        }
    }

    Ok(reports)
}
