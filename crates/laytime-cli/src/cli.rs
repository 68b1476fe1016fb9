//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Laytime reconciliation engine.
///
/// Turns extracted voyage documents (Statement of Facts, charter party) into
/// an auditable laytime timeline with deductions and a demurrage/despatch
/// settlement.
#[derive(Debug, Parser)]
#[command(name = "laytime", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Calculate laytime for one voyage from extracted documents.
    Calculate {
        /// Path to the extracted Statement of Facts JSON.
        #[arg(long)]
        sof: PathBuf,

        /// Path to the extracted contract JSON.
        #[arg(long)]
        contract: Option<PathBuf>,

        /// Voyage key to save the report under.
        #[arg(long)]
        voyage: Option<String>,

        /// Emit the full report as JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },

    /// Calculate laytime for every voyage directory under a root.
    Batch {
        /// Directory with one subdirectory of document JSON files per voyage.
        dir: PathBuf,

        /// Emit results as JSON lines instead of summaries.
        #[arg(long)]
        json: bool,
    },

    /// Inspect stored reports.
    Reports {
        #[command(subcommand)]
        action: ReportsAction,
    },
}

/// Stored report operations.
#[derive(Debug, Subcommand)]
pub enum ReportsAction {
    /// List stored reports, most recent first.
    List {
        /// Only list voyages with this key prefix.
        #[arg(long)]
        prefix: Option<String>,
    },

    /// Print a stored report as JSON.
    Show {
        /// Voyage key.
        voyage: String,
    },
}
