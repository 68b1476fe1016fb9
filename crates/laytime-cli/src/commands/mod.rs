//! CLI subcommand implementations.

pub mod batch;
pub mod calculate;
pub mod reports;
pub mod util;
