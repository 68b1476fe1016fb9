//! Laytime reconciliation CLI library.
//!
//! This crate provides the CLI interface for the laytime engine.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, ReportsAction};
pub use config::Config;
