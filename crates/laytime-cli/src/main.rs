use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use laytime_cli::commands::{batch, calculate, reports, util};
use laytime_cli::{Cli, Commands, Config, ReportsAction};
use laytime_core::sequence::SequencerConfig;
use laytime_core::{Collaborators, DocumentType, PipelineConfig};
use laytime_llm::BlockingClient;

/// Load config and open the report store, ensuring the parent directory
/// exists.
fn open_store(config_path: Option<&Path>) -> Result<(laytime_store::Store, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let store = laytime_store::Store::open(&config.database_path)
        .context("failed to open report store")?;
    Ok((store, config))
}

fn pipeline_config(config: &Config) -> PipelineConfig {
    PipelineConfig {
        sequencer: SequencerConfig {
            holiday_markers: config.holiday_markers.clone(),
        },
    }
}

/// Builds the Gemini-backed collaborators when an API key is available.
fn llm_client(config: &Config) -> Option<BlockingClient> {
    let api_key = std::env::var("GOOGLE_API_KEY").ok()?;
    match BlockingClient::new(api_key, &config.model) {
        Ok(client) => Some(client),
        Err(err) => {
            tracing::warn!(error = %err, "LLM client unavailable, using fallbacks");
            None
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let mut stdout = std::io::stdout().lock();

    match &cli.command {
        Some(Commands::Calculate {
            sof,
            contract,
            voyage,
            json,
        }) => {
            let config = Config::load_from(cli.config.as_deref())
                .context("failed to load configuration")?;

            let mut documents = vec![util::load_document(sof, Some(DocumentType::Sof))?];
            if let Some(contract) = contract {
                documents.push(util::load_document(
                    contract,
                    Some(DocumentType::Contract),
                )?);
            }

            let client = llm_client(&config);
            let collaborators = client.as_ref().map_or_else(Collaborators::default, |c| {
                Collaborators {
                    gap_inference: Some(c),
                    clause_matcher: Some(c),
                }
            });

            let report = calculate::run(
                &mut stdout,
                &documents,
                &pipeline_config(&config),
                collaborators,
                *json,
            )?;

            // Archiving is fire-and-forget: a store failure never invalidates
            // the calculation already printed.
            if let Some(voyage) = voyage {
                match open_store(cli.config.as_deref()) {
                    Ok((mut store, _config)) => {
                        if let Err(err) = store.put_report(voyage, &report) {
                            tracing::warn!(voyage, error = %err, "failed to save report");
                        }
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "report store unavailable");
                    }
                }
            }
        }
        Some(Commands::Batch { dir, json }) => {
            let config = Config::load_from(cli.config.as_deref())
                .context("failed to load configuration")?;

            let results = batch::run(&mut stdout, dir, &pipeline_config(&config), *json)?;

            match open_store(cli.config.as_deref()) {
                Ok((mut store, _config)) => {
                    for (voyage, report) in &results {
                        if let Err(err) = store.put_report(voyage, report) {
                            tracing::warn!(voyage, error = %err, "failed to save report");
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "report store unavailable");
                }
            }
        }
        Some(Commands::Reports { action }) => {
            let (store, _config) = open_store(cli.config.as_deref())?;
            match action {
                ReportsAction::List { prefix } => {
                    reports::list(&mut stdout, &store, prefix.as_deref())?;
                }
                ReportsAction::Show { voyage } => {
                    reports::show(&mut stdout, &store, voyage)?;
                }
            }
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
