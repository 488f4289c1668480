//! # Batch Writer CLI
//!
//! Command-line entry point.
//!
//! Provides:
//! - Configuration validation
//! - Synthetic load against a configured writer
//! - Graceful shutdown handling

mod cli;
mod commands;
mod error;
mod report;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_load, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(&cli)?;

    info!(version = env!("CARGO_PKG_VERSION"), "batchwriter starting");

    let result = match &cli.command {
        Commands::Run(args) => run_load(args).await,
        Commands::Validate(args) => run_validate(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Initialize logging based on CLI options
fn init_logging(cli: &Cli) -> Result<()> {
    let default_log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    observability::init_with_config(observability::ObservabilityConfig {
        log_format: cli.log_format.into(),
        // The exporter is installed by `run` when asked for
        metrics_port: None,
        default_log_level: default_log_level.to_string(),
    })
}
