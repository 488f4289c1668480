//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// batchwriter - drive and inspect size/time triggered batch writers
#[derive(Parser, Debug)]
#[command(
    name = "batchwriter",
    author,
    version,
    about = "Size and time triggered batch writer",
    long_about = "Runs a batch writer built from a configuration file.\n\n\
                  Producers enqueue synthetic records; the writer flushes them to the \n\
                  configured sink when a batch fills up or the flush interval elapses."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "BATCHWRITER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "BATCHWRITER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run producers against a configured writer
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "writer.toml",
        env = "BATCHWRITER_CONFIG"
    )]
    pub config: PathBuf,

    /// Number of concurrent producer tasks
    #[arg(long, default_value = "4", env = "BATCHWRITER_PRODUCERS")]
    pub producers: usize,

    /// Records enqueued by each producer (0 = until stopped)
    #[arg(long, default_value = "1000", env = "BATCHWRITER_RECORDS")]
    pub records: u64,

    /// Stop after this many seconds (0 = no limit)
    #[arg(long, default_value = "0", env = "BATCHWRITER_DURATION_SECS")]
    pub duration_secs: u64,

    /// Override the batch capacity from configuration
    #[arg(long)]
    pub capacity: Option<usize>,

    /// Override the flush interval (milliseconds) from configuration
    #[arg(long)]
    pub flush_interval_ms: Option<u64>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "BATCHWRITER_METRICS_PORT")]
    pub metrics_port: u16,

    /// Print the final report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "writer.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
