//! Error types for CLI operations.

use batch_writer::BuildError;
use contracts::ContractError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration could not be loaded or failed validation
    #[error("Failed to load configuration: {0}")]
    Config(#[from] ContractError),

    /// Writer construction failed
    #[error("Failed to build writer: {0}")]
    Build(#[from] BuildError),

    /// Metrics exporter could not be started
    #[error("Failed to start metrics exporter: {0}")]
    Metrics(#[source] anyhow::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }
}
