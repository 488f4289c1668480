//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{SinkType, WriterConfig};

use crate::cli::ValidateArgs;

/// Intervals below this flush mostly empty or tiny batches
const SHORT_INTERVAL_MS: u64 = 10;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    name: String,
    capacity: usize,
    flush_interval_ms: u64,
    queue_capacity: usize,
    clear_buffers: bool,
    sink_name: String,
    sink_type: SinkType,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    name: config.name.clone(),
                    capacity: config.capacity,
                    flush_interval_ms: config.flush_interval_ms,
                    queue_capacity: config.queue_capacity,
                    clear_buffers: config.clear_buffers,
                    sink_name: config.sink.name.clone(),
                    sink_type: config.sink.sink_type,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &WriterConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.capacity == 1 {
        warnings.push("capacity is 1 - every record is flushed on its own".to_string());
    }

    if config.flush_interval_ms < SHORT_INTERVAL_MS {
        warnings.push(format!(
            "flush_interval_ms is {} - the ticker will flush very small batches",
            config.flush_interval_ms
        ));
    }

    if config.sink.sink_type == SinkType::Log && !config.log_flushes {
        warnings.push("log sink with log_flushes = false - flushes are only visible at debug level".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Writer: {}", summary.name);
            println!("  Capacity: {}", summary.capacity);
            println!("  Flush interval: {}ms", summary.flush_interval_ms);
            println!("  Queue capacity: {}", summary.queue_capacity);
            println!("  Clear buffers: {}", summary.clear_buffers);
            println!("  Sink: {} ({:?})", summary.sink_name, summary.sink_type);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
