//! Writer configuration contracts shared by the loader, the writer and the CLI.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use validator::{Validate, ValidationError};

/// Intake queue size used when none is configured
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// Writer name used when none is configured
pub const DEFAULT_WRITER_NAME: &str = "batch_writer";

/// Batch writer configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct WriterConfig {
    /// Writer name (log / metric label)
    #[serde(default = "default_name")]
    #[validate(length(min = 1, message = "name cannot be empty"))]
    pub name: String,

    /// Maximum records per batch
    #[validate(range(min = 1, message = "capacity must be at least 1"))]
    pub capacity: usize,

    /// Periodic flush interval in milliseconds
    #[validate(range(min = 1, message = "flush interval must be at least 1ms"))]
    pub flush_interval_ms: u64,

    /// Intake queue size
    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1, message = "queue capacity must be at least 1"))]
    pub queue_capacity: usize,

    /// Drop processed records right after each flush
    #[serde(default)]
    pub clear_buffers: bool,

    /// Emit an info log line per flush
    #[serde(default = "default_log_flushes")]
    pub log_flushes: bool,

    /// Sink to build for this writer
    #[serde(default)]
    #[validate(nested)]
    pub sink: SinkConfig,
}

fn default_name() -> String {
    DEFAULT_WRITER_NAME.to_string()
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_log_flushes() -> bool {
    true
}

impl WriterConfig {
    /// Minimal config with defaults for every optional field
    pub fn new(capacity: usize, flush_interval: Duration) -> Self {
        Self {
            name: default_name(),
            capacity,
            flush_interval_ms: flush_interval.as_millis() as u64,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            clear_buffers: false,
            log_flushes: true,
            sink: SinkConfig::default(),
        }
    }

    /// Flush interval as a Duration
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

/// Sink output configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_sink_params"))]
pub struct SinkConfig {
    /// Sink name
    #[serde(default = "default_sink_name")]
    #[validate(length(min = 1, message = "sink name cannot be empty"))]
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Type specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_sink_name() -> String {
    "log".to_string()
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            name: default_sink_name(),
            sink_type: SinkType::Log,
            params: HashMap::new(),
        }
    }
}

fn validate_sink_params(sink: &SinkConfig) -> Result<(), ValidationError> {
    if sink.sink_type == SinkType::File
        && sink.params.get("path").is_none_or(|p| p.trim().is_empty())
    {
        let mut err = ValidationError::new("missing_path");
        err.message = Some("file sink requires params.path".into());
        return Err(err);
    }
    Ok(())
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Batch summaries via tracing
    Log,
    /// JSON lines appended to a file
    File,
}
