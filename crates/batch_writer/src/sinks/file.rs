//! FileSink - appends batches to a JSON lines file

use chrono::{SecondsFormat, Utc};
use contracts::{BatchSink, ContractError};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, error, instrument};

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Output file, created if missing and appended to otherwise
    pub path: PathBuf,
}

impl FileSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, ContractError> {
        let path = params
            .get("path")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| ContractError::config_validation("sink.params.path", "missing"))?;

        Ok(Self { path })
    }
}

/// One output line
#[derive(Serialize)]
struct Line<'a, T> {
    batch: u64,
    written_at: &'a str,
    record: &'a T,
}

/// Sink that writes every record as one JSON line
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    writer: BufWriter<File>,
    batches: u64,
}

impl FileSink {
    /// Create a new FileSink, creating parent directories as needed
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)?;

        Ok(Self {
            name: name.into(),
            config,
            writer: BufWriter::new(file),
            batches: 0,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let config = FileSinkConfig::from_params(params)?;
        Ok(Self::new(name, config)?)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn write_lines<T: Serialize>(&mut self, batch: &[T]) -> std::io::Result<()> {
        self.batches += 1;
        let written_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        for record in batch {
            let line = Line {
                batch: self.batches,
                written_at: &written_at,
                record,
            };
            serde_json::to_writer(&mut self.writer, &line)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()
    }

    fn persist_batch<T: Serialize>(&mut self, batch: &[T]) -> Result<(), ContractError> {
        self.write_lines(batch).map_err(|e| {
            error!(
                sink = %self.name,
                path = %self.config.path.display(),
                error = %e,
                "Write failed"
            );
            ContractError::sink_write(&self.name, e.to_string())
        })
    }
}

impl<T> BatchSink<T> for FileSink
where
    T: Serialize + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, batch),
        fields(sink = %self.name, batch_size = batch.len())
    )]
    async fn write_batch(&mut self, batch: &[T]) -> Result<(), ContractError> {
        self.persist_batch(batch)
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.writer.flush()?;
        debug!(sink = %self.name, batches = self.batches, "FileSink closed");
        Ok(())
    }
}
