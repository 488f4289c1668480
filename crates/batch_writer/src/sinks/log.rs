//! LogSink - logs batch summaries via tracing

use contracts::{BatchSink, ContractError};
use tracing::{info, instrument};

/// Sink that logs batch summaries for debugging
pub struct LogSink {
    name: String,
    batches: u64,
    records: u64,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            batches: 0,
            records: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Batches seen so far
    pub fn batches(&self) -> u64 {
        self.batches
    }

    /// Records seen so far
    pub fn records(&self) -> u64 {
        self.records
    }
}

impl<T: Sync> BatchSink<T> for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, batch),
        fields(sink = %self.name, batch_size = batch.len())
    )]
    async fn write_batch(&mut self, batch: &[T]) -> Result<(), ContractError> {
        self.batches += 1;
        self.records += batch.len() as u64;
        info!(
            sink = %self.name,
            batch = self.batches,
            batch_size = batch.len(),
            total_records = self.records,
            "Batch received"
        );
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(
            sink = %self.name,
            batches = self.batches,
            records = self.records,
            "LogSink closed"
        );
        Ok(())
    }
}
