//! BatchSink trait - flush engine output interface
//!
//! Defines the abstract interface for batch consumers.

use crate::ContractError;

/// Batch consumer trait
///
/// The writer hands every flushed batch to exactly one sink. A batch holds
/// between 1 and `capacity` records, in intake order.
#[trait_variant::make(BatchSink: Send)]
pub trait LocalBatchSink<T> {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Consume one batch
    ///
    /// # Errors
    /// Returns write error (should include context). The batch is not
    /// retried either way.
    async fn write_batch(&mut self, batch: &[T]) -> Result<(), ContractError>;

    /// Close sink, called once after the final flush
    async fn close(&mut self) -> Result<(), ContractError>;
}
