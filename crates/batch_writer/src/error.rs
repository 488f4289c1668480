//! Batch writer error types

use thiserror::Error;

/// Errors returned when building a writer. No task is started on error.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Batch capacity below 1
    #[error("batch capacity must be at least 1, got {0}")]
    CapacityTooSmall(usize),

    /// No sink was supplied
    #[error("sink function cannot be empty")]
    NilSinkFunction,

    /// Flush interval below 1ms
    #[error("flush interval must be at least 1ms, got {0:?}")]
    InvalidFlushInterval(std::time::Duration),

    /// Sink could not be created from configuration
    #[error("failed to create sink: {0}")]
    Sink(#[from] contracts::ContractError),
}

/// Errors returned to producers
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueError {
    /// Cancellation token fired before the record was queued
    #[error("enqueue cancelled")]
    Cancelled,

    /// Writer has stopped, record dropped
    #[error("batch writer is closed")]
    Closed,
}
