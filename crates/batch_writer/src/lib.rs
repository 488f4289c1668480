//! # Batch Writer
//!
//! Bounded batch writer with time and capacity triggered flushing.
//!
//! Responsibilities:
//! - Accept records from many concurrent producers through a bounded queue
//! - Batch them in a double buffer owned by a single dispatcher task
//! - Hand each batch to a sink when the buffer fills, the interval elapses,
//!   a flush is requested or the writer stops
//! - Isolate sink faults so one bad batch never stops the writer
//!
//! # Example
//!
//! ```no_run
//! use batch_writer::{BatchWriter, FnSink};
//! use std::time::Duration;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let writer = BatchWriter::<u64>::builder(100, Duration::from_millis(250))
//!     .sink(FnSink::new("print", |batch: &[u64]| println!("{} records", batch.len())))
//!     .build()?;
//!
//! writer.enqueue(42).await?;
//! writer.stop().await;
//! # Ok(())
//! # }
//! ```

mod buffer;
mod dispatcher;
pub mod error;
mod flush;
pub mod metrics;
pub mod producer;
pub mod sinks;
pub mod writer;

pub use contracts::{BatchSink, FlushTrigger, WriterConfig};
pub use error::{BuildError, EnqueueError};
pub use metrics::{MetricsSnapshot, WriterMetrics};
pub use producer::Producer;
pub use sinks::{ConfiguredSink, FileSink, FileSinkConfig, FnSink, LogSink};
pub use tokio_util::sync::CancellationToken;
pub use writer::{create_writer, BatchWriter, BatchWriterBuilder};
