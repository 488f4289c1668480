//! Writer metrics for observability

use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Lock-free counters shared by producers, the dispatcher and the flush engine
#[derive(Debug, Default)]
pub struct WriterMetrics {
    /// Records that entered the intake queue
    records_accepted: AtomicU64,
    /// Records handed to the sink (normal return or fault)
    records_processed: AtomicU64,
    /// Records rejected by a full queue, cancellation or a closed writer
    records_dropped: AtomicU64,
    /// Sink invocations
    flush_count: AtomicU64,
    /// Current write buffer occupancy
    records_in_buffer: AtomicUsize,
    /// Last flush duration in nanoseconds
    last_flush_nanos: AtomicU64,
    /// Sum of all flush durations in nanoseconds
    total_flush_nanos: AtomicU64,
    /// Configured intake queue size
    queue_capacity: usize,
}

impl WriterMetrics {
    /// Create new metrics instance
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            queue_capacity,
            ..Self::default()
        }
    }

    pub fn records_accepted(&self) -> u64 {
        self.records_accepted.load(Ordering::Relaxed)
    }

    pub fn inc_accepted(&self) {
        self.records_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn records_processed(&self) -> u64 {
        self.records_processed.load(Ordering::Relaxed)
    }

    pub fn records_dropped(&self) -> u64 {
        self.records_dropped.load(Ordering::Relaxed)
    }

    pub fn inc_dropped(&self) {
        self.records_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn flush_count(&self) -> u64 {
        self.flush_count.load(Ordering::Relaxed)
    }

    pub fn records_in_buffer(&self) -> usize {
        self.records_in_buffer.load(Ordering::Relaxed)
    }

    /// Only the dispatcher writes this gauge
    pub(crate) fn set_records_in_buffer(&self, len: usize) {
        self.records_in_buffer.store(len, Ordering::Relaxed);
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Account for one completed sink invocation over `batch_size` records
    pub(crate) fn record_flush(&self, batch_size: usize, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.last_flush_nanos.store(nanos, Ordering::Relaxed);
        self.total_flush_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.flush_count.fetch_add(1, Ordering::Relaxed);
        self.records_processed
            .fetch_add(batch_size as u64, Ordering::Relaxed);
    }

    /// Read every field independently. Fields may be mutually inconsistent
    /// under concurrent updates, each one is a value that was actually observed.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let flush_count = self.flush_count();
        let total_flush_duration =
            Duration::from_nanos(self.total_flush_nanos.load(Ordering::Relaxed));
        let avg_flush_duration = if flush_count > 0 {
            Duration::from_nanos(total_flush_duration.as_nanos() as u64 / flush_count)
        } else {
            Duration::ZERO
        };

        MetricsSnapshot {
            records_accepted: self.records_accepted(),
            records_processed: self.records_processed(),
            records_dropped: self.records_dropped(),
            records_in_buffer: self.records_in_buffer(),
            queue_capacity: self.queue_capacity,
            flush_count,
            last_flush_duration: Duration::from_nanos(
                self.last_flush_nanos.load(Ordering::Relaxed),
            ),
            total_flush_duration,
            avg_flush_duration,
        }
    }
}

/// Point-in-time copy of the writer metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub records_accepted: u64,
    pub records_processed: u64,
    pub records_dropped: u64,
    pub records_in_buffer: usize,
    pub queue_capacity: usize,
    pub flush_count: u64,
    #[serde(rename = "last_flush_duration_ns", serialize_with = "as_nanos")]
    pub last_flush_duration: Duration,
    #[serde(rename = "total_flush_duration_ns", serialize_with = "as_nanos")]
    pub total_flush_duration: Duration,
    #[serde(rename = "avg_flush_duration_ns", serialize_with = "as_nanos")]
    pub avg_flush_duration: Duration,
}

impl From<&MetricsSnapshot> for observability::WriterGauges {
    fn from(snapshot: &MetricsSnapshot) -> Self {
        Self {
            records_accepted: snapshot.records_accepted,
            records_processed: snapshot.records_processed,
            records_dropped: snapshot.records_dropped,
            records_in_buffer: snapshot.records_in_buffer,
            queue_capacity: snapshot.queue_capacity,
        }
    }
}

fn as_nanos<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX))
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Batch Writer Metrics ===")?;
        writeln!(f, "Records accepted: {}", self.records_accepted)?;
        writeln!(f, "Records processed: {}", self.records_processed)?;
        writeln!(f, "Records dropped: {}", self.records_dropped)?;
        writeln!(
            f,
            "Records in buffer: {} (queue capacity {})",
            self.records_in_buffer, self.queue_capacity
        )?;
        writeln!(f, "Flushes: {}", self.flush_count)?;
        writeln!(
            f,
            "Flush duration: last={:?}, avg={:?}, total={:?}",
            self.last_flush_duration, self.avg_flush_duration, self.total_flush_duration
        )
    }
}
