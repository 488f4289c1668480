//! Batch writer metrics recorded through the `metrics` facade.
//!
//! Without an installed recorder every call here is a no-op.

use contracts::FlushTrigger;
use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Record one completed sink invocation
pub fn record_flush(
    writer: &str,
    trigger: FlushTrigger,
    batch_size: usize,
    elapsed: Duration,
    faulted: bool,
) {
    counter!(
        "batch_writer_flushes_total",
        "writer" => writer.to_string(),
        "trigger" => trigger.as_str()
    )
    .increment(1);

    counter!("batch_writer_records_processed_total", "writer" => writer.to_string())
        .increment(batch_size as u64);

    if faulted {
        counter!("batch_writer_sink_faults_total", "writer" => writer.to_string()).increment(1);
    }

    histogram!("batch_writer_flush_duration_ms", "writer" => writer.to_string())
        .record(elapsed.as_secs_f64() * 1000.0);
    histogram!("batch_writer_batch_size", "writer" => writer.to_string())
        .record(batch_size as f64);
}

/// Point-in-time writer counters published as gauges
#[derive(Debug, Clone, Copy, Default)]
pub struct WriterGauges {
    pub records_accepted: u64,
    pub records_processed: u64,
    pub records_dropped: u64,
    pub records_in_buffer: usize,
    pub queue_capacity: usize,
}

/// Publish a writer's current state
pub fn record_writer_state(writer: &str, state: &WriterGauges) {
    let label = writer.to_string();
    gauge!("batch_writer_records_accepted", "writer" => label.clone())
        .set(state.records_accepted as f64);
    gauge!("batch_writer_records_processed", "writer" => label.clone())
        .set(state.records_processed as f64);
    gauge!("batch_writer_records_dropped", "writer" => label.clone())
        .set(state.records_dropped as f64);
    gauge!("batch_writer_records_in_buffer", "writer" => label.clone())
        .set(state.records_in_buffer as f64);
    gauge!("batch_writer_queue_capacity", "writer" => label).set(state.queue_capacity as f64);
}
