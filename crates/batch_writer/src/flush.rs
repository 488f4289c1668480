//! Flush engine - runs the sink over a swapped-out batch
//!
//! The handoff mutex guards the flush buffer together with the sink. A swap
//! takes the mutex, and the guard travels into the task that runs the sink,
//! so the next swap waits until the previous sink call has returned.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

use contracts::{BatchSink, FlushTrigger};

use crate::buffer::Buffer;
use crate::metrics::WriterMetrics;

/// Flush buffer plus the sink that consumes it
struct FlushSlot<T, S> {
    buffer: Buffer<T>,
    sink: S,
}

pub(crate) struct FlushEngine<T, S> {
    writer: Arc<str>,
    handoff: Arc<Mutex<FlushSlot<T, S>>>,
    metrics: Arc<WriterMetrics>,
    clear_buffers: bool,
    log_flushes: bool,
}

impl<T, S> Clone for FlushEngine<T, S> {
    fn clone(&self) -> Self {
        Self {
            writer: Arc::clone(&self.writer),
            handoff: Arc::clone(&self.handoff),
            metrics: Arc::clone(&self.metrics),
            clear_buffers: self.clear_buffers,
            log_flushes: self.log_flushes,
        }
    }
}

impl<T, S> FlushEngine<T, S>
where
    T: Send + Sync + 'static,
    S: BatchSink<T> + 'static,
{
    pub(crate) fn new(
        writer: Arc<str>,
        sink: S,
        capacity: usize,
        metrics: Arc<WriterMetrics>,
        clear_buffers: bool,
        log_flushes: bool,
    ) -> Self {
        let slot = FlushSlot {
            buffer: Buffer::with_capacity(capacity),
            sink,
        };
        Self {
            writer,
            handoff: Arc::new(Mutex::new(slot)),
            metrics,
            clear_buffers,
            log_flushes,
        }
    }

    /// Swap `write` with the flush buffer and start the sink on the batch.
    ///
    /// Returns once the swap is done; the sink keeps running on its own task
    /// while holding the handoff mutex. Returns 0 without touching anything
    /// when `write` is empty.
    pub(crate) async fn flush(&self, write: &mut Buffer<T>, trigger: FlushTrigger) -> usize {
        if write.is_empty() {
            return 0;
        }

        let mut slot = Arc::clone(&self.handoff).lock_owned().await;
        let batch_size = slot.buffer.swap_with(write);
        self.metrics.set_records_in_buffer(0);
        let started = Instant::now();

        let engine = self.clone();
        tokio::spawn(async move {
            engine.run_sink(slot, batch_size, trigger, started).await;
        });

        batch_size
    }

    async fn run_sink(
        self,
        mut slot: OwnedMutexGuard<FlushSlot<T, S>>,
        batch_size: usize,
        trigger: FlushTrigger,
        started: Instant,
    ) {
        if self.log_flushes {
            info!(
                writer = %self.writer,
                trigger = %trigger,
                batch_size,
                "Flushing records"
            );
        }

        let FlushSlot { buffer, sink } = &mut *slot;
        let sink_name = sink.name().to_string();
        let outcome = AssertUnwindSafe(sink.write_batch(buffer.as_slice()))
            .catch_unwind()
            .await;

        let faulted = match outcome {
            Ok(Ok(())) => false,
            Ok(Err(e)) => {
                error!(
                    writer = %self.writer,
                    sink = %sink_name,
                    batch_size,
                    error = %e,
                    "Sink failed, batch discarded"
                );
                true
            }
            Err(panic) => {
                warn!(
                    writer = %self.writer,
                    sink = %sink_name,
                    batch_size,
                    panic = %panic_message(panic.as_ref()),
                    "Recovered from panic in sink"
                );
                true
            }
        };

        let elapsed = started.elapsed();
        self.metrics.record_flush(batch_size, elapsed);
        observability::record_flush(&self.writer, trigger, batch_size, elapsed, faulted);

        if self.clear_buffers {
            buffer.clear();
        }
        // Dropping `slot` releases the handoff mutex.
    }

    /// Wait for the in-flight sink call, if any, then close the sink.
    pub(crate) async fn close(&self) {
        let mut slot = self.handoff.lock().await;
        let FlushSlot { buffer, sink } = &mut *slot;
        buffer.clear();

        match AssertUnwindSafe(sink.close()).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!(writer = %self.writer, error = %e, "Sink close failed on shutdown");
            }
            Err(panic) => {
                warn!(
                    writer = %self.writer,
                    panic = %panic_message(panic.as_ref()),
                    "Recovered from panic in sink close"
                );
            }
        }
        debug!(writer = %self.writer, "Flush engine closed");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
