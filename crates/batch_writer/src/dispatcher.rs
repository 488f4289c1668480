//! Dispatcher - single consumer that owns the write buffer

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use contracts::{BatchSink, FlushTrigger};

use crate::buffer::Buffer;
use crate::flush::FlushEngine;
use crate::metrics::WriterMetrics;

/// Requests sent to the dispatcher by the writer handle
pub(crate) enum Command {
    /// Flush now; replies with the swapped batch size once the swap is done
    Flush(oneshot::Sender<usize>),
}

pub(crate) struct Dispatcher<T, S> {
    writer: Arc<str>,
    buffer: Buffer<T>,
    input_rx: mpsc::Receiver<T>,
    control_rx: mpsc::Receiver<Command>,
    /// Child of `external`: fires on stop or on external cancellation
    shutdown: CancellationToken,
    external: CancellationToken,
    flush_interval: Duration,
    engine: FlushEngine<T, S>,
    metrics: Arc<WriterMetrics>,
}

impl<T, S> Dispatcher<T, S>
where
    T: Send + Sync + 'static,
    S: BatchSink<T> + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        writer: Arc<str>,
        capacity: usize,
        input_rx: mpsc::Receiver<T>,
        control_rx: mpsc::Receiver<Command>,
        shutdown: CancellationToken,
        external: CancellationToken,
        flush_interval: Duration,
        engine: FlushEngine<T, S>,
        metrics: Arc<WriterMetrics>,
    ) -> Self {
        Self {
            writer,
            buffer: Buffer::with_capacity(capacity),
            input_rx,
            control_rx,
            shutdown,
            external,
            flush_interval,
            engine,
            metrics,
        }
    }

    /// Run the event loop until stop or cancellation, then drain.
    ///
    /// Branch order gives shutdown precedence and keeps the ticker from being
    /// starved by a constant stream of records.
    #[instrument(name = "dispatcher_run", skip(self), fields(writer = %self.writer))]
    pub(crate) async fn run(mut self) {
        info!(
            capacity = self.buffer.capacity(),
            flush_interval_ms = self.flush_interval.as_millis() as u64,
            queue_capacity = self.metrics.queue_capacity(),
            "Batch writer started"
        );

        let mut ticker = interval_at(Instant::now() + self.flush_interval, self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.flush(FlushTrigger::TickerFired).await;
                }
                Some(command) = self.control_rx.recv() => match command {
                    Command::Flush(reply) => {
                        let taken = self.take_queued().await;
                        debug!(taken, "Explicit flush requested");
                        let batch_size = self.flush(FlushTrigger::ExplicitRequest).await;
                        let _ = reply.send(batch_size);
                    }
                },
                record = self.input_rx.recv() => match record {
                    Some(record) => self.append(record).await,
                    None => {
                        debug!("All producers gone");
                        break;
                    }
                },
            }
        }

        self.drain_and_stop().await;
    }

    async fn append(&mut self, record: T) {
        self.buffer.append(record);
        self.metrics.set_records_in_buffer(self.buffer.len());
        if self.buffer.is_full() {
            self.flush(FlushTrigger::CapacityReached).await;
        }
    }

    /// Move records already waiting in the intake queue into the buffer.
    ///
    /// Takes at most one queue's worth, so producers refilling the queue
    /// cannot hold an explicit flush back indefinitely.
    async fn take_queued(&mut self) -> usize {
        let limit = self.metrics.queue_capacity();
        let mut taken = 0;
        while taken < limit {
            match self.input_rx.try_recv() {
                Ok(record) => {
                    self.append(record).await;
                    taken += 1;
                }
                Err(_) => break,
            }
        }
        taken
    }

    async fn flush(&mut self, trigger: FlushTrigger) -> usize {
        self.engine.flush(&mut self.buffer, trigger).await
    }

    /// Take whatever is still queued, flush it, and wait for the sink.
    async fn drain_and_stop(mut self) {
        let reason = if self.external.is_cancelled() {
            "cancelled"
        } else {
            "stop requested"
        };
        info!(reason, "Shutting down, processing remaining items");

        // New sends fail from here on; queued records can still be received.
        self.input_rx.close();
        self.control_rx.close();

        let mut drained = 0usize;
        while let Ok(record) = self.input_rx.try_recv() {
            drained += 1;
            self.append(record).await;
        }
        self.flush(FlushTrigger::ShutdownRequested).await;
        self.engine.close().await;

        let snapshot = self.metrics.snapshot();
        info!(
            drained,
            records_processed = snapshot.records_processed,
            records_dropped = snapshot.records_dropped,
            flushes = snapshot.flush_count,
            "Batch writer stopped"
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::sinks::FnSink;
    use crate::writer::BatchWriter;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    type Batches = Arc<Mutex<Vec<Vec<u32>>>>;

    fn writer(capacity: usize, interval: Duration, batches: &Batches) -> BatchWriter<u32> {
        let batches = Arc::clone(batches);
        BatchWriter::<u32>::builder(capacity, interval)
            .sink(FnSink::new("recording", move |batch: &[u32]| {
                batches.lock().unwrap().push(batch.to_vec());
            }))
            .log_flushes(false)
            .build()
            .unwrap()
    }

    async fn wait_for_batches(batches: &Batches, count: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while batches.lock().unwrap().len() < count {
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for {count} batches"
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn test_capacity_triggers_flush() {
        let batches = Batches::default();
        let writer = writer(3, Duration::from_secs(60), &batches);

        for i in 1..=3 {
            writer.enqueue(i).await.unwrap();
        }
        wait_for_batches(&batches, 1).await;

        assert_eq!(*batches.lock().unwrap(), vec![vec![1, 2, 3]]);
        assert_eq!(writer.snapshot().records_in_buffer, 0);
        writer.stop().await;
    }

    #[tokio::test]
    async fn test_ticker_flushes_partial_batch() {
        let batches = Batches::default();
        let writer = writer(10, Duration::from_millis(50), &batches);

        writer.enqueue(7).await.unwrap();
        wait_for_batches(&batches, 1).await;

        assert_eq!(*batches.lock().unwrap(), vec![vec![7]]);
        writer.stop().await;
    }

    #[tokio::test]
    async fn test_empty_ticks_do_not_flush() {
        let batches = Batches::default();
        let writer = writer(10, Duration::from_millis(10), &batches);

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(writer.snapshot().flush_count, 0);
        writer.stop().await;
        assert!(batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_intake_order_preserved_across_batches() {
        let batches = Batches::default();
        let writer = writer(4, Duration::from_secs(60), &batches);

        for i in 0..10 {
            writer.enqueue(i).await.unwrap();
        }
        writer.stop().await;

        assert_eq!(
            *batches.lock().unwrap(),
            vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7], vec![8, 9]]
        );
    }

    #[tokio::test]
    async fn test_flush_now_includes_queued_records() {
        let batches = Batches::default();
        let writer = writer(10, Duration::from_secs(60), &batches);

        writer.enqueue(1).await.unwrap();
        writer.enqueue(2).await.unwrap();
        writer.enqueue(3).await.unwrap();
        assert_eq!(writer.flush_now().await, 3);

        writer.stop().await;
        assert_eq!(*batches.lock().unwrap(), vec![vec![1, 2, 3]]);
    }

    #[tokio::test]
    async fn test_records_in_buffer_tracks_occupancy() {
        let batches = Batches::default();
        let writer = writer(10, Duration::from_secs(60), &batches);

        writer.enqueue(1).await.unwrap();
        writer.enqueue(2).await.unwrap();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while writer.snapshot().records_in_buffer < 2 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(writer.snapshot().records_in_buffer, 2);

        writer.flush_now().await;
        assert_eq!(writer.snapshot().records_in_buffer, 0);
        writer.stop().await;
    }
}
