//! BatchWriter - construction, producer surface and shutdown

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument};

use contracts::{BatchSink, WriterConfig, DEFAULT_QUEUE_CAPACITY, DEFAULT_WRITER_NAME};

use crate::dispatcher::{Command, Dispatcher};
use crate::error::{BuildError, EnqueueError};
use crate::flush::FlushEngine;
use crate::metrics::{MetricsSnapshot, WriterMetrics};
use crate::producer::Producer;
use crate::sinks::ConfiguredSink;

const MIN_FLUSH_INTERVAL: Duration = Duration::from_millis(1);

/// Builder for creating a BatchWriter
pub struct BatchWriterBuilder<T, S> {
    capacity: usize,
    flush_interval: Duration,
    sink: Option<S>,
    name: String,
    queue_capacity: usize,
    clear_buffers: bool,
    log_flushes: bool,
    cancel: Option<CancellationToken>,
    _records: PhantomData<fn(T)>,
}

impl<T, S> BatchWriterBuilder<T, S>
where
    T: Send + Sync + 'static,
    S: BatchSink<T> + 'static,
{
    /// Create a new builder; `capacity` is the maximum batch size
    pub fn new(capacity: usize, flush_interval: Duration) -> Self {
        Self {
            capacity,
            flush_interval,
            sink: None,
            name: DEFAULT_WRITER_NAME.to_string(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            clear_buffers: false,
            log_flushes: true,
            cancel: None,
            _records: PhantomData,
        }
    }

    /// Seed every option from a loaded configuration. The sink is still
    /// supplied separately.
    pub fn from_config(config: &WriterConfig) -> Self {
        Self::new(config.capacity, config.flush_interval())
            .name(&config.name)
            .queue_capacity(config.queue_capacity)
            .clear_buffers(config.clear_buffers)
            .log_flushes(config.log_flushes)
    }

    /// Sink that receives every batch
    pub fn sink(mut self, sink: S) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Writer name used in logs and metric labels
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Intake queue size; 0 keeps the default
    pub fn queue_capacity(mut self, queue_capacity: usize) -> Self {
        if queue_capacity > 0 {
            self.queue_capacity = queue_capacity;
        }
        self
    }

    /// Drop processed records right after each sink call instead of at the
    /// next swap
    pub fn clear_buffers(mut self, clear: bool) -> Self {
        self.clear_buffers = clear;
        self
    }

    /// Emit an info line per flush
    pub fn log_flushes(mut self, enabled: bool) -> Self {
        self.log_flushes = enabled;
        self
    }

    /// External cancellation: firing it drains and stops the writer
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Validate parameters and start the dispatcher on the current runtime
    #[instrument(name = "batch_writer_build", skip(self), fields(writer = %self.name))]
    pub fn build(self) -> Result<BatchWriter<T>, BuildError> {
        if self.capacity < 1 {
            return Err(BuildError::CapacityTooSmall(self.capacity));
        }
        let sink = self.sink.ok_or(BuildError::NilSinkFunction)?;
        if self.flush_interval < MIN_FLUSH_INTERVAL {
            return Err(BuildError::InvalidFlushInterval(self.flush_interval));
        }

        let writer: Arc<str> = Arc::from(self.name.as_str());
        let metrics = Arc::new(WriterMetrics::new(self.queue_capacity));
        let (input_tx, input_rx) = mpsc::channel(self.queue_capacity);
        let (control_tx, control_rx) = mpsc::channel(1);

        let external = self.cancel.unwrap_or_default();
        let shutdown = external.child_token();

        let engine = FlushEngine::new(
            Arc::clone(&writer),
            sink,
            self.capacity,
            Arc::clone(&metrics),
            self.clear_buffers,
            self.log_flushes,
        );
        let dispatcher = Dispatcher::new(
            Arc::clone(&writer),
            self.capacity,
            input_rx,
            control_rx,
            shutdown.clone(),
            external,
            self.flush_interval,
            engine,
            Arc::clone(&metrics),
        );
        let dispatcher_handle = tokio::spawn(dispatcher.run());

        Ok(BatchWriter {
            name: writer,
            producer: Producer::new(input_tx, Arc::clone(&metrics)),
            control_tx,
            shutdown,
            metrics,
            dispatcher_handle: Some(dispatcher_handle),
        })
    }
}

/// Bounded, time and capacity triggered batch writer
///
/// Records go through a bounded intake queue to a single dispatcher task,
/// which batches them and hands each batch to the sink. Dropping the writer
/// without calling [`stop`](Self::stop) still drains it in the background.
pub struct BatchWriter<T> {
    name: Arc<str>,
    producer: Producer<T>,
    control_tx: mpsc::Sender<Command>,
    shutdown: CancellationToken,
    metrics: Arc<WriterMetrics>,
    dispatcher_handle: Option<JoinHandle<()>>,
}

impl<T> BatchWriter<T>
where
    T: Send + Sync + 'static,
{
    /// Start building a writer with batch `capacity` and periodic `flush_interval`
    pub fn builder<S: BatchSink<T> + 'static>(
        capacity: usize,
        flush_interval: Duration,
    ) -> BatchWriterBuilder<T, S> {
        BatchWriterBuilder::new(capacity, flush_interval)
    }

    /// Writer name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// A cloneable handle for other producer tasks or threads
    pub fn producer(&self) -> Producer<T> {
        self.producer.clone()
    }

    /// Queue a record, waiting for space. See [`Producer::enqueue`].
    pub async fn enqueue(&self, record: T) -> Result<(), EnqueueError> {
        self.producer.enqueue(record).await
    }

    /// Queue a record without waiting. See [`Producer::try_enqueue`].
    pub fn try_enqueue(&self, record: T) -> bool {
        self.producer.try_enqueue(record)
    }

    /// Queue a record unless `cancel` fires first. See
    /// [`Producer::enqueue_with_cancel`].
    pub async fn enqueue_with_cancel(
        &self,
        cancel: &CancellationToken,
        record: T,
    ) -> Result<(), EnqueueError> {
        self.producer.enqueue_with_cancel(cancel, record).await
    }

    /// Flush the write buffer now.
    ///
    /// Records already sitting in the intake queue when the request reaches
    /// the dispatcher are moved into the buffer first, so an `enqueue` that
    /// returned before this call is part of the flush.
    ///
    /// Returns the number of records swapped out once the swap is done; the
    /// sink may still be running. Returns 0 for an empty buffer or a stopped
    /// writer.
    pub async fn flush_now(&self) -> usize {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.control_tx.send(Command::Flush(reply_tx)).await.is_err() {
            return 0;
        }
        reply_rx.await.unwrap_or(0)
    }

    /// Current metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Publish the current snapshot as gauges through the metrics facade
    pub fn publish_metrics(&self) {
        let gauges = observability::WriterGauges::from(&self.snapshot());
        observability::record_writer_state(&self.name, &gauges);
    }

    /// Shared metrics handle
    pub fn metrics(&self) -> &Arc<WriterMetrics> {
        &self.metrics
    }

    /// Stop the writer: drain the intake queue, flush the remainder and
    /// wait until the sink has consumed it and been closed.
    #[instrument(name = "batch_writer_stop", skip(self), fields(writer = %self.name))]
    pub async fn stop(mut self) {
        self.shutdown.cancel();
        if let Some(handle) = self.dispatcher_handle.take() {
            if let Err(e) = handle.await {
                error!(writer = %self.name, error = ?e, "Dispatcher task panicked");
            }
        }
        debug!(writer = %self.name, "Batch writer stop complete");
    }
}

impl<T> Drop for BatchWriter<T> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Convenience function to create a writer whose sink comes from configuration
#[instrument(name = "batch_writer_create", skip(config), fields(writer = %config.name))]
pub fn create_writer<T>(config: &WriterConfig) -> Result<BatchWriter<T>, BuildError>
where
    T: serde::Serialize + Send + Sync + 'static,
{
    let sink = ConfiguredSink::from_config(&config.sink)?;
    BatchWriterBuilder::from_config(config).sink(sink).build()
}
