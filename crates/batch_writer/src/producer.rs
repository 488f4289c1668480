//! Producer - cloneable intake handle
//!
//! Wraps the sending half of the bounded intake queue. Every outcome is
//! reflected in the shared counters: a queued record counts as accepted, any
//! rejected record counts as dropped.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::EnqueueError;
use crate::metrics::WriterMetrics;

/// Handle used by producers to feed a running writer
pub struct Producer<T> {
    tx: mpsc::Sender<T>,
    metrics: Arc<WriterMetrics>,
}

impl<T> Clone for Producer<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<T> Producer<T> {
    pub(crate) fn new(tx: mpsc::Sender<T>, metrics: Arc<WriterMetrics>) -> Self {
        Self { tx, metrics }
    }

    /// Queue a record, waiting for space if the queue is full.
    ///
    /// Fails only with [`EnqueueError::Closed`] once the writer has stopped.
    pub async fn enqueue(&self, record: T) -> Result<(), EnqueueError> {
        match self.tx.send(record).await {
            Ok(()) => {
                self.metrics.inc_accepted();
                Ok(())
            }
            Err(_) => Err(self.record_closed()),
        }
    }

    /// Queue a record without waiting.
    ///
    /// Returns true if queued, false if the queue is full (record dropped)
    pub fn try_enqueue(&self, record: T) -> bool {
        match self.tx.try_send(record) {
            Ok(()) => {
                self.metrics.inc_accepted();
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.metrics.inc_dropped();
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.record_closed();
                false
            }
        }
    }

    /// Queue a record, giving up when `cancel` fires.
    ///
    /// An already cancelled token returns [`EnqueueError::Cancelled`] without
    /// touching the queue.
    pub async fn enqueue_with_cancel(
        &self,
        cancel: &CancellationToken,
        record: T,
    ) -> Result<(), EnqueueError> {
        if cancel.is_cancelled() {
            self.metrics.inc_dropped();
            return Err(EnqueueError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                self.metrics.inc_dropped();
                Err(EnqueueError::Cancelled)
            }
            permit = self.tx.reserve() => match permit {
                Ok(permit) => {
                    permit.send(record);
                    self.metrics.inc_accepted();
                    Ok(())
                }
                Err(_) => Err(self.record_closed()),
            },
        }
    }

    /// Blocking variant of [`enqueue`](Self::enqueue) for producers on plain
    /// threads. Panics if called from within an async execution context.
    pub fn blocking_enqueue(&self, record: T) -> Result<(), EnqueueError> {
        match self.tx.blocking_send(record) {
            Ok(()) => {
                self.metrics.inc_accepted();
                Ok(())
            }
            Err(_) => Err(self.record_closed()),
        }
    }

    /// Intake queue size
    pub fn queue_capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    /// True once the dispatcher no longer accepts records
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn record_closed(&self) -> EnqueueError {
        self.metrics.inc_dropped();
        debug!("Enqueue on a stopped writer, record dropped");
        EnqueueError::Closed
    }
}
