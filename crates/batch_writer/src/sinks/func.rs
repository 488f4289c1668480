//! FnSink - adapts a closure into a sink

use contracts::{BatchSink, ContractError};

/// Sink backed by a plain function over each batch.
///
/// A panic inside the function is a sink fault like any other: the writer
/// catches it and counts the batch as processed.
pub struct FnSink<F> {
    name: String,
    f: F,
}

impl<F> FnSink<F> {
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<T, F> BatchSink<T> for FnSink<F>
where
    T: Sync,
    F: FnMut(&[T]) + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn write_batch(&mut self, batch: &[T]) -> Result<(), ContractError> {
        (self.f)(batch);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        Ok(())
    }
}
