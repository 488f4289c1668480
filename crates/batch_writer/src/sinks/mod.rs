//! Sink implementations
//!
//! Contains LogSink, FileSink, FnSink and the config-driven ConfiguredSink.

mod file;
mod func;
mod log;

pub use self::file::{FileSink, FileSinkConfig};
pub use self::func::FnSink;
pub use self::log::LogSink;

use contracts::{BatchSink, ContractError, SinkConfig, SinkType};
use serde::Serialize;
use tracing::instrument;

/// Sink selected by a [`SinkConfig`]
pub enum ConfiguredSink {
    Log(LogSink),
    File(FileSink),
}

impl ConfiguredSink {
    /// Create the sink described by `config`
    #[instrument(
        name = "configured_sink_create",
        skip(config),
        fields(sink = %config.name, sink_type = ?config.sink_type)
    )]
    pub fn from_config(config: &SinkConfig) -> Result<Self, ContractError> {
        match config.sink_type {
            SinkType::Log => Ok(Self::Log(LogSink::new(&config.name))),
            SinkType::File => {
                let sink = FileSink::from_params(&config.name, &config.params)?;
                Ok(Self::File(sink))
            }
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Log(sink) => sink.name(),
            Self::File(sink) => sink.name(),
        }
    }
}

impl<T> BatchSink<T> for ConfiguredSink
where
    T: Serialize + Sync,
{
    fn name(&self) -> &str {
        ConfiguredSink::name(self)
    }

    async fn write_batch(&mut self, batch: &[T]) -> Result<(), ContractError> {
        match self {
            Self::Log(sink) => sink.write_batch(batch).await,
            Self::File(sink) => sink.write_batch(batch).await,
        }
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        match self {
            Self::Log(sink) => BatchSink::<T>::close(sink).await,
            Self::File(sink) => BatchSink::<T>::close(sink).await,
        }
    }
}
