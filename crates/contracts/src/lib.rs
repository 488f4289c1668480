//! # Contracts
//!
//! Interface contracts shared by the batch writer workspace.
//! Business crates depend on this crate only, never the other way round.
//!
//! ## Record model
//! - Records are opaque: the writer moves them, only a [`BatchSink`] reads them
//! - Capacity is counted in records, not bytes

mod error;
mod sink;
mod trigger;
mod writer_config;

pub use error::*;
pub use sink::*;
pub use trigger::FlushTrigger;
pub use writer_config::*;
