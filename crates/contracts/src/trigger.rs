//! FlushTrigger - why a flush happened

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reason a flush was started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushTrigger {
    /// Write buffer reached capacity
    CapacityReached,
    /// Periodic flush interval elapsed
    TickerFired,
    /// Writer is stopping (stop call or external cancellation)
    ShutdownRequested,
    /// `flush_now` was called
    ExplicitRequest,
}

impl FlushTrigger {
    /// Stable label for logs and metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CapacityReached => "capacity",
            Self::TickerFired => "ticker",
            Self::ShutdownRequested => "shutdown",
            Self::ExplicitRequest => "explicit",
        }
    }
}

impl fmt::Display for FlushTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
