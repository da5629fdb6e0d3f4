//! Event: an immutable notification of something that happened.
//!
//! Events replace implicit event emission by drivers: the application
//! publishes them explicitly after a state change, so subscribers never
//! observe a half-applied transition.

use serde::{Deserialize, Serialize};

use crate::output_state::OutputState;
use crate::time::Timestamp;

/// Lifecycle state of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    Uninitialized,
    Ready,
    Running,
    Paused,
    Stopped,
}

impl std::fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => f.write_str("uninitialized"),
            Self::Ready => f.write_str("ready"),
            Self::Running => f.write_str("running"),
            Self::Paused => f.write_str("paused"),
            Self::Stopped => f.write_str("stopped"),
        }
    }
}

/// A state-change notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A sensor produced a new reading.
    SensorRead {
        sensor: String,
        value: f64,
        at: Timestamp,
    },
    /// An output reached a new state (after `set_state` or `reset`).
    OutputChanged {
        output: String,
        state: OutputState,
        at: Timestamp,
    },
    /// The scheduler moved to a new lifecycle state.
    LifecycleChanged { state: Lifecycle, at: Timestamp },
}
