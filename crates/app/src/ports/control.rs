//! Control port: lifecycle and manual override operations.
//!
//! The control channel is a second caller of the same operations the
//! scheduler uses; it never reaches into the engine directly.

use std::future::Future;

use turnip_domain::error::TurnipError;
use turnip_domain::output_state::OutputState;

use super::reporting::ReportingPort;

/// Operations exposed to the control channel.
pub trait ControlPort: ReportingPort {
    /// Start (or cleanly restart) the scheduler.
    fn start(&self) -> impl Future<Output = ()> + Send;

    /// Clear all timers, leaving outputs untouched.
    fn pause(&self) -> impl Future<Output = ()> + Send;

    /// Clear all timers and reset every output.
    fn stop(&self) -> impl Future<Output = Result<(), TurnipError>> + Send;

    /// Read one sensor now, updating its last reading.
    fn read_sensor(&self, name: &str) -> impl Future<Output = Result<f64, TurnipError>> + Send;

    /// Drive one output now, returning the state reached.
    fn set_output(
        &self,
        name: &str,
        state: OutputState,
    ) -> impl Future<Output = Result<OutputState, TurnipError>> + Send;
}

impl<T: ControlPort> ControlPort for std::sync::Arc<T> {
    fn start(&self) -> impl Future<Output = ()> + Send {
        (**self).start()
    }

    fn pause(&self) -> impl Future<Output = ()> + Send {
        (**self).pause()
    }

    fn stop(&self) -> impl Future<Output = Result<(), TurnipError>> + Send {
        (**self).stop()
    }

    fn read_sensor(&self, name: &str) -> impl Future<Output = Result<f64, TurnipError>> + Send {
        (**self).read_sensor(name)
    }

    fn set_output(
        &self,
        name: &str,
        state: OutputState,
    ) -> impl Future<Output = Result<OutputState, TurnipError>> + Send {
        (**self).set_output(name, state)
    }
}
