//! Capability ports: the contracts concrete sensor and output drivers implement.
//!
//! Drivers live in adapter crates (e.g. `adapter_drivers`) or in external
//! crates registered through a [`DriverProvider`](crate::registry::DriverProvider).
//! The application calls the methods in order:
//!
//! 1. `initialize`: asynchronous setup, awaited before the first read/write
//! 2. `read` / `set_state` / `reset`: driven by ticks and the control channel
//!
//! Instances are always accessed through a mutex owned by the application,
//! so methods take `&mut self` and implementations need only be [`Send`].

use async_trait::async_trait;

use turnip_domain::error::DeviceError;
use turnip_domain::output_state::OutputState;

/// A source of numeric readings (temperature, power, …).
#[async_trait]
pub trait Sensor: Send {
    /// Complete asynchronous setup, e.g. resolve the device identity.
    ///
    /// The default implementation is ready immediately.
    async fn initialize(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    /// Take one reading, in the unit/scale the driver was configured with.
    async fn read(&mut self) -> Result<f64, DeviceError>;
}

/// Something the daemon drives: a relay, a power limit, a command.
#[async_trait]
pub trait Output: Send {
    /// Complete asynchronous setup and probe the current state.
    ///
    /// The returned state (if any) becomes the observable state of the
    /// output before the engine is allowed to override it. Outputs that
    /// capture a baseline for [`reset`](Self::reset) do it here.
    async fn initialize(&mut self) -> Result<Option<OutputState>, DeviceError> {
        Ok(None)
    }

    /// Drive the output to `state`, returning the state actually reached
    /// (relative adjustments are resolved to absolute levels).
    async fn set_state(&mut self, state: &OutputState) -> Result<OutputState, DeviceError>;

    /// Restore the default state, returning it.
    async fn reset(&mut self) -> Result<OutputState, DeviceError>;
}
