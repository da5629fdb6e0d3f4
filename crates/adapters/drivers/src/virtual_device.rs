//! In-memory `virtual` sensor and output, for demos and dry runs.

use async_trait::async_trait;
use serde::Deserialize;
use turnip_app::ports::{Output, Sensor};
use turnip_domain::driver::DriverConfig;
use turnip_domain::error::DeviceError;
use turnip_domain::output_state::OutputState;

use crate::error::DriverError;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SensorOptions {
    value: f64,
    fail: bool,
}

/// A sensor that always reports its configured `value`.
#[derive(Debug)]
pub struct VirtualSensor {
    value: f64,
    fail: bool,
}

impl VirtualSensor {
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self { value, fail: false }
    }

    /// A sensor whose every read fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            value: 0.0,
            fail: true,
        }
    }
}

pub(crate) fn sensor(config: &DriverConfig) -> Result<Box<dyn Sensor>, DeviceError> {
    let options: SensorOptions = config.options().map_err(DriverError::from)?;
    Ok(Box::new(VirtualSensor {
        value: options.value,
        fail: options.fail,
    }))
}

#[async_trait]
impl Sensor for VirtualSensor {
    async fn read(&mut self) -> Result<f64, DeviceError> {
        if self.fail {
            return Err(DriverError::Simulated.into());
        }
        Ok(self.value)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct OutputOptions {
    default: Option<OutputState>,
}

/// An output that only remembers the last state it was driven to.
#[derive(Debug)]
pub struct VirtualOutput {
    default: OutputState,
    state: OutputState,
}

impl VirtualOutput {
    #[must_use]
    pub fn new(default: OutputState) -> Self {
        Self {
            state: default.clone(),
            default,
        }
    }
}

pub(crate) fn output(config: &DriverConfig) -> Result<Box<dyn Output>, DeviceError> {
    let options: OutputOptions = config.options().map_err(DriverError::from)?;
    Ok(Box::new(VirtualOutput::new(
        options.default.unwrap_or(OutputState::Off),
    )))
}

#[async_trait]
impl Output for VirtualOutput {
    async fn initialize(&mut self) -> Result<Option<OutputState>, DeviceError> {
        Ok(Some(self.state.clone()))
    }

    async fn set_state(&mut self, state: &OutputState) -> Result<OutputState, DeviceError> {
        let reached = state.resolve(self.state.level()).ok_or(DriverError::NoLevel)?;
        self.state = reached.clone();
        Ok(reached)
    }

    async fn reset(&mut self) -> Result<OutputState, DeviceError> {
        self.state = self.default.clone();
        Ok(self.state.clone())
    }
}
