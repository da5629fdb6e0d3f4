//! Live sensor and output instances built from the manifest.
//!
//! Each instance wraps its driver in an async mutex (one driver call at a
//! time per device) and keeps its observable value (`last reading`,
//! `state`) behind a separate short-lived lock, so snapshots never wait on
//! a stalled driver.

use std::sync::{Mutex, PoisonError};

use futures::future::join_all;
use turnip_domain::driver::{DriverConfig, DriverKind};
use turnip_domain::error::{NotFoundError, TurnipError};
use turnip_domain::event::Event;
use turnip_domain::manifest::Manifest;
use turnip_domain::output_state::OutputState;
use turnip_domain::time::now;

use crate::event_bus::InProcessEventBus;
use crate::ports::{Output, OutputSnapshot, Reading, Sensor, SensorSnapshot};
use crate::registry::DriverRegistry;

/// A ready sensor instance.
pub struct SensorInstance {
    name: String,
    driver: String,
    device: tokio::sync::Mutex<Box<dyn Sensor>>,
    last_reading: Mutex<Option<Reading>>,
}

impl SensorInstance {
    fn new(config: &DriverConfig, device: Box<dyn Sensor>) -> Self {
        Self {
            name: config.name.clone(),
            driver: config.driver.clone(),
            device: tokio::sync::Mutex::new(device),
            last_reading: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read the sensor. Only a successful read updates the last reading.
    ///
    /// # Errors
    ///
    /// Returns [`TurnipError::SensorRead`] wrapping the driver failure.
    pub async fn read(&self, bus: &InProcessEventBus) -> Result<f64, TurnipError> {
        let value = self
            .device
            .lock()
            .await
            .read()
            .await
            .map_err(|source| TurnipError::SensorRead {
                sensor: self.name.clone(),
                source,
            })?;

        let at = now();
        *self.lock_reading() = Some(Reading {
            value,
            updated_at: at,
        });
        bus.publish(Event::SensorRead {
            sensor: self.name.clone(),
            value,
            at,
        });
        Ok(value)
    }

    #[must_use]
    pub fn last_reading(&self) -> Option<Reading> {
        *self.lock_reading()
    }

    #[must_use]
    pub fn snapshot(&self) -> SensorSnapshot {
        SensorSnapshot {
            name: self.name.clone(),
            driver: self.driver.clone(),
            reading: self.last_reading(),
        }
    }

    fn lock_reading(&self) -> std::sync::MutexGuard<'_, Option<Reading>> {
        self.last_reading
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// A ready output instance.
pub struct OutputInstance {
    name: String,
    driver: String,
    device: tokio::sync::Mutex<Box<dyn Output>>,
    state: Mutex<Option<OutputState>>,
}

impl OutputInstance {
    fn new(config: &DriverConfig, device: Box<dyn Output>, state: Option<OutputState>) -> Self {
        Self {
            name: config.name.clone(),
            driver: config.driver.clone(),
            device: tokio::sync::Mutex::new(device),
            state: Mutex::new(state),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Drive the output to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`TurnipError::OutputWrite`] wrapping the driver failure;
    /// the observable state is left unchanged.
    pub async fn set_state(
        &self,
        target: &OutputState,
        bus: &InProcessEventBus,
    ) -> Result<OutputState, TurnipError> {
        let result = self.device.lock().await.set_state(target).await;
        self.record(result, bus)
    }

    /// Restore the output's default state.
    ///
    /// # Errors
    ///
    /// Returns [`TurnipError::OutputWrite`] wrapping the driver failure.
    pub async fn reset(&self, bus: &InProcessEventBus) -> Result<OutputState, TurnipError> {
        let result = self.device.lock().await.reset().await;
        self.record(result, bus)
    }

    #[must_use]
    pub fn state(&self) -> Option<OutputState> {
        self.lock_state().clone()
    }

    #[must_use]
    pub fn snapshot(&self) -> OutputSnapshot {
        OutputSnapshot {
            name: self.name.clone(),
            driver: self.driver.clone(),
            state: self.state(),
        }
    }

    fn record(
        &self,
        result: Result<OutputState, turnip_domain::error::DeviceError>,
        bus: &InProcessEventBus,
    ) -> Result<OutputState, TurnipError> {
        let state = result.map_err(|source| TurnipError::OutputWrite {
            output: self.name.clone(),
            source,
        })?;
        *self.lock_state() = Some(state.clone());
        bus.publish(Event::OutputChanged {
            output: self.name.clone(),
            state: state.clone(),
            at: now(),
        });
        Ok(state)
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, Option<OutputState>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// All ready instances, in configuration order.
pub struct Devices {
    sensors: Vec<SensorInstance>,
    outputs: Vec<OutputInstance>,
    bus: InProcessEventBus,
}

impl Devices {
    /// Build and initialize every sensor and output of the manifest.
    ///
    /// An entry whose driver cannot be resolved, whose constructor fails,
    /// or whose initialization fails is logged and skipped; the remaining
    /// entries are still set up. Initializations run concurrently.
    pub async fn setup(
        manifest: &Manifest,
        registry: &DriverRegistry,
        bus: InProcessEventBus,
    ) -> Self {
        let sensors = join_all(manifest.sensors.iter().filter_map(|config| {
            let device = registry
                .create_sensor(config)
                .map_err(|err| skip(DriverKind::Sensor, config, &err))
                .ok()?;
            Some(async move {
                let mut device = device;
                match device.initialize().await {
                    Ok(()) => Some(SensorInstance::new(config, device)),
                    Err(source) => {
                        let err = setup_error(DriverKind::Sensor, config, source);
                        skip(DriverKind::Sensor, config, &err);
                        None
                    }
                }
            })
        }))
        .await;

        let outputs = join_all(manifest.outputs.iter().filter_map(|config| {
            let device = registry
                .create_output(config)
                .map_err(|err| skip(DriverKind::Output, config, &err))
                .ok()?;
            Some(async move {
                let mut device = device;
                match device.initialize().await {
                    Ok(state) => Some(OutputInstance::new(config, device, state)),
                    Err(source) => {
                        let err = setup_error(DriverKind::Output, config, source);
                        skip(DriverKind::Output, config, &err);
                        None
                    }
                }
            })
        }))
        .await;

        let devices = Self {
            sensors: sensors.into_iter().flatten().collect(),
            outputs: outputs.into_iter().flatten().collect(),
            bus,
        };
        tracing::info!(
            sensors = devices.sensors.len(),
            outputs = devices.outputs.len(),
            "devices ready"
        );
        devices
    }

    /// Look up a ready sensor by name.
    ///
    /// # Errors
    ///
    /// Returns [`NotFoundError`] if the sensor is not configured or was
    /// skipped during setup.
    pub fn sensor(&self, name: &str) -> Result<&SensorInstance, NotFoundError> {
        self.sensors
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| NotFoundError {
                kind: DriverKind::Sensor,
                name: name.to_string(),
            })
    }

    /// Look up a ready output by name.
    ///
    /// # Errors
    ///
    /// Returns [`NotFoundError`] if the output is not configured or was
    /// skipped during setup.
    pub fn output(&self, name: &str) -> Result<&OutputInstance, NotFoundError> {
        self.outputs
            .iter()
            .find(|o| o.name == name)
            .ok_or_else(|| NotFoundError {
                kind: DriverKind::Output,
                name: name.to_string(),
            })
    }

    /// Read a sensor by name.
    ///
    /// # Errors
    ///
    /// Returns [`TurnipError::NotFound`] or [`TurnipError::SensorRead`].
    pub async fn read_sensor(&self, name: &str) -> Result<f64, TurnipError> {
        self.sensor(name)?.read(&self.bus).await
    }

    /// Drive an output by name.
    ///
    /// # Errors
    ///
    /// Returns [`TurnipError::NotFound`] or [`TurnipError::OutputWrite`].
    pub async fn set_output(
        &self,
        name: &str,
        state: &OutputState,
    ) -> Result<OutputState, TurnipError> {
        self.output(name)?.set_state(state, &self.bus).await
    }

    /// Reset an output by name.
    ///
    /// # Errors
    ///
    /// Returns [`TurnipError::NotFound`] or [`TurnipError::OutputWrite`].
    pub async fn reset_output(&self, name: &str) -> Result<OutputState, TurnipError> {
        self.output(name)?.reset(&self.bus).await
    }

    /// Reset every output concurrently, returning the failures.
    pub async fn reset_all(&self) -> Vec<TurnipError> {
        join_all(self.outputs.iter().map(|output| output.reset(&self.bus)))
            .await
            .into_iter()
            .filter_map(Result::err)
            .inspect(|err| tracing::error!(error = %err.describe(), "output reset failed"))
            .collect()
    }

    #[must_use]
    pub fn sensor_snapshots(&self) -> Vec<SensorSnapshot> {
        self.sensors.iter().map(SensorInstance::snapshot).collect()
    }

    #[must_use]
    pub fn output_snapshots(&self) -> Vec<OutputSnapshot> {
        self.outputs.iter().map(OutputInstance::snapshot).collect()
    }
}

fn setup_error(
    kind: DriverKind,
    config: &DriverConfig,
    source: turnip_domain::error::DeviceError,
) -> TurnipError {
    TurnipError::Setup {
        kind,
        name: config.name.clone(),
        source,
    }
}

fn skip(kind: DriverKind, config: &DriverConfig, err: &TurnipError) {
    tracing::warn!(
        %kind,
        name = %config.name,
        driver = %config.driver,
        error = %err.describe(),
        "skipping entry"
    );
}
