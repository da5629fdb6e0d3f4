//! DS18B20 1-Wire temperature sensor, read through the kernel's `w1`
//! sysfs interface.
//!
//! The device directory (e.g. `/sys/bus/w1/devices/28-000005e2fdc3`)
//! exposes `name`, read once during initialization, and `temperature` in
//! thousandths of a degree Celsius.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use turnip_app::ports::Sensor;
use turnip_domain::driver::DriverConfig;
use turnip_domain::error::DeviceError;

use crate::error::DriverError;
use crate::scale::Scale;

const DEFAULT_BASE_PATH: &str = "/sys/bus/w1/devices";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Options {
    path: PathBuf,
    #[serde(default = "default_base_path", alias = "basePath")]
    base_path: PathBuf,
    #[serde(default)]
    scale: Scale,
}

fn default_base_path() -> PathBuf {
    PathBuf::from(DEFAULT_BASE_PATH)
}

/// A DS18B20 sensor bound to its sysfs device directory.
#[derive(Debug)]
pub struct Ds18b20 {
    path: PathBuf,
    scale: Scale,
    device_name: Option<String>,
}

impl Ds18b20 {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, scale: Scale) -> Self {
        Self {
            path: path.into(),
            scale,
            device_name: None,
        }
    }

    /// The name the kernel reports for the device, once initialized.
    #[must_use]
    pub fn device_name(&self) -> Option<&str> {
        self.device_name.as_deref()
    }

    async fn read_file(&self, file: &str) -> Result<String, DriverError> {
        let path = self.path.join(file);
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| DriverError::io(path, source))
    }
}

pub(crate) fn build(config: &DriverConfig) -> Result<Box<dyn Sensor>, DeviceError> {
    let options: Options = config.options().map_err(DriverError::from)?;
    Ok(Box::new(Ds18b20::new(
        options.base_path.join(options.path),
        options.scale,
    )))
}

#[async_trait]
impl Sensor for Ds18b20 {
    async fn initialize(&mut self) -> Result<(), DeviceError> {
        if !self.path.is_absolute() {
            return Err(DriverError::RelativePath(self.path.clone()).into());
        }
        let name = self.read_file("name").await?.trim().to_string();
        tracing::info!(path = %self.path.display(), device = %name, "ds18b20 ready");
        self.device_name = Some(name);
        Ok(())
    }

    async fn read(&mut self) -> Result<f64, DeviceError> {
        let raw = self.read_file("temperature").await?;
        let raw = raw.trim();
        let millis: i64 = raw.parse().map_err(|_| DriverError::Parse {
            origin: self.path.join("temperature").display().to_string(),
            value: raw.to_string(),
        })?;
        #[allow(clippy::cast_precision_loss)]
        let celsius = millis as f64 / 1000.0;
        Ok(self.scale.from_celsius(celsius))
    }
}
