//! Relay on a GPIO pin, driven through the sysfs GPIO interface.
//!
//! Many relay boards are active-low, hence `on_value` (default `0`): the
//! pin is written `on_value` to switch the relay on and its complement to
//! switch it off. Initialization exports the pin if needed, sets it as an
//! output and switches the relay off.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use turnip_app::ports::Output;
use turnip_domain::driver::DriverConfig;
use turnip_domain::error::DeviceError;
use turnip_domain::output_state::OutputState;

use crate::error::DriverError;

const DEFAULT_GPIO_ROOT: &str = "/sys/class/gpio";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Options {
    pin: u32,
    #[serde(default, alias = "onValue")]
    on_value: u8,
    #[serde(default = "default_gpio_root")]
    gpio_root: PathBuf,
}

fn default_gpio_root() -> PathBuf {
    PathBuf::from(DEFAULT_GPIO_ROOT)
}

/// A relay switched by one GPIO pin.
#[derive(Debug)]
pub struct Relay {
    pin: u32,
    on_value: u8,
    gpio_root: PathBuf,
}

impl Relay {
    /// # Errors
    ///
    /// Returns [`DriverError::InvalidOption`] if `on_value` is neither 0 nor 1.
    pub fn new(pin: u32, on_value: u8, gpio_root: impl Into<PathBuf>) -> Result<Self, DriverError> {
        if on_value > 1 {
            return Err(DriverError::InvalidOption {
                option: "on_value",
                reason: "must be 0 or 1",
            });
        }
        Ok(Self {
            pin,
            on_value,
            gpio_root: gpio_root.into(),
        })
    }

    fn pin_dir(&self) -> PathBuf {
        self.gpio_root.join(format!("gpio{}", self.pin))
    }

    async fn write(path: PathBuf, content: String) -> Result<(), DriverError> {
        tokio::fs::write(&path, content)
            .await
            .map_err(|source| DriverError::io(path, source))
    }

    async fn switch(&self, on: bool) -> Result<OutputState, DriverError> {
        let value = if on { self.on_value } else { self.on_value ^ 1 };
        Self::write(self.pin_dir().join("value"), value.to_string()).await?;
        tracing::debug!(pin = self.pin, value, "relay switched");
        Ok(if on { OutputState::On } else { OutputState::Off })
    }
}

pub(crate) fn build(config: &DriverConfig) -> Result<Box<dyn Output>, DeviceError> {
    let options: Options = config.options().map_err(DriverError::from)?;
    Ok(Box::new(Relay::new(
        options.pin,
        options.on_value,
        options.gpio_root,
    )?))
}

#[async_trait]
impl Output for Relay {
    async fn initialize(&mut self) -> Result<Option<OutputState>, DeviceError> {
        if !tokio::fs::try_exists(self.pin_dir()).await.unwrap_or(false) {
            Self::write(self.gpio_root.join("export"), self.pin.to_string()).await?;
        }
        Self::write(self.pin_dir().join("direction"), "out".to_string()).await?;
        Ok(Some(self.switch(false).await?))
    }

    async fn set_state(&mut self, state: &OutputState) -> Result<OutputState, DeviceError> {
        match state {
            OutputState::On => Ok(self.switch(true).await?),
            OutputState::Off => Ok(self.switch(false).await?),
            other => Err(DriverError::Unsupported {
                driver: "relay",
                state: other.clone(),
            }
            .into()),
        }
    }

    async fn reset(&mut self) -> Result<OutputState, DeviceError> {
        Ok(self.switch(false).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A fake sysfs GPIO root with pin 17 already exported.
    fn gpio_root() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("gpio17")).unwrap();
        dir
    }

    fn read(root: &tempfile::TempDir, file: &str) -> String {
        std::fs::read_to_string(root.path().join("gpio17").join(file)).unwrap()
    }

    #[tokio::test]
    async fn should_configure_output_and_switch_off_when_initialized() {
        let root = gpio_root();
        let mut relay = Relay::new(17, 0, root.path()).unwrap();

        let state = relay.initialize().await.unwrap();

        assert_eq!(state, Some(OutputState::Off));
        assert_eq!(read(&root, "direction"), "out");
        assert_eq!(read(&root, "value"), "1");
    }

    #[tokio::test]
    async fn should_write_on_value_when_switched_on() {
        let root = gpio_root();
        let mut relay = Relay::new(17, 0, root.path()).unwrap();

        assert_eq!(relay.set_state(&OutputState::On).await.unwrap(), OutputState::On);
        assert_eq!(read(&root, "value"), "0");
    }

    #[tokio::test]
    async fn should_honor_active_high_boards() {
        let root = gpio_root();
        let mut relay = Relay::new(17, 1, root.path()).unwrap();

        relay.set_state(&OutputState::On).await.unwrap();
        assert_eq!(read(&root, "value"), "1");

        assert_eq!(relay.reset().await.unwrap(), OutputState::Off);
        assert_eq!(read(&root, "value"), "0");
    }

    #[tokio::test]
    async fn should_export_pin_when_not_yet_exported() {
        let root = tempfile::tempdir().unwrap();
        let mut relay = Relay::new(22, 0, root.path()).unwrap();

        // no kernel behind the fake root, so the pin directory never appears
        assert!(relay.initialize().await.is_err());
        assert_eq!(
            std::fs::read_to_string(root.path().join("export")).unwrap(),
            "22"
        );
    }

    #[tokio::test]
    async fn should_refuse_level_states() {
        let root = gpio_root();
        let mut relay = Relay::new(17, 0, root.path()).unwrap();

        let err = relay.set_state(&OutputState::Level(50.0)).await.unwrap_err();

        assert_eq!(err.to_string(), "relay does not accept state 50");
    }

    #[test]
    fn should_reject_on_value_other_than_zero_or_one() {
        let config = DriverConfig::new("fan", "relay")
            .with_options(serde_json::json!({"pin": 17, "on_value": 2}));
        assert!(build(&config).is_err());
    }
}
