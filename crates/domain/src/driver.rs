//! Driver configuration: a named sensor or output bound to a driver.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// The two capability kinds a driver can implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    Sensor,
    Output,
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor => f.write_str("sensor"),
            Self::Output => f.write_str("output"),
        }
    }
}

/// One `[[sensors]]` or `[[outputs]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Friendly name used by rules and the control channel.
    #[serde(default)]
    pub name: String,
    /// Driver name, resolved through the driver registry.
    #[serde(default)]
    pub driver: String,
    /// Driver-specific options, opaque to the core.
    #[serde(default)]
    pub options: serde_json::Value,
}

impl DriverConfig {
    #[must_use]
    pub fn new(name: impl Into<String>, driver: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            driver: driver.into(),
            options: serde_json::Value::Null,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: serde_json::Value) -> Self {
        self.options = options;
        self
    }

    /// Decode the driver options into a typed structure.
    ///
    /// Missing options decode as an empty table so that drivers whose
    /// options all have defaults need no `options` entry at all.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when the options do not match `T`.
    pub fn options<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match &self.options {
            serde_json::Value::Null => serde_json::from_value(serde_json::json!({})),
            options => serde_json::from_value(options.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Options {
        pin: u8,
        scale: String,
    }

    #[test]
    fn should_decode_missing_options_as_defaults() {
        let config = DriverConfig::new("fan", "relay");
        let options: Options = config.options().unwrap();
        assert_eq!(options, Options::default());
    }

    #[test]
    fn should_decode_typed_options() {
        let config = DriverConfig::new("fan", "relay")
            .with_options(serde_json::json!({"pin": 25, "scale": "C"}));
        let options: Options = config.options().unwrap();
        assert_eq!(options.pin, 25);
        assert_eq!(options.scale, "C");
    }

    #[test]
    fn should_report_mismatched_options() {
        let config =
            DriverConfig::new("fan", "relay").with_options(serde_json::json!({"pin": "x"}));
        assert!(config.options::<Options>().is_err());
    }

    #[test]
    fn should_display_kind_lowercase() {
        assert_eq!(DriverKind::Sensor.to_string(), "sensor");
        assert_eq!(DriverKind::Output.to_string(), "output");
    }
}
