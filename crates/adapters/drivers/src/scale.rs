//! Temperature scale shared by the temperature sensors.

use serde::Deserialize;

/// Unit in which a temperature sensor reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum Scale {
    #[default]
    #[serde(alias = "f", alias = "fahrenheit")]
    F,
    #[serde(alias = "c", alias = "celsius")]
    C,
}

impl Scale {
    /// Convert a Celsius temperature to this scale, rounded to 2 decimals.
    #[must_use]
    pub fn from_celsius(self, celsius: f64) -> f64 {
        let value = match self {
            Self::F => celsius * 9.0 / 5.0 + 32.0,
            Self::C => celsius,
        };
        (value * 100.0).round() / 100.0
    }
}
