//! Output state: the value an output is driven to.
//!
//! Relays understand `on`/`off`, power-limited devices understand absolute
//! levels (`250`) or relative adjustments (`+10`, `-25`), and command outputs
//! accept arbitrary text.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// Target or current state of an output.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputState {
    On,
    Off,
    /// Absolute numeric level.
    Level(f64),
    /// Adjustment relative to the current level.
    Relative(f64),
    /// Free-form text, e.g. a command line.
    Command(String),
}

impl OutputState {
    /// Resolve a relative adjustment against the current numeric level.
    ///
    /// Absolute states are returned unchanged. A relative state with no
    /// known current level resolves to `None`.
    #[must_use]
    pub fn resolve(&self, current: Option<f64>) -> Option<Self> {
        match self {
            Self::Relative(delta) => current.map(|level| Self::Level(level + delta)),
            other => Some(other.clone()),
        }
    }

    /// Numeric level, if this state is an absolute level.
    #[must_use]
    pub fn level(&self) -> Option<f64> {
        match self {
            Self::Level(level) => Some(*level),
            _ => None,
        }
    }
}

impl FromStr for OutputState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ValidationError::EmptyState);
        }
        if s.eq_ignore_ascii_case("on") || s.eq_ignore_ascii_case("true") {
            return Ok(Self::On);
        }
        if s.eq_ignore_ascii_case("off") || s.eq_ignore_ascii_case("false") {
            return Ok(Self::Off);
        }
        if let Ok(value) = s.parse::<f64>() {
            if value.is_finite() {
                if s.starts_with('+') || s.starts_with('-') {
                    return Ok(Self::Relative(value));
                }
                return Ok(Self::Level(value));
            }
        }
        Ok(Self::Command(s.to_string()))
    }
}

impl fmt::Display for OutputState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::On => f.write_str("on"),
            Self::Off => f.write_str("off"),
            Self::Level(level) => write!(f, "{level}"),
            Self::Relative(delta) if *delta >= 0.0 => write!(f, "+{delta}"),
            Self::Relative(delta) => write!(f, "{delta}"),
            Self::Command(text) => f.write_str(text),
        }
    }
}

impl Serialize for OutputState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Level(level) => serializer.serialize_f64(*level),
            other => serializer.collect_str(other),
        }
    }
}

/// Raw configuration value: `state = "on"`, `state = 250` or `state = true`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawState {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for OutputState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawState::deserialize(deserializer)? {
            RawState::Bool(true) => Ok(Self::On),
            RawState::Bool(false) => Ok(Self::Off),
            RawState::Number(level) => Ok(Self::Level(level)),
            RawState::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}
