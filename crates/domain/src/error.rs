//! Common error types used across the workspace.
//!
//! Each failure class of the daemon has its own variant so that callers can
//! decide whether it is fatal (configuration), localized to one driver entry
//! (resolution, setup) or localized to one tick (sensor read, output write).

use std::error::Error as StdError;

use crate::driver::DriverKind;

/// Opaque error produced by a concrete sensor or output driver.
pub type DeviceError = Box<dyn StdError + Send + Sync>;

/// Top-level error shared by every layer.
#[derive(Debug, thiserror::Error)]
pub enum TurnipError {
    #[error("invalid configuration")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// The driver was resolved but its instance failed to become ready.
    #[error("failed to set up {kind} {name}")]
    Setup {
        kind: DriverKind,
        name: String,
        #[source]
        source: DeviceError,
    },

    #[error("failed to read sensor {sensor}")]
    SensorRead {
        sensor: String,
        #[source]
        source: DeviceError,
    },

    #[error("failed to write output {output}")]
    OutputWrite {
        output: String,
        #[source]
        source: DeviceError,
    },
}

impl TurnipError {
    /// Render the error together with its whole source chain on one line,
    /// e.g. `failed to read sensor t1: no such file or directory`.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut message = self.to_string();
        let mut source = self.source();
        while let Some(err) = source {
            message.push_str(": ");
            message.push_str(&err.to_string());
            source = err.source();
        }
        message
    }
}

/// Malformed configuration. Always fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{kind} without a name")]
    EmptyName { kind: DriverKind },

    #[error("{kind} {name} has no driver")]
    EmptyDriver { kind: DriverKind, name: String },

    #[error("{kind} {name} is configured more than once")]
    DuplicateName { kind: DriverKind, name: String },

    #[error("rule has no sensor")]
    MissingSensor,

    #[error("rule action has no output")]
    MissingOutput,

    #[error("rule threshold must be a finite number")]
    NonFiniteThreshold,

    #[error("unknown comparison {0:?}, expected one of eq, lt, lte, gt, gte")]
    InvalidComparison(String),

    #[error("invalid interval {0:?}")]
    InvalidInterval(String),

    #[error("interval must be greater than zero")]
    ZeroInterval,

    #[error("output state must not be empty")]
    EmptyState,

    #[error("rule #{index} references unknown sensor {sensor}")]
    UnknownSensor { index: usize, sensor: String },

    #[error("rule #{index} references unknown output {output}")]
    UnknownOutput { index: usize, output: String },
}

/// A named sensor or output does not exist (or was skipped during setup).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} {name} not found")]
pub struct NotFoundError {
    pub kind: DriverKind,
    pub name: String,
}

/// No built-in or external implementation exists for a driver name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no {kind} driver named {driver}")]
pub struct ResolutionError {
    pub kind: DriverKind,
    pub driver: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_describe_error_with_source_chain() {
        let err = TurnipError::SensorRead {
            sensor: "t1".to_string(),
            source: Box::new(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no such file",
            )),
        };
        assert_eq!(err.describe(), "failed to read sensor t1: no such file");
    }

    #[test]
    fn should_describe_validation_error_with_reason() {
        let err = TurnipError::from(ValidationError::MissingSensor);
        assert_eq!(err.describe(), "invalid configuration: rule has no sensor");
    }

    #[test]
    fn should_display_not_found_error() {
        let err = NotFoundError {
            kind: DriverKind::Output,
            name: "fan".to_string(),
        };
        assert_eq!(err.to_string(), "output fan not found");
    }

    #[test]
    fn should_display_resolution_error() {
        let err = ResolutionError {
            kind: DriverKind::Sensor,
            driver: "bogus".to_string(),
        };
        assert_eq!(err.to_string(), "no sensor driver named bogus");
    }

    #[test]
    fn should_convert_not_found_transparently() {
        let err: TurnipError = NotFoundError {
            kind: DriverKind::Sensor,
            name: "t1".to_string(),
        }
        .into();
        assert!(matches!(err, TurnipError::NotFound(_)));
        assert_eq!(err.describe(), "sensor t1 not found");
    }
}
