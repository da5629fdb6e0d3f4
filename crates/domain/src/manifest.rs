//! Manifest: the validated set of sensors, outputs and rules.
//!
//! The manifest is the only configuration the core consumes. It is built
//! once (usually deserialized from the daemon's config file), validated, and
//! handed by value to the application.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::driver::{DriverConfig, DriverKind};
use crate::error::{TurnipError, ValidationError};
use crate::rule::Rule;

/// Sensors, outputs and rules, in configuration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub sensors: Vec<DriverConfig>,
    pub outputs: Vec<DriverConfig>,
    pub rules: Vec<Rule>,
}

impl Manifest {
    /// Check that every entry is well formed and every rule references a
    /// configured sensor and output.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found, wrapped in
    /// [`TurnipError::Validation`].
    pub fn validate(&self) -> Result<(), TurnipError> {
        let sensors = check_entries(DriverKind::Sensor, &self.sensors)?;
        let outputs = check_entries(DriverKind::Output, &self.outputs)?;

        for (index, rule) in self.rules.iter().enumerate() {
            rule.validate()?;
            if !sensors.contains(rule.sensor.as_str()) {
                return Err(ValidationError::UnknownSensor {
                    index,
                    sensor: rule.sensor.clone(),
                }
                .into());
            }
            if !outputs.contains(rule.action.output.as_str()) {
                return Err(ValidationError::UnknownOutput {
                    index,
                    output: rule.action.output.clone(),
                }
                .into());
            }
        }
        Ok(())
    }
}

fn check_entries(
    kind: DriverKind,
    entries: &[DriverConfig],
) -> Result<HashSet<&str>, ValidationError> {
    let mut names = HashSet::with_capacity(entries.len());
    for entry in entries {
        if entry.name.trim().is_empty() {
            return Err(ValidationError::EmptyName { kind });
        }
        if entry.driver.trim().is_empty() {
            return Err(ValidationError::EmptyDriver {
                kind,
                name: entry.name.clone(),
            });
        }
        if !names.insert(entry.name.as_str()) {
            return Err(ValidationError::DuplicateName {
                kind,
                name: entry.name.clone(),
            });
        }
    }
    Ok(names)
}
