//! Rule: a threshold comparison on one sensor, bound to an output action.
//!
//! Rules are immutable once loaded. Every rule names the sensor it watches:
//! a rule without a sensor is rejected when it is built or deserialized.

use serde::{Deserialize, Serialize};

use crate::comparison::Comparison;
use crate::error::{TurnipError, ValidationError};
use crate::interval::Interval;
use crate::output_state::OutputState;

/// What to do with an output when a rule matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub output: String,
    pub state: OutputState,
}

/// A configured `reading <comparison> threshold` check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RuleConfig")]
pub struct Rule {
    pub sensor: String,
    pub threshold: f64,
    pub comparison: Comparison,
    pub interval: Interval,
    /// Evaluate once when the scheduler starts, before the first tick.
    pub immediate: bool,
    /// Reset the output when the comparison does not match.
    pub reset_when_negative: bool,
    pub action: Action,
}

impl Rule {
    /// Create a builder for constructing a [`Rule`].
    #[must_use]
    pub fn builder() -> RuleBuilder {
        RuleBuilder::default()
    }

    /// Whether `reading` satisfies this rule.
    #[must_use]
    pub fn matches(&self, reading: f64) -> bool {
        self.comparison.matches(reading, self.threshold)
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`TurnipError::Validation`] when:
    /// - `sensor` is empty ([`ValidationError::MissingSensor`])
    /// - `action.output` is empty ([`ValidationError::MissingOutput`])
    /// - `threshold` is NaN or infinite ([`ValidationError::NonFiniteThreshold`])
    pub fn validate(&self) -> Result<(), TurnipError> {
        self.check().map_err(TurnipError::from)
    }

    fn check(&self) -> Result<(), ValidationError> {
        if self.sensor.trim().is_empty() {
            return Err(ValidationError::MissingSensor);
        }
        if self.action.output.trim().is_empty() {
            return Err(ValidationError::MissingOutput);
        }
        if !self.threshold.is_finite() {
            return Err(ValidationError::NonFiniteThreshold);
        }
        Ok(())
    }
}

/// Step-by-step builder for [`Rule`].
#[derive(Debug, Default)]
pub struct RuleBuilder {
    sensor: Option<String>,
    threshold: Option<f64>,
    comparison: Option<Comparison>,
    interval: Option<Interval>,
    immediate: Option<bool>,
    reset_when_negative: Option<bool>,
    output: Option<String>,
    state: Option<OutputState>,
}

impl RuleBuilder {
    #[must_use]
    pub fn sensor(mut self, sensor: impl Into<String>) -> Self {
        self.sensor = Some(sensor.into());
        self
    }

    #[must_use]
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    #[must_use]
    pub fn comparison(mut self, comparison: Comparison) -> Self {
        self.comparison = Some(comparison);
        self
    }

    #[must_use]
    pub fn interval(mut self, interval: Interval) -> Self {
        self.interval = Some(interval);
        self
    }

    #[must_use]
    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = Some(immediate);
        self
    }

    #[must_use]
    pub fn reset_when_negative(mut self, reset: bool) -> Self {
        self.reset_when_negative = Some(reset);
        self
    }

    #[must_use]
    pub fn action(mut self, output: impl Into<String>, state: OutputState) -> Self {
        self.output = Some(output.into());
        self.state = Some(state);
        self
    }

    /// Consume the builder, validate, and return a [`Rule`].
    ///
    /// Defaults: threshold `0`, comparison `eq`, interval `60s`, immediate
    /// `true`, no reset, action state `on`.
    ///
    /// # Errors
    ///
    /// Returns [`TurnipError::Validation`] if the sensor or output is missing
    /// or the threshold is not finite.
    pub fn build(self) -> Result<Rule, TurnipError> {
        let rule = Rule {
            sensor: self.sensor.unwrap_or_default(),
            threshold: self.threshold.unwrap_or_default(),
            comparison: self.comparison.unwrap_or_default(),
            interval: self.interval.unwrap_or_default(),
            immediate: self.immediate.unwrap_or(true),
            reset_when_negative: self.reset_when_negative.unwrap_or(false),
            action: Action {
                output: self.output.unwrap_or_default(),
                state: self.state.unwrap_or(OutputState::On),
            },
        };
        rule.validate()?;
        Ok(rule)
    }
}

/// Serialized shape of a `[[rules]]` entry, before validation.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleConfig {
    sensor: Option<String>,
    #[serde(default)]
    threshold: f64,
    #[serde(default)]
    comparison: Comparison,
    #[serde(default)]
    interval: Interval,
    #[serde(default = "default_immediate")]
    immediate: bool,
    #[serde(default, alias = "resetWhenNegative")]
    reset_when_negative: bool,
    action: Action,
}

fn default_immediate() -> bool {
    true
}

impl TryFrom<RuleConfig> for Rule {
    type Error = ValidationError;

    fn try_from(config: RuleConfig) -> Result<Self, Self::Error> {
        let sensor = config.sensor.ok_or(ValidationError::MissingSensor)?;
        let rule = Rule {
            sensor,
            threshold: config.threshold,
            comparison: config.comparison,
            interval: config.interval,
            immediate: config.immediate,
            reset_when_negative: config.reset_when_negative,
            action: config.action,
        };
        rule.check()?;
        Ok(rule)
    }
}
