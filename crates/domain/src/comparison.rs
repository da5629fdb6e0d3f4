//! Comparison: how a sensor reading is compared to a rule threshold.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Comparison operator applied as `reading <op> threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    #[default]
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl Comparison {
    /// Evaluate `reading <op> threshold`.
    ///
    /// `Eq` is exact equality: readings are already rounded by their drivers.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn matches(self, reading: f64, threshold: f64) -> bool {
        match self {
            Self::Eq => reading == threshold,
            Self::Lt => reading < threshold,
            Self::Lte => reading <= threshold,
            Self::Gt => reading > threshold,
            Self::Gte => reading >= threshold,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Gt => "gt",
            Self::Gte => "gte",
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Comparison {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eq" => Ok(Self::Eq),
            "lt" => Ok(Self::Lt),
            "lte" => Ok(Self::Lte),
            "gt" => Ok(Self::Gt),
            "gte" => Ok(Self::Gte),
            other => Err(ValidationError::InvalidComparison(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_match_gte_when_reading_is_above_or_equal() {
        assert!(Comparison::Gte.matches(80.0, 75.0));
        assert!(Comparison::Gte.matches(75.0, 75.0));
        assert!(!Comparison::Gte.matches(70.0, 75.0));
    }

    #[test]
    fn should_match_strict_operators_only_when_strict() {
        assert!(Comparison::Gt.matches(75.1, 75.0));
        assert!(!Comparison::Gt.matches(75.0, 75.0));
        assert!(Comparison::Lt.matches(74.9, 75.0));
        assert!(!Comparison::Lt.matches(75.0, 75.0));
        assert!(Comparison::Lte.matches(75.0, 75.0));
    }

    #[test]
    fn should_match_eq_only_on_exact_value() {
        assert!(Comparison::Eq.matches(21.5, 21.5));
        assert!(!Comparison::Eq.matches(21.51, 21.5));
    }

    #[test]
    fn should_parse_every_operator() {
        for op in ["eq", "lt", "lte", "gt", "gte"] {
            let parsed: Comparison = op.parse().unwrap();
            assert_eq!(parsed.to_string(), op);
        }
    }

    #[test]
    fn should_reject_unknown_operator() {
        let err = "ne".parse::<Comparison>().unwrap_err();
        assert_eq!(err, ValidationError::InvalidComparison("ne".to_string()));
    }

    #[test]
    fn should_reject_unknown_operator_when_deserializing() {
        let result: Result<Comparison, _> = serde_json::from_str("\"between\"");
        assert!(result.is_err());
    }
}
