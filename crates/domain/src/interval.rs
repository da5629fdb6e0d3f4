//! Interval: polling period of a rule, parsed from strings such as `"60s"`.
//!
//! Accepted units are `ms`, `s`, `m`, `h` and `d`. The amount may be
//! fractional (`"1.5m"`); a bare number is read as milliseconds.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A strictly positive polling period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawInterval", into = "String")]
pub struct Interval(Duration);

impl Interval {
    /// Wrap a duration.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ZeroInterval`] for a zero duration.
    pub fn new(duration: Duration) -> Result<Self, ValidationError> {
        if duration.is_zero() {
            return Err(ValidationError::ZeroInterval);
        }
        Ok(Self(duration))
    }

    #[must_use]
    pub fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs.max(1)))
    }

    #[must_use]
    pub fn as_duration(self) -> Duration {
        self.0
    }
}

impl Default for Interval {
    fn default() -> Self {
        Self(Duration::from_secs(60))
    }
}

impl FromStr for Interval {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidInterval(s.to_string());
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| c.is_ascii_alphabetic())
            .unwrap_or(trimmed.len());
        let (amount, unit) = trimmed.split_at(split);
        let amount: f64 = amount.trim().parse().map_err(|_| invalid())?;
        if !amount.is_finite() || amount < 0.0 {
            return Err(invalid());
        }
        let millis_per_unit = match unit.trim().to_ascii_lowercase().as_str() {
            "" | "ms" => 1.0,
            "s" => 1_000.0,
            "m" => 60_000.0,
            "h" => 3_600_000.0,
            "d" => 86_400_000.0,
            _ => return Err(invalid()),
        };
        let duration = Duration::try_from_secs_f64(amount * millis_per_unit / 1_000.0)
            .map_err(|_| invalid())?;
        Self::new(duration)
    }
}

/// Configuration value: `interval = "30s"` or `interval = 500` (milliseconds).
#[derive(Deserialize)]
#[serde(untagged)]
enum RawInterval {
    Millis(u64),
    Text(String),
}

impl TryFrom<RawInterval> for Interval {
    type Error = ValidationError;

    fn try_from(value: RawInterval) -> Result<Self, Self::Error> {
        match value {
            RawInterval::Millis(millis) => Self::new(Duration::from_millis(millis)),
            RawInterval::Text(text) => text.parse(),
        }
    }
}

impl From<Interval> for String {
    fn from(value: Interval) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let millis = self.0.as_millis();
        if millis % 1_000 == 0 {
            write!(f, "{}s", millis / 1_000)
        } else {
            write!(f, "{millis}ms")
        }
    }
}
