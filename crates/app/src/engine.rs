//! Rule engine: groups rules by interval and evaluates one group per tick.
//!
//! A tick:
//! 1. reads every distinct sensor referenced by the group exactly once,
//!    concurrently, tolerating individual failures;
//! 2. walks the group's rules in configuration order: a match drives the
//!    action's output to the target state, a miss resets the output when
//!    `reset_when_negative` is set, otherwise nothing happens.
//!
//! A rule whose sensor failed to read is skipped for this tick and is
//! naturally retried on the next one. Output failures are logged and the
//! tick moves on to the next rule. When several rules of one group target
//! the same output, the last matching rule wins.

use std::collections::HashMap;

use futures::future::join_all;
use turnip_domain::interval::Interval;
use turnip_domain::rule::Rule;

use crate::devices::Devices;

/// Rules sharing one polling interval, in configuration order.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleGroup {
    interval: Interval,
    rules: Vec<Rule>,
}

impl RuleGroup {
    #[must_use]
    pub fn interval(&self) -> Interval {
        self.interval
    }

    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Distinct sensor names referenced by the group, in first-use order.
    #[must_use]
    pub fn sensor_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for rule in &self.rules {
            if !names.contains(&rule.sensor.as_str()) {
                names.push(&rule.sensor);
            }
        }
        names
    }

    /// The subset of rules flagged `immediate`, or `None` if there are none.
    #[must_use]
    pub fn immediate(&self) -> Option<Self> {
        let rules: Vec<Rule> = self.rules.iter().filter(|r| r.immediate).cloned().collect();
        if rules.is_empty() {
            return None;
        }
        Some(Self {
            interval: self.interval,
            rules,
        })
    }
}

/// The rules-by-interval grouping, built once from the rule list.
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    groups: Vec<RuleGroup>,
}

impl RuleEngine {
    /// Group `rules` by interval. Groups appear in order of the first rule
    /// using each interval; rules keep their configuration order.
    #[must_use]
    pub fn new(rules: &[Rule]) -> Self {
        let mut groups: Vec<RuleGroup> = Vec::new();
        for rule in rules {
            match groups.iter_mut().find(|g| g.interval == rule.interval) {
                Some(group) => group.rules.push(rule.clone()),
                None => groups.push(RuleGroup {
                    interval: rule.interval,
                    rules: vec![rule.clone()],
                }),
            }
        }
        Self { groups }
    }

    #[must_use]
    pub fn groups(&self) -> &[RuleGroup] {
        &self.groups
    }
}

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Sensors read successfully, with their value.
    pub readings: Vec<(String, f64)>,
    /// Sensors whose read failed (or that are not available).
    pub failed_sensors: Vec<String>,
    /// Outputs driven by a matching rule.
    pub applied: usize,
    /// Outputs reset by a non-matching rule.
    pub resets: usize,
    /// Rules skipped because their reading is missing.
    pub skipped: usize,
    /// Output writes that failed.
    pub write_failures: usize,
}

/// Run one tick of `group` against `devices`.
pub async fn run_tick(group: &RuleGroup, devices: &Devices) -> TickReport {
    let names = group.sensor_names();
    let results = join_all(names.iter().map(|name| devices.read_sensor(name))).await;

    let mut report = TickReport::default();
    let mut readings: HashMap<&str, f64> = HashMap::with_capacity(names.len());
    for (name, result) in names.into_iter().zip(results) {
        match result {
            Ok(value) => {
                readings.insert(name, value);
                report.readings.push((name.to_string(), value));
            }
            Err(err) => {
                tracing::warn!(sensor = name, error = %err.describe(), "sensor read failed");
                report.failed_sensors.push(name.to_string());
            }
        }
    }

    for rule in &group.rules {
        let Some(&reading) = readings.get(rule.sensor.as_str()) else {
            report.skipped += 1;
            continue;
        };

        let output = &rule.action.output;
        let outcome = if rule.matches(reading) {
            tracing::debug!(
                sensor = %rule.sensor,
                reading,
                comparison = %rule.comparison,
                threshold = rule.threshold,
                output = %output,
                state = %rule.action.state,
                "rule matched"
            );
            report.applied += 1;
            devices.set_output(output, &rule.action.state).await
        } else if rule.reset_when_negative {
            report.resets += 1;
            devices.reset_output(output).await
        } else {
            continue;
        };

        if let Err(err) = outcome {
            report.write_failures += 1;
            tracing::error!(output = %output, error = %err.describe(), "output write failed");
        }
    }

    report
}
