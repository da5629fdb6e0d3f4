//! Reporting port: read-only snapshots consumed by outer surfaces.

use serde::Serialize;

use turnip_domain::output_state::OutputState;
use turnip_domain::time::Timestamp;

/// The last successful reading of a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reading {
    pub value: f64,
    pub updated_at: Timestamp,
}

/// Point-in-time view of one sensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorSnapshot {
    pub name: String,
    pub driver: String,
    /// `None` until the first successful read.
    pub reading: Option<Reading>,
}

/// Point-in-time view of one output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputSnapshot {
    pub name: String,
    pub driver: String,
    /// `None` while the state is unknown.
    pub state: Option<OutputState>,
}

/// Stable, enumerable snapshots in configuration order.
///
/// Entries skipped during setup (unresolvable driver, failed
/// initialization) never appear.
pub trait ReportingPort: Send + Sync {
    fn outputs(&self) -> Vec<OutputSnapshot>;

    fn sensors(&self) -> Vec<SensorSnapshot>;
}

impl<T: ReportingPort> ReportingPort for std::sync::Arc<T> {
    fn outputs(&self) -> Vec<OutputSnapshot> {
        (**self).outputs()
    }

    fn sensors(&self) -> Vec<SensorSnapshot> {
        (**self).sensors()
    }
}
