//! Port definitions: traits that adapters implement or consume.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod control;
pub mod device;
pub mod reporting;

pub use control::ControlPort;
pub use device::{Output, Sensor};
pub use reporting::{OutputSnapshot, Reading, ReportingPort, SensorSnapshot};
