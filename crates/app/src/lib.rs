//! # turnip-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define the **capability ports** drivers implement:
//!   - `Sensor`: asynchronous readiness + numeric reads
//!   - `Output`: asynchronous readiness, `set_state`, `reset`
//! - Define the **driving ports** used by outer surfaces:
//!   - `ReportingPort`: stable snapshots of outputs and sensors
//!   - `ControlPort`: lifecycle and manual override operations
//! - Resolve driver names to constructors (`DriverRegistry`)
//! - Group rules by interval and evaluate them per tick (`engine`)
//! - Own the timers and the start/pause/stop lifecycle (`App`)
//! - Implement the transport-agnostic control protocol (`control`)
//! - Provide **in-process infrastructure** (event bus) that doesn't need IO
//!
//! ## Concurrency
//! Every interval owns an independent timer task. Ticks of different
//! intervals are not serialized against each other: two rules on different
//! intervals targeting the same output race, and the last `set_state` wins.
//! Within one tick, sensor reads run concurrently and rules are evaluated
//! strictly in configuration order, so the last matching rule of a group
//! wins. Each device instance sits behind its own async mutex, so a single
//! driver call is never interleaved with another call on the same device.
//!
//! ## Dependency rule
//! Depends on `turnip-domain` only (plus `tokio` for timers and channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod app;
pub mod control;
pub mod devices;
pub mod engine;
pub mod event_bus;
pub mod ports;
pub mod registry;

#[cfg(test)]
mod testing;

pub use app::App;
