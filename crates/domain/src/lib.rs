//! # turnip-domain
//!
//! Pure domain model for the turnip sensor/rule/output daemon.
//!
//! ## Responsibilities
//! - Foundational types: error taxonomy, timestamps
//! - Define **Rules** (sensor reading compared to a threshold, bound to an
//!   output action and a polling interval)
//! - Define **Comparisons**, **Intervals** and **Output states** as value
//!   objects with their parsing rules
//! - Define the configuration **Manifest** (sensors, outputs, rules) and its
//!   validation
//! - Define **Events** (state-change notifications)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod time;

pub mod comparison;
pub mod driver;
pub mod event;
pub mod interval;
pub mod manifest;
pub mod output_state;
pub mod rule;
