//! # turnip-adapter-control-unix
//!
//! The daemon's control endpoint: a Unix domain socket speaking the
//! line protocol of [`turnip_app::control`].
//!
//! Binding reclaims a socket left behind by a crashed instance but
//! refuses to start next to a live one. Every connection gets its own
//! session, so one-shot commands and console sessions can run side by
//! side.
//!
//! ## Dependency rule
//!
//! Depends on `turnip-app` only; the port it drives is supplied by the
//! binary.

mod bind;
mod error;
mod server;

pub use bind::bind;
pub use error::ControlError;
pub use server::ControlServer;
