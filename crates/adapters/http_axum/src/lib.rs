//! # turnip-adapter-http-axum
//!
//! Read-only HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Routes
//! - `GET /`, `GET /health`: liveness, answers `OK`
//! - `GET /outputs`: `{"<name>": <state> | null}`
//! - `GET /sensors`: `{"<name>": {"value": .., "updated_at": ..} | null}`
//!
//! Nothing here drives the daemon; control stays on the Unix socket.
//!
//! ## Dependency rule
//! Depends on `turnip-app` (for the reporting port) and `turnip-domain`
//! (for the serialized state types). Never leaks axum types into the domain.

#[allow(clippy::missing_errors_doc)]
pub mod api;
pub mod router;
