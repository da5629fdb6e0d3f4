//! Axum router assembly.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use turnip_app::ports::ReportingPort;

/// Build the top-level axum [`Router`] over a reporting port.
///
/// Includes a [`TraceLayer`] that logs each HTTP request/response at the
/// `DEBUG` level using the `tracing` ecosystem.
pub fn build<R>(port: R) -> Router
where
    R: ReportingPort + 'static,
{
    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/outputs", get(crate::api::outputs::<R>))
        .route("/sensors", get(crate::api::sensors::<R>))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(port))
}

async fn health_check() -> &'static str {
    "OK"
}
