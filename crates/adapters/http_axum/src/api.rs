//! JSON snapshot handlers.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::State;

use turnip_app::ports::{Reading, ReportingPort};
use turnip_domain::output_state::OutputState;

/// `GET /outputs`: every output with its current state, `null` while
/// unknown.
pub async fn outputs<R: ReportingPort>(
    State(port): State<Arc<R>>,
) -> Json<BTreeMap<String, Option<OutputState>>> {
    Json(
        port.outputs()
            .into_iter()
            .map(|snapshot| (snapshot.name, snapshot.state))
            .collect(),
    )
}

/// `GET /sensors`: every sensor with its last reading, `null` until the
/// first successful read.
pub async fn sensors<R: ReportingPort>(
    State(port): State<Arc<R>>,
) -> Json<BTreeMap<String, Option<Reading>>> {
    Json(
        port.sensors()
            .into_iter()
            .map(|snapshot| (snapshot.name, snapshot.reading))
            .collect(),
    )
}
