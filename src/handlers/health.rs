//! Liveness probe handler.

use axum::{http::StatusCode, response::IntoResponse};
use tracing::{debug, instrument};

/// Handler for the /healthz endpoint.
///
/// Reports process liveness only; sampling health is exposed as `collector_up`.
#[instrument]
pub async fn healthz_handler() -> impl IntoResponse {
    debug!("Processing /healthz request");
    (StatusCode::OK, [("Content-Type", "text/plain")], "ok")
}
