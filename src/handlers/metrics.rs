//! Metrics endpoint handler for Prometheus scraping.
//!
//! This module provides the `/metrics` endpoint handler. It never triggers a
//! collection itself: it copies the latest snapshot published by the sampling
//! thread and renders it, optionally followed by the collector telemetry.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use herakles_host_exporter::EXPOSITION_CONTENT_TYPE;
use std::time::Instant;
use tracing::{debug, error, instrument};

use crate::state::SharedState;

/// Error type for metrics endpoint failures.
#[derive(Debug)]
pub enum MetricsError {
    EncodingFailed,
}

impl IntoResponse for MetricsError {
    fn into_response(self) -> axum::response::Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to encode metrics",
        )
            .into_response()
    }
}

/// Handler for the /metrics endpoint.
#[instrument(skip(state))]
pub async fn metrics_handler(
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, MetricsError> {
    let start = Instant::now();
    debug!("Processing /metrics request");

    let mut body = state.store.render_exposition();

    if let Some(telemetry) = &state.telemetry {
        let encoded = telemetry.render().map_err(|e| {
            error!("Failed to encode collector telemetry: {}", e);
            MetricsError::EncodingFailed
        })?;
        body.push_str(&encoded);
    }

    debug!(
        "Served /metrics ({} bytes) in {:.3}ms",
        body.len(),
        start.elapsed().as_secs_f64() * 1000.0
    );

    Ok((
        StatusCode::OK,
        [("Content-Type", EXPOSITION_CONTENT_TYPE)],
        body,
    ))
}
