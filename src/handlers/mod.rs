//! HTTP endpoint handlers for the exporter.
//!
//! This module provides handlers for all HTTP endpoints:
//! - `/metrics`: Prometheus metrics endpoint
//! - `/healthz`: Liveness probe
//! - everything else: 404

pub mod health;
pub mod metrics;

use axum::{http::StatusCode, response::IntoResponse};

// Re-export handlers
pub use health::healthz_handler;
pub use metrics::metrics_handler;

/// Fallback for unknown paths and unsupported methods.
pub async fn not_found_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        [("Content-Type", "text/plain")],
        "Not found\n",
    )
}
