//! Application state management for the exporter.
//!
//! This module defines the shared application state that is passed
//! to HTTP handlers. Handlers only read from it.

use herakles_host_exporter::{CollectorTelemetry, SnapshotStore};
use std::sync::Arc;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Global application state shared across requests.
pub struct AppState {
    /// Latest published sample, written by the sampling thread.
    pub store: Arc<SnapshotStore>,
    /// Collector self-telemetry, present when enabled in the configuration.
    pub telemetry: Option<CollectorTelemetry>,
}
