//! Herakles Host Exporter Library
//!
//! This library provides the sampling core of the exporter: it reads host CPU
//! and memory counters from `/proc`, derives utilization percentages and
//! publishes the latest result for lock-safe concurrent reads. It is transport
//! agnostic; the binary wraps it in an HTTP server, but any caller can poll the
//! [`SnapshotStore`] directly.
//!
//! # Features
//!
//! - **Delta-based CPU usage**: busy percentage between consecutive ticks
//! - **Read-health flags**: failed reads degrade a value to `0.0` instead of erroring
//! - **Single writer, many readers**: readers always get a whole snapshot copy
//! - **Cooperative shutdown**: an explicit [`CancellationToken`] stops the loop
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use herakles_host_exporter::{CancellationToken, Sampler, Scheduler, SnapshotStore};
//!
//! let store = Arc::new(SnapshotStore::new());
//! let scheduler = Scheduler::new(
//!     Sampler::from_proc("/proc"),
//!     store.clone(),
//!     Duration::from_secs(1),
//!     CancellationToken::new(),
//! );
//!
//! scheduler.start().expect("failed to start sampler");
//! std::thread::sleep(Duration::from_secs(2));
//! print!("{}", store.render_exposition());
//! scheduler.stop();
//! ```

pub mod sampler;
pub mod scheduler;
pub mod snapshot;
pub mod system;
pub mod telemetry;

// Re-export main types for convenience
pub use sampler::{memory_percent, CounterSource, CpuReading, ProcSource, Sampler};
pub use scheduler::{
    resolve_interval, CancellationToken, Scheduler, DEFAULT_INTERVAL_MS, MAX_INTERVAL_MS,
    MIN_INTERVAL_MS,
};
pub use snapshot::{Snapshot, SnapshotStore, EXPOSITION_CONTENT_TYPE};
pub use system::{CpuTimes, MemInfo, SourceError, DEFAULT_PROC_ROOT};
pub use telemetry::CollectorTelemetry;
