//! Latest-sample storage shared between the sampling thread and readers.
//!
//! The store holds exactly one [`Snapshot`] behind a lock. The sampling thread
//! replaces it as a whole value; readers only ever receive copies, so a reader
//! can never observe fields from two different ticks.

use serde::Serialize;
use std::fmt::Write as FmtWrite;
use std::sync::{PoisonError, RwLock};

/// Content type of the exposition document.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Result of one sampling tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Snapshot {
    /// Host CPU busy percentage over the last interval, in [0, 100].
    pub cpu_percent: f64,
    /// Host memory in use as a percentage of MemTotal, in [0, 100].
    pub mem_percent: f64,
    /// Number of ticks performed by the sampler.
    pub uptime_seconds: u64,
    pub cpu_read_ok: bool,
    pub mem_read_ok: bool,
}

impl Snapshot {
    /// True when both sources produced a usable value on the last tick.
    pub fn collector_up(&self) -> bool {
        self.cpu_read_ok && self.mem_read_ok
    }

    /// Renders this snapshot as a Prometheus text exposition document.
    ///
    /// Family order and names are fixed; floats use two fractional digits.
    pub fn render_exposition(&self) -> String {
        let mut out = String::with_capacity(512);
        write_family(
            &mut out,
            "cpu_usage",
            "Host CPU utilization in percent",
            "gauge",
            format_args!("{:.2}", self.cpu_percent),
        );
        write_family(
            &mut out,
            "mem_usage",
            "Host memory utilization in percent",
            "gauge",
            format_args!("{:.2}", self.mem_percent),
        );
        write_family(
            &mut out,
            "uptime_seconds",
            "Sampling ticks completed since the collector started",
            "counter",
            format_args!("{}", self.uptime_seconds),
        );
        write_family(
            &mut out,
            "collector_up",
            "1 if the last CPU and memory reads both succeeded",
            "gauge",
            format_args!("{}", u8::from(self.collector_up())),
        );
        out
    }
}

fn write_family(
    out: &mut String,
    name: &str,
    help: &str,
    kind: &str,
    value: std::fmt::Arguments<'_>,
) {
    writeln!(out, "# HELP {} {}", name, help).ok();
    writeln!(out, "# TYPE {} {}", name, kind).ok();
    writeln!(out, "{} {}", name, value).ok();
}

/// Thread-safe holder of the current [`Snapshot`].
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: RwLock<Snapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current snapshot.
    pub fn publish(&self, snapshot: Snapshot) {
        // A poisoned lock still holds a whole Snapshot: assignment of a Copy
        // value cannot be observed half-done.
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = snapshot;
    }

    /// Returns a copy of the current snapshot.
    pub fn current(&self) -> Snapshot {
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Renders the current snapshot; formatting happens outside the lock.
    pub fn render_exposition(&self) -> String {
        self.current().render_exposition()
    }
}
