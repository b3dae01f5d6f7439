//! Self-telemetry of the sampling loop.
//!
//! These series describe the collector itself (how often it ticked, how often a
//! source failed, how long a tick took). They live in their own registry and are
//! appended after the host families when telemetry is enabled.

use prometheus::{Encoder, Gauge, IntCounter, Registry, TextEncoder};

use crate::snapshot::Snapshot;

/// Prometheus series describing the sampling loop.
#[derive(Clone)]
pub struct CollectorTelemetry {
    registry: Registry,
    pub ticks_total: IntCounter,
    pub cpu_read_failures_total: IntCounter,
    pub mem_read_failures_total: IntCounter,
    pub tick_duration_seconds: Gauge,
}

impl CollectorTelemetry {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let ticks_total = IntCounter::new(
            "collector_ticks_total",
            "Sampling ticks performed by the collector",
        )?;
        let cpu_read_failures_total = IntCounter::new(
            "collector_cpu_read_failures_total",
            "Ticks on which no usable CPU value was produced",
        )?;
        let mem_read_failures_total = IntCounter::new(
            "collector_mem_read_failures_total",
            "Ticks on which no usable memory value was produced",
        )?;
        let tick_duration_seconds = Gauge::new(
            "collector_tick_duration_seconds",
            "Time spent in the most recent sampling tick",
        )?;

        registry.register(Box::new(ticks_total.clone()))?;
        registry.register(Box::new(cpu_read_failures_total.clone()))?;
        registry.register(Box::new(mem_read_failures_total.clone()))?;
        registry.register(Box::new(tick_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            ticks_total,
            cpu_read_failures_total,
            mem_read_failures_total,
            tick_duration_seconds,
        })
    }

    /// Records the outcome of one tick.
    pub fn record_tick(&self, snapshot: &Snapshot, duration_seconds: f64) {
        self.ticks_total.inc();
        if !snapshot.cpu_read_ok {
            self.cpu_read_failures_total.inc();
        }
        if !snapshot.mem_read_ok {
            self.mem_read_failures_total.inc();
        }
        self.tick_duration_seconds.set(duration_seconds);
    }

    /// Encodes all telemetry series in the Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::with_capacity(1024);
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
