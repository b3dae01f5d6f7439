//! Host utilization sampler.
//!
//! The sampler reads the CPU and memory counter sources once per tick and turns
//! them into a [`Snapshot`]. CPU usage is a rate, so it is derived from the delta
//! between the current reading and the one taken on the previous tick.
//!
//! Read failures never escape `tick()`: they are reported through the
//! `cpu_read_ok` / `mem_read_ok` flags of the produced snapshot, with the metric
//! value degraded to `0.0` for that cycle.

use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::snapshot::Snapshot;
use crate::system::{self, CpuTimes, MemInfo, SourceError, DEFAULT_PROC_ROOT};

/// Source of raw host counters queried on every tick.
pub trait CounterSource: Send {
    fn read_cpu_times(&mut self) -> Result<CpuTimes, SourceError>;
    fn read_mem_info(&mut self) -> Result<MemInfo, SourceError>;
}

/// Counter source backed by a proc filesystem mount.
#[derive(Debug, Clone)]
pub struct ProcSource {
    root: PathBuf,
}

impl ProcSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

impl Default for ProcSource {
    fn default() -> Self {
        Self::new(DEFAULT_PROC_ROOT)
    }
}

impl CounterSource for ProcSource {
    fn read_cpu_times(&mut self) -> Result<CpuTimes, SourceError> {
        system::read_cpu_times(&self.root)
    }

    fn read_mem_info(&mut self) -> Result<MemInfo, SourceError> {
        system::read_mem_info(&self.root)
    }
}

/// Outcome of feeding one CPU reading into the delta state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CpuReading {
    /// First reading after construction or after a failed read; no rate yet.
    Baseline,
    /// No accounting ticks elapsed since the previous reading.
    NoElapsedTicks,
    /// Busy percentage over the interval, clamped to [0, 100].
    Usage(f64),
}

/// Cross-tick baseline for CPU delta computation.
#[derive(Debug, Clone, Copy, Default)]
struct CpuDeltaState {
    previous_idle_ticks: u64,
    previous_total_ticks: u64,
    has_prior_sample: bool,
}

impl CpuDeltaState {
    /// Computes the reading against the stored baseline and replaces the
    /// baseline with `(idle, total)` unconditionally.
    fn advance(&mut self, idle: u64, total: u64) -> CpuReading {
        let previous = *self;
        self.previous_idle_ticks = idle;
        self.previous_total_ticks = total;
        self.has_prior_sample = true;

        if !previous.has_prior_sample {
            return CpuReading::Baseline;
        }

        // Signed deltas: counters can go backwards across a reset.
        let idle_delta = i128::from(idle) - i128::from(previous.previous_idle_ticks);
        let total_delta = i128::from(total) - i128::from(previous.previous_total_ticks);

        if total_delta == 0 {
            return CpuReading::NoElapsedTicks;
        }

        let usage = 100.0 * (1.0 - idle_delta as f64 / total_delta as f64);
        CpuReading::Usage(usage.clamp(0.0, 100.0))
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Memory utilization percentage, or `None` when the total is zero.
pub fn memory_percent(mem: &MemInfo) -> Option<f64> {
    if mem.total_kb == 0 {
        return None;
    }
    // Computed in floating point so available > total cannot underflow.
    let used = mem.total_kb as f64 - mem.available_kb as f64;
    Some((100.0 * used / mem.total_kb as f64).clamp(0.0, 100.0))
}

/// Produces one [`Snapshot`] per tick from a [`CounterSource`].
pub struct Sampler<S = ProcSource> {
    source: S,
    cpu_state: CpuDeltaState,
    uptime_seconds: u64,
    last: Snapshot,
}

impl Sampler<ProcSource> {
    /// Creates a sampler reading from the proc filesystem mounted at `proc_root`.
    pub fn from_proc(proc_root: impl Into<PathBuf>) -> Self {
        Self::new(ProcSource::new(proc_root))
    }
}

impl<S: CounterSource> Sampler<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cpu_state: CpuDeltaState::default(),
            uptime_seconds: 0,
            last: Snapshot::default(),
        }
    }

    /// Current CPU baseline as `(idle_ticks, total_ticks)`, if one exists.
    pub fn cpu_baseline(&self) -> Option<(u64, u64)> {
        self.cpu_state
            .has_prior_sample
            .then_some((self.cpu_state.previous_idle_ticks, self.cpu_state.previous_total_ticks))
    }

    /// The snapshot produced by the most recent tick.
    pub fn last_snapshot(&self) -> Snapshot {
        self.last
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Performs one sampling step.
    pub fn tick(&mut self) -> Snapshot {
        let (cpu_percent, cpu_read_ok) = self.sample_cpu();
        let (mem_percent, mem_read_ok) = self.sample_memory();
        self.uptime_seconds += 1;

        let snapshot = Snapshot {
            cpu_percent,
            mem_percent,
            uptime_seconds: self.uptime_seconds,
            cpu_read_ok,
            mem_read_ok,
        };

        self.log_health_transitions(&snapshot);
        debug!(
            "Tick {}: cpu={:.2}% (ok={}), mem={:.2}% (ok={})",
            snapshot.uptime_seconds, cpu_percent, cpu_read_ok, mem_percent, mem_read_ok
        );

        self.last = snapshot;
        snapshot
    }

    fn sample_cpu(&mut self) -> (f64, bool) {
        let times = match self.source.read_cpu_times() {
            Ok(times) => times,
            Err(e) => {
                debug!("CPU read failed: {}", e);
                self.cpu_state.clear();
                return (0.0, false);
            }
        };

        match self.cpu_state.advance(times.idle_total(), times.total()) {
            CpuReading::Baseline => {
                debug!("CPU baseline established (total={} ticks)", times.total());
                (0.0, true)
            }
            CpuReading::NoElapsedTicks => {
                debug!("No CPU ticks elapsed since previous sample");
                (0.0, false)
            }
            CpuReading::Usage(usage) => (usage, true),
        }
    }

    fn sample_memory(&mut self) -> (f64, bool) {
        match self.source.read_mem_info() {
            Ok(mem) => match memory_percent(&mem) {
                Some(percent) => (percent, true),
                None => {
                    debug!("MemTotal reported as zero");
                    (0.0, false)
                }
            },
            Err(e) => {
                debug!("Memory read failed: {}", e);
                (0.0, false)
            }
        }
    }

    fn log_health_transitions(&self, current: &Snapshot) {
        // The first tick has no meaningful predecessor.
        if self.uptime_seconds == 1 {
            if !current.cpu_read_ok {
                warn!("CPU counters unavailable on first sample");
            }
            if !current.mem_read_ok {
                warn!("Memory counters unavailable on first sample");
            }
            return;
        }

        match (self.last.cpu_read_ok, current.cpu_read_ok) {
            (true, false) => warn!("CPU sampling degraded, reporting 0.0 until next good read"),
            (false, true) => info!("CPU sampling recovered"),
            _ => {}
        }
        match (self.last.mem_read_ok, current.mem_read_ok) {
            (true, false) => warn!("Memory sampling degraded, reporting 0.0 until next good read"),
            (false, true) => info!("Memory sampling recovered"),
            _ => {}
        }
    }
}
