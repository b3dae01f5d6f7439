//! Integration tests for the sampler's per-tick semantics.
//!
//! A scripted counter source replays a fixed sequence of readings so every
//! branch of the CPU delta and memory computation can be driven directly.

use herakles_host_exporter::{CounterSource, CpuTimes, MemInfo, Sampler, SourceError};
use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;

type CpuStep = Result<CpuTimes, SourceError>;
type MemStep = Result<MemInfo, SourceError>;

/// Counter source that replays queued readings, one per tick.
#[derive(Default)]
struct ScriptedSource {
    cpu: VecDeque<CpuStep>,
    mem: VecDeque<MemStep>,
}

impl ScriptedSource {
    fn cpu(mut self, step: CpuStep) -> Self {
        self.cpu.push_back(step);
        self
    }

    fn mem(mut self, step: MemStep) -> Self {
        self.mem.push_back(step);
        self
    }
}

impl CounterSource for ScriptedSource {
    fn read_cpu_times(&mut self) -> Result<CpuTimes, SourceError> {
        self.cpu.pop_front().unwrap_or_else(|| Err(unavailable("stat")))
    }

    fn read_mem_info(&mut self) -> Result<MemInfo, SourceError> {
        self.mem.pop_front().unwrap_or_else(|| Err(unavailable("meminfo")))
    }
}

/// CPU reading whose idle total is `idle` and whose grand total is `total`.
fn cpu(idle: u64, total: u64) -> CpuStep {
    Ok(CpuTimes {
        user: total - idle,
        idle,
        ..CpuTimes::default()
    })
}

fn mem(total_kb: u64, available_kb: u64) -> MemStep {
    Ok(MemInfo {
        total_kb,
        available_kb,
    })
}

fn unavailable(file: &str) -> SourceError {
    SourceError::Unavailable {
        path: PathBuf::from("/proc").join(file),
        source: io::Error::new(io::ErrorKind::NotFound, "gone"),
    }
}

fn malformed(file: &str) -> SourceError {
    SourceError::Malformed {
        path: PathBuf::from("/proc").join(file),
        reason: "truncated".into(),
    }
}

#[test]
fn test_first_sample_reports_zero_cpu_with_ok() {
    let source = ScriptedSource::default()
        .cpu(cpu(100, 200))
        .mem(mem(1000, 400));
    let mut sampler = Sampler::new(source);

    let snap = sampler.tick();
    assert_eq!(snap.cpu_percent, 0.0);
    assert!(snap.cpu_read_ok);
    assert_eq!(snap.mem_percent, 60.0);
    assert!(snap.mem_read_ok);
    assert_eq!(snap.uptime_seconds, 1);
    assert_eq!(sampler.cpu_baseline(), Some((100, 200)));
}

#[test]
fn test_cpu_usage_from_delta() {
    let source = ScriptedSource::default()
        .cpu(cpu(100, 200))
        .cpu(cpu(150, 300))
        .mem(mem(1000, 400))
        .mem(mem(1000, 400));
    let mut sampler = Sampler::new(source);

    sampler.tick();
    let snap = sampler.tick();
    assert_eq!(snap.cpu_percent, 50.0);
    assert!(snap.cpu_read_ok);
    assert_eq!(sampler.cpu_baseline(), Some((150, 300)));
}

#[test]
fn test_zero_delta_degrades_cpu_and_moves_baseline() {
    let source = ScriptedSource::default()
        .cpu(cpu(100, 200))
        .cpu(cpu(100, 200))
        .cpu(cpu(100, 300))
        .mem(mem(1000, 400))
        .mem(mem(1000, 400))
        .mem(mem(1000, 400));
    let mut sampler = Sampler::new(source);

    sampler.tick();
    let stalled = sampler.tick();
    assert_eq!(stalled.cpu_percent, 0.0);
    assert!(!stalled.cpu_read_ok);
    assert!(stalled.mem_read_ok);
    assert!(!stalled.collector_up());

    // The flag is not sticky: the next good delta recovers.
    let recovered = sampler.tick();
    assert_eq!(recovered.cpu_percent, 100.0);
    assert!(recovered.cpu_read_ok);
    assert!(recovered.collector_up());
}

#[test]
fn test_counter_regression_is_clamped() {
    let source = ScriptedSource::default()
        .cpu(cpu(1_000, 2_000))
        .cpu(cpu(1_100, 1_500))
        .mem(mem(1000, 400))
        .mem(mem(1000, 400));
    let mut sampler = Sampler::new(source);

    sampler.tick();
    // idle grew while total shrank: the raw ratio is 120%
    let snap = sampler.tick();
    assert_eq!(snap.cpu_percent, 100.0);
    assert!(snap.cpu_read_ok);
}

#[test]
fn test_failed_cpu_read_clears_baseline() {
    let source = ScriptedSource::default()
        .cpu(cpu(100, 200))
        .cpu(Err(malformed("stat")))
        .cpu(cpu(150, 300))
        .mem(mem(1000, 400))
        .mem(mem(1000, 400))
        .mem(mem(1000, 400));
    let mut sampler = Sampler::new(source);

    sampler.tick();
    let failed = sampler.tick();
    assert_eq!(failed.cpu_percent, 0.0);
    assert!(!failed.cpu_read_ok);
    assert_eq!(sampler.cpu_baseline(), None);

    // Treated as a fresh first sample, not a delta against the stale baseline.
    let rebased = sampler.tick();
    assert_eq!(rebased.cpu_percent, 0.0);
    assert!(rebased.cpu_read_ok);
    assert_eq!(sampler.cpu_baseline(), Some((150, 300)));
}

#[test]
fn test_memory_failures_degrade_independently() {
    let source = ScriptedSource::default()
        .cpu(cpu(100, 200))
        .cpu(cpu(150, 300))
        .cpu(cpu(200, 400))
        .mem(Err(unavailable("meminfo")))
        .mem(mem(0, 0))
        .mem(mem(2000, 500));
    let mut sampler = Sampler::new(source);

    let missing = sampler.tick();
    assert_eq!(missing.mem_percent, 0.0);
    assert!(!missing.mem_read_ok);
    assert!(missing.cpu_read_ok);

    let zero_total = sampler.tick();
    assert_eq!(zero_total.mem_percent, 0.0);
    assert!(!zero_total.mem_read_ok);
    assert_eq!(zero_total.cpu_percent, 50.0);

    let recovered = sampler.tick();
    assert_eq!(recovered.mem_percent, 75.0);
    assert!(recovered.mem_read_ok);
}

#[test]
fn test_uptime_counts_every_tick_even_on_failure() {
    // Every read fails: the script is empty.
    let mut sampler = Sampler::new(ScriptedSource::default());

    for expected in 1..=5 {
        let snap = sampler.tick();
        assert_eq!(snap.uptime_seconds, expected);
        assert!(!snap.cpu_read_ok);
        assert!(!snap.mem_read_ok);
        assert_eq!(snap.cpu_percent, 0.0);
        assert_eq!(snap.mem_percent, 0.0);
    }
    assert_eq!(sampler.last_snapshot().uptime_seconds, 5);
}

#[test]
fn test_values_stay_in_range() {
    let mut source = ScriptedSource::default();
    let readings = [(0, 0), (10, 100), (10, 100), (90, 200), (95, 250), (255, 260)];
    for (idle, total) in readings {
        source = source.cpu(cpu(idle, total)).mem(mem(4096, idle * 10));
    }
    let mut sampler = Sampler::new(source);

    for _ in readings {
        let snap = sampler.tick();
        assert!((0.0..=100.0).contains(&snap.cpu_percent), "{:?}", snap);
        assert!((0.0..=100.0).contains(&snap.mem_percent), "{:?}", snap);
    }
}

#[test]
fn test_overflowing_cpu_counters_are_a_read_failure() {
    let proc = tempfile::tempdir().unwrap();
    std::fs::write(
        proc.path().join("stat"),
        "cpu  18446744073709551615 0 0 0 0 0 0 1\n",
    )
    .unwrap();
    std::fs::write(
        proc.path().join("meminfo"),
        "MemTotal: 1000 kB\nMemAvailable: 400 kB\n",
    )
    .unwrap();
    let mut sampler = Sampler::from_proc(proc.path());

    for expected in 1..=3 {
        let snap = sampler.tick();
        assert_eq!(snap.uptime_seconds, expected);
        assert!(!snap.cpu_read_ok);
        assert_eq!(snap.cpu_percent, 0.0);
        assert!(snap.mem_read_ok);
        assert_eq!(snap.mem_percent, 60.0);
    }
    assert_eq!(sampler.cpu_baseline(), None);
}
