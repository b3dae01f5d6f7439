//! Host counter sources read from the /proc filesystem.
//!
//! This module reads the aggregate CPU time accounting line from `/proc/stat`
//! and the memory totals from `/proc/meminfo`. Parsing is split from file access
//! so the formats can be validated without a live `/proc`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default mount point of the proc filesystem.
pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// Label of the aggregate CPU line in /proc/stat.
const CPU_LABEL: &str = "cpu";

/// Number of accounting fields consumed after the label.
const CPU_FIELD_COUNT: usize = 8;

/// Errors raised while reading a counter source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to read {}: {source}", path.display())]
    Unavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid {} format: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },
}

/// Aggregate CPU time accounting fields, in clock ticks since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuTimes {
    /// Calculate non-active time (idle + iowait). Saturates at `u64::MAX`.
    pub fn idle_total(&self) -> u64 {
        self.idle.saturating_add(self.iowait)
    }

    /// Calculate active time across all non-idle fields. Saturates at `u64::MAX`.
    pub fn non_idle_total(&self) -> u64 {
        [self.nice, self.system, self.irq, self.softirq, self.steal]
            .into_iter()
            .fold(self.user, u64::saturating_add)
    }

    /// Calculate total CPU time (all fields). Saturates at `u64::MAX`.
    pub fn total(&self) -> u64 {
        self.idle_total().saturating_add(self.non_idle_total())
    }

    /// Total CPU time, or `None` if the fields do not sum within a `u64`.
    pub fn checked_total(&self) -> Option<u64> {
        [
            self.nice,
            self.system,
            self.idle,
            self.iowait,
            self.irq,
            self.softirq,
            self.steal,
        ]
        .into_iter()
        .try_fold(self.user, u64::checked_add)
    }
}

/// Memory totals from /proc/meminfo, in kilobytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemInfo {
    pub total_kb: u64,
    pub available_kb: u64,
}

/// Parses the aggregate `cpu` line from the contents of /proc/stat.
///
/// Format: "cpu  3357 0 4313 1362393 120 0 33 0 0 0"
/// Only the first eight numeric fields are consumed; guest fields are ignored.
pub fn parse_cpu_times(content: &str) -> Result<CpuTimes, String> {
    let line = content
        .lines()
        .find(|l| l.split_whitespace().next() == Some(CPU_LABEL))
        .ok_or_else(|| format!("no '{}' line found", CPU_LABEL))?;

    let values: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .take(CPU_FIELD_COUNT)
        .map(|field| {
            field
                .parse::<u64>()
                .map_err(|e| format!("non-numeric field '{}': {}", field, e))
        })
        .collect::<Result<_, _>>()?;

    if values.len() < CPU_FIELD_COUNT {
        return Err(format!(
            "expected {} fields after '{}', got {}",
            CPU_FIELD_COUNT,
            CPU_LABEL,
            values.len()
        ));
    }

    let times = CpuTimes {
        user: values[0],
        nice: values[1],
        system: values[2],
        idle: values[3],
        iowait: values[4],
        irq: values[5],
        softirq: values[6],
        steal: values[7],
    };

    if times.checked_total().is_none() {
        return Err(format!("'{}' fields overflow a 64-bit total", CPU_LABEL));
    }

    Ok(times)
}

/// Parses MemTotal and MemAvailable from the contents of /proc/meminfo.
///
/// Only the first occurrence of each key is used and scanning stops once both
/// have been seen.
pub fn parse_mem_info(content: &str) -> Result<MemInfo, String> {
    let mut total_kb: Option<u64> = None;
    let mut available_kb: Option<u64> = None;

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };

        let slot = match key {
            "MemTotal:" if total_kb.is_none() => &mut total_kb,
            "MemAvailable:" if available_kb.is_none() => &mut available_kb,
            _ => continue,
        };

        *slot = Some(
            value
                .parse::<u64>()
                .map_err(|e| format!("failed to parse {} value '{}': {}", key, value, e))?,
        );

        if total_kb.is_some() && available_kb.is_some() {
            break;
        }
    }

    match (total_kb, available_kb) {
        (Some(total_kb), Some(available_kb)) => Ok(MemInfo {
            total_kb,
            available_kb,
        }),
        (None, _) => Err("missing MemTotal".to_string()),
        (_, None) => Err("missing MemAvailable".to_string()),
    }
}

fn read_source(path: PathBuf) -> Result<(PathBuf, String), SourceError> {
    match fs::read_to_string(&path) {
        Ok(content) => Ok((path, content)),
        Err(source) => Err(SourceError::Unavailable { path, source }),
    }
}

/// Reads aggregate CPU times from `<proc_root>/stat`.
pub fn read_cpu_times(proc_root: &Path) -> Result<CpuTimes, SourceError> {
    let (path, content) = read_source(proc_root.join("stat"))?;
    parse_cpu_times(&content).map_err(|reason| SourceError::Malformed { path, reason })
}

/// Reads memory totals from `<proc_root>/meminfo`.
pub fn read_mem_info(proc_root: &Path) -> Result<MemInfo, SourceError> {
    let (path, content) = read_source(proc_root.join("meminfo"))?;
    parse_mem_info(&content).map_err(|reason| SourceError::Malformed { path, reason })
}
