//! Point-in-time CPU and memory utilization.
//!
//! Read straight from `/proc` on Linux. Other platforms report `None`;
//! callers treat a missing sample as "unknown", never as an error.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A utilization sample taken on demand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSnapshot {
    /// System-wide CPU busy percentage over the sample window.
    pub cpu_percent: Option<f64>,
    /// Used memory as a percentage of total.
    pub memory_percent: Option<f64>,
}

impl ResourceSnapshot {
    /// Sample utilization. Blocks for `window` while measuring CPU.
    pub fn capture(window: Duration) -> Self {
        Self {
            cpu_percent: cpu_percent(window),
            memory_percent: memory_percent(),
        }
    }
}

/// Number of workers to use when none is configured.
pub fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn memory_percent() -> Option<f64> {
    #[cfg(target_os = "linux")]
    {
        let meminfo = std::fs::read_to_string("/proc/meminfo").ok()?;
        let total = meminfo_kb(&meminfo, "MemTotal:")?;
        let available = meminfo_kb(&meminfo, "MemAvailable:")?;
        used_percent(total, available)
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

fn cpu_percent(window: Duration) -> Option<f64> {
    #[cfg(target_os = "linux")]
    {
        let before = read_cpu_times()?;
        std::thread::sleep(window);
        let after = read_cpu_times()?;
        busy_percent(before, after)
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = window;
        None
    }
}

#[cfg(target_os = "linux")]
fn read_cpu_times() -> Option<CpuTimes> {
    let stat = std::fs::read_to_string("/proc/stat").ok()?;
    parse_cpu_line(stat.lines().next()?)
}

/// Aggregate jiffies from the first `cpu` line of `/proc/stat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CpuTimes {
    idle: u64,
    total: u64,
}

fn parse_cpu_line(line: &str) -> Option<CpuTimes> {
    let mut fields = line.split_whitespace();
    if fields.next()? != "cpu" {
        return None;
    }
    let values: Vec<u64> = fields.filter_map(|f| f.parse().ok()).collect();
    if values.len() < 4 {
        return None;
    }
    // idle + iowait
    let idle = values[3] + values.get(4).copied().unwrap_or(0);
    Some(CpuTimes {
        idle,
        total: values.iter().sum(),
    })
}

fn busy_percent(before: CpuTimes, after: CpuTimes) -> Option<f64> {
    let total = after.total.checked_sub(before.total)?;
    let idle = after.idle.checked_sub(before.idle)?;
    if total == 0 {
        return None;
    }
    Some((total.saturating_sub(idle)) as f64 * 100.0 / total as f64)
}

fn meminfo_kb(meminfo: &str, key: &str) -> Option<u64> {
    meminfo
        .lines()
        .find(|line| line.starts_with(key))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|kb| kb.parse().ok())
}

fn used_percent(total_kb: u64, available_kb: u64) -> Option<f64> {
    if total_kb == 0 {
        return None;
    }
    Some(total_kb.saturating_sub(available_kb) as f64 * 100.0 / total_kb as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cpu_line() {
        let times = parse_cpu_line("cpu  100 0 50 800 50 0 0 0 0 0").unwrap();
        assert_eq!(times.idle, 850);
        assert_eq!(times.total, 1000);
        assert!(parse_cpu_line("cpu0 1 2 3 4").is_none());
        assert!(parse_cpu_line("intr 1 2").is_none());
    }

    #[test]
    fn test_busy_percent() {
        let before = CpuTimes { idle: 800, total: 1000 };
        let after = CpuTimes { idle: 850, total: 1100 };
        assert_eq!(busy_percent(before, after), Some(50.0));
        assert_eq!(busy_percent(before, before), None);
    }

    #[test]
    fn test_meminfo_parsing() {
        let meminfo = "MemTotal:       8000000 kB\nMemFree:  100 kB\nMemAvailable:   2000000 kB\n";
        let total = meminfo_kb(meminfo, "MemTotal:").unwrap();
        let available = meminfo_kb(meminfo, "MemAvailable:").unwrap();
        assert_eq!(used_percent(total, available), Some(75.0));
        assert_eq!(used_percent(0, 0), None);
    }

    #[test]
    fn test_capture_never_panics() {
        let snap = ResourceSnapshot::capture(Duration::from_millis(5));
        if let Some(mem) = snap.memory_percent {
            assert!((0.0..=100.0).contains(&mem));
        }
        assert!(available_parallelism() >= 1);
    }
}
