//! Process default metrics, sampled on every snapshot.
//!
//! Start time, uptime and memory come from `sysinfo` on every platform it
//! supports. CPU seconds and open file descriptors come from `procfs` and are
//! only reported on Linux.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use sysinfo::{Pid, System};

pub const PROCESS_CPU_SECONDS_TOTAL: &str = "process_cpu_seconds_total";
pub const PROCESS_START_TIME_SECONDS: &str = "process_start_time_seconds";
pub const PROCESS_UPTIME_SECONDS: &str = "process_uptime_seconds";
pub const PROCESS_RESIDENT_MEMORY_BYTES: &str = "process_resident_memory_bytes";
pub const PROCESS_VIRTUAL_MEMORY_BYTES: &str = "process_virtual_memory_bytes";
pub const PROCESS_OPEN_FDS: &str = "process_open_fds";

/// Names owned by the collector. A registry with process metrics enabled
/// refuses user definitions under these names.
pub const PROCESS_METRIC_NAMES: [&str; 6] = [
    PROCESS_CPU_SECONDS_TOTAL,
    PROCESS_START_TIME_SECONDS,
    PROCESS_UPTIME_SECONDS,
    PROCESS_RESIDENT_MEMORY_BYTES,
    PROCESS_VIRTUAL_MEMORY_BYTES,
    PROCESS_OPEN_FDS,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    Gauge,
    Counter,
}

impl SampleKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SampleKind::Gauge => "gauge",
            SampleKind::Counter => "counter",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSample {
    pub name: &'static str,
    pub help: &'static str,
    pub kind: SampleKind,
    pub value: f64,
}

impl ProcessSample {
    fn gauge(name: &'static str, help: &'static str, value: f64) -> Self {
        Self { name, help, kind: SampleKind::Gauge, value }
    }
}

pub struct ProcessCollector {
    pid: Option<Pid>,
    // Kept between scrapes so sysinfo only refreshes the one process.
    sys: Mutex<System>,
}

impl std::fmt::Debug for ProcessCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessCollector").field("pid", &self.pid).finish()
    }
}

impl Default for ProcessCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessCollector {
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::warn!(error = e, "process metrics unavailable on this platform");
                None
            }
        };
        Self { pid, sys: Mutex::new(System::new()) }
    }

    pub fn collect(&self) -> Vec<ProcessSample> {
        let mut samples = Vec::with_capacity(PROCESS_METRIC_NAMES.len());

        if let Some(cpu) = cpu_seconds() {
            samples.push(ProcessSample {
                name: PROCESS_CPU_SECONDS_TOTAL,
                help: "Total user and system CPU time spent in seconds.",
                kind: SampleKind::Counter,
                value: cpu,
            });
        }

        if let Some(info) = self.sample() {
            samples.push(ProcessSample::gauge(
                PROCESS_START_TIME_SECONDS,
                "Start time of the process since unix epoch in seconds.",
                info.start_time_secs as f64,
            ));
            samples.push(ProcessSample::gauge(
                PROCESS_UPTIME_SECONDS,
                "Seconds elapsed since the process started.",
                uptime_since(info.start_time_secs),
            ));
            samples.push(ProcessSample::gauge(
                PROCESS_RESIDENT_MEMORY_BYTES,
                "Resident memory size in bytes.",
                info.resident_bytes as f64,
            ));
            samples.push(ProcessSample::gauge(
                PROCESS_VIRTUAL_MEMORY_BYTES,
                "Virtual memory size in bytes.",
                info.virtual_bytes as f64,
            ));
        }

        if let Some(fds) = open_fds() {
            samples.push(ProcessSample::gauge(
                PROCESS_OPEN_FDS,
                "Number of open file descriptors.",
                fds as f64,
            ));
        }
        samples
    }

    fn sample(&self) -> Option<ProcessInfo> {
        let pid = self.pid?;
        let mut sys = match self.sys.lock() {
            Ok(sys) => sys,
            Err(e) => {
                tracing::warn!(error = %e, "process metrics lock poisoned");
                return None;
            }
        };
        sys.refresh_process(pid);
        let proc_info = sys.process(pid)?;
        Some(ProcessInfo {
            start_time_secs: proc_info.start_time(),
            resident_bytes: proc_info.memory(),
            virtual_bytes: proc_info.virtual_memory(),
        })
    }
}

struct ProcessInfo {
    start_time_secs: u64,
    resident_bytes: u64,
    virtual_bytes: u64,
}

/// Seconds between `start_secs` (unix epoch) and now, never negative.
fn uptime_since(start_secs: u64) -> f64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);
    (now - start_secs as f64).max(0.0)
}

#[cfg(target_os = "linux")]
fn cpu_seconds() -> Option<f64> {
    let stat = procfs::process::Process::myself().and_then(|p| p.stat()).ok()?;
    let ticks = procfs::ticks_per_second();
    if ticks == 0 {
        return None;
    }
    Some((stat.utime + stat.stime) as f64 / ticks as f64)
}

#[cfg(not(target_os = "linux"))]
fn cpu_seconds() -> Option<f64> {
    None
}

#[cfg(target_os = "linux")]
fn open_fds() -> Option<usize> {
    procfs::process::Process::myself().and_then(|p| p.fd_count()).ok()
}

#[cfg(not(target_os = "linux"))]
fn open_fds() -> Option<usize> {
    None
}
