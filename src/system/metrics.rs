//! Process memory, reclamation and hardware readings

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::memory::{self, PoolRegistry};

/// Memory in use and its ceilings, in bytes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub heap_current_bytes: u64,
    pub heap_max_bytes: u64,
    pub off_heap_current_bytes: u64,
    pub off_heap_max_bytes: u64,
    /// One entry per accelerator; empty when there are none
    pub device_current_bytes: Vec<u64>,
    pub device_max_bytes: Vec<u64>,
}

/// Cumulative counters of one reclamation source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcSample {
    pub name: String,
    pub count: u64,
    pub time_ms: u64,
}

impl GcSample {
    pub fn new(name: &str, count: u64, time_ms: u64) -> Self {
        Self {
            name: name.to_string(),
            count,
            time_ms,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HardwareSnapshot {
    pub available_processors: usize,
    pub heap_max_bytes: u64,
    pub off_heap_max_bytes: u64,
    /// Total memory per accelerator
    pub device_total_memory: Vec<u64>,
}

/// Read-only view of process-wide resource counters
pub trait SystemMetricsProvider: Send + Sync {
    fn memory_snapshot(&self) -> MemoryStats;

    /// Cumulative readings of every reclamation source currently known
    fn gc_snapshot(&self) -> Vec<GcSample>;

    fn hardware_snapshot(&self) -> HardwareSnapshot;
}

/// Reads `/proc` (Linux) and the registered memory pools
pub struct ProcessMetricsProvider {
    registry: Arc<PoolRegistry>,
    devices: Vec<u64>,
}

impl ProcessMetricsProvider {
    pub fn new() -> Self {
        Self::with_registry(memory::global_registry())
    }

    pub fn with_registry(registry: Arc<PoolRegistry>) -> Self {
        Self {
            registry,
            devices: Vec::new(),
        }
    }

    /// Declares accelerators by their total memory, in device order
    pub fn with_devices(mut self, device_total_memory: Vec<u64>) -> Self {
        self.devices = device_total_memory;
        self
    }

    fn heap_current(&self) -> u64 {
        read_kib_field("/proc/self/status", "VmRSS:").unwrap_or(0)
    }

    fn heap_max(&self) -> u64 {
        let cgroup_limit = std::fs::read_to_string("/sys/fs/cgroup/memory.max")
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok());
        let physical = read_kib_field("/proc/meminfo", "MemTotal:");

        match (cgroup_limit, physical) {
            (Some(limit), Some(total)) => limit.min(total),
            (limit, total) => limit.or(total).unwrap_or(0),
        }
    }
}

impl Default for ProcessMetricsProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses a `Name:   1234 kB` line and returns the value in bytes
fn read_kib_field(path: &str, field: &str) -> Option<u64> {
    let content = std::fs::read_to_string(path).ok()?;
    content
        .lines()
        .find(|line| line.starts_with(field))
        .and_then(|line| line[field.len()..].split_whitespace().next())
        .and_then(|value| value.parse::<u64>().ok())
        .map(|kib| kib * 1024)
}

impl SystemMetricsProvider for ProcessMetricsProvider {
    fn memory_snapshot(&self) -> MemoryStats {
        let pools = self.registry.snapshot();
        MemoryStats {
            heap_current_bytes: self.heap_current(),
            heap_max_bytes: self.heap_max(),
            off_heap_current_bytes: pools.iter().map(|p| p.allocated_bytes).sum(),
            off_heap_max_bytes: pools.iter().map(|p| p.limit_bytes).sum(),
            device_current_bytes: vec![0; self.devices.len()],
            device_max_bytes: self.devices.clone(),
        }
    }

    fn gc_snapshot(&self) -> Vec<GcSample> {
        self.registry
            .snapshot()
            .into_iter()
            .map(|p| GcSample {
                name: p.name,
                count: p.reclaim_count,
                time_ms: p.reclaim_time_ms,
            })
            .collect()
    }

    fn hardware_snapshot(&self) -> HardwareSnapshot {
        HardwareSnapshot {
            available_processors: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            heap_max_bytes: self.heap_max(),
            off_heap_max_bytes: self.registry.snapshot().iter().map(|p| p.limit_bytes).sum(),
            device_total_memory: self.devices.clone(),
        }
    }
}
