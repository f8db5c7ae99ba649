//! Process and machine introspection used by the collector
//!
//! Everything the collector reads from its surroundings goes through one
//! of the traits here, so tests can swap in deterministic sources.

pub mod clock;
pub mod environment;
pub mod metrics;

pub use clock::{Clock, ManualClock, SystemClock};
pub use environment::{EnvironmentInfo, ProcessEnvironment, SoftwareSnapshot};
pub use metrics::{GcSample, HardwareSnapshot, MemoryStats, ProcessMetricsProvider, SystemMetricsProvider};

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use lazy_static::lazy_static;
use uuid::Uuid;

lazy_static! {
    static ref PROCESS_UID: String = Uuid::new_v4().simple().to_string();
}

/// Identifier generated once per process
pub fn process_uid() -> &'static str {
    &PROCESS_UID
}

/// Stable identifier of this machine.
///
/// Uses the systemd machine id when readable, otherwise a hash of the
/// architecture, OS and processor count.
pub fn hardware_uid() -> String {
    if let Ok(id) = std::fs::read_to_string("/etc/machine-id") {
        let id = id.trim();
        if !id.is_empty() {
            return id.to_string();
        }
    }

    let mut hasher = DefaultHasher::new();
    std::env::consts::ARCH.hash(&mut hasher);
    std::env::consts::OS.hash(&mut hasher);
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Numeric id of the calling thread
pub fn current_thread_number() -> String {
    let id = format!("{:?}", std::thread::current().id());
    id.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Default worker id: `<process uid>_<thread number>`
pub fn default_worker_id() -> String {
    format!("{}_{}", process_uid(), current_thread_number())
}
