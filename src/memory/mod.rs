//! Named memory pools with allocation and reclamation accounting
//!
//! Pools are the crate's stand-in for a managed runtime's collectors: each
//! pool keeps cumulative counters (bytes in use, number of reclamation
//! passes, time spent reclaiming) that any number of readers can snapshot.
//! The collector reports per-pool deltas of those counters as its
//! garbage-collection statistics.

use std::sync::Arc;
use std::time::{Duration, Instant};

use lazy_static::lazy_static;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

pub trait MemoryPool: Send + Sync {
    fn name(&self) -> &str;
    fn allocate(&self, size: usize) -> MemoryGuard;
    fn deallocate(&self, size: usize);
    fn stats(&self) -> PoolStats;
}

/// Releases its bytes back to the pool when dropped
pub struct MemoryGuard {
    size: usize,
    pool: Arc<dyn MemoryPool>,
}

impl MemoryGuard {
    pub fn new(size: usize, pool: Arc<dyn MemoryPool>) -> Self {
        Self { size, pool }
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

impl Drop for MemoryGuard {
    fn drop(&mut self) {
        self.pool.deallocate(self.size);
    }
}

/// Point-in-time counters of one pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    pub name: String,
    pub allocated_bytes: u64,
    pub peak_bytes: u64,
    pub limit_bytes: u64,
    pub reclaim_count: u64,
    pub reclaim_time_ms: u64,
}

#[derive(Debug, Default)]
struct PoolState {
    allocated: usize,
    peak: usize,
    reclaim_count: u64,
    reclaim_time: Duration,
}

#[derive(Clone)]
pub struct TrackedMemoryPool {
    name: Arc<str>,
    limit: usize,
    state: Arc<Mutex<PoolState>>,
}

impl TrackedMemoryPool {
    pub fn new(name: &str, limit: usize) -> Self {
        Self {
            name: Arc::from(name),
            limit,
            state: Arc::new(Mutex::new(PoolState::default())),
        }
    }

    pub fn allocated(&self) -> usize {
        self.state.lock().allocated
    }

    /// Runs one reclamation pass and records how long it took.
    ///
    /// `pass` frees cached memory and returns the number of bytes it released.
    pub fn reclaim<F: FnOnce() -> usize>(&self, pass: F) -> usize {
        let start = Instant::now();
        let freed = pass();
        let elapsed = start.elapsed();

        let mut state = self.state.lock();
        state.allocated = state.allocated.saturating_sub(freed);
        state.reclaim_count += 1;
        state.reclaim_time += elapsed;
        tracing::trace!(pool = %self.name, freed, "reclamation pass");
        freed
    }

    /// Records a reclamation pass that happened outside this pool's control
    pub fn record_reclaim(&self, freed: usize, elapsed: Duration) {
        let mut state = self.state.lock();
        state.allocated = state.allocated.saturating_sub(freed);
        state.reclaim_count += 1;
        state.reclaim_time += elapsed;
    }
}

impl MemoryPool for TrackedMemoryPool {
    fn name(&self) -> &str {
        &self.name
    }

    fn allocate(&self, size: usize) -> MemoryGuard {
        {
            let mut state = self.state.lock();
            state.allocated += size;
            state.peak = state.peak.max(state.allocated);
        }
        MemoryGuard::new(size, Arc::new(self.clone()))
    }

    fn deallocate(&self, size: usize) {
        let mut state = self.state.lock();
        state.allocated = state.allocated.saturating_sub(size);
    }

    fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        PoolStats {
            name: self.name.to_string(),
            allocated_bytes: state.allocated as u64,
            peak_bytes: state.peak as u64,
            limit_bytes: self.limit as u64,
            reclaim_count: state.reclaim_count,
            reclaim_time_ms: state.reclaim_time.as_millis() as u64,
        }
    }
}

/// Set of pools visible to metrics readers
#[derive(Default)]
pub struct PoolRegistry {
    pools: RwLock<Vec<TrackedMemoryPool>>,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the pool registered under `name`, creating it if needed
    pub fn register(&self, name: &str, limit: usize) -> TrackedMemoryPool {
        let mut pools = self.pools.write();
        if let Some(existing) = pools.iter().find(|p| p.name() == name) {
            return existing.clone();
        }
        let pool = TrackedMemoryPool::new(name, limit);
        pools.push(pool.clone());
        pool
    }

    pub fn remove(&self, name: &str) -> bool {
        let mut pools = self.pools.write();
        let before = pools.len();
        pools.retain(|p| p.name() != name);
        pools.len() != before
    }

    pub fn snapshot(&self) -> Vec<PoolStats> {
        self.pools.read().iter().map(|p| p.stats()).collect()
    }
}

lazy_static! {
    static ref GLOBAL_REGISTRY: Arc<PoolRegistry> = Arc::new(PoolRegistry::new());
}

/// Process-wide pool registry
pub fn global_registry() -> Arc<PoolRegistry> {
    GLOBAL_REGISTRY.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_releases_on_drop() {
        let pool = TrackedMemoryPool::new("tensors", 1024);
        {
            let _a = pool.allocate(100);
            let _b = pool.allocate(50);
            assert_eq!(pool.allocated(), 150);
        }
        assert_eq!(pool.allocated(), 0);
        assert_eq!(pool.stats().peak_bytes, 150);
    }

    #[test]
    fn test_reclaim_counts_passes() {
        let pool = TrackedMemoryPool::new("cache", 0);
        let guard = pool.allocate(64);
        std::mem::forget(guard);

        let freed = pool.reclaim(|| 64);
        assert_eq!(freed, 64);
        pool.record_reclaim(0, Duration::from_millis(5));

        let stats = pool.stats();
        assert_eq!(stats.allocated_bytes, 0);
        assert_eq!(stats.reclaim_count, 2);
        assert!(stats.reclaim_time_ms >= 5);
    }

    #[test]
    fn test_registry_reuses_names() {
        let registry = PoolRegistry::new();
        let a = registry.register("device", 10);
        let b = registry.register("device", 99);
        let _g = a.allocate(4);
        assert_eq!(b.allocated(), 4);
        assert_eq!(registry.snapshot().len(), 1);

        registry.register("host", 0);
        assert_eq!(registry.snapshot().len(), 2);
        assert!(registry.remove("host"));
        assert!(!registry.remove("host"));
    }
}
