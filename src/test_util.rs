//! Deterministic models and collaborators shared by the unit tests

use std::cell::Cell;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{TelemetryError, TelemetryResult};
use crate::model::{GraphModel, Model, NamedArrays, SequentialModel};
use crate::report::{StatsInitializationReport, StatsReport, StorageMetaData};
use crate::storage::{InMemoryStatsStorage, StatsStorageRouter};
use crate::system::{EnvironmentInfo, GcSample, HardwareSnapshot, MemoryStats, SoftwareSnapshot, SystemMetricsProvider};

fn random_array(rng: &mut fastrand::Rng, len: usize) -> Vec<f32> {
    (0..len).map(|_| rng.f32() * 2.0 - 1.0).collect()
}

/// Dense stack with `layer_sizes.len() - 1` layers
pub struct MockSequential {
    pub params: Vec<(String, Vec<f32>)>,
    pub grads: Vec<(String, Vec<f32>)>,
    pub inputs: Vec<Vec<f32>>,
    pub score: f64,
    pub batch_size: Option<usize>,
    pub expose_learning_rates: bool,
    /// Number of times the parameter arrays were read
    pub param_reads: Cell<usize>,
}

impl MockSequential {
    pub fn new(layer_sizes: &[usize], batch_size: usize) -> Self {
        let mut rng = fastrand::Rng::with_seed(42);
        let mut params = Vec::new();
        let mut grads = Vec::new();
        let mut inputs = Vec::new();

        for (i, pair) in layer_sizes.windows(2).enumerate() {
            let (n_in, n_out) = (pair[0], pair[1]);
            params.push((format!("{}_W", i), random_array(&mut rng, n_in * n_out)));
            params.push((format!("{}_b", i), random_array(&mut rng, n_out)));
            grads.push((format!("{}_W", i), random_array(&mut rng, n_in * n_out)));
            grads.push((format!("{}_b", i), random_array(&mut rng, n_out)));
            inputs.push(random_array(&mut rng, batch_size * n_in));
        }

        Self {
            params,
            grads,
            inputs,
            score: 1.0,
            batch_size: Some(batch_size),
            expose_learning_rates: true,
            param_reads: Cell::new(0),
        }
    }
}

impl Model for MockSequential {
    fn model_class(&self) -> &str {
        "MockSequential"
    }

    fn score(&self) -> f64 {
        self.score
    }

    fn parameters(&self) -> NamedArrays<'_> {
        self.param_reads.set(self.param_reads.get() + 1);
        self.params.iter().map(|(n, v)| (n.clone(), v.as_slice())).collect()
    }

    fn gradients(&self) -> NamedArrays<'_> {
        self.grads.iter().map(|(n, v)| (n.clone(), v.as_slice())).collect()
    }

    fn batch_size(&self) -> Option<usize> {
        self.batch_size
    }

    fn num_layers(&self) -> usize {
        self.inputs.len()
    }

    fn num_params(&self) -> usize {
        self.params.iter().map(|(_, v)| v.len()).sum()
    }

    fn configuration(&self) -> serde_json::Value {
        serde_json::json!({ "layers": self.inputs.len(), "type": "dense" })
    }

    fn learning_rates(&self) -> Option<BTreeMap<String, f64>> {
        if !self.expose_learning_rates {
            return None;
        }
        Some(self.params.iter().map(|(n, _)| (n.clone(), 0.01)).collect())
    }
}

impl SequentialModel for MockSequential {
    fn layer_inputs(&self) -> Vec<Option<&[f32]>> {
        self.inputs.iter().map(|v| Some(v.as_slice())).collect()
    }
}

/// Two-vertex graph without batch-size information
pub struct MockGraph {
    pub params: Vec<(String, Vec<f32>)>,
    pub score: f64,
}

impl MockGraph {
    pub fn new(score: f64) -> Self {
        Self {
            params: vec![
                ("dense_W".to_string(), vec![0.5, -0.5, 1.0, -1.0]),
                ("out_W".to_string(), vec![2.0, 2.0]),
            ],
            score,
        }
    }
}

impl Model for MockGraph {
    fn model_class(&self) -> &str {
        "MockGraph"
    }

    fn score(&self) -> f64 {
        self.score
    }

    fn parameters(&self) -> NamedArrays<'_> {
        self.params.iter().map(|(n, v)| (n.clone(), v.as_slice())).collect()
    }

    fn gradients(&self) -> NamedArrays<'_> {
        self.parameters()
    }

    fn batch_size(&self) -> Option<usize> {
        None
    }

    fn num_layers(&self) -> usize {
        2
    }

    fn num_params(&self) -> usize {
        6
    }

    fn configuration(&self) -> serde_json::Value {
        serde_json::json!({ "vertices": ["dense", "out"] })
    }

    fn learning_rates(&self) -> Option<BTreeMap<String, f64>> {
        Some(self.params.iter().map(|(n, _)| (n.clone(), 0.1)).collect())
    }
}

impl GraphModel for MockGraph {
    fn num_vertices(&self) -> usize {
        2
    }
}

/// Metrics provider whose reclamation readings are set by the test
#[derive(Clone, Default)]
pub struct FakeMetrics {
    pub gc: Arc<Mutex<Vec<GcSample>>>,
}

impl FakeMetrics {
    pub fn set_gc(&self, samples: Vec<GcSample>) {
        *self.gc.lock() = samples;
    }
}

impl SystemMetricsProvider for FakeMetrics {
    fn memory_snapshot(&self) -> MemoryStats {
        MemoryStats {
            heap_current_bytes: 1 << 20,
            heap_max_bytes: 1 << 30,
            off_heap_current_bytes: 0,
            off_heap_max_bytes: 0,
            device_current_bytes: Vec::new(),
            device_max_bytes: Vec::new(),
        }
    }

    fn gc_snapshot(&self) -> Vec<GcSample> {
        self.gc.lock().clone()
    }

    fn hardware_snapshot(&self) -> HardwareSnapshot {
        HardwareSnapshot {
            available_processors: 8,
            heap_max_bytes: 1 << 30,
            off_heap_max_bytes: 0,
            device_total_memory: vec![16 << 30],
        }
    }
}

pub struct FakeEnvironment {
    pub hostname: Option<String>,
}

impl EnvironmentInfo for FakeEnvironment {
    fn software_snapshot(&self) -> SoftwareSnapshot {
        SoftwareSnapshot {
            arch: "x86_64".to_string(),
            os_name: "linux".to_string(),
            runtime_name: "test".to_string(),
            runtime_version: "0.0.0".to_string(),
            runtime_spec_version: "1.70".to_string(),
        }
    }

    fn hostname(&self) -> TelemetryResult<String> {
        self.hostname
            .clone()
            .ok_or_else(|| TelemetryError::HostnameUnavailable("not configured".to_string()))
    }
}

/// Router that rejects everything and counts the attempts
#[derive(Default)]
pub struct FailingRouter {
    pub attempts: AtomicUsize,
}

impl FailingRouter {
    fn reject(&self, operation: &str) -> TelemetryResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(TelemetryError::router_failure(operation, "unreachable"))
    }
}

impl StatsStorageRouter for FailingRouter {
    fn put_storage_metadata(&self, _meta: StorageMetaData) -> TelemetryResult<()> {
        self.reject("put_storage_metadata")
    }

    fn put_static_info(&self, _report: StatsInitializationReport) -> TelemetryResult<()> {
        self.reject("put_static_info")
    }

    fn put_update(&self, _report: StatsReport) -> TelemetryResult<()> {
        self.reject("put_update")
    }
}

/// Rejects the storage metadata record and stores everything else
pub struct MetadataFailingRouter {
    inner: Arc<InMemoryStatsStorage>,
}

impl MetadataFailingRouter {
    pub fn new(inner: Arc<InMemoryStatsStorage>) -> Self {
        Self { inner }
    }
}

impl StatsStorageRouter for MetadataFailingRouter {
    fn put_storage_metadata(&self, _meta: StorageMetaData) -> TelemetryResult<()> {
        Err(TelemetryError::router_failure("put_storage_metadata", "metadata store offline"))
    }

    fn put_static_info(&self, report: StatsInitializationReport) -> TelemetryResult<()> {
        self.inner.put_static_info(report)
    }

    fn put_update(&self, report: StatsReport) -> TelemetryResult<()> {
        self.inner.put_update(report)
    }
}
