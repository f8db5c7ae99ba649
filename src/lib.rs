//! Anvil Telemetry - training statistics collection for Anvil models
//!
//! Features:
//! - Per-iteration listener with a configurable reporting cadence
//! - Histograms and summary statistics of parameters, updates and activations
//! - Throughput, memory and pool reclamation metrics
//! - Pluggable storage routers (in-memory, file, async channel)
//!
//! A training loop hands its model to a [`StatsCollector`] after every
//! iteration:
//!
//! ```no_run
//! use std::sync::Arc;
//! use anvil_telemetry::{InMemoryStatsStorage, StatsCollector};
//!
//! let storage = Arc::new(InMemoryStatsStorage::new());
//! let mut collector = StatsCollector::new(storage.clone()).unwrap();
//! // collector.iteration_done(ModelRef::Sequential(&model), iteration)?;
//! ```

pub mod collector;
pub mod config;
pub mod error;
pub mod memory;
pub mod model;
pub mod report;
pub mod stats;
pub mod storage;
pub mod system;

#[cfg(test)]
pub(crate) mod test_util;

pub use collector::{IterationListener, StatsCollector, StatsCollectorBuilder};
pub use config::{CategoryConfig, CollectorConfig, ConfigBuilder, RouterErrorPolicy, StatsInitConfig, StatsUpdateConfig};
pub use error::{ErrorCode, TelemetryError, TelemetryResult};
pub use model::{GraphModel, Model, ModelRef, NamedArrays, SequentialModel};
pub use report::{StatsInitializationReport, StatsReport, StorageMetaData};
pub use stats::{Histogram, StatsType, SummaryType};
pub use storage::{FileStatsStorage, InMemoryStatsStorage, ReportEncoding, StatsStorageRouter, StorageRecord};
#[cfg(feature = "async")]
pub use storage::ChannelStatsRouter;

/// Install the default tracing subscriber
///
/// Honors `RUST_LOG` when set. Calling it more than once is harmless; only
/// the first subscriber is kept.
pub fn init() -> TelemetryResult<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_ok() {
        tracing::info!("Anvil telemetry {} initialized", version());
    }
    Ok(())
}

/// Get the current crate version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
