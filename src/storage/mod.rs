//! Storage routers: where finished reports go
//!
//! A router accepts the three record kinds a collector produces. Routers
//! are shared (`&self` methods, `Send + Sync`), so one instance can collect
//! the streams of many workers.

pub mod file;
#[cfg(feature = "async")]
pub mod channel;

pub use file::{read_records, FileStatsStorage, ReportEncoding};
#[cfg(feature = "async")]
pub use channel::ChannelStatsRouter;

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::TelemetryResult;
use crate::report::{StatsInitializationReport, StatsReport, StorageMetaData};

pub trait StatsStorageRouter: Send + Sync {
    fn put_storage_metadata(&self, meta: StorageMetaData) -> TelemetryResult<()>;

    fn put_static_info(&self, report: StatsInitializationReport) -> TelemetryResult<()>;

    fn put_update(&self, report: StatsReport) -> TelemetryResult<()>;
}

impl<T: StatsStorageRouter + ?Sized> StatsStorageRouter for Arc<T> {
    fn put_storage_metadata(&self, meta: StorageMetaData) -> TelemetryResult<()> {
        (**self).put_storage_metadata(meta)
    }

    fn put_static_info(&self, report: StatsInitializationReport) -> TelemetryResult<()> {
        (**self).put_static_info(report)
    }

    fn put_update(&self, report: StatsReport) -> TelemetryResult<()> {
        (**self).put_update(report)
    }
}

/// Any record a router can receive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StorageRecord {
    MetaData(StorageMetaData),
    StaticInfo(StatsInitializationReport),
    Update(StatsReport),
}

impl StorageRecord {
    pub fn kind(&self) -> &'static str {
        match self {
            StorageRecord::MetaData(_) => "metadata",
            StorageRecord::StaticInfo(_) => "static_info",
            StorageRecord::Update(_) => "update",
        }
    }
}

/// Keeps every record in memory, in arrival order
#[derive(Default)]
pub struct InMemoryStatsStorage {
    records: Mutex<Vec<StorageRecord>>,
}

impl InMemoryStatsStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<StorageRecord> {
        self.records.lock().clone()
    }

    pub fn metadata(&self) -> Vec<StorageMetaData> {
        self.records
            .lock()
            .iter()
            .filter_map(|r| match r {
                StorageRecord::MetaData(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn static_info(&self) -> Vec<StatsInitializationReport> {
        self.records
            .lock()
            .iter()
            .filter_map(|r| match r {
                StorageRecord::StaticInfo(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn updates(&self) -> Vec<StatsReport> {
        self.records
            .lock()
            .iter()
            .filter_map(|r| match r {
                StorageRecord::Update(u) => Some(u.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl StatsStorageRouter for InMemoryStatsStorage {
    fn put_storage_metadata(&self, meta: StorageMetaData) -> TelemetryResult<()> {
        self.records.lock().push(StorageRecord::MetaData(meta));
        Ok(())
    }

    fn put_static_info(&self, report: StatsInitializationReport) -> TelemetryResult<()> {
        self.records.lock().push(StorageRecord::StaticInfo(report));
        Ok(())
    }

    fn put_update(&self, report: StatsReport) -> TelemetryResult<()> {
        self.records.lock().push(StorageRecord::Update(report));
        Ok(())
    }
}
