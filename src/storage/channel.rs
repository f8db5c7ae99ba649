//! Router that forwards records to an async consumer
//!
//! Sending never blocks the training thread; a task on the receiving end
//! decides how and when records are persisted.

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use super::{StatsStorageRouter, StorageRecord};
use crate::error::{TelemetryError, TelemetryResult};
use crate::report::{StatsInitializationReport, StatsReport, StorageMetaData};

#[derive(Clone)]
pub struct ChannelStatsRouter {
    sender: UnboundedSender<StorageRecord>,
}

impl ChannelStatsRouter {
    pub fn new() -> (Self, UnboundedReceiver<StorageRecord>) {
        let (sender, receiver) = unbounded_channel();
        (Self { sender }, receiver)
    }

    fn send(&self, operation: &str, record: StorageRecord) -> TelemetryResult<()> {
        self.sender
            .send(record)
            .map_err(|_| TelemetryError::router_failure(operation, "receiver dropped"))
    }
}

impl StatsStorageRouter for ChannelStatsRouter {
    fn put_storage_metadata(&self, meta: StorageMetaData) -> TelemetryResult<()> {
        self.send("put_storage_metadata", StorageRecord::MetaData(meta))
    }

    fn put_static_info(&self, report: StatsInitializationReport) -> TelemetryResult<()> {
        self.send("put_static_info", StorageRecord::StaticInfo(report))
    }

    fn put_update(&self, report: StatsReport) -> TelemetryResult<()> {
        self.send("put_update", StorageRecord::Update(report))
    }
}
