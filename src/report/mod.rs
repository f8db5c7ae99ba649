//! Report value objects handed to the storage router
//!
//! Three record kinds exist: a [`StorageMetaData`] record and a
//! [`StatsInitializationReport`], both sent once per collector, and a
//! stream of [`StatsReport`] updates. Reports are assembled with their
//! builders and are not modified after `build()`.

pub mod init;
pub mod update;

pub use init::{HardwareInfo, ModelInfo, SoftwareInfo, StatsInitializationReport, StatsInitializationReportBuilder};
pub use update::{GcStats, PerformanceStats, StatsReport, StatsReportBuilder};

use serde::{Deserialize, Serialize};

/// Identifies this collector as the producer of a report
pub const TYPE_ID: &str = "StatsListener";

/// Persisted name of the initialization record shape
pub const INIT_REPORT_TYPE: &str = "StatsInitializationReport";

/// Persisted name of the update record shape
pub const UPDATE_REPORT_TYPE: &str = "StatsReport";

/// Identity fields shared by every record of one collector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportIds {
    pub session_id: String,
    pub type_id: String,
    pub worker_id: String,
}

impl ReportIds {
    pub fn new(session_id: &str, worker_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            type_id: TYPE_ID.to_string(),
            worker_id: worker_id.to_string(),
        }
    }
}

/// Describes the records a collector will produce, sent before anything else
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageMetaData {
    pub timestamp: i64,
    pub ids: ReportIds,
    pub init_report_type: String,
    pub update_report_type: String,
}

impl StorageMetaData {
    pub fn new(timestamp: i64, ids: ReportIds) -> Self {
        Self {
            timestamp,
            ids,
            init_report_type: INIT_REPORT_TYPE.to_string(),
            update_report_type: UPDATE_REPORT_TYPE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_names_report_shapes() {
        let meta = StorageMetaData::new(10, ReportIds::new("session", "worker"));
        assert_eq!(meta.ids.type_id, TYPE_ID);
        assert_eq!(meta.init_report_type, "StatsInitializationReport");
        assert_eq!(meta.update_report_type, "StatsReport");
    }
}
