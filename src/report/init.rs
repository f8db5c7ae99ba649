use serde::{Deserialize, Serialize};

use super::ReportIds;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftwareInfo {
    pub arch: String,
    pub os_name: String,
    pub runtime_name: String,
    pub runtime_version: String,
    pub runtime_spec_version: String,
    pub backend: String,
    pub dtype: String,
    /// `None` when the hostname could not be determined
    pub hostname: Option<String>,
    pub process_uid: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareInfo {
    pub available_processors: usize,
    pub device_count: usize,
    pub heap_max_bytes: u64,
    pub off_heap_max_bytes: u64,
    /// Parallel to the device indices
    pub device_total_memory: Vec<u64>,
    pub hardware_uid: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_class: String,
    /// Model configuration as JSON text
    pub config_json: String,
    pub param_names: Vec<String>,
    pub num_layers: usize,
    pub num_params: usize,
    /// Vertex count, present for graph models only
    #[serde(default)]
    pub num_vertices: Option<usize>,
}

impl ModelInfo {
    pub fn config(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_str(&self.config_json)
    }
}

/// One-time description of the software, hardware and model of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsInitializationReport {
    pub ids: ReportIds,
    pub timestamp: i64,
    pub software: Option<SoftwareInfo>,
    pub hardware: Option<HardwareInfo>,
    pub model: Option<ModelInfo>,
}

pub struct StatsInitializationReportBuilder {
    report: StatsInitializationReport,
}

impl StatsInitializationReportBuilder {
    pub fn new(ids: ReportIds, timestamp: i64) -> Self {
        Self {
            report: StatsInitializationReport {
                ids,
                timestamp,
                software: None,
                hardware: None,
                model: None,
            },
        }
    }

    pub fn report_software_info(&mut self, software: SoftwareInfo) -> &mut Self {
        self.report.software = Some(software);
        self
    }

    pub fn report_hardware_info(&mut self, hardware: HardwareInfo) -> &mut Self {
        self.report.hardware = Some(hardware);
        self
    }

    pub fn report_model_info(&mut self, model: ModelInfo) -> &mut Self {
        self.report.model = Some(model);
        self
    }

    pub fn build(self) -> StatsInitializationReport {
        self.report
    }
}
