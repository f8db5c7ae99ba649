use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ReportIds;
use crate::stats::{Histogram, StatsType, SummaryType};
use crate::system::MemoryStats;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub total_runtime_ms: i64,
    pub total_examples: u64,
    pub total_minibatches: u64,
    pub examples_per_second: f64,
    pub minibatches_per_second: f64,
}

/// Reclamation activity of one source since the previous report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcStats {
    pub name: String,
    pub delta_count: u64,
    pub delta_time_ms: u64,
}

/// One periodic snapshot of a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsReport {
    pub ids: ReportIds,
    pub timestamp: i64,
    pub iteration: u64,
    pub param_names: Vec<String>,
    pub score: f64,
    pub performance: Option<PerformanceStats>,
    pub memory: Option<MemoryStats>,
    pub garbage_collection: Vec<GcStats>,
    pub learning_rates: Option<BTreeMap<String, f64>>,
    pub histograms: BTreeMap<StatsType, BTreeMap<String, Histogram>>,
    pub mean: BTreeMap<StatsType, BTreeMap<String, f64>>,
    pub stdev: BTreeMap<StatsType, BTreeMap<String, f64>>,
    pub mean_magnitudes: BTreeMap<StatsType, BTreeMap<String, f64>>,
    pub stats_collection_duration_ms: i64,
}

impl StatsReport {
    pub fn histograms(&self, stats_type: StatsType) -> Option<&BTreeMap<String, Histogram>> {
        self.histograms.get(&stats_type)
    }

    pub fn summary(&self, stats_type: StatsType, summary: SummaryType) -> Option<&BTreeMap<String, f64>> {
        match summary {
            SummaryType::Mean => self.mean.get(&stats_type),
            SummaryType::Stdev => self.stdev.get(&stats_type),
            SummaryType::MeanMagnitude => self.mean_magnitudes.get(&stats_type),
        }
    }
}

/// Assembles a [`StatsReport`] section by section
pub struct StatsReportBuilder {
    report: StatsReport,
}

impl StatsReportBuilder {
    pub fn new(ids: ReportIds, timestamp: i64, iteration: u64, param_names: Vec<String>) -> Self {
        Self {
            report: StatsReport {
                ids,
                timestamp,
                iteration,
                param_names,
                score: 0.0,
                performance: None,
                memory: None,
                garbage_collection: Vec::new(),
                learning_rates: None,
                histograms: BTreeMap::new(),
                mean: BTreeMap::new(),
                stdev: BTreeMap::new(),
                mean_magnitudes: BTreeMap::new(),
                stats_collection_duration_ms: 0,
            },
        }
    }

    pub fn report_score(&mut self, score: f64) -> &mut Self {
        self.report.score = score;
        self
    }

    pub fn report_performance(&mut self, performance: PerformanceStats) -> &mut Self {
        self.report.performance = Some(performance);
        self
    }

    pub fn report_memory(&mut self, memory: MemoryStats) -> &mut Self {
        self.report.memory = Some(memory);
        self
    }

    pub fn report_garbage_collection(&mut self, name: &str, delta_count: u64, delta_time_ms: u64) -> &mut Self {
        self.report.garbage_collection.push(GcStats {
            name: name.to_string(),
            delta_count,
            delta_time_ms,
        });
        self
    }

    pub fn report_learning_rates(&mut self, learning_rates: BTreeMap<String, f64>) -> &mut Self {
        self.report.learning_rates = Some(learning_rates);
        self
    }

    pub fn report_histograms(&mut self, stats_type: StatsType, histograms: BTreeMap<String, Histogram>) -> &mut Self {
        self.report.histograms.insert(stats_type, histograms);
        self
    }

    pub fn report_summary(&mut self, stats_type: StatsType, summary: SummaryType, values: BTreeMap<String, f64>) -> &mut Self {
        let target = match summary {
            SummaryType::Mean => &mut self.report.mean,
            SummaryType::Stdev => &mut self.report.stdev,
            SummaryType::MeanMagnitude => &mut self.report.mean_magnitudes,
        };
        target.insert(stats_type, values);
        self
    }

    pub fn report_stats_collection_duration(&mut self, duration_ms: i64) -> &mut Self {
        self.report.stats_collection_duration_ms = duration_ms;
        self
    }

    pub fn build(self) -> StatsReport {
        self.report
    }
}
