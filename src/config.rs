//! Collector configuration: what to report, how often, and what to do when the router fails

use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::error::{TelemetryError, TelemetryResult};
use crate::stats::StatsType;

/// Statistics collected for one family of arrays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    pub histograms: bool,
    pub num_histogram_bins: usize,
    pub mean: bool,
    pub stdev: bool,
    pub mean_magnitudes: bool,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            histograms: true,
            num_histogram_bins: 20,
            mean: true,
            stdev: true,
            mean_magnitudes: true,
        }
    }
}

impl CategoryConfig {
    /// Nothing collected for this family
    pub fn disabled() -> Self {
        Self {
            histograms: false,
            num_histogram_bins: 20,
            mean: false,
            stdev: false,
            mean_magnitudes: false,
        }
    }

    pub fn any_enabled(&self) -> bool {
        self.histograms || self.mean || self.stdev || self.mean_magnitudes
    }
}

/// What goes into each update report, and how often one is produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsUpdateConfig {
    /// Produce an update report every N iterations
    pub reporting_frequency: usize,
    pub collect_performance_stats: bool,
    pub collect_memory_stats: bool,
    pub collect_garbage_collection_stats: bool,
    pub collect_learning_rates: bool,
    pub parameters: CategoryConfig,
    pub updates: CategoryConfig,
    pub activations: CategoryConfig,
}

impl Default for StatsUpdateConfig {
    fn default() -> Self {
        Self {
            reporting_frequency: 1,
            collect_performance_stats: true,
            collect_memory_stats: true,
            collect_garbage_collection_stats: true,
            collect_learning_rates: true,
            parameters: CategoryConfig::default(),
            updates: CategoryConfig::default(),
            activations: CategoryConfig::default(),
        }
    }
}

impl StatsUpdateConfig {
    pub fn category(&self, stats_type: StatsType) -> &CategoryConfig {
        match stats_type {
            StatsType::Parameters => &self.parameters,
            StatsType::Updates => &self.updates,
            StatsType::Activations => &self.activations,
        }
    }

    pub fn category_mut(&mut self, stats_type: StatsType) -> &mut CategoryConfig {
        match stats_type {
            StatsType::Parameters => &mut self.parameters,
            StatsType::Updates => &mut self.updates,
            StatsType::Activations => &mut self.activations,
        }
    }

    pub fn collect_histograms(&self, stats_type: StatsType) -> bool {
        self.category(stats_type).histograms
    }

    pub fn num_histogram_bins(&self, stats_type: StatsType) -> usize {
        self.category(stats_type).num_histogram_bins
    }

    pub fn collect_mean(&self, stats_type: StatsType) -> bool {
        self.category(stats_type).mean
    }

    pub fn collect_stdev(&self, stats_type: StatsType) -> bool {
        self.category(stats_type).stdev
    }

    pub fn collect_mean_magnitudes(&self, stats_type: StatsType) -> bool {
        self.category(stats_type).mean_magnitudes
    }

    /// Whether an iteration with this (zero-based) count produces an update report
    pub fn is_reporting_iteration(&self, iteration_count: u64) -> bool {
        let frequency = self.reporting_frequency as u64;
        frequency <= 1 || iteration_count == 0 || iteration_count % frequency == 0
    }

    pub fn validate(&self) -> TelemetryResult<()> {
        if self.reporting_frequency < 1 {
            return Err(TelemetryError::invalid_config(format!(
                "reporting frequency must be at least 1, got {}",
                self.reporting_frequency
            )));
        }
        for stats_type in StatsType::ALL {
            let category = self.category(stats_type);
            if category.histograms && category.num_histogram_bins < 1 {
                return Err(TelemetryError::invalid_config(format!(
                    "{} histogram bin count must be at least 1",
                    stats_type.as_str()
                )));
            }
        }
        Ok(())
    }
}

/// One-time information gathered on the first iteration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsInitConfig {
    pub collect_software_info: bool,
    pub collect_hardware_info: bool,
    pub collect_model_info: bool,
}

impl Default for StatsInitConfig {
    fn default() -> Self {
        Self {
            collect_software_info: true,
            collect_hardware_info: true,
            collect_model_info: true,
        }
    }
}

/// What the collector does when the router rejects a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RouterErrorPolicy {
    /// Log a bounded number of warnings and keep training
    LogAndContinue { max_messages: usize },
    /// Return the failure to the caller
    Fail,
}

impl Default for RouterErrorPolicy {
    fn default() -> Self {
        RouterErrorPolicy::LogAndContinue { max_messages: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    pub update: StatsUpdateConfig,
    pub init: StatsInitConfig,
    pub router_error_policy: RouterErrorPolicy,
    /// Upper bound on the external hostname lookup
    pub hostname_timeout_ms: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            update: StatsUpdateConfig::default(),
            init: StatsInitConfig::default(),
            router_error_policy: RouterErrorPolicy::default(),
            hostname_timeout_ms: 2000,
        }
    }
}

impl CollectorConfig {
    pub fn validate(&self) -> TelemetryResult<()> {
        self.update.validate()
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> TelemetryResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| TelemetryError::invalid_config(format!("Failed to read config file {:?}: {}", path, e)))?;

        let config: CollectorConfig = serde_json::from_str(&content)
            .map_err(|e| TelemetryError::invalid_config(format!("Failed to parse config file {:?}: {}", path, e)))?;
        config.validate()?;

        tracing::info!("Configuration loaded from {:?}", path);
        Ok(config)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> TelemetryResult<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        tracing::info!("Configuration saved to {:?}", path);
        Ok(())
    }
}

/// Create a collector configuration with closure-style section setters
pub struct ConfigBuilder {
    config: CollectorConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: CollectorConfig::default(),
        }
    }

    pub fn update(mut self, f: impl FnOnce(&mut StatsUpdateConfig)) -> Self {
        f(&mut self.config.update);
        self
    }

    pub fn init(mut self, f: impl FnOnce(&mut StatsInitConfig)) -> Self {
        f(&mut self.config.init);
        self
    }

    pub fn category(mut self, stats_type: StatsType, f: impl FnOnce(&mut CategoryConfig)) -> Self {
        f(self.config.update.category_mut(stats_type));
        self
    }

    pub fn reporting_frequency(mut self, frequency: usize) -> Self {
        self.config.update.reporting_frequency = frequency;
        self
    }

    pub fn router_error_policy(mut self, policy: RouterErrorPolicy) -> Self {
        self.config.router_error_policy = policy;
        self
    }

    pub fn hostname_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.hostname_timeout_ms = timeout_ms;
        self
    }

    pub fn build(self) -> CollectorConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .reporting_frequency(5)
            .update(|u| {
                u.collect_memory_stats = false;
            })
            .category(StatsType::Activations, |a| *a = CategoryConfig::disabled())
            .init(|i| i.collect_hardware_info = false)
            .build();

        assert_eq!(config.update.reporting_frequency, 5);
        assert!(!config.update.collect_memory_stats);
        assert!(!config.update.collect_histograms(StatsType::Activations));
        assert!(config.update.collect_histograms(StatsType::Parameters));
        assert!(!config.init.collect_hardware_info);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cadence() {
        let every = StatsUpdateConfig::default();
        assert!((0..10).all(|i| every.is_reporting_iteration(i)));

        let config = ConfigBuilder::new().reporting_frequency(5).build().update;
        let reporting: Vec<u64> = (0..12).filter(|&i| config.is_reporting_iteration(i)).collect();
        assert_eq!(reporting, vec![0, 5, 10]);
    }

    #[test]
    fn test_validation() {
        let config = ConfigBuilder::new().reporting_frequency(0).build();
        assert!(matches!(config.validate(), Err(TelemetryError::ConfigurationError(_))));

        let config = ConfigBuilder::new()
            .category(StatsType::Updates, |u| u.num_histogram_bins = 0)
            .build();
        assert!(config.validate().is_err());

        let config = ConfigBuilder::new()
            .category(StatsType::Updates, |u| {
                u.histograms = false;
                u.num_histogram_bins = 0;
            })
            .build();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_file_io() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("telemetry.json");

        let config = ConfigBuilder::new()
            .reporting_frequency(3)
            .router_error_policy(RouterErrorPolicy::Fail)
            .build();
        config.save_to_file(&config_path).unwrap();

        let loaded = CollectorConfig::load_from_file(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_config_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("partial.json");
        std::fs::write(
            &config_path,
            r#"{ "update": { "reporting_frequency": 10 }, "router_error_policy": { "mode": "log_and_continue", "max_messages": 3 } }"#,
        )
        .unwrap();

        let loaded = CollectorConfig::load_from_file(&config_path).unwrap();
        assert_eq!(loaded.update.reporting_frequency, 10);
        assert!(loaded.update.collect_performance_stats);
        assert_eq!(loaded.router_error_policy, RouterErrorPolicy::LogAndContinue { max_messages: 3 });
    }

    #[test]
    fn test_invalid_file_rejected() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("bad.json");
        std::fs::write(&config_path, r#"{ "update": { "reporting_frequency": 0 } }"#).unwrap();
        assert!(CollectorConfig::load_from_file(&config_path).is_err());
    }
}
