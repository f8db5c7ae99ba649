//! Per-iteration statistics collection
//!
//! [`StatsCollector`] is called once per training iteration. The first
//! call sends the storage metadata and the initialization report; after
//! that, every `reporting_frequency`-th call samples the model and the
//! process and sends an update report. All other calls only bump counters.

pub mod window;

pub use window::{GcTracker, Rates, ReportingWindow, RunTotals};

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{CollectorConfig, RouterErrorPolicy};
use crate::error::TelemetryResult;
use crate::model::{ModelRef, NamedArrays};
use crate::report::{
    HardwareInfo, ModelInfo, ReportIds, SoftwareInfo, StatsInitializationReportBuilder, StatsReport,
    StatsReportBuilder, StorageMetaData,
};
use crate::stats::{self, StatsType, SummaryType};
use crate::storage::StatsStorageRouter;
use crate::system::{
    self, Clock, EnvironmentInfo, ProcessEnvironment, ProcessMetricsProvider, SystemClock, SystemMetricsProvider,
};

/// Hook invoked by a training loop after every iteration
pub trait IterationListener {
    /// Whether the listener has been called at least once
    fn invoked(&self) -> bool;

    fn iteration_done(&mut self, model: ModelRef<'_>, iteration: u64) -> TelemetryResult<()>;
}

/// Collects model and system statistics and routes them to storage.
///
/// One collector belongs to one worker; it is not meant to be shared
/// between threads. The router can be shared by many collectors.
pub struct StatsCollector {
    router: Arc<dyn StatsStorageRouter>,
    config: CollectorConfig,
    ids: ReportIds,
    clock: Box<dyn Clock>,
    metrics: Box<dyn SystemMetricsProvider>,
    environment: Box<dyn EnvironmentInfo>,

    iteration_count: u64,
    totals: RunTotals,
    window: ReportingWindow,
    gc: GcTracker,
    param_names: Vec<String>,
    router_errors: usize,
}

pub struct StatsCollectorBuilder {
    router: Arc<dyn StatsStorageRouter>,
    config: CollectorConfig,
    session_id: Option<String>,
    worker_id: Option<String>,
    clock: Option<Box<dyn Clock>>,
    metrics: Option<Box<dyn SystemMetricsProvider>>,
    environment: Option<Box<dyn EnvironmentInfo>>,
}

impl StatsCollectorBuilder {
    pub fn config(mut self, config: CollectorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn worker_id(mut self, worker_id: impl Into<String>) -> Self {
        self.worker_id = Some(worker_id.into());
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    pub fn metrics_provider(mut self, metrics: impl SystemMetricsProvider + 'static) -> Self {
        self.metrics = Some(Box::new(metrics));
        self
    }

    pub fn environment(mut self, environment: impl EnvironmentInfo + 'static) -> Self {
        self.environment = Some(Box::new(environment));
        self
    }

    /// Validates the configuration and fills in generated ids and default sources
    pub fn build(self) -> TelemetryResult<StatsCollector> {
        self.config.validate()?;

        let session_id = self.session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let worker_id = self.worker_id.unwrap_or_else(system::default_worker_id);
        let hostname_timeout = Duration::from_millis(self.config.hostname_timeout_ms);

        Ok(StatsCollector {
            router: self.router,
            ids: ReportIds::new(&session_id, &worker_id),
            clock: self.clock.unwrap_or_else(|| Box::new(SystemClock)),
            metrics: self.metrics.unwrap_or_else(|| Box::new(ProcessMetricsProvider::new())),
            environment: self
                .environment
                .unwrap_or_else(|| Box::new(ProcessEnvironment::new(hostname_timeout))),
            config: self.config,
            iteration_count: 0,
            totals: RunTotals::default(),
            window: ReportingWindow::default(),
            gc: GcTracker::default(),
            param_names: Vec::new(),
            router_errors: 0,
        })
    }
}

impl StatsCollector {
    /// Collector with the default configuration and generated ids
    pub fn new(router: Arc<dyn StatsStorageRouter>) -> TelemetryResult<Self> {
        Self::builder(router).build()
    }

    pub fn builder(router: Arc<dyn StatsStorageRouter>) -> StatsCollectorBuilder {
        StatsCollectorBuilder {
            router,
            config: CollectorConfig::default(),
            session_id: None,
            worker_id: None,
            clock: None,
            metrics: None,
            environment: None,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.ids.session_id
    }

    pub fn worker_id(&self) -> &str {
        &self.ids.worker_id
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    pub fn iteration_count(&self) -> u64 {
        self.iteration_count
    }

    pub fn total_examples(&self) -> u64 {
        self.totals.examples
    }

    pub fn total_minibatches(&self) -> u64 {
        self.totals.minibatches
    }

    /// Timestamp of the last update report, `None` before the first one
    pub fn last_report_timestamp(&self) -> Option<i64> {
        self.window.start_ms
    }

    pub fn last_report_iteration(&self) -> Option<u64> {
        self.window.start_iteration
    }

    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Router failures swallowed under [`RouterErrorPolicy::LogAndContinue`]
    pub fn router_error_count(&self) -> usize {
        self.router_errors
    }

    /// Records one training iteration; see the module docs for what is sent when.
    pub fn iteration_done(&mut self, model: ModelRef<'_>, iteration: u64) -> TelemetryResult<()> {
        let result = self.collect(model, iteration);
        self.iteration_count += 1;
        result
    }

    fn collect(&mut self, model: ModelRef<'_>, iteration: u64) -> TelemetryResult<()> {
        let current_time = self.clock.now_millis();
        if self.iteration_count == 0 {
            self.totals.init_ms = Some(current_time);
        }

        // Counted before anything fallible so totals cover every call.
        if self.config.update.collect_performance_stats {
            let examples = model.batch_size();
            self.window.record_minibatch(examples);
            self.totals.record_minibatch(examples);
        }

        if self.iteration_count == 0 {
            self.do_init(model, current_time)?;
        }

        if !self.config.update.is_reporting_iteration(self.iteration_count) {
            return Ok(());
        }

        let report = self.build_report(model, current_time)?;
        debug!(
            iteration,
            report_iteration = report.iteration,
            duration_ms = report.stats_collection_duration_ms,
            "update report ready"
        );

        self.window = ReportingWindow::starting_at(current_time, self.iteration_count);

        let result = self.router.put_update(report);
        self.handle_router_result("put_update", result)
    }

    fn do_init(&mut self, model: ModelRef<'_>, init_time: i64) -> TelemetryResult<()> {
        let init_config = self.config.init.clone();
        let mut builder = StatsInitializationReportBuilder::new(self.ids.clone(), init_time);

        if init_config.collect_software_info {
            let software = self.environment.software_snapshot();
            let hostname = match self.environment.hostname() {
                Ok(name) => Some(name),
                Err(e) => {
                    warn!("Could not determine hostname: {}", e);
                    None
                }
            };

            builder.report_software_info(SoftwareInfo {
                arch: software.arch,
                os_name: software.os_name,
                runtime_name: software.runtime_name,
                runtime_version: software.runtime_version,
                runtime_spec_version: software.runtime_spec_version,
                backend: model.backend().to_string(),
                dtype: model.dtype().to_string(),
                hostname,
                process_uid: system::process_uid().to_string(),
            });
        }

        if init_config.collect_hardware_info {
            let hardware = self.metrics.hardware_snapshot();
            builder.report_hardware_info(HardwareInfo {
                available_processors: hardware.available_processors,
                device_count: hardware.device_total_memory.len(),
                heap_max_bytes: hardware.heap_max_bytes,
                off_heap_max_bytes: hardware.off_heap_max_bytes,
                device_total_memory: hardware.device_total_memory,
                hardware_uid: system::hardware_uid(),
            });
        }

        self.param_names = model.parameter_names();

        if init_config.collect_model_info {
            builder.report_model_info(ModelInfo {
                model_class: model.model_class().to_string(),
                config_json: serde_json::to_string(&model.configuration())?,
                param_names: self.param_names.clone(),
                num_layers: model.num_layers(),
                num_params: model.num_params(),
                num_vertices: model.num_vertices(),
            });
        }

        info!(
            session = %self.ids.session_id,
            worker = %self.ids.worker_id,
            model = model.kind(),
            "Stats collection initialized"
        );

        let meta = StorageMetaData::new(init_time, self.ids.clone());
        let result = self.router.put_storage_metadata(meta);
        self.handle_router_result("put_storage_metadata", result)?;

        let result = self.router.put_static_info(builder.build());
        self.handle_router_result("put_static_info", result)
    }

    fn build_report(&mut self, model: ModelRef<'_>, current_time: i64) -> TelemetryResult<StatsReport> {
        let update = &self.config.update;

        // Fallible model reads come first so a failure leaves no state behind.
        let mut activations = if update.activations.any_enabled() {
            Some(model.activations()?)
        } else {
            None
        };

        let mut builder = StatsReportBuilder::new(
            self.ids.clone(),
            current_time,
            self.iteration_count,
            self.param_names.clone(),
        );

        if update.collect_performance_stats {
            let rates = self.window.rates(current_time);
            builder.report_performance(self.totals.performance(current_time, rates));
        }

        if update.collect_memory_stats {
            builder.report_memory(self.metrics.memory_snapshot());
        }

        if update.collect_garbage_collection_stats {
            for gc in self.gc.observe(&self.metrics.gc_snapshot()) {
                builder.report_garbage_collection(&gc.name, gc.delta_count, gc.delta_time_ms);
            }
        }

        builder.report_score(model.score());

        if update.collect_learning_rates {
            match model.learning_rates() {
                Some(rates) => {
                    builder.report_learning_rates(rates);
                }
                None => debug!(model = model.kind(), "model exposes no learning rates"),
            }
        }

        for stats_type in StatsType::ALL {
            let category = update.category(stats_type);
            if !category.any_enabled() {
                continue;
            }

            let arrays: NamedArrays<'_> = match stats_type {
                StatsType::Parameters => model.parameters(),
                StatsType::Updates => model.gradients(),
                StatsType::Activations => activations.take().unwrap_or_default(),
            };

            if category.histograms {
                builder.report_histograms(stats_type, stats::histograms(&arrays, category.num_histogram_bins)?);
            }
            if category.mean {
                builder.report_summary(stats_type, SummaryType::Mean, stats::summarize(&arrays, SummaryType::Mean));
            }
            if category.stdev {
                builder.report_summary(stats_type, SummaryType::Stdev, stats::summarize(&arrays, SummaryType::Stdev));
            }
            if category.mean_magnitudes {
                builder.report_summary(
                    stats_type,
                    SummaryType::MeanMagnitude,
                    stats::summarize(&arrays, SummaryType::MeanMagnitude),
                );
            }
        }

        let end_time = self.clock.now_millis();
        builder.report_stats_collection_duration(end_time - current_time);
        Ok(builder.build())
    }

    fn handle_router_result(&mut self, operation: &str, result: TelemetryResult<()>) -> TelemetryResult<()> {
        let error = match result {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        match self.config.router_error_policy {
            RouterErrorPolicy::Fail => Err(error),
            RouterErrorPolicy::LogAndContinue { max_messages } => {
                if self.router_errors < max_messages {
                    warn!("Storage router failed during {}: {}", operation, error);
                }
                self.router_errors += 1;
                if self.router_errors == max_messages {
                    warn!("Max error messages ({}) logged; printing no more messages", max_messages);
                }
                Ok(())
            }
        }
    }
}

impl IterationListener for StatsCollector {
    fn invoked(&self) -> bool {
        self.iteration_count > 0
    }

    fn iteration_done(&mut self, model: ModelRef<'_>, iteration: u64) -> TelemetryResult<()> {
        StatsCollector::iteration_done(self, model, iteration)
    }
}
