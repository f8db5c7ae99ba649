//! Anvil Telemetry CLI - collect and inspect training statistics

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use anvil_telemetry::{
    error::{TelemetryError, TelemetryResult},
    model::{Model, ModelRef, NamedArrays, SequentialModel},
    storage::read_records,
    version, CollectorConfig, ConfigBuilder, FileStatsStorage, InMemoryStatsStorage, ReportEncoding, StatsCollector,
    StatsStorageRouter, StatsType, StorageRecord, SummaryType,
};

#[derive(Parser)]
#[command(name = "anvil-telemetry")]
#[command(about = "Training statistics collection for Anvil models")]
#[command(version = version())]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a synthetic dense network and record its statistics
    Run {
        /// Number of training iterations
        #[arg(short, long, default_value = "100")]
        iterations: u64,

        /// Examples per minibatch
        #[arg(short, long, default_value = "32")]
        batch_size: usize,

        /// Layer widths, input first
        #[arg(long, value_delimiter = ',', default_value = "784,256,10")]
        layers: Vec<usize>,

        /// Report every N iterations (overrides the configuration file)
        #[arg(short, long)]
        frequency: Option<usize>,

        /// Output file for the records; kept in memory and summarized when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Record encoding (json, bincode)
        #[arg(long, default_value = "json")]
        format: String,

        /// Collector configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Random seed for the synthetic network
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Print a summary of every record in a stats file
    Inspect {
        /// Stats file written by `run`
        path: PathBuf,

        /// Record encoding (json, bincode)
        #[arg(long, default_value = "json")]
        format: String,
    },

    /// Generate a configuration template
    Config {
        /// Output path for configuration file
        #[arg(short, long, default_value = "./telemetry_config.json")]
        output: PathBuf,
    },
}

fn main() -> TelemetryResult<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Run { iterations, batch_size, layers, frequency, output, format, config, seed } => {
            let encoding: ReportEncoding = format.parse()?;
            run(iterations, batch_size, &layers, frequency, output.as_deref(), encoding, config.as_deref(), seed)?;
        }

        Commands::Inspect { path, format } => {
            let encoding: ReportEncoding = format.parse()?;
            inspect(&path, encoding)?;
        }

        Commands::Config { output } => {
            generate_config(&output)?;
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run(
    iterations: u64,
    batch_size: usize,
    layers: &[usize],
    frequency: Option<usize>,
    output: Option<&Path>,
    encoding: ReportEncoding,
    config_path: Option<&Path>,
    seed: u64,
) -> TelemetryResult<()> {
    let mut config = match config_path {
        Some(path) => {
            info!("Configuration loaded from {:?}", path);
            CollectorConfig::load_from_file(path)?
        }
        None => CollectorConfig::default(),
    };
    if let Some(frequency) = frequency {
        config.update.reporting_frequency = frequency;
    }

    let memory = Arc::new(InMemoryStatsStorage::new());
    let router: Arc<dyn StatsStorageRouter> = match output {
        Some(path) => Arc::new(FileStatsStorage::open(path, encoding)?),
        None => memory.clone(),
    };
    let mut collector = StatsCollector::builder(router).config(config).build()?;
    let mut model = SyntheticNet::new(layers, batch_size, seed)?;

    info!("Starting run {} ({} iterations)", collector.session_id(), iterations);
    for iteration in 0..iterations {
        model.step(iteration);
        collector.iteration_done(ModelRef::Sequential(&model), iteration)?;
    }

    if collector.router_error_count() > 0 {
        warn!("{} records could not be stored", collector.router_error_count());
    }
    info!(
        "Recorded {} iterations ({} examples)",
        collector.iteration_count(),
        collector.total_examples()
    );

    match output {
        Some(path) => info!("Records written to {:?}", path),
        None => print_records(&memory.records()),
    }
    Ok(())
}

fn inspect(path: &Path, encoding: ReportEncoding) -> TelemetryResult<()> {
    let records = read_records(path, encoding)?;
    print_records(&records);
    info!("{} records in {:?}", records.len(), path);
    Ok(())
}

fn print_records(records: &[StorageRecord]) {
    for record in records {
        match record {
            StorageRecord::MetaData(meta) => {
                println!("metadata    session={} worker={}", meta.ids.session_id, meta.ids.worker_id);
            }
            StorageRecord::StaticInfo(init) => {
                let model = init
                    .model
                    .as_ref()
                    .map(|m| format!("{} ({} params)", m.model_class, m.num_params))
                    .unwrap_or_else(|| "-".to_string());
                let host = init
                    .software
                    .as_ref()
                    .and_then(|s| s.hostname.clone())
                    .unwrap_or_else(|| "-".to_string());
                println!("static_info model={} host={}", model, host);
            }
            StorageRecord::Update(report) => {
                let rate = report.performance.as_ref().map(|p| p.examples_per_second).unwrap_or(0.0);
                let mean_magnitude = report
                    .summary(StatsType::Parameters, SummaryType::MeanMagnitude)
                    .map(|values| values.values().sum::<f64>() / values.len().max(1) as f64);
                println!(
                    "update      iteration={} score={:.5} examples/s={:.1} param_mean_magnitude={}",
                    report.iteration,
                    report.score,
                    rate,
                    mean_magnitude.map(|m| format!("{:.5}", m)).unwrap_or_else(|| "-".to_string()),
                );
            }
        }
    }
}

fn generate_config(output: &Path) -> TelemetryResult<()> {
    let config = ConfigBuilder::new()
        .reporting_frequency(10)
        .category(StatsType::Activations, |a| a.num_histogram_bins = 50)
        .build();
    config.save_to_file(output)?;
    info!("Configuration template written to {:?}", output);
    Ok(())
}

/// Dense network whose weights follow a noisy descent
struct SyntheticNet {
    params: Vec<(String, Vec<f32>)>,
    grads: Vec<(String, Vec<f32>)>,
    inputs: Vec<Vec<f32>>,
    sizes: Vec<usize>,
    batch_size: usize,
    learning_rate: f32,
    score: f64,
    rng: StdRng,
}

impl SyntheticNet {
    fn new(sizes: &[usize], batch_size: usize, seed: u64) -> TelemetryResult<Self> {
        if sizes.len() < 2 || sizes.contains(&0) {
            return Err(TelemetryError::InvalidInput(
                "at least two non-zero layer widths are required".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut params: Vec<(String, Vec<f32>)> = Vec::new();
        for (i, pair) in sizes.windows(2).enumerate() {
            let scale = (2.0 / pair[0] as f32).sqrt();
            let weights: Vec<f32> = (0..pair[0] * pair[1]).map(|_| rng.gen_range(-scale..scale)).collect();
            params.push((format!("{}_W", i), weights));
            params.push((format!("{}_b", i), vec![0.0; pair[1]]));
        }
        let grads = params.iter().map(|(n, v)| (n.clone(), vec![0.0; v.len()])).collect();
        let inputs = sizes[..sizes.len() - 1].iter().map(|n| vec![0.0; n * batch_size]).collect();

        Ok(Self {
            params,
            grads,
            inputs,
            sizes: sizes.to_vec(),
            batch_size,
            learning_rate: 0.01,
            score: 2.5,
            rng,
        })
    }

    fn step(&mut self, iteration: u64) {
        for ((_, grad), (_, param)) in self.grads.iter_mut().zip(self.params.iter_mut()) {
            for (g, p) in grad.iter_mut().zip(param.iter_mut()) {
                *g = 0.1 * *p + self.rng.gen_range(-0.05..0.05);
                *p -= self.learning_rate * *g;
            }
        }
        for input in &mut self.inputs {
            for x in input.iter_mut() {
                *x = (self.rng.gen::<f32>() - 0.3).max(0.0);
            }
        }
        let noise: f64 = self.rng.gen_range(-0.02..0.02);
        self.score = 2.5 / (1.0 + 0.05 * iteration as f64) + noise;
    }
}

impl Model for SyntheticNet {
    fn model_class(&self) -> &str {
        "SyntheticNet"
    }

    fn score(&self) -> f64 {
        self.score
    }

    fn parameters(&self) -> NamedArrays<'_> {
        self.params.iter().map(|(n, v)| (n.clone(), v.as_slice())).collect()
    }

    fn gradients(&self) -> NamedArrays<'_> {
        self.grads.iter().map(|(n, v)| (n.clone(), v.as_slice())).collect()
    }

    fn batch_size(&self) -> Option<usize> {
        Some(self.batch_size)
    }

    fn num_layers(&self) -> usize {
        self.sizes.len() - 1
    }

    fn num_params(&self) -> usize {
        self.params.iter().map(|(_, v)| v.len()).sum()
    }

    fn configuration(&self) -> serde_json::Value {
        serde_json::json!({
            "layers": self.sizes,
            "activation": "relu",
            "learning_rate": self.learning_rate,
        })
    }

    fn learning_rates(&self) -> Option<BTreeMap<String, f64>> {
        Some(self.params.iter().map(|(n, _)| (n.clone(), self.learning_rate as f64)).collect())
    }
}

impl SequentialModel for SyntheticNet {
    fn layer_inputs(&self) -> Vec<Option<&[f32]>> {
        self.inputs.iter().map(|v| Some(v.as_slice())).collect()
    }
}
