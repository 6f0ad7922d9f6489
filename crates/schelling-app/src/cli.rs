use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use schelling_core::{DEFAULT_SWEEP_THRESHOLDS, SchellingConfig, SweepOrder};

#[derive(Parser, Debug)]
#[command(
    name = "schelling",
    version,
    about = "Simulate Schelling's segregation model and chart its outcomes"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a single simulation, writing grid snapshots and a JSON report.
    Run(RunArgs),
    /// Sweep similarity thresholds and chart mean similarity against them.
    Sweep(SweepArgs),
    /// Reproduce the reference demonstration: three thresholds, then a sweep.
    Demo(DemoArgs),
}

/// Snapshot traversal order accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OrderArg {
    RowMajor,
    Shuffled,
}

impl From<OrderArg> for SweepOrder {
    fn from(order: OrderArg) -> Self {
        match order {
            OrderArg::RowMajor => SweepOrder::RowMajor,
            OrderArg::Shuffled => SweepOrder::Shuffled,
        }
    }
}

/// Configuration source plus per-field overrides.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// JSON file holding a (possibly partial) simulation configuration.
    #[arg(long, env = "SCHELLING_CONFIG")]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub width: Option<u32>,
    #[arg(long)]
    pub height: Option<u32>,
    /// Fraction of houses left empty, in [0, 1).
    #[arg(long)]
    pub empty_ratio: Option<f64>,
    /// Minimum same-group neighbor fraction an agent tolerates.
    #[arg(long)]
    pub threshold: Option<f64>,
    /// Maximum number of relocation passes.
    #[arg(long)]
    pub iterations: Option<u32>,
    /// Number of groups.
    #[arg(long)]
    pub races: Option<u16>,
    /// RNG seed for reproducible runs.
    #[arg(long, env = "SCHELLING_SEED")]
    pub seed: Option<u64>,
    #[arg(long, value_enum)]
    pub order: Option<OrderArg>,
}

impl ConfigArgs {
    /// Load the base configuration and apply command-line overrides.
    pub fn resolve(&self) -> Result<SchellingConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                serde_json::from_str::<SchellingConfig>(&raw)
                    .with_context(|| format!("failed to parse config {}", path.display()))?
            }
            None => SchellingConfig::default(),
        };
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(empty_ratio) = self.empty_ratio {
            config.empty_ratio = empty_ratio;
        }
        if let Some(threshold) = self.threshold {
            config.similarity_threshold = threshold;
        }
        if let Some(iterations) = self.iterations {
            config.n_iterations = iterations;
        }
        if let Some(races) = self.races {
            config.races = races;
        }
        if let Some(seed) = self.seed {
            config.rng_seed = Some(seed);
        }
        if let Some(order) = self.order {
            config.sweep_order = order.into();
        }
        config.validate().context("invalid simulation configuration")?;
        Ok(config)
    }
}

/// Where and how output files are written.
#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Directory receiving images and reports.
    #[arg(long, short, default_value = ".")]
    pub out_dir: PathBuf,
    /// Edge length of one grid cell in rendered images.
    #[arg(long, default_value_t = 12)]
    pub cell_px: u32,
    /// Skip PNG output.
    #[arg(long)]
    pub no_images: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug, Clone)]
pub struct SweepArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
    #[command(flatten)]
    pub output: OutputArgs,
    /// Comma-separated similarity thresholds.
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_SWEEP_THRESHOLDS)]
    pub thresholds: Vec<f64>,
}

#[derive(Args, Debug, Clone)]
pub struct DemoArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
    #[command(flatten)]
    pub output: OutputArgs,
    /// Thresholds rendered individually before the sweep.
    #[arg(long, value_delimiter = ',', default_values_t = [0.3, 0.5, 0.8])]
    pub showcase: Vec<f64>,
}
