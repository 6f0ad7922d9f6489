use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use schelling_core::{
    IterationSummary, RunSummary, SchellingConfig, SimilarityReport, Simulation, SweepResult,
    similarity_report, threshold_sweep,
};
use schelling_render::{GridRenderOptions, render_grid_png, render_sweep_png};
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::{DemoArgs, OutputArgs, RunArgs, SweepArgs};

const CURVE_WIDTH: u32 = 640;
const CURVE_HEIGHT: u32 = 480;
const PROGRESS_EVERY: u32 = 50;

/// JSON report written after a single run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub config: SchellingConfig,
    pub initial_similarity: f64,
    pub summary: RunSummary,
    pub terminal: SimilarityReport,
    pub history: Vec<IterationSummary>,
    pub images: Vec<PathBuf>,
}

/// JSON report written after a threshold sweep.
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub config: SchellingConfig,
    pub sweep: SweepResult,
    pub curve: Option<PathBuf>,
}

/// Both reports produced by the demonstration.
#[derive(Debug, Clone, Serialize)]
pub struct DemoReport {
    pub runs: Vec<RunReport>,
    pub sweep: SweepReport,
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(file, value).context("failed to serialize report")?;
    Ok(())
}

fn write_png(bytes: &[u8], path: &Path) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "wrote image");
    Ok(())
}

fn percent(threshold: f64) -> u32 {
    (threshold * 100.0).round() as u32
}

/// Simulate one configuration, optionally rendering its initial layout too.
fn simulate(
    config: SchellingConfig,
    output: &OutputArgs,
    write_initial: bool,
) -> Result<RunReport> {
    fs::create_dir_all(&output.out_dir)
        .with_context(|| format!("failed to create {}", output.out_dir.display()))?;
    let render = GridRenderOptions {
        cell_px: output.cell_px,
        ..GridRenderOptions::default()
    };
    let mut simulation = Simulation::with_observer(
        config.clone(),
        Box::new(|summary: &IterationSummary| {
            if summary.iteration % PROGRESS_EVERY == 0 {
                info!(
                    iteration = summary.iteration,
                    relocations = summary.relocations,
                    "simulation progress"
                );
            }
        }),
    )?;
    let initial_similarity = schelling_core::mean_similarity(simulation.grid())?;

    let mut images = Vec::new();
    if write_initial && !output.no_images {
        let path = output
            .out_dir
            .join(format!("schelling_{}_initial.png", config.races));
        write_png(&render_grid_png(simulation.grid(), &render)?, &path)?;
        images.push(path);
    }

    let summary = simulation.run()?;
    if summary.stranded > 0 {
        warn!(
            stranded = summary.stranded,
            "run stopped with unsatisfied agents and no empty houses"
        );
    } else if !summary.converged {
        warn!(
            iterations = summary.iterations,
            "iteration cap reached before a fixed point"
        );
    }

    if !output.no_images {
        let path = output.out_dir.join(format!(
            "schelling_{}_{}_final.png",
            config.races,
            percent(config.similarity_threshold)
        ));
        write_png(&render_grid_png(simulation.grid(), &render)?, &path)?;
        images.push(path);
    }

    Ok(RunReport {
        terminal: similarity_report(simulation.grid(), config.similarity_threshold)?,
        history: simulation.history().copied().collect(),
        config,
        initial_similarity,
        summary,
        images,
    })
}

fn sweep(config: SchellingConfig, thresholds: &[f64], output: &OutputArgs) -> Result<SweepReport> {
    fs::create_dir_all(&output.out_dir)
        .with_context(|| format!("failed to create {}", output.out_dir.display()))?;
    let result = threshold_sweep(&config, thresholds)?;
    for point in &result.points {
        info!(
            threshold = point.threshold,
            similarity = point.mean_similarity,
            iterations = point.iterations,
            "sweep point"
        );
    }
    let curve = if output.no_images {
        None
    } else {
        let path = output.out_dir.join("schelling_segregation.png");
        write_png(&render_sweep_png(&result, CURVE_WIDTH, CURVE_HEIGHT)?, &path)?;
        Some(path)
    };
    Ok(SweepReport {
        config,
        sweep: result,
        curve,
    })
}

/// `schelling run`
pub fn execute_run(args: &RunArgs) -> Result<RunReport> {
    let config = args.config.resolve()?;
    let report = simulate(config, &args.output, true)?;
    write_json(&report, &args.output.out_dir.join("run_report.json"))?;
    Ok(report)
}

/// `schelling sweep`
pub fn execute_sweep(args: &SweepArgs) -> Result<SweepReport> {
    let config = args.config.resolve()?;
    let report = sweep(config, &args.thresholds, &args.output)?;
    write_json(&report, &args.output.out_dir.join("sweep_report.json"))?;
    Ok(report)
}

/// `schelling demo`
pub fn execute_demo(args: &DemoArgs) -> Result<DemoReport> {
    let base = args.config.resolve()?;
    let mut runs = Vec::with_capacity(args.showcase.len());
    for (idx, &threshold) in args.showcase.iter().enumerate() {
        let config = SchellingConfig {
            similarity_threshold: threshold,
            rng_seed: base.rng_seed.map(|seed| seed.wrapping_add(idx as u64)),
            ..base.clone()
        };
        config
            .validate()
            .with_context(|| format!("invalid showcase threshold {threshold}"))?;
        runs.push(simulate(config, &args.output, idx == 0)?);
    }
    let thresholds = schelling_core::DEFAULT_SWEEP_THRESHOLDS;
    let sweep_report = sweep(base, &thresholds, &args.output)?;
    let report = DemoReport {
        runs,
        sweep: sweep_report,
    };
    write_json(&report, &args.output.out_dir.join("demo_report.json"))?;
    Ok(report)
}
