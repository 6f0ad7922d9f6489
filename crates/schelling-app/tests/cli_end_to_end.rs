use anyhow::Result;
use clap::Parser;
use schelling_app::{Cli, Command, dispatch, execute_run, execute_sweep};
use serde::Deserialize;
use std::fs;
use tempfile::tempdir;

#[allow(dead_code)]
#[derive(Debug, Deserialize)]
struct RunSummaryDto {
    iterations: u32,
    total_relocations: u64,
    converged: bool,
    mean_similarity: f64,
}

#[allow(dead_code)]
#[derive(Debug, Deserialize)]
struct RunReportDto {
    initial_similarity: f64,
    summary: RunSummaryDto,
    history: Vec<serde_json::Value>,
    images: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SweepPointDto {
    threshold: f64,
    mean_similarity: f64,
}

#[derive(Debug, Deserialize)]
struct SweepResultDto {
    points: Vec<SweepPointDto>,
}

#[derive(Debug, Deserialize)]
struct SweepReportDto {
    sweep: SweepResultDto,
    curve: Option<String>,
}

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(args).expect("cli parse")
}

#[test]
fn run_writes_images_and_report() -> Result<()> {
    let dir = tempdir()?;
    let out = dir.path().to_str().expect("utf8 path");
    let cli = parse(&[
        "schelling",
        "run",
        "--width",
        "12",
        "--height",
        "10",
        "--threshold",
        "0.5",
        "--iterations",
        "30",
        "--seed",
        "42",
        "--out-dir",
        out,
        "--cell-px",
        "6",
    ]);
    let Command::Run(args) = &cli.command else {
        panic!("expected run command");
    };
    let report = execute_run(args)?;
    assert_eq!(report.images.len(), 2);
    for image in &report.images {
        let bytes = fs::read(image)?;
        assert_eq!(&bytes[0..4], b"\x89PNG");
    }
    assert!(dir.path().join("schelling_2_initial.png").exists());
    assert!(dir.path().join("schelling_2_50_final.png").exists());

    let raw = fs::read_to_string(dir.path().join("run_report.json"))?;
    let dto: RunReportDto = serde_json::from_str(&raw)?;
    assert!(dto.summary.iterations >= 1 && dto.summary.iterations <= 30);
    assert_eq!(dto.history.len(), dto.summary.iterations as usize);
    assert!((0.0..=1.0).contains(&dto.summary.mean_similarity));
    Ok(())
}

#[test]
fn run_honours_config_file_and_no_images() -> Result<()> {
    let dir = tempdir()?;
    let config_path = dir.path().join("config.json");
    fs::write(
        &config_path,
        r#"{"width": 8, "height": 8, "empty_ratio": 0.25, "similarity_threshold": 0.0, "rng_seed": 9}"#,
    )?;
    let cli = parse(&[
        "schelling",
        "run",
        "--config",
        config_path.to_str().expect("utf8 path"),
        "--out-dir",
        dir.path().to_str().expect("utf8 path"),
        "--no-images",
    ]);
    let Command::Run(args) = &cli.command else {
        panic!("expected run command");
    };
    let report = execute_run(args)?;
    assert!(report.images.is_empty());
    assert_eq!(report.config.width, 8);
    assert_eq!(report.summary.iterations, 1);
    assert_eq!(report.summary.total_relocations, 0);
    assert_eq!(report.terminal.agent_count, 48);
    Ok(())
}

#[test]
fn sweep_writes_curve_and_sorted_points() -> Result<()> {
    let dir = tempdir()?;
    let cli = parse(&[
        "schelling",
        "sweep",
        "--width",
        "10",
        "--height",
        "10",
        "--iterations",
        "20",
        "--seed",
        "7",
        "--thresholds",
        "0.6,0.0,0.3",
        "--out-dir",
        dir.path().to_str().expect("utf8 path"),
    ]);
    let Command::Sweep(args) = &cli.command else {
        panic!("expected sweep command");
    };
    execute_sweep(args)?;

    let raw = fs::read_to_string(dir.path().join("sweep_report.json"))?;
    let dto: SweepReportDto = serde_json::from_str(&raw)?;
    let thresholds: Vec<_> = dto.sweep.points.iter().map(|p| p.threshold).collect();
    assert_eq!(thresholds, vec![0.0, 0.3, 0.6]);
    for point in &dto.sweep.points {
        assert!((0.0..=1.0).contains(&point.mean_similarity));
    }
    let curve = dto.curve.expect("curve path");
    assert!(fs::metadata(curve)?.len() > 0);
    Ok(())
}

#[test]
fn demo_runs_showcase_and_sweep() -> Result<()> {
    let dir = tempdir()?;
    let cli = parse(&[
        "schelling",
        "demo",
        "--width",
        "10",
        "--height",
        "10",
        "--iterations",
        "15",
        "--seed",
        "2014",
        "--showcase",
        "0.3,0.8",
        "--out-dir",
        dir.path().to_str().expect("utf8 path"),
    ]);
    dispatch(&cli)?;
    assert!(dir.path().join("schelling_2_initial.png").exists());
    assert!(dir.path().join("schelling_2_30_final.png").exists());
    assert!(dir.path().join("schelling_2_80_final.png").exists());
    assert!(dir.path().join("schelling_segregation.png").exists());
    assert!(dir.path().join("demo_report.json").exists());
    Ok(())
}

#[test]
fn invalid_configuration_fails_before_simulating() {
    let dir = tempdir().expect("tempdir");
    let cli = parse(&[
        "schelling",
        "run",
        "--empty-ratio",
        "1.0",
        "--out-dir",
        dir.path().to_str().expect("utf8 path"),
    ]);
    let err = dispatch(&cli).expect_err("invalid empty ratio");
    assert!(format!("{err:#}").contains("empty_ratio"));
    assert!(!dir.path().join("run_report.json").exists());
}
