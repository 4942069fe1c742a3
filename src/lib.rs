// src/lib.rs

pub mod analysis;
pub mod benchmark;
pub mod cli;
pub mod config;
pub mod driver;
pub mod errors;
pub mod fs;
pub mod infra;
pub mod job;
pub mod logging;
pub mod manifest;
pub mod pipeline;
pub mod types;

use std::path::Path;

use anyhow::Result;
use tracing::{info, warn};

use crate::analysis::write_artifacts;
use crate::cli::{CliArgs, Command};
use crate::config::load_and_validate;
use crate::config::model::MatrixFile;
use crate::driver::Driver;
use crate::fs::RealFileSystem;
use crate::infra::status::{status, Progress};
use crate::infra::{default_run_name, from_config};

/// High-level entry point used by `main.rs`.
///
/// `status` only reads the run directory. Every other subcommand loads the
/// matrix file, builds a driver from it and applies the `-b`/`-c` filters.
pub async fn run(args: CliArgs) -> Result<()> {
    if let Command::Status { dir } = &args.command {
        print_status(dir)?;
        return Ok(());
    }

    let cfg = load_and_validate(&args.config)?;

    match &args.command {
        Command::Build => {
            let driver = driver_for(&cfg, &args, None)?;
            driver.build()?;
            info!("build complete");
        }
        Command::Clean => {
            let driver = driver_for(&cfg, &args, None)?;
            driver.clean()?;
            info!("clean complete");
        }
        Command::Run {
            invocations,
            logdir,
        } => {
            let logdir = logdir.clone().unwrap_or_else(|| cfg.driver.logdir.clone());
            let mut driver = driver_for(&cfg, &args, Some(logdir.as_path()))?;
            driver.set_invocations(*invocations as usize);
            let log = driver.start().await?;
            println!("{}", log.basedir.display());
        }
        Command::Analyse { dir } => {
            let driver = driver_for(&cfg, &args, Some(dir.as_path()))?;
            let report = driver.analyse(&RealFileSystem, dir)?;

            for w in &report.warnings {
                let key = w.key.as_ref().map(ToString::to_string).unwrap_or_default();
                warn!(short_id = %w.short_id, key = %key, "{}", w.message);
            }
            for (benchmark, error) in &report.failures {
                warn!(benchmark = %benchmark, error = %error, "no artifact written");
            }
            if !report.missing.is_empty() {
                info!(count = report.missing.len(), "jobs without output were skipped");
            }

            for path in write_artifacts(dir, &report)? {
                println!("{}", path.display());
            }
        }
        Command::Status { .. } => {}
    }

    Ok(())
}

/// Build a filtered driver.
///
/// `under` is the parent directory of the run directory for `run`, or the
/// run directory itself for `analyse`; `build`/`clean` never touch it.
fn driver_for(cfg: &MatrixFile, args: &CliArgs, under: Option<&Path>) -> Result<Driver> {
    let (name, basedir) = match (&args.command, under) {
        (Command::Run { .. }, Some(logdir)) => {
            let name = cfg.driver.name.clone().unwrap_or_else(default_run_name);
            let basedir = logdir.join(&name);
            (name, basedir)
        }
        (_, Some(dir)) => (dir_name(dir), dir.to_path_buf()),
        (_, None) => (default_run_name(), cfg.driver.logdir.clone()),
    };

    let infrastructure = from_config(&cfg.infrastructure, name, basedir);
    let mut driver = Driver::from_matrix(cfg, infrastructure)?;
    driver
        .prune_benchmarks(&args.benchmarks)
        .prune_configurations(&args.configurations);
    Ok(driver)
}

fn dir_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string())
}

/// Operator-facing progress report for a run directory.
fn print_status(dir: &Path) -> Result<()> {
    let summary = status(&RealFileSystem, dir)?;

    println!(
        "{}: {}/{} jobs have output",
        dir.display(),
        summary.completed(),
        summary.total()
    );
    for job in &summary.jobs {
        let state = match &job.progress {
            Progress::Pending => "pending".to_string(),
            Progress::Completed { exit: None } => "done".to_string(),
            Progress::Completed { exit: Some(exit) } => format!("done ({exit:?})"),
        };
        println!(
            "  {} {}/{} {}",
            job.short_id,
            job.benchmark.as_deref().unwrap_or("?"),
            job.configuration.as_deref().unwrap_or("?"),
            state
        );
    }
    if summary.is_finished() {
        println!("all jobs finished; ready for analysis");
    }
    Ok(())
}
