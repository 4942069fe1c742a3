// src/driver/mod.rs

//! Matrix orchestration.
//!
//! A [`Driver`] owns the registered benchmarks and configurations, the
//! driver-level arguments and one [`Infrastructure`]. A run is a loop of
//! rounds:
//!
//! 1. expand the matrix into one job per (benchmark, invocation,
//!    configuration) cell,
//! 2. schedule the batch (which records it in the manifest) and run it,
//! 3. record the round in the [`RunLog`] and ask the stop predicate whether
//!    to go again.
//!
//! Analysis is independent of the loop: it only needs the benchmarks and a
//! run directory, and may happen in another process entirely.

mod matrix;
pub mod run_log;

use std::path::Path;

use chrono::Local;
use tracing::{info, warn};

use crate::analysis::{self, AnalysisReport};
use crate::benchmark::{Benchmark, Configuration, ShellBenchmark, ShellConfiguration};
use crate::config::model::MatrixFile;
use crate::errors::{BenchmatrixError, Result};
use crate::fs::FileSystem;
use crate::infra::Infrastructure;
use crate::pipeline::{run_chain, DriverView, PipelineContext, PipelineData};
use crate::types::ArgMap;

pub use run_log::{HostInfo, RoundRecord, RunLog, RUNINFO_FILE};

/// Decides, after each round, whether the run is over.
pub type StopPredicate = Box<dyn FnMut(&RunLog) -> bool + Send>;

pub struct Driver {
    benchmarks: Vec<Box<dyn Benchmark>>,
    configurations: Vec<Box<dyn Configuration>>,
    args: ArgMap,
    invocations: Option<usize>,
    infrastructure: Box<dyn Infrastructure>,
    should_stop: StopPredicate,
}

impl Driver {
    /// Empty driver bound to `infrastructure`. Stops after one round.
    pub fn new(infrastructure: Box<dyn Infrastructure>) -> Self {
        Self {
            benchmarks: Vec::new(),
            configurations: Vec::new(),
            args: ArgMap::new(),
            invocations: None,
            infrastructure,
            should_stop: Box::new(|_| true),
        }
    }

    /// Driver populated from a validated matrix file.
    pub fn from_matrix(cfg: &MatrixFile, infrastructure: Box<dyn Infrastructure>) -> Result<Self> {
        let mut driver = Self::new(infrastructure);

        for (name, bm) in &cfg.benchmark {
            driver.add_benchmark(ShellBenchmark::from_config(name, bm)?);
        }
        for (name, c) in &cfg.configuration {
            driver.add_configuration(ShellConfiguration::from_config(name, c));
        }

        driver.update_args(cfg.driver.args.clone());
        if let Some(n) = cfg.driver.invocations {
            driver.set_invocations(n);
        }
        driver.stop_after_rounds(cfg.driver.rounds);
        Ok(driver)
    }

    pub fn add_benchmark(&mut self, benchmark: impl Benchmark + 'static) -> &mut Self {
        self.benchmarks.push(Box::new(benchmark));
        self
    }

    pub fn add_configuration(&mut self, configuration: impl Configuration + 'static) -> &mut Self {
        self.configurations.push(Box::new(configuration));
        self
    }

    /// Merge driver-level arguments; later values win.
    pub fn update_args(&mut self, args: ArgMap) -> &mut Self {
        self.args.extend(args);
        self
    }

    pub fn set_invocations(&mut self, invocations: usize) -> &mut Self {
        self.invocations = Some(invocations);
        self
    }

    /// Configured invocation count. Zero counts as unset.
    pub(crate) fn invocation_count(&self) -> Result<usize> {
        match self.invocations {
            Some(n) if n > 0 => Ok(n),
            _ => Err(BenchmatrixError::InvocationsUnset),
        }
    }

    pub fn set_stop_predicate<F>(&mut self, predicate: F) -> &mut Self
    where
        F: FnMut(&RunLog) -> bool + Send + 'static,
    {
        self.should_stop = Box::new(predicate);
        self
    }

    /// Stop once `rounds` rounds have completed.
    pub fn stop_after_rounds(&mut self, rounds: usize) -> &mut Self {
        self.set_stop_predicate(move |log| log.rounds_completed() >= rounds)
    }

    /// Keep only the named benchmarks. An empty list keeps everything.
    pub fn prune_benchmarks(&mut self, keep: &[String]) -> &mut Self {
        prune("benchmark", &mut self.benchmarks, keep, |b| b.name());
        self
    }

    /// Keep only the named configurations. An empty list keeps everything.
    pub fn prune_configurations(&mut self, keep: &[String]) -> &mut Self {
        prune("configuration", &mut self.configurations, keep, |c| c.name());
        self
    }

    pub fn benchmarks(&self) -> &[Box<dyn Benchmark>] {
        &self.benchmarks
    }

    pub fn configurations(&self) -> &[Box<dyn Configuration>] {
        &self.configurations
    }

    pub fn args(&self) -> &ArgMap {
        &self.args
    }

    pub fn infrastructure(&self) -> &dyn Infrastructure {
        self.infrastructure.as_ref()
    }

    pub fn infrastructure_mut(&mut self) -> &mut dyn Infrastructure {
        self.infrastructure.as_mut()
    }

    /// Read-only view handed to pipeline stages.
    pub fn bind(&self) -> DriverView {
        DriverView {
            benchmarks: self.benchmarks.iter().map(|b| b.name().to_string()).collect(),
            configurations: self
                .configurations
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
            args: self.args.clone(),
        }
    }

    /// Run rounds until the stop predicate holds.
    ///
    /// Fails before touching the infrastructure if the invocation count is
    /// unset. `RUNINFO.json` is rewritten after every round.
    pub async fn start(&mut self) -> Result<RunLog> {
        let invocations = self.invocation_count()?;

        self.infrastructure.setup()?;
        let mut log = RunLog::new(
            self.infrastructure.name(),
            self.infrastructure.basedir(),
            invocations,
            self.args.clone(),
        );

        loop {
            let index = log.rounds_completed();
            let started_at = Local::now();
            info!(round = index, invocations, "starting round");

            let jobs = self.expand()?;
            self.infrastructure.schedule(jobs)?;
            let report = self.infrastructure.run().await?;

            let record = RoundRecord {
                index,
                started_at,
                finished_at: Local::now(),
                report,
            };
            info!(
                round = index,
                jobs = record.jobs(),
                failures = record.failures(),
                "round finished"
            );
            log.rounds.push(record);
            log.write()?;

            if (self.should_stop)(&log) {
                break;
            }
        }

        info!(
            rounds = log.rounds_completed(),
            jobs = log.jobs_run(),
            basedir = %log.basedir.display(),
            "run complete"
        );
        Ok(log)
    }

    /// Regroup `dir` and fold every benchmark's results through its
    /// pipelines.
    ///
    /// A failing chain only costs that benchmark its artifact.
    pub fn analyse(&self, fs: &dyn FileSystem, dir: &Path) -> Result<AnalysisReport> {
        let regrouped = analysis::regroup(fs, dir, &self.benchmarks)?;
        let view = self.bind();

        let mut report = AnalysisReport {
            warnings: regrouped.warnings,
            missing: regrouped.missing,
            ..AnalysisReport::default()
        };

        for (name, results) in regrouped.results {
            let Some(benchmark) = self.benchmarks.iter().find(|b| b.name() == name) else {
                continue;
            };
            let ctx = PipelineContext {
                driver: &view,
                benchmark: &name,
            };

            match run_chain(&benchmark.pipelines(), &ctx, PipelineData::Grouped(results)) {
                Ok(data) => {
                    report.artifacts.insert(name, data.into_json());
                }
                Err(e) => {
                    warn!(benchmark = %name, error = %e, "pipeline chain failed");
                    report.failures.insert(name, e.to_string());
                }
            }
        }

        Ok(report)
    }
}

fn prune<T: ?Sized>(
    kind: &str,
    items: &mut Vec<Box<T>>,
    keep: &[String],
    name_of: impl Fn(&T) -> &str,
) {
    if keep.is_empty() {
        return;
    }
    for wanted in keep {
        if !items.iter().any(|item| name_of(&**item) == wanted) {
            warn!(kind, name = %wanted, "asked to keep an unknown entry");
        }
    }
    items.retain(|item| keep.iter().any(|k| k == name_of(&**item)));
}
