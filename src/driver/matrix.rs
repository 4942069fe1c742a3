// src/driver/matrix.rs

//! Cross-product helpers: per-pair build/clean and job expansion.

use serde_json::Value;
use tracing::{debug, error, info};

use super::Driver;
use crate::benchmark::{Benchmark, Configuration};
use crate::errors::{BenchmatrixError, Result};
use crate::job::{Job, META_DRIVER_ARGS};

impl Driver {
    /// Build every (benchmark, configuration) pair.
    ///
    /// For each pair the configuration builds first, then the benchmark. A
    /// failing pair does not stop the others; all failures are reported
    /// together at the end.
    pub fn build(&self) -> Result<()> {
        self.for_each_pair("build", |cfg, bm| {
            cfg.build(bm)?;
            bm.build(cfg)
        })
    }

    /// Counterpart of [`Driver::build`].
    pub fn clean(&self) -> Result<()> {
        self.for_each_pair("clean", |cfg, bm| {
            cfg.clean(bm)?;
            bm.clean(cfg)
        })
    }

    fn for_each_pair<F>(&self, action: &'static str, f: F) -> Result<()>
    where
        F: Fn(&dyn Configuration, &dyn Benchmark) -> Result<()>,
    {
        let mut failures = Vec::new();
        for bm in &self.benchmarks {
            for cfg in &self.configurations {
                info!(benchmark = bm.name(), configuration = cfg.name(), "{action}");
                if let Err(e) = f(cfg.as_ref(), bm.as_ref()) {
                    error!(
                        benchmark = bm.name(),
                        configuration = cfg.name(),
                        error = %e,
                        "{action} failed"
                    );
                    failures.push(format!("{}/{}: {e}", bm.name(), cfg.name()));
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(BenchmatrixError::PairFailures { action, failures })
        }
    }

    /// Realize one job per (benchmark, invocation, configuration) cell.
    ///
    /// Jobs come from the infrastructure so they have the right kind, are
    /// populated by the configuration and finally carry the driver args
    /// under `driver_args`. The result is in cell order; infrastructures
    /// re-sort on schedule anyway.
    pub fn expand(&self) -> Result<Vec<Job>> {
        let invocations = self.invocation_count()?;
        let driver_args = Value::Object(
            self.args
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        );

        let mut jobs =
            Vec::with_capacity(self.benchmarks.len() * invocations * self.configurations.len());
        for bm in &self.benchmarks {
            for invocation in 0..invocations {
                for cfg in &self.configurations {
                    let mut job = self.infrastructure.new_job();
                    cfg.realize(bm.as_ref(), invocation, &self.args, &mut job)?;
                    check_cell(&job, bm.as_ref(), invocation, cfg.as_ref())?;
                    job.set_metadata([(META_DRIVER_ARGS, driver_args.clone())]);
                    jobs.push(job);
                }
            }
        }

        debug!(count = jobs.len(), "expanded matrix");
        Ok(jobs)
    }
}

/// A realized job must identify exactly the cell it was realized for.
fn check_cell(
    job: &Job,
    bm: &dyn Benchmark,
    invocation: usize,
    cfg: &dyn Configuration,
) -> Result<()> {
    let base = job.base();
    let tagged = base.benchmark() == Some(bm.name())
        && base.invocation() == Some(invocation as u64)
        && base.configuration() == Some(cfg.name());

    if tagged {
        Ok(())
    } else {
        Err(BenchmatrixError::ConfigError(format!(
            "configuration '{}' did not tag the job for {}/{invocation}/{}",
            cfg.name(),
            bm.name(),
            cfg.name()
        )))
    }
}
