// src/benchmark/mod.rs

//! Contracts for the user-supplied halves of the matrix.
//!
//! A [`Benchmark`] knows how to build/clean itself against a configuration
//! and how to turn captured output into [`Stats`]. A [`Configuration`]
//! knows how to build/clean itself and how to *realize* one matrix cell:
//! fill a job's commands, environment and identifying metadata.
//!
//! Build and clean are symmetric: for every pair the driver calls
//! `configuration.build(benchmark)` and then `benchmark.build(configuration)`,
//! so either side can own the work. Both default to doing nothing.
//!
//! [`shell`] has TOML-backed implementations of both traits.

pub mod shell;

use std::fmt::Debug;

use crate::errors::{BenchmatrixError, Result};
use crate::job::Job;
use crate::pipeline::Pipeline;
use crate::types::{ArgMap, EnvMap, Stats};

pub use shell::{ShellBenchmark, ShellConfiguration, DEFAULT_METRIC_PATTERN};

pub trait Benchmark: Send + Sync + Debug {
    fn name(&self) -> &str;

    /// Argument vector for one invocation.
    fn command(&self) -> Vec<String>;

    fn build(&self, _configuration: &dyn Configuration) -> Result<()> {
        Ok(())
    }

    fn clean(&self, _configuration: &dyn Configuration) -> Result<()> {
        Ok(())
    }

    /// Extract statistics from one invocation's captured output.
    fn parse(&self, stdout: &str, stderr: &str) -> Result<Stats>;

    /// Post-processing chain for this benchmark, in application order.
    fn pipelines(&self) -> Vec<Box<dyn Pipeline>> {
        Vec::new()
    }
}

pub trait Configuration: Send + Sync + Debug {
    fn name(&self) -> &str;

    /// Environment exported for every job of this configuration.
    fn env(&self) -> EnvMap {
        EnvMap::new()
    }

    fn build(&self, _benchmark: &dyn Benchmark) -> Result<()> {
        Ok(())
    }

    fn clean(&self, _benchmark: &dyn Benchmark) -> Result<()> {
        Ok(())
    }

    /// Populate `job` for cell (benchmark, invocation, self).
    ///
    /// Must attach exactly the `benchmark`, `invocation` and `configuration`
    /// metadata keys (see [`Job::tag_cell`]).
    fn realize(
        &self,
        benchmark: &dyn Benchmark,
        invocation: usize,
        _driver_args: &ArgMap,
        job: &mut Job,
    ) -> Result<()> {
        let command = benchmark.command();
        if command.is_empty() {
            return Err(BenchmatrixError::ConfigError(format!(
                "benchmark '{}' produced an empty command",
                benchmark.name()
            )));
        }
        job.set_env(self.env());
        job.add_command(command, EnvMap::new());
        job.tag_cell(benchmark.name(), invocation, self.name());
        Ok(())
    }
}
