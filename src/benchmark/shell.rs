// src/benchmark/shell.rs

//! Benchmarks and configurations described entirely in the matrix file.

use std::collections::BTreeMap;
use std::process::Command;

use regex::Regex;
use tracing::{debug, info};

use super::{Benchmark, Configuration};
use crate::config::model::{BenchmarkConfig, ConfigurationConfig};
use crate::errors::{BenchmatrixError, Result};
use crate::job::Job;
use crate::pipeline::{builtin, Pipeline};
use crate::types::{ArgMap, EnvMap, OutputStream, Stats};

/// Matches lines like `time: 12.5` or `ops=1e6`.
pub const DEFAULT_METRIC_PATTERN: &str = r"^\s*(?P<metric>[A-Za-z_][\w.\-]*)\s*[:=]\s*(?P<value>[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?)\s*$";

const ENV_BENCHMARK: &str = "BENCHMATRIX_BENCHMARK";
const ENV_CONFIGURATION: &str = "BENCHMATRIX_CONFIGURATION";

/// Run `sh -c <script>` for one (benchmark, configuration) pair.
fn run_shell(script: &str, env: &EnvMap, benchmark: &str, configuration: &str) -> Result<()> {
    info!(benchmark, configuration, cmd = %script, "running shell step");
    let status = Command::new("sh")
        .arg("-c")
        .arg(script)
        .envs(env)
        .env(ENV_BENCHMARK, benchmark)
        .env(ENV_CONFIGURATION, configuration)
        .status()?;

    if !status.success() {
        return Err(BenchmatrixError::CommandFailed {
            command: script.to_string(),
            code: status.code(),
        });
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct ShellBenchmark {
    name: String,
    command: Vec<String>,
    build: Option<String>,
    clean: Option<String>,
    metric_pattern: Regex,
    stream: OutputStream,
    pipelines: Vec<String>,
}

impl ShellBenchmark {
    /// Benchmark with the default metric pattern and no build/clean steps.
    pub fn new<I, S>(name: impl Into<String>, command: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            name: name.into(),
            command: command.into_iter().map(Into::into).collect(),
            build: None,
            clean: None,
            metric_pattern: compile_pattern(DEFAULT_METRIC_PATTERN)?,
            stream: OutputStream::Stdout,
            pipelines: Vec::new(),
        })
    }

    /// Fails on an invalid metric pattern or an unknown pipeline name.
    pub fn from_config(name: &str, cfg: &BenchmarkConfig) -> Result<Self> {
        if let Some(unknown) = cfg
            .pipelines
            .iter()
            .find(|p| !builtin::NAMES.contains(&p.as_str()))
        {
            return Err(BenchmatrixError::UnknownPipeline(format!(
                "'{unknown}' in benchmark '{name}' (known: {})",
                builtin::NAMES.join(", ")
            )));
        }

        let pattern = cfg
            .metric_pattern
            .as_deref()
            .unwrap_or(DEFAULT_METRIC_PATTERN);
        Ok(Self {
            name: name.to_string(),
            command: cfg.command.clone(),
            build: cfg.build.clone(),
            clean: cfg.clean.clone(),
            metric_pattern: compile_pattern(pattern)?,
            stream: cfg.stream,
            pipelines: cfg.pipelines.clone(),
        })
    }
}

fn compile_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| BenchmatrixError::ConfigError(format!("invalid metric pattern: {e}")))
}

impl Benchmark for ShellBenchmark {
    fn name(&self) -> &str {
        &self.name
    }

    fn command(&self) -> Vec<String> {
        self.command.clone()
    }

    fn build(&self, configuration: &dyn Configuration) -> Result<()> {
        match self.build {
            Some(ref script) => {
                run_shell(script, &configuration.env(), &self.name, configuration.name())
            }
            None => Ok(()),
        }
    }

    fn clean(&self, configuration: &dyn Configuration) -> Result<()> {
        match self.clean {
            Some(ref script) => {
                run_shell(script, &configuration.env(), &self.name, configuration.name())
            }
            None => Ok(()),
        }
    }

    fn parse(&self, stdout: &str, stderr: &str) -> Result<Stats> {
        let text = match self.stream {
            OutputStream::Stdout => stdout,
            OutputStream::Stderr => stderr,
        };

        let mut stats = Stats::new();
        for line in text.lines() {
            let Some(caps) = self.metric_pattern.captures(line) else {
                continue;
            };
            let (Some(metric), Some(value)) = (caps.name("metric"), caps.name("value")) else {
                continue;
            };
            match value.as_str().parse::<f64>() {
                Ok(v) => {
                    stats.insert(metric.as_str().to_string(), v);
                }
                Err(e) => debug!(line, error = %e, "metric value is not a number"),
            }
        }

        if stats.is_empty() {
            return Err(BenchmatrixError::Parse(format!(
                "benchmark '{}': no metrics found on {:?}",
                self.name, self.stream
            )));
        }
        Ok(stats)
    }

    fn pipelines(&self) -> Vec<Box<dyn Pipeline>> {
        // Names were checked against the built-ins in `from_config`.
        self.pipelines
            .iter()
            .filter_map(|name| builtin::by_name(name))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct ShellConfiguration {
    name: String,
    env: EnvMap,
    command_env: EnvMap,
    prefix: Vec<String>,
    args: ArgMap,
    build: Option<String>,
    clean: Option<String>,
}

impl ShellConfiguration {
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_config(name.into().as_str(), &ConfigurationConfig::default())
    }

    pub fn from_config(name: &str, cfg: &ConfigurationConfig) -> Self {
        Self {
            name: name.to_string(),
            env: cfg.env.clone(),
            command_env: cfg.command_env.clone(),
            prefix: cfg.prefix.clone(),
            args: cfg.args.clone(),
            build: cfg.build.clone(),
            clean: cfg.clean.clone(),
        }
    }

    /// Values for `{placeholder}` substitution in the command line.
    ///
    /// Configuration args shadow driver args of the same name; the cell
    /// coordinates shadow both.
    fn placeholders(
        &self,
        benchmark: &dyn Benchmark,
        invocation: usize,
        driver_args: &ArgMap,
    ) -> BTreeMap<String, String> {
        let mut vars: BTreeMap<String, String> = driver_args
            .iter()
            .chain(self.args.iter())
            .map(|(k, v)| (k.clone(), placeholder_value(v)))
            .collect();
        vars.insert("benchmark".to_string(), benchmark.name().to_string());
        vars.insert("configuration".to_string(), self.name.clone());
        vars.insert("invocation".to_string(), invocation.to_string());
        vars
    }
}

fn placeholder_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Replace `{name}` with its value in one left-to-right pass.
///
/// Substituted text is never rescanned, and unknown names stay verbatim.
fn substitute(arg: &str, vars: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(arg.len());
    let mut rest = arg;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let Some(close) = tail[1..].find(['{', '}']).map(|i| i + 1) else {
            rest = tail;
            break;
        };
        if &tail[close..=close] == "{" {
            out.push_str(&tail[..close]);
            rest = &tail[close..];
            continue;
        }
        match vars.get(&tail[1..close]) {
            Some(value) => out.push_str(value),
            None => out.push_str(&tail[..=close]),
        }
        rest = &tail[close + 1..];
    }

    out.push_str(rest);
    out
}

impl Configuration for ShellConfiguration {
    fn name(&self) -> &str {
        &self.name
    }

    fn env(&self) -> EnvMap {
        self.env.clone()
    }

    fn build(&self, benchmark: &dyn Benchmark) -> Result<()> {
        match self.build {
            Some(ref script) => run_shell(script, &self.env, benchmark.name(), &self.name),
            None => Ok(()),
        }
    }

    fn clean(&self, benchmark: &dyn Benchmark) -> Result<()> {
        match self.clean {
            Some(ref script) => run_shell(script, &self.env, benchmark.name(), &self.name),
            None => Ok(()),
        }
    }

    fn realize(
        &self,
        benchmark: &dyn Benchmark,
        invocation: usize,
        driver_args: &ArgMap,
        job: &mut Job,
    ) -> Result<()> {
        let vars = self.placeholders(benchmark, invocation, driver_args);
        let argv: Vec<String> = self
            .prefix
            .iter()
            .cloned()
            .chain(benchmark.command())
            .map(|arg| substitute(&arg, &vars))
            .collect();
        if argv.is_empty() {
            return Err(BenchmatrixError::ConfigError(format!(
                "benchmark '{}' produced an empty command",
                benchmark.name()
            )));
        }

        job.set_env(self.env.clone());
        job.add_command(argv, self.command_env.clone());
        job.tag_cell(benchmark.name(), invocation, &self.name);
        Ok(())
    }
}
