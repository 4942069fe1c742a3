// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::job::BatchDirectives;
use crate::types::{ArgMap, EnvMap, InfrastructureKind, OutputStream};

/// Matrix file exactly as deserialized from TOML, before validation.
///
/// ```toml
/// [driver]
/// invocations = 10
/// logdir = "results"
///
/// [driver.args]
/// heap = "64M"
///
/// [infrastructure]
/// kind = "standalone"
///
/// [benchmark.fib]
/// command = ["./fib", "30"]
/// build = "make fib"
/// pipelines = ["summary"]
///
/// [configuration.o3]
/// env = { OPT_LEVEL = "3" }
/// prefix = ["taskset", "-c", "0"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawMatrixFile {
    #[serde(default)]
    pub driver: DriverSection,

    #[serde(default)]
    pub infrastructure: InfrastructureSection,

    /// Keys are benchmark names.
    #[serde(default)]
    pub benchmark: BTreeMap<String, BenchmarkConfig>,

    /// Keys are configuration names.
    #[serde(default)]
    pub configuration: BTreeMap<String, ConfigurationConfig>,
}

/// Validated matrix file. Only obtainable through `TryFrom<RawMatrixFile>`.
#[derive(Debug, Clone)]
pub struct MatrixFile {
    pub driver: DriverSection,
    pub infrastructure: InfrastructureSection,
    pub benchmark: BTreeMap<String, BenchmarkConfig>,
    pub configuration: BTreeMap<String, ConfigurationConfig>,
}

impl MatrixFile {
    pub(crate) fn new_unchecked(raw: RawMatrixFile) -> Self {
        Self {
            driver: raw.driver,
            infrastructure: raw.infrastructure,
            benchmark: raw.benchmark,
            configuration: raw.configuration,
        }
    }
}

/// `[driver]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DriverSection {
    /// Invocations per (benchmark, configuration) pair. The `run` subcommand
    /// always passes its own value, so this only matters for library use.
    #[serde(default)]
    pub invocations: Option<usize>,

    /// Parent directory of every run's working directory.
    #[serde(default = "default_logdir")]
    pub logdir: PathBuf,

    /// Run name; `<hostname>-<timestamp>` when absent.
    #[serde(default)]
    pub name: Option<String>,

    /// Number of schedule/run rounds before stopping.
    #[serde(default = "default_rounds")]
    pub rounds: usize,

    /// Driver-level arguments, recorded with every job and used as part of
    /// the analysis grouping key.
    #[serde(default)]
    pub args: ArgMap,
}

fn default_logdir() -> PathBuf {
    PathBuf::from("results")
}

fn default_rounds() -> usize {
    1
}

impl Default for DriverSection {
    fn default() -> Self {
        Self {
            invocations: None,
            logdir: default_logdir(),
            name: None,
            rounds: default_rounds(),
            args: ArgMap::new(),
        }
    }
}

/// `[infrastructure]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct InfrastructureSection {
    #[serde(default)]
    pub kind: InfrastructureKind,

    /// Submission program for `kind = "batch"`.
    #[serde(default = "default_submit_command")]
    pub submit_command: String,

    /// Extra arguments placed before `-o/-e/<script>`.
    #[serde(default)]
    pub submit_args: Vec<String>,

    #[serde(default)]
    pub directives: BatchDirectives,
}

fn default_submit_command() -> String {
    "qsub".to_string()
}

impl Default for InfrastructureSection {
    fn default() -> Self {
        Self {
            kind: InfrastructureKind::default(),
            submit_command: default_submit_command(),
            submit_args: Vec::new(),
            directives: BatchDirectives::default(),
        }
    }
}

/// `[benchmark.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct BenchmarkConfig {
    /// Argument vector of one invocation.
    ///
    /// `{benchmark}`, `{configuration}`, `{invocation}` and the names of
    /// driver/configuration args are substituted when a job is realized.
    pub command: Vec<String>,

    /// Shell command run once per configuration by `build`.
    #[serde(default)]
    pub build: Option<String>,

    /// Shell command run once per configuration by `clean`.
    #[serde(default)]
    pub clean: Option<String>,

    /// Regex with `metric` and `value` named groups, applied per line.
    #[serde(default)]
    pub metric_pattern: Option<String>,

    /// Which captured stream metrics are scraped from.
    #[serde(default)]
    pub stream: OutputStream,

    /// Post-processing stages, applied in order.
    #[serde(default)]
    pub pipelines: Vec<String>,
}

/// `[configuration.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigurationConfig {
    /// Exported for the whole job script.
    #[serde(default)]
    pub env: EnvMap,

    /// Prepended to the benchmark command line only.
    #[serde(default)]
    pub command_env: EnvMap,

    /// Arguments placed before the benchmark's command (wrappers, runtimes).
    #[serde(default)]
    pub prefix: Vec<String>,

    /// Configuration-specific `{placeholder}` values for the command line.
    #[serde(default)]
    pub args: ArgMap,

    #[serde(default)]
    pub build: Option<String>,

    #[serde(default)]
    pub clean: Option<String>,
}
