#![allow(dead_code)]

use std::collections::BTreeMap;

use benchmatrix::config::{
    BenchmarkConfig, ConfigurationConfig, DriverSection, InfrastructureSection, MatrixFile,
    RawMatrixFile,
};
use benchmatrix::types::{InfrastructureKind, OutputStream};

/// Builder for `MatrixFile` to simplify test setup.
pub struct MatrixFileBuilder {
    raw: RawMatrixFile,
}

impl MatrixFileBuilder {
    pub fn new() -> Self {
        Self {
            raw: RawMatrixFile {
                driver: DriverSection::default(),
                infrastructure: InfrastructureSection::default(),
                benchmark: BTreeMap::new(),
                configuration: BTreeMap::new(),
            },
        }
    }

    pub fn with_benchmark(mut self, name: &str, benchmark: BenchmarkConfig) -> Self {
        self.raw.benchmark.insert(name.to_string(), benchmark);
        self
    }

    pub fn with_configuration(mut self, name: &str, configuration: ConfigurationConfig) -> Self {
        self.raw
            .configuration
            .insert(name.to_string(), configuration);
        self
    }

    pub fn invocations(mut self, n: usize) -> Self {
        self.raw.driver.invocations = Some(n);
        self
    }

    pub fn rounds(mut self, n: usize) -> Self {
        self.raw.driver.rounds = n;
        self
    }

    pub fn driver_arg(mut self, key: &str, value: serde_json::Value) -> Self {
        self.raw.driver.args.insert(key.to_string(), value);
        self
    }

    pub fn batch(mut self, submit_command: &str) -> Self {
        self.raw.infrastructure.kind = InfrastructureKind::Batch;
        self.raw.infrastructure.submit_command = submit_command.to_string();
        self
    }

    /// The unvalidated file, for exercising validation errors.
    pub fn raw(self) -> RawMatrixFile {
        self.raw
    }

    pub fn build(self) -> MatrixFile {
        MatrixFile::try_from(self.raw).expect("Failed to build valid matrix file from builder")
    }
}

impl Default for MatrixFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `BenchmarkConfig`.
pub struct BenchmarkConfigBuilder {
    benchmark: BenchmarkConfig,
}

impl BenchmarkConfigBuilder {
    pub fn new(command: &[&str]) -> Self {
        Self {
            benchmark: BenchmarkConfig {
                command: command.iter().map(|s| s.to_string()).collect(),
                build: None,
                clean: None,
                metric_pattern: None,
                stream: OutputStream::Stdout,
                pipelines: vec![],
            },
        }
    }

    pub fn build_cmd(mut self, cmd: &str) -> Self {
        self.benchmark.build = Some(cmd.to_string());
        self
    }

    pub fn clean_cmd(mut self, cmd: &str) -> Self {
        self.benchmark.clean = Some(cmd.to_string());
        self
    }

    pub fn metric_pattern(mut self, pattern: &str) -> Self {
        self.benchmark.metric_pattern = Some(pattern.to_string());
        self
    }

    pub fn stream(mut self, stream: OutputStream) -> Self {
        self.benchmark.stream = stream;
        self
    }

    pub fn pipeline(mut self, name: &str) -> Self {
        self.benchmark.pipelines.push(name.to_string());
        self
    }

    pub fn build(self) -> BenchmarkConfig {
        self.benchmark
    }
}
