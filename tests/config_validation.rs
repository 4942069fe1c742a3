// tests/config_validation.rs

use std::fs;
use std::path::PathBuf;

use serde_json::json;

use benchmatrix::config::{load_and_validate, MatrixFile};
use benchmatrix::errors::BenchmatrixError;
use benchmatrix::types::{InfrastructureKind, OutputStream};
use benchmatrix_test_utils::builders::{BenchmarkConfigBuilder, MatrixFileBuilder};

fn write_config(dir: &tempfile::TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("Benchmatrix.toml");
    fs::write(&path, body).unwrap();
    path
}

fn minimal() -> MatrixFileBuilder {
    MatrixFileBuilder::new()
        .with_benchmark("fib", BenchmarkConfigBuilder::new(&["./fib"]).build())
        .with_configuration("default", Default::default())
}

#[test]
fn full_matrix_file_loads_with_defaults() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_config(
        &tmp,
        r#"
[driver]
invocations = 5
name = "nightly"

[driver.args]
heap = "64M"

[infrastructure]
kind = "batch"
submit_args = ["-W", "block=false"]

[infrastructure.directives]
queue = "normal"
ncpus = 4
wd = true

[benchmark.fib]
command = ["./fib", "{n}"]
build = "make fib"
stream = "stderr"
pipelines = ["summary"]

[configuration.o3]
env = { OPT = "3" }
args = { n = 30 }
"#,
    );

    let cfg = load_and_validate(&path).unwrap();

    assert_eq!(cfg.driver.invocations, Some(5));
    assert_eq!(cfg.driver.rounds, 1);
    assert_eq!(cfg.driver.logdir, PathBuf::from("results"));
    assert_eq!(cfg.driver.args["heap"], json!("64M"));
    assert_eq!(cfg.infrastructure.kind, InfrastructureKind::Batch);
    assert_eq!(cfg.infrastructure.submit_command, "qsub");
    assert_eq!(cfg.infrastructure.directives.ncpus, Some(4));
    assert!(cfg.infrastructure.directives.wd);

    let fib = &cfg.benchmark["fib"];
    assert_eq!(fib.stream, OutputStream::Stderr);
    assert_eq!(fib.pipelines, vec!["summary"]);
    assert_eq!(cfg.configuration["o3"].args["n"], json!(30));
}

#[test]
fn missing_file_is_a_config_error() {
    let tmp = tempfile::tempdir().unwrap();
    let err = load_and_validate(tmp.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, BenchmatrixError::ConfigError(_)));
}

#[test]
fn malformed_toml_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_config(&tmp, "[benchmark.fib\ncommand = 1");
    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, BenchmatrixError::TomlError(_)));
}

#[test]
fn empty_matrix_is_rejected() {
    let err = MatrixFile::try_from(MatrixFileBuilder::new().raw()).unwrap_err();
    assert!(matches!(err, BenchmatrixError::ConfigError(_)));

    let only_benchmarks = MatrixFileBuilder::new()
        .with_benchmark("fib", BenchmarkConfigBuilder::new(&["./fib"]).build())
        .raw();
    assert!(MatrixFile::try_from(only_benchmarks).is_err());
}

#[test]
fn zero_invocations_or_rounds_are_rejected() {
    assert!(MatrixFile::try_from(minimal().invocations(0).raw()).is_err());
    assert!(MatrixFile::try_from(minimal().rounds(0).raw()).is_err());
    assert!(MatrixFile::try_from(minimal().invocations(1).rounds(2).raw()).is_ok());
}

#[test]
fn empty_benchmark_command_is_rejected() {
    let raw = MatrixFileBuilder::new()
        .with_benchmark("fib", BenchmarkConfigBuilder::new(&[]).build())
        .with_configuration("default", Default::default())
        .raw();
    let err = MatrixFile::try_from(raw).unwrap_err();
    assert!(err.to_string().contains("empty `command`"));
}

#[test]
fn metric_pattern_needs_named_groups() {
    let bad_regex = minimal()
        .with_benchmark(
            "fib",
            BenchmarkConfigBuilder::new(&["./fib"])
                .metric_pattern("(unclosed")
                .build(),
        )
        .raw();
    assert!(MatrixFile::try_from(bad_regex).is_err());

    let no_groups = minimal()
        .with_benchmark(
            "fib",
            BenchmarkConfigBuilder::new(&["./fib"])
                .metric_pattern(r"(\w+)=(\d+)")
                .build(),
        )
        .raw();
    assert!(MatrixFile::try_from(no_groups).is_err());

    let good = minimal()
        .with_benchmark(
            "fib",
            BenchmarkConfigBuilder::new(&["./fib"])
                .metric_pattern(r"(?P<metric>\w+)=(?P<value>\d+)")
                .build(),
        )
        .raw();
    assert!(MatrixFile::try_from(good).is_ok());
}

#[test]
fn unknown_pipeline_is_rejected() {
    let raw = minimal()
        .with_benchmark(
            "fib",
            BenchmarkConfigBuilder::new(&["./fib"])
                .pipeline("summary")
                .pipeline("median")
                .build(),
        )
        .raw();
    let err = MatrixFile::try_from(raw).unwrap_err();
    assert!(matches!(err, BenchmatrixError::UnknownPipeline(ref m) if m.contains("median")));
}

#[test]
fn batch_kind_needs_a_submit_command() {
    let err = MatrixFile::try_from(minimal().batch("  ").raw()).unwrap_err();
    assert!(matches!(err, BenchmatrixError::ConfigError(_)));
    assert!(MatrixFile::try_from(minimal().batch("sbatch").raw()).is_ok());
}
