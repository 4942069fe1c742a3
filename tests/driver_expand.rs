// tests/driver_expand.rs

use std::collections::BTreeSet;
use std::fs;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use benchmatrix::config::ConfigurationConfig;
use benchmatrix::driver::{Driver, RUNINFO_FILE};
use benchmatrix::errors::BenchmatrixError;
use benchmatrix::types::ArgMap;
use benchmatrix_test_utils::builders::{BenchmarkConfigBuilder, MatrixFileBuilder};
use benchmatrix_test_utils::fakes::{FakeBenchmark, FakeConfiguration, RecordingInfrastructure};
use benchmatrix_test_utils::init_tracing;

fn driver_with(infra: RecordingInfrastructure) -> Driver {
    let mut driver = Driver::new(Box::new(infra));
    driver
        .add_benchmark(FakeBenchmark::new("A"))
        .add_benchmark(FakeBenchmark::new("B"))
        .add_configuration(FakeConfiguration::new("cfg1"));
    driver
}

#[test]
fn two_benchmarks_one_configuration_two_invocations() {
    let tmp = tempfile::tempdir().unwrap();
    let mut driver = driver_with(RecordingInfrastructure::new(tmp.path()));
    driver.set_invocations(2);

    let jobs = driver.expand().unwrap();
    assert_eq!(jobs.len(), 4);

    let cells: BTreeSet<(String, u64, String)> = jobs
        .iter()
        .map(|j| {
            let b = j.base();
            (
                b.benchmark().unwrap().to_string(),
                b.invocation().unwrap(),
                b.configuration().unwrap().to_string(),
            )
        })
        .collect();
    let expected: BTreeSet<(String, u64, String)> = [("A", 0), ("A", 1), ("B", 0), ("B", 1)]
        .into_iter()
        .map(|(b, i)| (b.to_string(), i, "cfg1".to_string()))
        .collect();
    assert_eq!(cells, expected);

    for job in &jobs {
        let meta = job.base().metadata();
        assert_eq!(meta.len(), 4);
        assert_eq!(meta["driver_args"], json!({}));
    }
}

#[test]
fn driver_args_are_attached_after_realize() {
    let tmp = tempfile::tempdir().unwrap();
    let mut driver = driver_with(RecordingInfrastructure::new(tmp.path()));
    let args: ArgMap = [("heap".to_string(), json!("64M"))].into();
    driver.set_invocations(1).update_args(args);
    driver.update_args([("threads".to_string(), json!(4))].into());

    let jobs = driver.expand().unwrap();
    for job in &jobs {
        assert_eq!(
            job.base().metadata()["driver_args"],
            json!({"heap": "64M", "threads": 4})
        );
    }
}

#[test]
fn expand_without_invocations_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let driver = driver_with(RecordingInfrastructure::new(tmp.path()));

    assert!(matches!(
        driver.expand(),
        Err(BenchmatrixError::InvocationsUnset)
    ));
}

#[tokio::test]
async fn start_without_invocations_never_schedules() {
    let tmp = tempfile::tempdir().unwrap();
    let infra = RecordingInfrastructure::new(tmp.path().join("run"));
    let batches = Arc::clone(&infra.batches);
    let mut driver = driver_with(infra);

    let err = driver.start().await.unwrap_err();
    assert!(matches!(err, BenchmatrixError::InvocationsUnset));
    assert!(batches.lock().unwrap().is_empty());
    assert!(!tmp.path().join("run").exists());
}

#[tokio::test]
async fn zero_invocations_is_treated_as_unset() {
    let tmp = tempfile::tempdir().unwrap();
    let infra = RecordingInfrastructure::new(tmp.path().join("run"));
    let batches = Arc::clone(&infra.batches);
    let mut driver = driver_with(infra);
    driver.set_invocations(0);

    assert!(matches!(
        driver.expand().unwrap_err(),
        BenchmatrixError::InvocationsUnset
    ));
    let err = driver.start().await.unwrap_err();
    assert!(matches!(err, BenchmatrixError::InvocationsUnset));
    assert!(batches.lock().unwrap().is_empty());
    assert!(!tmp.path().join("run").join(RUNINFO_FILE).exists());
}

#[tokio::test]
async fn start_runs_a_single_round_by_default() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let infra = RecordingInfrastructure::new(tmp.path().join("run"));
    let batches = Arc::clone(&infra.batches);
    let mut driver = driver_with(infra);
    driver.set_invocations(3);

    let log = driver.start().await.unwrap();

    assert_eq!(log.rounds_completed(), 1);
    assert_eq!(log.jobs_run(), 6);
    assert_eq!(log.failures(), 0);
    assert_eq!(batches.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn stop_predicate_controls_rounds_and_runinfo_is_written() {
    let tmp = tempfile::tempdir().unwrap();
    let basedir = tmp.path().join("run");
    let infra = RecordingInfrastructure::new(&basedir);
    let batches = Arc::clone(&infra.batches);
    let mut driver = driver_with(infra);
    driver.set_invocations(1).stop_after_rounds(3);

    let log = driver.start().await.unwrap();
    assert_eq!(log.rounds_completed(), 3);

    let batches = batches.lock().unwrap();
    assert_eq!(batches.len(), 3);
    assert!(batches.iter().all(|b| b.len() == 2));

    let info: Value =
        serde_json::from_str(&fs::read_to_string(basedir.join(RUNINFO_FILE)).unwrap()).unwrap();
    assert_eq!(info["rounds"].as_array().unwrap().len(), 3);
    assert_eq!(info["invocations"], json!(1));
    assert!(info["host"]["cpus"].as_u64().unwrap() >= 1);
}

#[test]
fn build_failure_in_one_pair_does_not_stop_the_others() {
    let tmp = tempfile::tempdir().unwrap();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut driver = Driver::new(Box::new(RecordingInfrastructure::new(tmp.path())));
    driver
        .add_benchmark(
            FakeBenchmark::new("A")
                .failing_build_for("cfg1")
                .with_calls(Arc::clone(&calls)),
        )
        .add_benchmark(FakeBenchmark::new("B").with_calls(Arc::clone(&calls)))
        .add_configuration(FakeConfiguration::new("cfg1"))
        .add_configuration(FakeConfiguration::new("cfg2"));

    let err = driver.build().unwrap_err();
    match err {
        BenchmatrixError::PairFailures { action, failures } => {
            assert_eq!(action, "build");
            assert_eq!(failures.len(), 1);
            assert!(failures[0].starts_with("A/cfg1"));
        }
        other => panic!("unexpected error: {other}"),
    }

    let calls = calls.lock().unwrap();
    assert_eq!(
        *calls,
        vec!["build:A/cfg1", "build:A/cfg2", "build:B/cfg1", "build:B/cfg2"]
    );
}

#[test]
fn clean_visits_every_pair_once() {
    let tmp = tempfile::tempdir().unwrap();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut driver = Driver::new(Box::new(RecordingInfrastructure::new(tmp.path())));
    driver
        .add_benchmark(FakeBenchmark::new("A").with_calls(Arc::clone(&calls)))
        .add_configuration(FakeConfiguration::new("cfg1"))
        .add_configuration(FakeConfiguration::new("cfg2"));

    driver.clean().unwrap();
    assert_eq!(calls.lock().unwrap().len(), 2);
}

#[test]
fn pruning_keeps_only_named_entries() {
    let tmp = tempfile::tempdir().unwrap();
    let mut driver = driver_with(RecordingInfrastructure::new(tmp.path()));
    driver.add_configuration(FakeConfiguration::new("cfg2"));

    driver
        .prune_benchmarks(&["B".to_string(), "nope".to_string()])
        .prune_configurations(&[]);

    let view = driver.bind();
    assert_eq!(view.benchmarks, vec!["B"]);
    assert_eq!(view.configurations, vec!["cfg1", "cfg2"]);
}

#[test]
fn matrix_file_placeholders_and_prefix_end_up_in_the_command() {
    let cfg = MatrixFileBuilder::new()
        .with_benchmark(
            "fib",
            BenchmarkConfigBuilder::new(&["./fib", "--heap={heap}", "--n={n}", "#{invocation}"])
                .build(),
        )
        .with_configuration(
            "pinned",
            ConfigurationConfig {
                prefix: vec!["taskset".to_string(), "-c".to_string(), "0".to_string()],
                args: [("n".to_string(), json!(30))].into(),
                env: [("OPT".to_string(), "3".to_string())].into(),
                ..ConfigurationConfig::default()
            },
        )
        .driver_arg("heap", json!("64M"))
        .invocations(1)
        .build();

    let tmp = tempfile::tempdir().unwrap();
    let driver = Driver::from_matrix(&cfg, Box::new(RecordingInfrastructure::new(tmp.path())))
        .unwrap();
    let jobs = driver.expand().unwrap();
    assert_eq!(jobs.len(), 1);

    let base = jobs[0].base();
    assert_eq!(
        base.commands()[0].args,
        vec!["taskset", "-c", "0", "./fib", "--heap=64M", "--n=30", "#0"]
    );
    assert_eq!(base.env()["OPT"], "3");
    assert_eq!(base.metadata()["driver_args"], json!({"heap": "64M"}));
}
