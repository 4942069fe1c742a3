// tests/standalone_run.rs

#![cfg(unix)]

use std::fs;

use benchmatrix::infra::{Infrastructure, JobStatus, Standalone};
use benchmatrix::job::Job;
use benchmatrix::manifest::{parse_manifest, OutputFiles, MANIFEST_FILE};
use benchmatrix::types::EnvMap;
use benchmatrix_test_utils::{init_tracing, with_timeout};

fn job(benchmark: &str, args: &[&str]) -> Job {
    let mut job = Job::script();
    job.add_command(args.iter().copied(), EnvMap::new());
    job.tag_cell(benchmark, 0, "cfg");
    job
}

#[tokio::test]
async fn output_and_exit_files_are_written_per_job() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let mut infra = Standalone::new("run", tmp.path());
    infra.setup().unwrap();

    let mut ok = job("a", &["echo", "time: 1.5"]);
    ok.set_env([("GREETING".to_string(), "hi".to_string())].into());
    ok.add_command(["echo", "$GREETING", ">&2"], EnvMap::new());
    let failing = job("b", &["exit", "3"]);
    infra.schedule(vec![failing, ok]).unwrap();
    let scheduled: Vec<String> = infra
        .scheduled()
        .iter()
        .map(|j| j.short_id().to_string())
        .collect();

    let report = with_timeout(infra.run()).await.unwrap();

    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.outcomes[0].status, JobStatus::Exited(0));
    assert_eq!(report.outcomes[1].status, JobStatus::Exited(3));
    assert!(infra.scheduled().is_empty());
    assert_eq!(infra.finished().len(), 2);
    assert!(infra.finished().iter().all(Job::is_finished));

    let a = OutputFiles::new(tmp.path(), &scheduled[0]);
    assert_eq!(fs::read_to_string(&a.stdout).unwrap(), "time: 1.5\n");
    assert_eq!(fs::read_to_string(&a.stderr).unwrap(), "hi\n");
    assert_eq!(fs::read_to_string(&a.exit).unwrap().trim(), "0");

    let b = OutputFiles::new(tmp.path(), &scheduled[1]);
    assert!(b.stdout.is_file());
    assert_eq!(fs::read_to_string(&b.exit).unwrap().trim(), "3");

    for short in &scheduled {
        assert!(!tmp.path().join(format!("{short}.sh")).exists());
    }
}

#[tokio::test]
async fn jobs_run_strictly_one_after_another() {
    let tmp = tempfile::tempdir().unwrap();
    let trace = tmp.path().join("trace.log");
    let trace_arg = trace.display().to_string();

    let mut infra = Standalone::new("run", tmp.path().join("run"));
    infra.setup().unwrap();
    infra
        .schedule(vec![
            job("b", &["echo", "second", ">>", &trace_arg]),
            job("a", &["sleep", "0.3", "&&", "echo", "first", ">>", &trace_arg]),
        ])
        .unwrap();

    with_timeout(infra.run()).await.unwrap();

    assert_eq!(fs::read_to_string(&trace).unwrap(), "first\nsecond\n");
}

#[tokio::test]
async fn manifest_order_matches_execution_order() {
    let tmp = tempfile::tempdir().unwrap();
    let mut infra = Standalone::new("run", tmp.path());
    infra.setup().unwrap();
    infra
        .schedule(vec![job("z", &["true"]), job("m", &["true"]), job("c", &["true"])])
        .unwrap();

    let report = with_timeout(infra.run()).await.unwrap();

    let text = fs::read_to_string(tmp.path().join(MANIFEST_FILE)).unwrap();
    let (entries, _) = parse_manifest(&text);
    let manifest: Vec<String> = entries.iter().map(|e| e.short_id()).collect();
    let executed: Vec<String> = report
        .outcomes
        .iter()
        .map(|o| o.short_id.clone())
        .collect();
    assert_eq!(manifest, executed);
}
