// tests/batch_submit.rs

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use benchmatrix::errors::BenchmatrixError;
use benchmatrix::infra::{BatchCluster, Infrastructure, JobStatus, SubmitCommand};
use benchmatrix::job::{BatchDirectives, Job, RenderScript};
use benchmatrix::types::EnvMap;
use benchmatrix_test_utils::{init_tracing, with_timeout};

/// Write an executable stand-in for `qsub`.
fn fake_qsub(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("qsub");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn cluster(tmp: &Path, qsub: &Path) -> BatchCluster {
    BatchCluster::new(
        "run",
        tmp.join("run"),
        SubmitCommand {
            program: qsub.display().to_string(),
            args: vec!["-V".to_string()],
        },
        BatchDirectives {
            queue: Some("normal".to_string()),
            walltime: Some("00:05:00".to_string()),
            wd: true,
            ..BatchDirectives::default()
        },
    )
}

fn realize(infra: &BatchCluster, benchmark: &str) -> Job {
    let mut job = infra.new_job();
    job.add_command(["./bench"], EnvMap::new());
    job.tag_cell(benchmark, 0, "cfg");
    job
}

#[tokio::test]
async fn jobs_are_rendered_and_submitted_in_order() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let log = tmp.path().join("submissions.log");
    let qsub = fake_qsub(
        tmp.path(),
        &format!("echo \"$@\" >> {}\necho 4242.server", log.display()),
    );
    let mut infra = cluster(tmp.path(), &qsub);
    infra.setup().unwrap();

    let jobs = vec![realize(&infra, "b"), realize(&infra, "a")];
    assert!(matches!(jobs[0], Job::Batch(_)));
    infra.schedule(jobs).unwrap();
    let order: Vec<Job> = infra.scheduled().to_vec();

    let report = with_timeout(infra.run()).await.unwrap();

    assert_eq!(report.outcomes.len(), 2);
    for outcome in &report.outcomes {
        assert_eq!(
            outcome.status,
            JobStatus::Submitted {
                scheduler_id: "4242.server".to_string()
            }
        );
    }
    assert_eq!(infra.submitted().len(), 2);

    let basedir = tmp.path().join("run");
    let submissions = fs::read_to_string(&log).unwrap();
    let lines: Vec<&str> = submissions.lines().collect();
    assert_eq!(lines.len(), 2);
    for (line, job) in lines.iter().zip(&order) {
        let short = job.short_id();
        let expected = format!(
            "-V -o {dir}/{short}.o -e {dir}/{short}.e {dir}/{short}.pbs",
            dir = std::path::absolute(&basedir).unwrap().display()
        );
        assert_eq!(*line, expected);

        let script = fs::read_to_string(basedir.join(format!("{short}.pbs"))).unwrap();
        let script: Vec<&str> = script.lines().collect();
        assert_eq!(script, job.render_script());
        assert_eq!(
            &script[..4],
            [
                "#!/bin/bash",
                "#PBS -q normal",
                "#PBS -l walltime=00:05:00",
                "#PBS -l wd"
            ]
        );
    }

    // The scheduler owns redirection; nothing is executed locally.
    assert!(!basedir.join(format!("{}.o", order[0].short_id())).exists());
}

#[tokio::test]
async fn rejected_submission_is_a_hard_error() {
    let tmp = tempfile::tempdir().unwrap();
    let qsub = fake_qsub(tmp.path(), "echo 'queue is closed' >&2\nexit 38");
    let mut infra = cluster(tmp.path(), &qsub);
    infra.setup().unwrap();

    infra
        .schedule(vec![realize(&infra, "a"), realize(&infra, "b")])
        .unwrap();
    let err = with_timeout(infra.run()).await.unwrap_err();

    match err {
        BenchmatrixError::Submission { code, stderr, .. } => {
            assert_eq!(code, Some(38));
            assert_eq!(stderr, "queue is closed");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(infra.submitted().is_empty());
    assert_eq!(infra.scheduled().len(), 2);
}
