// tests/manifest_format.rs

use std::path::Path;

use proptest::prelude::*;
use serde_json::{json, Value};

use benchmatrix::errors::BenchmatrixError;
use benchmatrix::fs::mock::MockFileSystem;
use benchmatrix::job::Job;
use benchmatrix::manifest::{parse_manifest, read_manifest, ManifestEntry};
use benchmatrix::types::EnvMap;

fn sample_job(benchmark: &str, invocation: usize) -> Job {
    let mut job = Job::script();
    job.add_command(["./bench", "--size", "10"], EnvMap::new());
    job.set_env([("PATH".to_string(), "/usr/bin".to_string())].into());
    job.tag_cell(benchmark, invocation, "cfg1");
    job
}

#[test]
fn encoded_line_has_four_tab_separated_fields() {
    let job = sample_job("fib", 0);
    let line = ManifestEntry::from_job(&job).encode().unwrap();

    let fields: Vec<&str> = line.split('\t').collect();
    assert_eq!(fields.len(), 4);
    assert_eq!(fields[0], job.id().hyphenated().to_string());
    assert_eq!(fields[1], r#"{"PATH":"/usr/bin"}"#);
    assert!(!line.contains('\n'));
}

#[test]
fn blank_and_trailing_lines_are_tolerated() {
    let a = ManifestEntry::from_job(&sample_job("a", 0));
    let b = ManifestEntry::from_job(&sample_job("b", 1));
    let text = format!(
        "{}\n\n   \n{}\n\n",
        a.encode().unwrap(),
        b.encode().unwrap()
    );

    let (entries, errors) = parse_manifest(&text);
    assert!(errors.is_empty());
    assert_eq!(entries, vec![a, b]);
}

#[test]
fn malformed_lines_are_reported_without_dropping_good_ones() {
    let good = ManifestEntry::from_job(&sample_job("a", 0));
    let text = format!("not a manifest line\n{}\n", good.encode().unwrap());

    let (entries, errors) = parse_manifest(&text);
    assert_eq!(entries, vec![good]);
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], BenchmatrixError::Manifest { line: 1, .. }));
}

#[test]
fn driver_args_are_read_back_from_metadata() {
    let mut job = sample_job("a", 0);
    job.set_metadata([("driver_args", json!({"heap": "64M", "threads": 4}))]);
    let entry = ManifestEntry::from_job(&job);

    let args = entry.driver_args();
    assert_eq!(args.get("heap"), Some(&json!("64M")));
    assert_eq!(args.get("threads"), Some(&json!(4)));
}

#[test]
fn reading_a_directory_without_manifest_is_a_config_error() {
    let fs = MockFileSystem::new();
    fs.add_file("/runs/r1/abcd1234.o", "x");

    let err = read_manifest(&fs, Path::new("/runs/r1")).unwrap_err();
    assert!(matches!(err, BenchmatrixError::ConfigError(_)));

    let err = read_manifest(&fs, Path::new("/runs/missing")).unwrap_err();
    assert!(matches!(err, BenchmatrixError::ConfigError(_)));
}

fn json_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        ".*".prop_map(Value::from),
        Just(Value::Null),
    ]
}

proptest! {
    #[test]
    fn manifest_line_round_trips(
        env in proptest::collection::btree_map(".*", ".*", 0..5),
        commands in proptest::collection::vec(
            (
                proptest::collection::vec(".*", 1..4),
                proptest::collection::btree_map("[A-Z_]{1,8}", ".*", 0..3),
            ),
            0..4,
        ),
        metadata in proptest::collection::btree_map(".*", json_leaf(), 0..6),
    ) {
        let mut job = Job::script();
        job.set_env(env);
        for (args, cmd_env) in commands {
            job.add_command(args, cmd_env);
        }
        job.set_metadata(metadata);

        let entry = ManifestEntry::from_job(&job);
        let line = entry.encode().unwrap();
        let decoded = ManifestEntry::parse(&line, 1).unwrap();

        prop_assert_eq!(decoded, entry);
    }
}
