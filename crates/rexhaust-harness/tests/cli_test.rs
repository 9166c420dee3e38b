//! Integration test: the `harness` binary end to end.

use std::path::PathBuf;
use std::process::{Command, Output};

fn harness(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_harness"))
        .args(args)
        .env_remove("REXHAUST_BOUNDS")
        .output()
        .expect("failed to run harness binary")
}

fn scratch(name: &str) -> PathBuf {
    let dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("rexhaust-cli").join(name);
    std::fs::create_dir_all(&dir).expect("scratch dir should be creatable");
    dir
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn verify_prints_summary_and_succeeds() {
    let output = harness(&[
        "verify",
        "--alphabet",
        "ab",
        "--max-atoms",
        "1",
        "--max-strlen",
        "2",
        "--str-alphabet",
        "ab",
    ]);
    assert!(output.status.success(), "stderr={}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(stdout(&output), "2 regexps, 16 tests, 0 failures [2/2 str]\n");
}

#[test]
fn egrep_runs_four_anchorings() {
    let dir = scratch("egrep");
    let log = dir.join("egrep.jsonl");
    let report = dir.join("egrep.json");
    let output = harness(&[
        "egrep",
        "--alphabet",
        "ab",
        "--max-atoms",
        "2",
        "--max-ops",
        "1",
        "--max-strlen",
        "2",
        "--str-alphabet",
        "ab",
        "--log",
        log.to_str().expect("utf-8 path"),
        "--report",
        report.to_str().expect("utf-8 path"),
    ]);
    assert!(output.status.success(), "stderr={}", String::from_utf8_lossy(&output.stderr));
    let text = stdout(&output);
    assert_eq!(text.lines().count(), 4);
    assert!(text.lines().all(|line| line.contains(" 0 failures ")));

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).expect("report should exist"))
            .expect("report should be JSON");
    let runs = report["runs"].as_array().expect("runs array");
    assert_eq!(runs.len(), 4);
    assert_eq!(runs[3]["topwrapper"], "^(?:%s)$");
    assert!(runs.iter().all(|run| run["failures"] == 0));

    let validated = harness(&["validate-log", "--path", log.to_str().expect("utf-8 path")]);
    assert!(validated.status.success(), "{}", String::from_utf8_lossy(&validated.stderr));
    assert!(stdout(&validated).ends_with(", 0 errors\n"));
}

#[test]
fn reduced_bounds_from_flag() {
    let output = harness(&[
        "verify",
        "--alphabet",
        "ab",
        "--max-atoms",
        "1",
        "--max-strlen",
        "2",
        "--str-alphabet",
        "ab",
        "--bounds",
        "reduced",
    ]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "2 regexps, 8 tests, 0 failures [1/2 str]\n");
}

#[test]
fn export_then_replay() {
    let dir = scratch("export");
    let corpus = dir.join("corpus.txt");
    let index = dir.join("index.json");
    let log = dir.join("export.jsonl");
    let report = dir.join("replay.md");
    let output = harness(&[
        "export",
        "--alphabet",
        "ab",
        "--max-atoms",
        "2",
        "--max-ops",
        "1",
        "--max-strlen",
        "2",
        "--str-alphabet",
        "ab",
        "--output",
        corpus.to_str().expect("utf-8 path"),
        "--index",
        index.to_str().expect("utf-8 path"),
        "--log",
        log.to_str().expect("utf-8 path"),
    ]);
    assert!(output.status.success(), "stderr={}", String::from_utf8_lossy(&output.stderr));
    assert!(output.stdout.is_empty());

    let events: Vec<serde_json::Value> = std::fs::read_to_string(&log)
        .expect("log should exist")
        .lines()
        .map(|line| serde_json::from_str(line).expect("log line should be JSON"))
        .collect();
    let written = events.last().expect("log should not be empty");
    assert_eq!(written["event"], "artifacts_written");
    assert_eq!(
        written["artifact_refs"],
        serde_json::json!([corpus.display().to_string(), index.display().to_string()])
    );
    let validated = harness(&["validate-log", "--path", log.to_str().expect("utf-8 path")]);
    assert!(validated.status.success(), "{}", String::from_utf8_lossy(&validated.stderr));

    let bytes = std::fs::read(&corpus).expect("corpus should exist");
    assert!(bytes.starts_with(b"strings\n\"\"\n\"a\"\n"));
    let index: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&index).expect("index should exist"))
            .expect("index should be JSON");
    assert_eq!(index["artifacts"][0]["kind"], "corpus");
    assert_eq!(
        index["artifacts"][0]["sha256"],
        rexhaust_harness::structured_log::sha256_hex(&bytes)
    );

    let replayed = harness(&[
        "replay",
        "--corpus",
        corpus.to_str().expect("utf-8 path"),
        "--report",
        report.to_str().expect("utf-8 path"),
    ]);
    assert!(replayed.status.success(), "stderr={}", String::from_utf8_lossy(&replayed.stderr));
    assert_eq!(stdout(&replayed), "16 regexps, 448 queries, 0 failed\n");
    let markdown = std::fs::read_to_string(&report).expect("report should exist");
    assert!(markdown.contains("- Failed: 0"));
}

#[test]
fn export_to_stdout_matches_file_export() {
    let args = [
        "export",
        "--alphabet",
        "a",
        "--max-atoms",
        "2",
        "--max-ops",
        "1",
        "--max-strlen",
        "1",
        "--str-alphabet",
        "a",
    ];
    let first = harness(&args);
    let second = harness(&args);
    assert!(first.status.success());
    assert!(!first.stdout.is_empty());
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn bad_configuration_fails() {
    let output = harness(&["verify", "--alphabet", "a", "--wrapper", "%s%s"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("wrapper"));

    let output = harness(&["export", "--alphabet", "a", "--random-strings", "1:3"]);
    assert!(!output.status.success());
}
