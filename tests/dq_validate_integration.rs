//! Integration tests for the dq_validate CLI
//!
//! Each test writes a small export into a temp directory, runs the binary on
//! it and inspects the exit status and the files written.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn dq_validate_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_dq_validate"))
}

fn run(args: &[&str]) -> Output {
    Command::new(dq_validate_binary())
        .args(args)
        .env("RUST_LOG", "warn")
        .env_remove("DQ_CONFIG")
        .env_remove("DQ_CONFIG_PATH")
        .output()
        .expect("Failed to run dq_validate")
}

fn read_summary(dir: &Path) -> serde_json::Value {
    let text = fs::read_to_string(dir.join("dq_summary.json")).expect("summary missing");
    serde_json::from_str(&text).expect("summary is not json")
}

const CLEAN_CSV: &str = "\
user_id,event_name,event_timestamp,value,transaction_id,currency,event_properties
u1,add_to_cart,2024-01-01 10:00:00,0,,USD,{}
u1,purchase,2024-01-01 10:05:00,19.99,t1,USD,\"{\"\"sku\"\": \"\"A1\"\"}\"
u2,page_view,2024-01-01T11:00:00Z,5,t2,EUR,
";

const FAILING_CSV: &str = "\
user_id,event_name,event_timestamp,value,transaction_id,event_properties
u1,purchase,2024-01-01 10:00:00,-5,t1,{broken
u2,purchase,2024-01-01 11:00:00,abc,t1,
u3,page_view,yesterday,3,t2,
";

#[test]
fn test_clean_batch_passes() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("events.csv");
    fs::write(&input, CLEAN_CSV).unwrap();
    let out = dir.path().join("report");

    let output = run(&[
        "--input",
        input.to_str().unwrap(),
        "--output-dir",
        out.to_str().unwrap(),
        "--gate",
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains("DQ report generated in"));

    let summary = read_summary(&out);
    assert_eq!(summary["summary"]["failed"], false);
    assert_eq!(summary["details"]["currencies"][1], "EUR");
    assert_eq!(summary["details"]["event_sequence"]["count"], 0);
    // zero revenue is detail only but its row is still sampled
    assert_eq!(summary["details"]["revenue"]["summary"]["zero"], 1);
    let sample = fs::read_to_string(out.join("dq_issues_sample.csv")).unwrap();
    assert_eq!(sample.lines().count(), 2);
}

#[test]
fn test_failing_batch_with_gate_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("events.csv");
    fs::write(&input, FAILING_CSV).unwrap();
    let out = dir.path().join("report");

    let output = run(&[
        "--input",
        input.to_str().unwrap(),
        "--output_dir",
        out.to_str().unwrap(),
        "--full_output",
        "--gate",
    ]);
    assert_eq!(output.status.code(), Some(1));

    let summary = read_summary(&out);
    assert_eq!(
        summary["summary"]["fail_reasons"],
        serde_json::json!(["duplicate_transactions", "revenue_has_nulls", "negative_revenue"])
    );
    assert_eq!(summary["details"]["timestamps"]["bad_count"], 1);
    assert_eq!(summary["details"]["malformed_event_properties"]["count"], 1);
    assert_eq!(summary["details"]["event_sequence"]["count"], 2);
    assert_eq!(summary["details"]["type_issues"][0]["check"], "value_parse_error");

    let full = fs::read_to_string(out.join("dq_full_issues.csv")).unwrap();
    assert_eq!(full.lines().count(), 4);
}

#[test]
fn test_failing_batch_without_gate_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("events.csv");
    fs::write(&input, FAILING_CSV).unwrap();
    let out = dir.path().join("report");

    let output = run(&[
        "--input",
        input.to_str().unwrap(),
        "--output-dir",
        out.to_str().unwrap(),
    ]);
    assert!(output.status.success());
    assert!(!out.join("dq_full_issues.csv").exists());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Status: FAIL"));
}

#[test]
fn test_jsonl_with_custom_timefield_and_sample_size() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("events.jsonl");
    let lines = [
        r#"{"event_name":"view","ts":"2024-01-01T10:00:00Z","value":1,"transaction_id":"a"}"#,
        r#"{"event_name":"view","ts":"2024-01-01T11:00:00Z","value":2,"transaction_id":"a"}"#,
        r#"{"event_name":"view","ts":"2024-01-01T12:00:00Z","value":3,"transaction_id":"a"}"#,
    ];
    fs::write(&input, lines.join("\n") + "\n").unwrap();
    let out = dir.path().join("report");

    let output = run(&[
        "--input",
        input.to_str().unwrap(),
        "--format",
        "jsonl",
        "--timefield",
        "ts",
        "--sample-size",
        "2",
        "--output-dir",
        out.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let summary = read_summary(&out);
    assert_eq!(summary["summary"]["required_fields_present"], true);
    assert_eq!(summary["details"]["duplicate_transactions"]["count"], 3);
    assert_eq!(
        summary["details"]["duplicate_transactions"]["sample"],
        serde_json::json!([0, 1])
    );
    let sample = fs::read_to_string(out.join("dq_issues_sample.csv")).unwrap();
    assert_eq!(sample.lines().count(), 3);
}

#[test]
fn test_config_file_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("events.csv");
    fs::write(&input, "event_name,event_timestamp,amount\nview,2024-01-01 10:00:00,-1\n").unwrap();
    let config = dir.path().join("dq.toml");
    fs::write(&config, "revenue_field = \"amount\"\n").unwrap();
    let out = dir.path().join("report");

    let output = run(&[
        "--input",
        input.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
        "--output-dir",
        out.to_str().unwrap(),
        "--gate",
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(read_summary(&out)["summary"]["fail_reasons"][0], "negative_revenue");
}

#[test]
fn test_missing_input_exits_two() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(&[
        "--input",
        dir.path().join("nope.csv").to_str().unwrap(),
        "--output-dir",
        dir.path().join("report").to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(2));
    assert!(!dir.path().join("report").exists());
}

#[test]
fn test_empty_input_exits_two() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("report");
    for (name, format) in [("events.csv", "csv"), ("events.jsonl", "jsonl")] {
        let input = dir.path().join(name);
        fs::write(&input, "").unwrap();

        let output = run(&[
            "--input",
            input.to_str().unwrap(),
            "--format",
            format,
            "--output-dir",
            out.to_str().unwrap(),
        ]);
        assert_eq!(output.status.code(), Some(2), "format {}", format);
    }
    assert!(!out.exists());
}

#[test]
fn test_bad_config_exits_two() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("events.csv");
    fs::write(&input, CLEAN_CSV).unwrap();
    let config = dir.path().join("dq.toml");
    fs::write(&config, "volume_sigma = \"three\"\n").unwrap();

    let output = run(&[
        "--input",
        input.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_unwritable_output_exits_three() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("events.csv");
    fs::write(&input, CLEAN_CSV).unwrap();
    let blocker = dir.path().join("report");
    fs::write(&blocker, "a file, not a directory").unwrap();

    let output = run(&[
        "--input",
        input.to_str().unwrap(),
        "--output-dir",
        blocker.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(3));
}
