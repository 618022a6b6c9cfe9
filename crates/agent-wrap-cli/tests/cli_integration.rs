use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{json, Value};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|err| panic!("clock should be >= UNIX_EPOCH: {err}"))
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("{prefix}-{now}"));
    fs::create_dir_all(&dir)
        .unwrap_or_else(|err| panic!("failed to create temp dir {}: {err}", dir.display()));
    dir
}

fn run_aw<I, S>(args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    Command::new(env!("CARGO_BIN_EXE_aw"))
        .args(args)
        .env_remove("AGENT_WRAP_SPREADSHEET_ID")
        .env_remove("AGENT_WRAP_API_KEY")
        .output()
        .unwrap_or_else(|err| panic!("failed to execute aw binary: {err}"))
}

fn run_json<I, S>(args: I) -> Value
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = run_aw(args);
    if !output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!(
            "aw command failed (status={}):\nstdout:\n{}\nstderr:\n{}",
            output.status, stdout, stderr
        );
    }

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    serde_json::from_str(&stdout)
        .unwrap_or_else(|err| panic!("stdout is not valid JSON: {err}\nstdout:\n{stdout}"))
}

fn write_fixture(dir: &Path) -> PathBuf {
    let batch = json!({
        "activity_rows": [
            ["Mobile Number", "Days Active", "Streak", "Streak Start", "Daywise"],
            ["919876543210", "12", "4", "2025-02-03", "0110110"],
        ],
        "profile_rows": [
            ["CP Id", "Mobile Number", "Name"],
            [
                "CP123",
                "9876543210",
                "Asha Rao",
                "[{\"zone\":\"East Bangalore\",\"count\":5},{\"zone\":\"North Bangalore\",\"count\":2}]",
            ],
        ],
    });
    let path = dir.join("batch.json");
    let body = serde_json::to_string_pretty(&batch)
        .unwrap_or_else(|err| panic!("failed to serialize fixture: {err}"));
    fs::write(&path, body)
        .unwrap_or_else(|err| panic!("failed to write fixture {}: {err}", path.display()));
    path
}

fn fixture_arg(path: &Path) -> String {
    path.to_str()
        .unwrap_or_else(|| panic!("fixture path should be valid UTF-8: {}", path.display()))
        .to_string()
}

// Test IDs: TCLI-001
#[test]
fn lookup_against_a_fixture_resolves_the_agent() {
    let dir = unique_temp_dir("aw-lookup");
    let fixture = write_fixture(&dir);

    let value =
        run_json(["lookup", "+91 98765 43210", "--fixture", fixture_arg(&fixture).as_str()]);
    assert_eq!(
        value.get("cli_contract_version").and_then(Value::as_str),
        Some("cli.v1")
    );
    assert_eq!(value.pointer("/data/found").and_then(Value::as_bool), Some(true));
    assert_eq!(
        value.pointer("/data/agent_name").and_then(Value::as_str),
        Some("Asha Rao")
    );
    assert_eq!(value.pointer("/data/days_active").and_then(Value::as_i64), Some(12));
    assert_eq!(value.pointer("/data/top_zone").and_then(Value::as_str), Some("East"));
}

// Test IDs: TCLI-002
#[test]
fn lookup_for_an_unknown_identifier_reports_not_found() {
    let dir = unique_temp_dir("aw-unknown");
    let fixture = write_fixture(&dir);

    let value = run_json(["lookup", "1234567890", "--fixture", fixture_arg(&fixture).as_str()]);
    assert_eq!(value.pointer("/data/found").and_then(Value::as_bool), Some(false));
    assert!(value.pointer("/data/agent_name").is_none());
}

// Test IDs: TCLI-003
#[test]
fn candidates_lists_the_variants_a_lookup_would_try() {
    let value = run_json(["candidates", "+91 98765-43210"]);
    assert_eq!(
        value.pointer("/data/normalized").and_then(Value::as_str),
        Some("919876543210")
    );

    let candidates = value
        .pointer("/data/candidates")
        .and_then(Value::as_array)
        .unwrap_or_else(|| panic!("candidates should be an array: {value}"));
    let candidates: Vec<&str> = candidates.iter().filter_map(Value::as_str).collect();
    assert!(candidates.contains(&"919876543210"));
    assert!(candidates.contains(&"9876543210"));
}

// Test IDs: TCLI-004
#[test]
fn lookup_without_credentials_or_fixture_fails_with_guidance() {
    let output = run_aw(["lookup", "9876543210"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("spreadsheet-id"), "stderr should name the missing flag: {stderr}");
}

// Test IDs: TCLI-005
#[test]
fn lookup_against_a_missing_fixture_fails_cleanly() {
    let output = run_aw(["lookup", "9876543210", "--fixture", "/nonexistent/aw-batch.json"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("backing store"), "stderr should describe the failure: {stderr}");
}
