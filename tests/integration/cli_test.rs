//! Command-line tool behavior

use std::io::Write;
use std::process::{Command, Output};

use tempfile::{NamedTempFile, TempDir};

use super::fixture_path;

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_adcs-template"))
        .args(args)
        .env_remove("ADCS_TEMPLATE_CONFIG")
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .output()
        .expect("binary runs")
}

fn temp_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_duration() {
    let output = run(&["duration", "2", "weeks"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "1209600");
}

#[test]
fn test_duration_error_reports_kind() {
    let output = run(&["duration", "bogus"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error: FormatError:"));
}

#[test]
fn test_plan() {
    let current = temp_file(r#"{"cn": "T", "flags": 131648, "displayName": "Old", "pKIExtendedKeyUsage": ["1.3.6.1.5.5.7.3.1"]}"#);
    let desired = temp_file(r#"{"flags": "131649", "displayName": "Old "}"#);

    let output = run(&[
        "--quiet",
        "plan",
        "--current",
        current.path().to_str().unwrap(),
        "--desired",
        desired.path().to_str().unwrap(),
    ]);
    assert!(output.status.success());

    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plan["template"], "T");
    assert_eq!(plan["reconciliation"]["replace"]["flags"], 131649);
    assert_eq!(plan["reconciliation"]["clear"][0], "pKIExtendedKeyUsage");
    assert_eq!(plan["applied"], false);
}

#[test]
fn test_diff() {
    let current = temp_file(r#"{"flags": 1}"#);
    let desired = temp_file(r#"{"flags": 2}"#);

    let output = run(&[
        "-q",
        "diff",
        "--current",
        current.path().to_str().unwrap(),
        "--desired",
        desired.path().to_str().unwrap(),
    ]);
    assert!(output.status.success());
    let changes: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(changes, serde_json::json!({ "flags": 2 }));
}

#[test]
fn test_policy_to_file() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("policy.xml");
    let web = fixture_path("WebServer2");

    let output = run(&[
        "-q",
        "policy",
        "--compact",
        "--output",
        out.to_str().unwrap(),
        web.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let xml = std::fs::read_to_string(out).unwrap();
    assert!(xml.contains("<commonName>WebServer2</commonName>"));
    assert!(xml.contains("<nextUpdateHours>8</nextUpdateHours>"));
}

#[test]
fn test_missing_input_file() {
    let output = run(&["policy", "/nonexistent/template.json"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("MissingInputError"));
}

#[test]
fn test_config_validate_rejects_bad_file() {
    let config = temp_file("[directory]\ntemplate_container = \"Templates\"\n");
    let output = run(&["--config", config.path().to_str().unwrap(), "config", "validate"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("ConfigError"));
}
