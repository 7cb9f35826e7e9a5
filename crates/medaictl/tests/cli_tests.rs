//! CLI integration tests for medaictl
//!
//! Runs the built binary with an isolated environment:
//! - medaictl --help            lists every panel
//! - medaictl <panel>           exits 78 when no endpoint is configured
//! - medaictl --config BAD      exits 78 on an unparseable file
//! - medaictl config --json     masks API keys
//! - medaictl diabetes --set    rejects bad values with 64 before any network call

use std::io::Write;
use std::process::{Command, Output};
use tempfile::NamedTempFile;

const ENV_VARS: &[&str] = &[
    "MEDAI_CONFIG",
    "MEDAI_LESION_URL",
    "MEDAI_DIABETES_URL",
    "MEDAI_TRIAGE_URL",
    "MEDAI_ENDPOINT_KIND",
    "MEDAI_API_KEY",
    "MEDAI_LOG",
];

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn medaictl(config: &NamedTempFile, args: &[&str]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_medaictl"));
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.env("MEDAI_CONFIG", config.path())
        .args(args)
        .output()
        .expect("Failed to run medaictl")
}

#[test]
fn test_help_lists_panels() {
    let output = Command::new(env!("CARGO_BIN_EXE_medaictl"))
        .arg("--help")
        .output()
        .expect("Failed to run medaictl");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["lesion", "diabetes", "triage", "config"] {
        assert!(stdout.contains(command), "help is missing {}", command);
    }
}

#[test]
fn test_missing_endpoint_exits_78() {
    let config = config_file("");
    let output = medaictl(&config, &["triage", "persistent", "cough"]);

    assert_eq!(output.status.code(), Some(78));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("MEDAI_TRIAGE_URL"));
}

#[test]
fn test_unparseable_config_exits_78() {
    let config = config_file("[endpoints.triage\nurl = ");
    let output = medaictl(&config, &["config"]);
    assert_eq!(output.status.code(), Some(78));
}

#[test]
fn test_non_http_url_exits_78() {
    let config = config_file("[endpoints.triage]\nurl = \"ftp://example.com/triage\"\n");
    let output = medaictl(&config, &["triage", "fever"]);
    assert_eq!(output.status.code(), Some(78));
}

#[test]
fn test_config_json_masks_api_key() {
    let config = config_file(
        "[endpoints.triage]\nurl = \"https://llm.example.com/generate\"\nkind = \"generative\"\napi_key = \"super-secret\"\n",
    );
    let output = medaictl(&config, &["config", "--json"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("super-secret"));
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(
        value["endpoints"]["triage"]["url"],
        "https://llm.example.com/generate"
    );
}

#[test]
fn test_invalid_form_value_exits_64() {
    // Port 9 (discard) is never contacted: validation fails first
    let config = config_file("[endpoints.diabetes]\nurl = \"http://127.0.0.1:9/predict\"\n");
    let output = medaictl(&config, &["diabetes", "--set", "smoking_status=Sometimes"]);
    assert_eq!(output.status.code(), Some(64));
}
