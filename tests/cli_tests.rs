//! CLI integration tests
//!
//! Drive the `netres` binary end to end with files on disk.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn netres() -> Command {
    let mut cmd = Command::cargo_bin("netres").unwrap();
    cmd.env_remove("NETRES_CONFIG")
        .env_remove("NETRES_STATE")
        .env_remove("NETRES_OUTPUT")
        .env_remove("RUST_LOG")
        .arg("--no-color");
    cmd
}

fn temp_file(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_help() {
    netres()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("list"));
}

#[test]
fn test_version() {
    netres()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_list_resources() {
    netres()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("hostname"))
        .stdout(predicate::str::contains("ntp_global"))
        .stdout(predicate::str::contains("fc_interfaces"))
        .stdout(predicate::str::contains("bgp_address_family"));
}

#[test]
fn test_list_json() {
    let output = netres().args(["--output", "json", "list"]).output().unwrap();
    assert!(output.status.success());
    let resources: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = resources
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|r| r["name"].as_str())
        .collect();
    assert_eq!(names.len(), 4);
    assert!(names.contains(&"bgp_address_family"));
}

#[test]
fn test_run_rendered() {
    let want = temp_file(".yml", "hostname: NXOSv\n");
    netres()
        .args(["run", "hostname", "--state", "rendered", "--config-file"])
        .arg(want.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("hostname NXOSv"));
}

#[test]
fn test_run_merged_json() {
    let want = temp_file(".yml", "hostname: NXOSv\n");
    let running = temp_file(".txt", "hostname NXOSv-9k\n");

    let output = netres()
        .args(["-o", "json", "run", "hostname", "--state", "merged", "--check"])
        .arg("--config-file")
        .arg(want.path())
        .arg("--running-config")
        .arg(running.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["changed"], serde_json::json!(true));
    assert_eq!(result["commands"], serde_json::json!(["hostname NXOSv"]));
    assert_eq!(result["before"], serde_json::json!({"hostname": "NXOSv-9k"}));
}

#[test]
fn test_run_parsed() {
    let running = temp_file(".txt", "ntp logging\nntp server 192.0.2.2\n");
    netres()
        .args(["run", "ntp_global", "--state", "parsed", "--running-config"])
        .arg(running.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("parsed"))
        .stdout(predicate::str::contains("server: 192.0.2.2"));
}

#[test]
fn test_run_unknown_resource() {
    netres()
        .args(["run", "vlans", "--state", "gathered"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown resource"));
}

#[test]
fn test_run_invalid_state() {
    netres()
        .args(["run", "hostname", "--state", "frobbed"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_run_missing_config() {
    let running = temp_file(".txt", "hostname NXOSv-9k\n");
    netres()
        .args(["run", "hostname", "--state", "merged", "--running-config"])
        .arg(running.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("config"));
}

#[test]
fn test_run_invalid_config_file() {
    let want = temp_file(".yml", "hostname: [unterminated\n");
    netres()
        .args(["run", "hostname", "--state", "rendered", "--config-file"])
        .arg(want.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config file"));
}
