//! End-to-end CLI tests for the harvester binary.

#![allow(deprecated)]

mod support;
use support::socket_guard::{mock_domain, socket_skip_return, start_mock_server_or_skip};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

fn harvester(db_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("harvester").unwrap();
    cmd.arg("--database").arg(db_dir.path().join("robots.db"));
    cmd
}

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    let mut cmd = Command::cargo_bin("harvester").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Harvest robots.txt"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    let mut cmd = Command::cargo_bin("harvester").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("harvester"));
}

/// Test that invalid flags cause non-zero exit.
#[test]
fn test_binary_invalid_flag_returns_error() {
    let mut cmd = Command::cargo_bin("harvester").unwrap();
    cmd.arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

/// Empty stdin is a normal end of input.
#[test]
fn test_binary_empty_input_reports_zero_rows() {
    let dir = TempDir::new().unwrap();
    harvester(&dir)
        .arg("-q")
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("Total rows in database: 0"));
    assert!(dir.path().join("robots.db").exists());
}

#[test]
fn test_binary_json_report() {
    let dir = TempDir::new().unwrap();
    let assert = harvester(&dir)
        .args(["-q", "--json"])
        .write_stdin("\n\n")
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["domains_read"], 0);
    assert_eq!(report["persistence"]["rows_in_store"], 0);
    assert_eq!(report["workers"]["attempts"], 0);
}

#[test]
fn test_binary_unopenable_database_fails() {
    let dir = TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin("harvester").unwrap();
    cmd.arg("--database")
        .arg(dir.path().join("missing").join("dir").join("robots.db"))
        .arg("-q")
        .write_stdin("example.com\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to open database"));
}

#[test]
fn test_binary_missing_input_file_fails() {
    let dir = TempDir::new().unwrap();
    harvester(&dir)
        .arg("--input")
        .arg(dir.path().join("nope.txt"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to open input"));
}

#[test]
fn test_binary_worker_range_enforced() {
    let dir = TempDir::new().unwrap();
    harvester(&dir)
        .args(["--workers", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("workers"));
}

#[tokio::test]
async fn test_binary_harvests_from_input_file() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return socket_skip_return();
    };
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow:\n"))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let input = dir.path().join("domains.txt");
    std::fs::write(&input, format!("{}\n", mock_domain(&mock_server))).unwrap();

    harvester(&dir)
        .arg("--input")
        .arg(&input)
        .args(["-q", "--workers", "2", "--commit-interval-ms", "50"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total rows in database: 1"));
}
