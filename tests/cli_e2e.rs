//! End-to-end CLI tests: flag handling and configuration failures.
//!
//! These never reach the network: they exercise the argument/config layer
//! that runs before any HTTP client is built.

use assert_cmd::Command;
use predicates::prelude::*;

fn boxdsync() -> Command {
    Command::cargo_bin("boxdsync").expect("binary should build")
}

#[test]
fn test_help_describes_the_tool() {
    boxdsync()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Letterboxd"))
        .stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn test_version_flag() {
    boxdsync()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("boxdsync"));
}

#[test]
fn test_missing_required_environment_fails_before_any_sync() {
    boxdsync()
        .env_clear()
        .assert()
        .failure()
        .stderr(predicate::str::contains("LBXD_USERNAME"));
}

#[test]
fn test_missing_api_key_named_in_error() {
    boxdsync()
        .env_clear()
        .env("LBXD_USERNAME", "fdrabsch")
        .env("OVERSEERR_HOST", "https://overseerr.example.net")
        .assert()
        .failure()
        .stderr(predicate::str::contains("OVERSEERR_API_KEY"));
}

#[test]
fn test_invalid_retry_bound_rejected_by_clap() {
    boxdsync()
        .arg("--max-retries")
        .arg("99")
        .assert()
        .failure()
        .stderr(predicate::str::contains("99"));
}
