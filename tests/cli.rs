//! Binary-level tests for the `geojson-relay` command.
//!
//! These never reach the network: they cover argument parsing and the
//! configuration errors that stop a command before any request is made.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn relay(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("geojson-relay").unwrap();
    cmd.env_clear()
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("xdg"));
    cmd
}

#[test]
fn help_lists_commands() {
    let home = TempDir::new().unwrap();
    relay(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("get"))
        .stdout(predicate::str::contains("list"));
}

#[test]
fn version() {
    let home = TempDir::new().unwrap();
    relay(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn missing_token_is_reported() {
    let home = TempDir::new().unwrap();
    relay(&home)
        .args(["get", "a.geojson"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("GITHUB_TOKEN"));
}

#[test]
fn traversal_rejected_before_config() {
    let home = TempDir::new().unwrap();
    relay(&home)
        .args(["get", "../secrets.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(".."));
}

#[test]
fn missing_explicit_config_is_reported() {
    let home = TempDir::new().unwrap();
    let missing = home.path().join("nope.toml");
    relay(&home)
        .env("GITHUB_TOKEN", "ghp_test")
        .args(["list", "--config"])
        .arg(&missing)
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn malformed_config_is_reported() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("relay.toml");
    std::fs::write(&config, "[upstream]\ntoken = \"nope\"\n").unwrap();
    relay(&home)
        .env("GITHUB_TOKEN", "ghp_test")
        .args(["serve", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse config file"));
}

#[test]
fn invalid_mode_flag_rejected() {
    let home = TempDir::new().unwrap();
    relay(&home)
        .args(["serve", "--mode", "chunked"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("buffered"));
}

#[test]
fn token_never_echoed_on_error() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("relay.toml");
    std::fs::write(&config, "[upstream]\napi_base = \"not a url\"\n").unwrap();
    relay(&home)
        .env("GITHUB_TOKEN", "ghp_super_secret_value")
        .args(["get", "a.geojson", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("ghp_super_secret_value").not());
}
