//! CLI tests for the `gardinar` binary.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn gardinar() -> Command {
    let mut cmd = cargo_bin_cmd!("gardinar");
    cmd.env_remove("GARDINAR_SECRET_KEY")
        .env_remove("GARDINAR_LISTEN_PORT")
        .env_remove("RUST_LOG");
    cmd
}

fn write_config(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.yaml");
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_help() {
    gardinar()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--config"));
}

#[test]
fn test_version() {
    gardinar()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_check_named_tasks() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        &dir,
        "listen_port: 9090\nsecret_key: s3cret\ntasks:\n  deploy: echo hello\n  test: make test\n",
    );

    gardinar()
        .current_dir(dir.path())
        .arg("--config")
        .arg(&config)
        .arg("--check")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.0.0.0:9090/webhook"))
        .stdout(predicate::str::contains("named (2 task(s))"))
        .stdout(predicate::str::contains("- deploy"))
        .stdout(predicate::str::contains("Configuration OK"))
        .stdout(predicate::str::contains("s3cret").not());
}

#[test]
fn test_check_applies_port_flag_and_env() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "secret_key: s3cret\ntasks:\n  deploy: echo hi\n");

    gardinar()
        .current_dir(dir.path())
        .env("GARDINAR_LISTEN_PORT", "7000")
        .args(["--check", "--port", "7100", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains(":7100/webhook"));

    gardinar()
        .current_dir(dir.path())
        .env("GARDINAR_LISTEN_PORT", "7000")
        .args(["--check", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains(":7000/webhook"));
}

#[test]
fn test_check_fixed_script_reports_missing() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        &dir,
        "secret_key: s3cret\npost_update_script: /nonexistent/post-update.sh\n",
    );

    gardinar()
        .current_dir(dir.path())
        .arg("--config")
        .arg(&config)
        .arg("--check")
        .assert()
        .success()
        .stdout(predicate::str::contains("fixed (1 task(s))"))
        .stdout(predicate::str::contains("(missing)"));
}

#[test]
fn test_missing_config_fails() {
    let dir = TempDir::new().unwrap();
    gardinar()
        .current_dir(dir.path())
        .args(["--config", "nope.yaml", "--check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error loading config"));
}

#[test]
fn test_directory_config_fails() {
    let dir = TempDir::new().unwrap();
    gardinar()
        .current_dir(dir.path())
        .arg("--config")
        .arg(dir.path())
        .arg("--check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("is a directory"));
}

#[test]
fn test_empty_secret_fails() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "secret_key: \"\"\ntasks:\n  deploy: echo hi\n");
    gardinar()
        .current_dir(dir.path())
        .arg("--config")
        .arg(&config)
        .arg("--check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("secret_key must not be empty"));
}
