use assert_cmd::Command;
use tempfile::tempdir;

const BIN: &str = "exportctl";

#[test]
fn test_empty_args() {
    let mut cmd = Command::cargo_bin(BIN).unwrap();
    cmd.assert().failure();
}

#[test]
fn test_help() {
    let mut cmd = Command::cargo_bin(BIN).unwrap();
    cmd.arg("-h").assert().success();
}

#[test]
fn test_version_opt() {
    let mut cmd = Command::cargo_bin(BIN).unwrap();
    cmd.arg("-V").assert().failure();
}

#[test]
fn test_version_keyword() {
    let mut cmd = Command::cargo_bin(BIN).unwrap();
    cmd.arg("version").assert().success();
}

#[test]
fn test_bad_keyword() {
    let mut cmd = Command::cargo_bin(BIN).unwrap();
    cmd.arg("bouh").assert().failure();
}

#[test]
fn test_list_empty() {
    let mut cmd = Command::cargo_bin(BIN).unwrap();
    cmd.arg("list").assert().failure();
}

#[test]
fn test_list_environments() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("config.json");
    std::fs::write(
        &cfg,
        r#"{"prod": {"url": "https://x", "passkey": "p", "secret": "s"}}"#,
    )
    .unwrap();

    let mut cmd = Command::cargo_bin(BIN).unwrap();
    cmd.arg("-c")
        .arg(&cfg)
        .arg("list")
        .arg("environments")
        .assert()
        .success();
}

#[test]
fn test_missing_config() {
    let dir = tempdir().unwrap();

    let mut cmd = Command::cargo_bin(BIN).unwrap();
    cmd.arg("-c")
        .arg(dir.path().join("nope.json"))
        .arg("list")
        .arg("environments")
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_completion() {
    let mut cmd = Command::cargo_bin(BIN).unwrap();
    cmd.arg("completion").arg("bash").assert().success();
}

#[test]
fn test_bulk_needs_date() {
    let mut cmd = Command::cargo_bin(BIN).unwrap();
    cmd.arg("bulk").arg("-e").arg("prod").assert().failure();
}
