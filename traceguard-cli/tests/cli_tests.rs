//! CLI integration tests

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

/// Build command for the traceguard-cli binary.
fn traceguard_cli() -> Command {
    Command::cargo_bin("traceguard-cli").unwrap()
}

/// Path to traceguard library test fixtures (relative to workspace).
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("traceguard")
        .join("tests")
        .join("fixtures")
}

#[test]
fn test_cli_help() {
    let mut cmd = traceguard_cli();

    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("netlist"));
}

#[test]
fn test_cli_version() {
    let mut cmd = traceguard_cli();

    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_check_fixture_system() {
    let mut cmd = traceguard_cli();
    let path = fixtures_dir().join("system.csv");

    cmd.arg("check").arg(path);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Trace checks:"))
        .stdout(predicate::str::contains("PASS  A.SIG_X -> B.SIG_Y"))
        .stdout(predicate::str::contains("FAIL  A.SIG_X -> B.SIG_Z"))
        .stdout(predicate::str::contains("Summary:"));
}

#[test]
fn test_cli_check_json_output() {
    let mut cmd = traceguard_cli();
    let path = fixtures_dir().join("system.csv");

    cmd.arg("check").arg(path).arg("--format").arg("json");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"traces\""))
        .stdout(predicate::str::contains("\"volt_conflicts\""));
}

#[test]
fn test_cli_check_nonexistent_file() {
    let mut cmd = traceguard_cli();

    cmd.arg("check").arg("does_not_exist.csv");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_cli_check_writes_reports() {
    let dir = tempfile::tempdir().unwrap();
    let stem = dir.path().join("out");

    let mut cmd = traceguard_cli();
    cmd.arg("check")
        .arg(fixtures_dir().join("system.csv"))
        .arg("--out")
        .arg(stem.to_str().unwrap())
        .arg("--all-volt");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("out_check.csv"));

    assert!(dir.path().join("out_check.csv").exists());
    assert!(dir.path().join("out_volt.csv").exists());
    assert!(dir.path().join("out_map.csv").exists());
}

#[test]
fn test_cli_directives_command() {
    let mut cmd = traceguard_cli();

    cmd.arg("directives");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("CHECKTRACE"))
        .stdout(predicate::str::contains("HARNESSLINK"));
}

#[test]
fn test_cli_directives_verbose() {
    let mut cmd = traceguard_cli();

    cmd.arg("directives").arg("--verbose");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("conductive-path"));
}

#[test]
fn test_cli_exit_codes() {
    let mut cmd = traceguard_cli();
    cmd.arg("check").arg(fixtures_dir().join("system.csv"));
    cmd.assert().code(0);

    let mut cmd = traceguard_cli();
    cmd.arg("check").arg("nonexistent.csv");
    cmd.assert().code(1);
}

#[test]
fn test_cli_output_formats_are_different() {
    let path = fixtures_dir().join("system.csv");

    let mut cmd_human = traceguard_cli();
    cmd_human
        .arg("check")
        .arg(&path)
        .arg("--format")
        .arg("human");
    let human_output = cmd_human.output().unwrap();

    let mut cmd_json = traceguard_cli();
    cmd_json.arg("check").arg(&path).arg("--format").arg("json");
    let json_output = cmd_json.output().unwrap();

    assert_ne!(
        human_output.stdout, json_output.stdout,
        "Different formats should produce different output"
    );
}
