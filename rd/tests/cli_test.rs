//! Command-line tests for the rd binary

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn rd() -> Command {
    let mut cmd = Command::cargo_bin("rd").expect("rd binary");
    cmd.arg("--stderr");
    cmd
}

#[test]
fn test_eval_true_and_false() {
    rd().args(["eval", "$status > 5", "10"])
        .assert()
        .success()
        .stdout(predicate::str::diff("true\n"));

    rd().args(["eval", "$status > 5", "3"])
        .assert()
        .success()
        .stdout(predicate::str::diff("false\n"));
}

#[test]
fn test_eval_timestamps() {
    rd().args(["eval", "$status < now - 1d", "2001-01-01T00:00:00Z"])
        .assert()
        .success()
        .stdout(predicate::str::diff("true\n"));
}

#[test]
fn test_eval_syntax_error() {
    rd().args(["eval", "$status >", "10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid condition"));
}

#[test]
fn test_eval_type_mismatch() {
    rd().args(["eval", "$status > 5", "open"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Evaluation failed"));
}

#[test]
fn test_validate_reports_each_file() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();
    std::fs::write(
        dir.join("good.yaml"),
        "reminder:\n  condition: \"$status > 5\"\n  watcher:\n    type: static\n    value: '1'\n",
    )
    .unwrap();
    std::fs::write(dir.join("notes.yaml"), "# nothing yet\n").unwrap();

    rd().arg("validate")
        .arg(dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("good.yaml").and(predicate::str::contains("notes.yaml")));
}

#[test]
fn test_validate_fails_on_bad_definition() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(
        temp_dir.path().join("bad.yaml"),
        "reminder:\n  condition: \"$status > 5\"\n  watcher:\n    type: zigbee\n",
    )
    .unwrap();

    rd().arg("validate")
        .arg(temp_dir.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("zigbee"));
}
