//! Drive the `checkin` binary end to end against a temporary store

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

mod common;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create tempdir"),
        }
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("checkin").expect("binary should build");
        cmd.env("NO_COLOR", "1")
            .env_remove("CHECKIN_COUPLE_ID")
            .env_remove("CHECKIN_USER_ID")
            .env_remove("CHECKIN_STORAGE_PATH")
            .env_remove("CHECKIN_LOG_LEVEL")
            .env_remove("RUST_LOG")
            .arg("--config")
            .arg(self.dir.path().join("missing.yaml"))
            .arg("--storage-path")
            .arg(self.dir.path().join("db"));
        cmd
    }
}

#[test]
fn test_version_flag() {
    Command::cargo_bin("checkin")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("checkin"));
}

#[test]
fn test_status_without_session() {
    let ws = Workspace::new();
    ws.cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("No check-in in progress"));
}

#[test]
fn test_check_in_lifecycle() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["start", "communication", "--mood", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Started check-in"))
        .stdout(predicate::str::contains("Welcome"));

    ws.cmd()
        .args(["start", "finances"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already in progress"));

    ws.cmd()
        .args(["step", "complete"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Completed"))
        .stdout(predicate::str::contains("Choose Topics"));

    ws.cmd()
        .args(["step", "goto", "reflection"])
        .assert()
        .failure();

    ws.cmd()
        .args(["note", "add", "talk about budgets", "--category", "communication"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added note"));

    ws.cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Choose Topics"))
        .stdout(predicate::str::contains("talk about budgets"));

    ws.cmd()
        .args(["complete", "--mood", "4", "--reflection", "felt heard"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Completed check-in"));

    ws.cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("No check-in in progress"));
}

#[test]
fn test_step_commands_require_a_session() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["step", "complete"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No active check-in"));
}

#[test]
fn test_timer_persists_between_invocations() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["timer", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("30:00"))
        .stdout(predicate::str::contains("idle"));

    ws.cmd()
        .args(["timer", "start"])
        .assert()
        .success()
        .stdout(predicate::str::contains("running"));

    ws.cmd()
        .args(["timer", "pause"])
        .assert()
        .success()
        .stdout(predicate::str::contains("paused"));

    ws.cmd()
        .args(["timer", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("paused"));

    ws.cmd()
        .args(["timer", "reset"])
        .assert()
        .success()
        .stdout(predicate::str::contains("30:00"))
        .stdout(predicate::str::contains("idle"));
}

#[test]
fn test_settings_templates_drive_the_turn_clock() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["settings", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("quick"))
        .stdout(predicate::str::contains("deep-dive"));

    ws.cmd()
        .args(["turn", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Turn-based mode is off"));

    ws.cmd()
        .args(["settings", "apply", "marathon"])
        .assert()
        .failure();

    ws.cmd()
        .args(["settings", "apply", "deep-dive"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Applied template"))
        .stdout(predicate::str::contains("60 min"));

    ws.cmd()
        .args(["turn", "start"])
        .assert()
        .success()
        .stdout(predicate::str::contains("partner-a"))
        .stdout(predicate::str::contains("03:00"));

    ws.cmd()
        .args(["turn", "switch"])
        .assert()
        .success()
        .stdout(predicate::str::contains("partner-b"));

    ws.cmd()
        .args(["turn", "timeout", "a"])
        .assert()
        .success()
        .stdout(predicate::str::contains("10:00"));
}

#[test]
fn test_config_file_selects_couple() {
    let ws = Workspace::new();
    let (_cfg_dir, config_path) = common::temp_config_file(
        "workspace:\n  couple_id: from-file\n  user_id: u-file\n",
    );

    Command::cargo_bin("checkin")
        .unwrap()
        .env("NO_COLOR", "1")
        .env_remove("CHECKIN_COUPLE_ID")
        .env_remove("CHECKIN_USER_ID")
        .arg("--config")
        .arg(&config_path)
        .arg("--storage-path")
        .arg(ws.dir.path().join("db"))
        .args(["start", "trust"])
        .assert()
        .success();

    // A different couple sees no session in the same store
    ws.cmd()
        .args(["--couple", "someone-else", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No check-in in progress"));
}
