// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI integration tests that need no running daemon

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn cadence(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("cadence").unwrap();
    cmd.env("CADENCE_SOCKET", temp.path().join("cadenced.sock"));
    cmd
}

#[test]
fn help_lists_commands() {
    let temp = TempDir::new().unwrap();
    cadence(&temp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("force"))
        .stdout(predicate::str::contains("shutdown"));
}

#[test]
fn status_without_daemon_fails_gracefully() {
    let temp = TempDir::new().unwrap();
    cadence(&temp)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Daemon not running"));
}

#[test]
fn socket_flag_overrides_env() {
    let temp = TempDir::new().unwrap();
    let other = temp.path().join("other.sock");
    cadence(&temp)
        .arg("--socket")
        .arg(&other)
        .arg("ping")
        .assert()
        .failure()
        .stderr(predicate::str::contains("other.sock"));
}

#[test]
fn start_requires_name_or_all() {
    let temp = TempDir::new().unwrap();
    cadence(&temp).arg("start").assert().failure().code(2);
}

#[test]
fn start_rejects_name_with_all() {
    let temp = TempDir::new().unwrap();
    cadence(&temp)
        .args(["start", "backup", "--all"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn force_requires_name() {
    let temp = TempDir::new().unwrap();
    cadence(&temp).arg("force").assert().failure().code(2);
}
