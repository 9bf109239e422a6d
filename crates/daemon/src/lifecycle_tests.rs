// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

fn write(dir: &TempDir, text: &str) -> PathBuf {
    let path = dir.path().join("cadence.toml");
    std::fs::write(&path, text).unwrap();
    path
}

const PROCESSOR: &str = r#"
[[processor]]
name = "touch"
kind = "shell"
command = "true"
"#;

#[test]
fn daemon_section_paths_resolve_against_config_dir() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        &format!(
            "[daemon]\nsocket = \"run/c.sock\"\nlog = \"c.log\"\nautostart = false\nshutdown_timeout = \"3s\"\npoll_interval = \"250ms\"\n{}",
            PROCESSOR
        ),
    );

    let config = Config::load(&path, None).unwrap();
    assert_eq!(config.socket_path, dir.path().join("run/c.sock"));
    assert_eq!(config.lock_path, dir.path().join("run/c.sock.lock"));
    assert_eq!(config.log_path, dir.path().join("c.log"));
    assert!(!config.autostart);
    assert_eq!(config.shutdown_timeout, Duration::from_secs(3));
    assert_eq!(config.runner.poll_interval, Duration::from_millis(250));
    assert_eq!(config.scheduler.processors.len(), 1);
}

#[test]
fn defaults_without_daemon_section() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, PROCESSOR);

    let config = Config::load(&path, None).unwrap();
    assert_eq!(config.socket_path, cadence_daemon::default_socket_path());
    assert_eq!(config.log_path, cadence_daemon::default_log_path());
    assert!(config.autostart);
    assert_eq!(config.shutdown_timeout, DEFAULT_SHUTDOWN_TIMEOUT);
    assert_eq!(config.runner, RunnerOptions::default());
}

#[test]
fn socket_override_wins() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "[daemon]\nsocket = \"a.sock\"\n");
    let other = dir.path().join("b.sock");

    let config = Config::load(&path, Some(other.clone())).unwrap();
    assert_eq!(config.socket_path, other);
}

#[test]
fn unknown_daemon_key_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "[daemon]\nsokcet = \"a.sock\"\n");

    let err = Config::load(&path, None).unwrap_err();
    assert!(matches!(err, LifecycleError::Config(ConfigError::Parse(_))));
}

#[test]
fn misspelled_processor_table_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "[daemon]\nsocket = \"a.sock\"\n[[processors]]\nname = \"touch\"\nkind = \"shell\"\ncommand = \"true\"\n",
    );

    let err = Config::load(&path, None).unwrap_err();
    assert!(matches!(err, LifecycleError::Config(ConfigError::Parse(_))));
    assert!(err.to_string().contains("processors"));
}

#[test]
fn processors_and_triggers_load_alongside_daemon_section() {
    let dir = TempDir::new().unwrap();
    let text = format!(
        "[daemon]\nsocket = \"a.sock\"\n[trigger.hourly]\ntype = \"interval\"\nevery = \"1h\"\n{}",
        PROCESSOR
    );
    let path = write(&dir, &text);

    let config = Config::load(&path, None).unwrap();
    assert_eq!(config.scheduler.processors.len(), 1);
    assert!(config.scheduler.triggers.contains_key("hourly"));
}

#[test]
fn missing_file_reports_path() {
    let dir = TempDir::new().unwrap();
    let err = Config::load(&dir.path().join("absent.toml"), None).unwrap_err();
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn registry_knows_shell() {
    assert_eq!(registry().kinds(), vec!["shell"]);
}

#[tokio::test]
async fn startup_binds_and_shutdown_cleans_up() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        &format!("[daemon]\nsocket = \"d.sock\"\nautostart = true\n{}", PROCESSOR),
    );
    let config = Config::load(&path, None).unwrap();

    let mut daemon = startup(&config).await.unwrap();
    assert!(config.socket_path.exists());
    let pid = std::fs::read_to_string(&config.lock_path).unwrap();
    assert_eq!(pid.trim(), std::process::id().to_string());
    assert!(daemon.manager.status().unwrap()[0].state != cadence_core::ProcessorState::Stopped);

    daemon.shutdown().await.unwrap();
    assert!(!config.socket_path.exists());
    assert!(!config.lock_path.exists());
    assert!(daemon
        .manager
        .status()
        .unwrap()
        .iter()
        .all(|s| s.state == cadence_core::ProcessorState::Stopped));
}

#[tokio::test]
async fn startup_with_bad_processor_leaves_no_socket() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "[daemon]\nsocket = \"d.sock\"\n[[processor]]\nname = \"x\"\nkind = \"nope\"\n",
    );
    let config = Config::load(&path, None).unwrap();

    let result = startup(&config).await;
    assert!(matches!(result, Err(LifecycleError::Manager(_))));
    assert!(!config.socket_path.exists());
}
