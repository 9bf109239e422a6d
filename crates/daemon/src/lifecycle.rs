// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: configuration, startup, shutdown.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cadence_core::{
    ConfigError, ProcessorDef, ProcessorManager, ProcessorRegistry, RunnerOptions,
    SchedulerConfig, TriggerDef,
};
use cadence_daemon::shell;
use fs2::FileExt;
use serde::Deserialize;
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::sync::Notify;
use tracing::{info, warn};

const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// `[daemon]` section of the configuration file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DaemonSection {
    socket: Option<PathBuf>,
    log: Option<PathBuf>,
    autostart: Option<bool>,
    #[serde(default, with = "humantime_serde")]
    shutdown_timeout: Option<Duration>,
    #[serde(default, with = "humantime_serde")]
    poll_interval: Option<Duration>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    daemon: DaemonSection,
    #[serde(default)]
    trigger: BTreeMap<String, TriggerDef>,
    #[serde(default)]
    processor: Vec<ProcessorDef>,
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Path to Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Start every processor once the socket is up
    pub autostart: bool,
    /// Bound on the cooperative stop at shutdown before aborting
    pub shutdown_timeout: Duration,
    pub runner: RunnerOptions,
    pub scheduler: SchedulerConfig,
}

impl Config {
    /// Load the configuration file; `socket` overrides `[daemon].socket`
    pub fn load(path: &Path, socket: Option<PathBuf>) -> Result<Self, LifecycleError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile = toml::from_str(&text).map_err(ConfigError::from)?;
        let base = path.parent().unwrap_or(Path::new("."));

        let socket_path = socket
            .or(file.daemon.socket.map(|p| base.join(p)))
            .unwrap_or_else(cadence_daemon::default_socket_path);
        let log_path = file
            .daemon
            .log
            .map(|p| base.join(p))
            .unwrap_or_else(cadence_daemon::default_log_path);
        let mut runner = RunnerOptions::default();
        if let Some(poll_interval) = file.daemon.poll_interval {
            runner.poll_interval = poll_interval;
        }

        Ok(Self {
            config_path: path.to_path_buf(),
            lock_path: lock_path_for(&socket_path),
            socket_path,
            log_path,
            autostart: file.daemon.autostart.unwrap_or(true),
            shutdown_timeout: file
                .daemon
                .shutdown_timeout
                .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT),
            runner,
            scheduler: SchedulerConfig {
                triggers: file.trigger,
                processors: file.processor,
            },
        })
    }
}

fn lock_path_for(socket_path: &Path) -> PathBuf {
    let mut name = socket_path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

/// Processor kinds the daemon can build
pub fn registry() -> ProcessorRegistry {
    let mut registry = ProcessorRegistry::new();
    shell::register(&mut registry);
    registry
}

/// Build the manager for `config`; bindings resolve on first use
pub fn build_manager(config: &Config) -> ProcessorManager {
    let scheduler = config.scheduler.clone();
    let registry = registry();
    ProcessorManager::with_options(move || scheduler.bind(&registry), config.runner)
}

/// Daemon state during operation
pub struct DaemonState {
    /// Configuration
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    /// Unix socket listener
    pub listener: UnixListener,
    pub manager: Arc<ProcessorManager>,
    /// When daemon started
    pub start_time: Instant,
    /// Signalled by a `Shutdown` request
    pub shutdown_requested: Arc<Notify>,
}

impl DaemonState {
    /// Stop every processor, then remove the socket and lock files.
    ///
    /// Runners get `shutdown_timeout` to finish cooperatively before they
    /// are aborted.
    pub async fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        let manager = Arc::clone(&self.manager);
        let timeout = self.config.shutdown_timeout;
        let stopped = tokio::task::spawn_blocking(move || -> Result<(), LifecycleError> {
            if !manager.stop_all_within(timeout)? {
                warn!("processors did not stop within {:?}, aborting", timeout);
                manager.abort_all()?;
            }
            Ok(())
        })
        .await
        .map_err(|e| LifecycleError::Runtime(e.to_string()))?;
        if let Err(e) = stopped {
            warn!("Failed to stop processors: {}", e);
        }

        if self.config.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.socket_path) {
                warn!("Failed to remove socket file: {}", e);
            }
        }
        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove lock file: {}", e);
            }
        }

        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine log directory")]
    NoLogDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Manager(#[from] cadence_core::ManagerError),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<DaemonState, LifecycleError> {
    match startup_inner(config).await {
        Ok(state) => Ok(state),
        // the socket belongs to the running daemon if the lock was taken
        Err(e @ LifecycleError::LockFailed(_)) => Err(e),
        Err(e) => {
            cleanup_on_failure(config);
            Err(e)
        }
    }
}

/// Inner startup logic - cleanup_on_failure called if this fails
async fn startup_inner(config: &Config) -> Result<DaemonState, LifecycleError> {
    // 1. Create socket directory (holds the lock file too)
    if let Some(parent) = config.socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // 2. Acquire lock file FIRST - prevents races
    let mut lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    // Only the lock holder may rewrite the PID
    lock_file.set_len(0)?;
    use std::io::Write;
    writeln!(lock_file, "{}", std::process::id())?;

    // 3. Resolve processors BEFORE binding socket (fail fast on bad config)
    let manager = Arc::new(build_manager(config));
    manager.initialize()?;
    info!(
        "Loaded {} processors from {}",
        config.scheduler.processors.len(),
        config.config_path.display()
    );

    // 4. Remove stale socket and bind (LAST - only after all validation passes)
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    // 5. Start processors
    if config.autostart {
        manager.start_all()?;
    }

    Ok(DaemonState {
        config: config.clone(),
        lock_file,
        listener,
        manager,
        start_time: Instant::now(),
        shutdown_requested: Arc::new(Notify::new()),
    })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
