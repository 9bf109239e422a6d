// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in `shell` processor: runs a command through `sh -c`
//!
//! ```toml
//! [[processor]]
//! name = "backup"
//! kind = "shell"
//! command = "rsync -a /src /dst"
//! cwd = "/srv"
//! env = { RSYNC_RSH = "ssh" }
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use cadence_core::config::params;
use cadence_core::{ConfigError, Processor, ProcessorError, ProcessorRegistry};
use serde::Deserialize;

/// Processor kind name used in configuration
pub const KIND: &str = "shell";

/// How often a running command is checked for exit
const WAIT_POLL: Duration = Duration::from_millis(20);

/// Configuration keys accepted by the shell processor
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShellParams {
    pub command: String,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Runs one shell command per unit of work
#[derive(Debug)]
pub struct ShellProcessor {
    name: String,
    params: ShellParams,
    child: Mutex<Option<Child>>,
    aborted: AtomicBool,
}

impl ShellProcessor {
    pub fn new(name: impl Into<String>, params: ShellParams) -> Self {
        Self {
            name: name.into(),
            params,
            child: Mutex::new(None),
            aborted: AtomicBool::new(false),
        }
    }

    pub fn params(&self) -> &ShellParams {
        &self.params
    }

    fn child(&self) -> MutexGuard<'_, Option<Child>> {
        self.child.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn spawn(&self) -> std::io::Result<Child> {
        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(&self.params.command)
            .envs(&self.params.env)
            .stdin(Stdio::null());
        if let Some(cwd) = &self.params.cwd {
            command.current_dir(cwd);
        }
        command.spawn()
    }

    /// Poll the running child until it exits, releasing the lock between
    /// polls so `abort()` can kill it
    fn wait(&self) -> Result<ExitStatus, ProcessorError> {
        loop {
            {
                let mut slot = self.child();
                let Some(child) = slot.as_mut() else {
                    return Err(ProcessorError::Aborted);
                };
                if let Some(status) = child.try_wait()? {
                    slot.take();
                    return Ok(status);
                }
            }
            std::thread::sleep(WAIT_POLL);
        }
    }
}

impl Processor for ShellProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self) -> Result<(), ProcessorError> {
        self.aborted.store(false, Ordering::SeqCst);
        let child = self.spawn()?;
        tracing::debug!(processor = %self.name, pid = child.id(), "command started");
        *self.child() = Some(child);

        let status = self.wait()?;
        if self.aborted.load(Ordering::SeqCst) {
            return Err(ProcessorError::Aborted);
        }
        if !status.success() {
            return Err(ProcessorError::Failed(format!(
                "command `{}` {}",
                self.params.command, status
            )));
        }
        tracing::info!(processor = %self.name, "command finished");
        Ok(())
    }

    fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
        if let Some(child) = self.child().as_mut() {
            if let Err(e) = child.kill() {
                tracing::warn!(processor = %self.name, error = %e, "failed to kill command");
            }
        }
    }
}

/// Factory for [`ProcessorRegistry`]
pub fn factory(name: &str, table: &toml::Table) -> Result<Arc<dyn Processor>, ConfigError> {
    let parsed: ShellParams = params(name, table)?;
    if parsed.command.trim().is_empty() {
        return Err(ConfigError::InvalidParams {
            processor: name.to_string(),
            message: "command must not be empty".to_string(),
        });
    }
    Ok(Arc::new(ShellProcessor::new(name, parsed)))
}

/// Register the `shell` kind
pub fn register(registry: &mut ProcessorRegistry) {
    registry.register(KIND, factory);
}

#[cfg(test)]
#[path = "shell_tests.rs"]
mod tests;
