// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ProcessorManager - control surface over every runner
//!
//! The manager resolves its processor bindings lazily on first use, builds
//! one shared [`AdmissionQueue`] and one [`ProcessorRunner`] per processor,
//! and exposes start/stop/abort/force by name or for all processors.

use crate::config::ConfigError;
use crate::processor::ProcessorBinding;
use crate::queue::AdmissionQueue;
use crate::runner::{ProcessorRunner, RunnerError, RunnerOptions, RunnerStatus};
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors from manager operations
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("unknown processor: {0}")]
    UnknownProcessor(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Runner(#[from] RunnerError),
}

/// Supplies the processor bindings, once, at first use
pub trait BindingSource: Send + Sync {
    fn load(&self) -> Result<Vec<ProcessorBinding>, ConfigError>;
}

impl<F> BindingSource for F
where
    F: Fn() -> Result<Vec<ProcessorBinding>, ConfigError> + Send + Sync,
{
    fn load(&self) -> Result<Vec<ProcessorBinding>, ConfigError> {
        self()
    }
}

struct Processors {
    queue: AdmissionQueue,
    runners: Vec<ProcessorRunner>,
    by_name: HashMap<String, usize>,
}

impl Processors {
    fn build(bindings: Vec<ProcessorBinding>, options: RunnerOptions) -> Result<Self, ConfigError> {
        if bindings.is_empty() {
            tracing::warn!("no processors configured");
        }
        let queue = AdmissionQueue::with_capacity(bindings.len() + 1);
        let mut runners = Vec::with_capacity(bindings.len());
        let mut by_name = HashMap::with_capacity(bindings.len());
        for binding in bindings {
            let name = binding.name().to_string();
            if by_name.insert(name.clone(), runners.len()).is_some() {
                return Err(ConfigError::DuplicateProcessor(name));
            }
            runners.push(ProcessorRunner::new(binding, queue.clone(), options));
        }
        tracing::info!(processors = runners.len(), "processors initialized");
        Ok(Self {
            queue,
            runners,
            by_name,
        })
    }
}

/// Owns every runner and the admission queue they share
pub struct ProcessorManager {
    source: Box<dyn BindingSource>,
    options: RunnerOptions,
    processors: OnceLock<Processors>,
    init: Mutex<()>,
}

impl ProcessorManager {
    pub fn new(source: impl BindingSource + 'static) -> Self {
        Self::with_options(source, RunnerOptions::default())
    }

    pub fn with_options(source: impl BindingSource + 'static, options: RunnerOptions) -> Self {
        Self {
            source: Box::new(source),
            options,
            processors: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    /// Resolve bindings now instead of on first use
    pub fn initialize(&self) -> Result<(), ManagerError> {
        self.processors().map(|_| ())
    }

    fn processors(&self) -> Result<&Processors, ManagerError> {
        if let Some(processors) = self.processors.get() {
            return Ok(processors);
        }
        let _guard = self.init.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(processors) = self.processors.get() {
            return Ok(processors);
        }
        let built = Processors::build(self.source.load()?, self.options)?;
        Ok(self.processors.get_or_init(|| built))
    }

    fn runner(&self, name: &str) -> Result<&ProcessorRunner, ManagerError> {
        let processors = self.processors()?;
        processors
            .by_name
            .get(name)
            .map(|&index| &processors.runners[index])
            .ok_or_else(|| ManagerError::UnknownProcessor(name.to_string()))
    }

    /// Processor names in configuration order
    pub fn processor_names(&self) -> Result<Vec<String>, ManagerError> {
        Ok(self
            .processors()?
            .runners
            .iter()
            .map(|r| r.name().to_string())
            .collect())
    }

    pub fn status(&self) -> Result<Vec<RunnerStatus>, ManagerError> {
        Ok(self.processors()?.runners.iter().map(|r| r.status()).collect())
    }

    /// Admission queue contents, head first
    pub fn queued(&self) -> Result<Vec<String>, ManagerError> {
        Ok(self.processors()?.queue.names())
    }

    /// Start every runner.
    ///
    /// All runners are attempted; the first failure is returned.
    pub fn start_all(&self) -> Result<(), ManagerError> {
        let mut first_error = None;
        for runner in &self.processors()?.runners {
            if let Err(e) = runner.start() {
                tracing::error!(processor = %runner.name(), error = %e, "failed to start runner");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    pub fn start(&self, name: &str) -> Result<(), ManagerError> {
        Ok(self.runner(name)?.start()?)
    }

    /// Stop every runner cooperatively, wait for all of them, then clear the queue
    pub fn stop_all(&self) -> Result<(), ManagerError> {
        let processors = self.processors()?;
        for runner in &processors.runners {
            runner.stop();
        }
        Self::reap(processors);
        processors.queue.clear();
        tracing::info!("all processors stopped");
        Ok(())
    }

    /// Stop every runner, waiting at most `timeout` for them to exit.
    ///
    /// Returns false if some runner is still running its unit of work; the
    /// queue is only cleared once every runner has exited.
    pub fn stop_all_within(&self, timeout: Duration) -> Result<bool, ManagerError> {
        let processors = self.processors()?;
        for runner in &processors.runners {
            runner.stop();
        }
        let deadline = Instant::now() + timeout;
        for runner in &processors.runners {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if !runner.wait_for_exit_timeout(remaining) {
                tracing::warn!(processor = %runner.name(), "runner did not stop in time");
                return Ok(false);
            }
        }
        Self::reap(processors);
        processors.queue.clear();
        tracing::info!("all processors stopped");
        Ok(true)
    }

    /// Cooperative stop of one runner; does not wait
    pub fn stop(&self, name: &str) -> Result<(), ManagerError> {
        self.runner(name)?.stop();
        Ok(())
    }

    /// Abort every runner, wait for all of them, then clear the queue
    pub fn abort_all(&self) -> Result<(), ManagerError> {
        let processors = self.processors()?;
        for runner in &processors.runners {
            runner.abort();
        }
        Self::reap(processors);
        processors.queue.clear();
        tracing::info!("all processors aborted");
        Ok(())
    }

    pub fn abort(&self, name: &str) -> Result<(), ManagerError> {
        self.runner(name)?.abort();
        Ok(())
    }

    /// Admit the named processor now and make sure its runner is started
    pub fn force(&self, name: &str) -> Result<(), ManagerError> {
        Ok(self.runner(name)?.force()?)
    }

    /// Drop the named processor's pending admissions, returning how many
    pub fn cancel_pending(&self, name: &str) -> Result<usize, ManagerError> {
        Ok(self.runner(name)?.cancel_pending())
    }

    /// Block until the named runner has exited
    pub fn wait_for_exit(&self, name: &str) -> Result<(), ManagerError> {
        Ok(self.runner(name)?.wait_for_exit()?)
    }

    /// Wait for every runner, logging exit errors instead of failing
    fn reap(processors: &Processors) {
        for runner in &processors.runners {
            if let Err(e) = runner.wait_for_exit() {
                tracing::error!(processor = %runner.name(), error = %e, "runner exited with error");
            }
        }
    }
}

impl std::fmt::Debug for ProcessorManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorManager")
            .field("options", &self.options)
            .field("initialized", &self.processors.get().is_some())
            .finish()
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod manager_tests;
