// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-processor runner: a dedicated thread polling a trigger
//!
//! Each runner owns one processor and its trigger. Its poll loop asks the
//! trigger whether to run, admits the processor to the shared
//! [`AdmissionQueue`], and runs the processor only once it reaches the head.
//!
//! ```text
//! Stopped --start--> Running --stop--> Stopping
//!    ^                  |                 |
//!    +---- loop exit ---+-----------------+
//! ```

use crate::processor::{Processor, ProcessorBinding, ProcessorError, ProcessorState};
use crate::queue::AdmissionQueue;
use crate::trigger::{Trigger, NEVER};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Sleep between two iterations of the poll loop
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Errors surfaced by a runner
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("processor {name} failed fatally: {source}")]
    Fatal {
        name: String,
        #[source]
        source: ProcessorError,
    },
    #[error("processor {name} panicked")]
    Panicked { name: String },
    #[error("failed to spawn runner thread for {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Runner tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerOptions {
    pub poll_interval: Duration,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Point-in-time view of a runner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerStatus {
    pub name: String,
    pub state: ProcessorState,
    /// None if the processor has no trigger or its trigger will never fire
    pub next_fire_time: Option<NaiveDateTime>,
    /// At the head of the admission queue
    pub admitted: bool,
    /// Waiting behind the head of the admission queue
    pub pending: bool,
}

#[derive(Debug, Default)]
struct Lifecycle {
    state: ProcessorState,
    thread_alive: bool,
    abort_requested: bool,
    exit_error: Option<RunnerError>,
}

impl Lifecycle {
    fn should_run(&self) -> bool {
        self.state == ProcessorState::Running && !self.abort_requested
    }
}

struct RunnerShared {
    processor: Arc<dyn Processor>,
    trigger: Mutex<Option<Box<dyn Trigger>>>,
    queue: AdmissionQueue,
    lifecycle: Mutex<Lifecycle>,
    /// Wakes the poll sleep on stop/abort and signals loop exit to waiters
    signal: Condvar,
    poll_interval: Duration,
}

impl RunnerShared {
    fn name(&self) -> &str {
        self.processor.name()
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn trigger(&self) -> MutexGuard<'_, Option<Box<dyn Trigger>>> {
        self.trigger.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn abort_requested(&self) -> bool {
        self.lifecycle().abort_requested
    }

    /// One poll step: run if admitted, otherwise ask the trigger
    fn execute(&self) -> Result<(), ProcessorError> {
        if self.queue.is_next(&self.processor) {
            if self.abort_requested() {
                return Err(ProcessorError::Aborted);
            }
            if let Some(trigger) = self.trigger().as_mut() {
                trigger.processing_completed();
            }
            tracing::debug!(processor = %self.name(), "processor starting");
            let result = self.processor.start();
            if self.queue.dequeue().is_err() {
                tracing::warn!(processor = %self.name(), "admission queue emptied during run");
            }
            return result;
        }

        let mut trigger = self.trigger();
        if let Some(trigger) = trigger.as_mut() {
            if trigger.fire() && !self.queue.has_pending(&self.processor) {
                tracing::debug!(processor = %self.name(), trigger = %trigger.name(), "trigger fired");
                self.queue.enqueue(Arc::clone(&self.processor));
            }
        }
        Ok(())
    }

    /// Loop exit: must be called with the lifecycle lock held
    fn finish(&self, lifecycle: &mut Lifecycle) {
        lifecycle.state = ProcessorState::Stopped;
        lifecycle.thread_alive = false;
        self.queue.remove_items(&self.processor);
        self.signal.notify_all();
        tracing::info!(processor = %self.name(), "runner stopped");
    }
}

/// Finishes the lifecycle if the loop unwinds
struct ExitGuard<'a> {
    shared: &'a RunnerShared,
    finished: bool,
}

impl Drop for ExitGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut lifecycle = self.shared.lifecycle();
        if thread::panicking() {
            tracing::error!(processor = %self.shared.name(), "processor panicked");
            lifecycle.exit_error = Some(RunnerError::Panicked {
                name: self.shared.name().to_string(),
            });
        }
        self.shared.finish(&mut lifecycle);
    }
}

fn poll_loop(shared: Arc<RunnerShared>) {
    let mut guard = ExitGuard {
        shared: &shared,
        finished: false,
    };
    loop {
        {
            let mut lifecycle = shared.lifecycle();
            if !lifecycle.should_run() {
                shared.finish(&mut lifecycle);
                guard.finished = true;
                return;
            }
        }

        match shared.execute() {
            Ok(()) => {}
            Err(ProcessorError::Aborted) if shared.abort_requested() => {
                tracing::debug!(processor = %shared.name(), "run aborted");
            }
            Err(e) if e.is_fatal() => {
                tracing::error!(processor = %shared.name(), error = %e, "fatal processor error");
                let mut lifecycle = shared.lifecycle();
                lifecycle.exit_error = Some(RunnerError::Fatal {
                    name: shared.name().to_string(),
                    source: e,
                });
                shared.finish(&mut lifecycle);
                guard.finished = true;
                return;
            }
            Err(e) => {
                tracing::error!(processor = %shared.name(), error = %e, "processor failed");
            }
        }

        let lifecycle = shared.lifecycle();
        let _ = shared
            .signal
            .wait_timeout_while(lifecycle, shared.poll_interval, |l| l.should_run())
            .unwrap_or_else(|e| e.into_inner());
    }
}

/// Drives one processor on its own thread
pub struct ProcessorRunner {
    shared: Arc<RunnerShared>,
}

impl ProcessorRunner {
    pub fn new(binding: ProcessorBinding, queue: AdmissionQueue, options: RunnerOptions) -> Self {
        Self {
            shared: Arc::new(RunnerShared {
                processor: binding.processor,
                trigger: Mutex::new(binding.trigger),
                queue,
                lifecycle: Mutex::new(Lifecycle::default()),
                signal: Condvar::new(),
                poll_interval: options.poll_interval,
            }),
        }
    }

    pub fn name(&self) -> &str {
        self.shared.name()
    }

    pub fn processor(&self) -> &Arc<dyn Processor> {
        &self.shared.processor
    }

    pub fn state(&self) -> ProcessorState {
        self.shared.lifecycle().state
    }

    pub fn is_running(&self) -> bool {
        self.state() == ProcessorState::Running
    }

    /// Start the poll loop.
    ///
    /// A no-op if already running. A runner that is stopping but whose loop
    /// has not exited yet is switched back to running on the same thread.
    /// A pending abort is cancelled.
    pub fn start(&self) -> Result<(), RunnerError> {
        let mut lifecycle = self.shared.lifecycle();
        if lifecycle.state == ProcessorState::Running && !lifecycle.abort_requested {
            return Ok(());
        }
        lifecycle.state = ProcessorState::Running;
        lifecycle.abort_requested = false;
        if lifecycle.thread_alive {
            return Ok(());
        }

        lifecycle.exit_error = None;
        lifecycle.thread_alive = true;
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(format!("runner-{}", self.name()))
            .spawn(move || poll_loop(shared));
        match spawned {
            Ok(_) => {
                tracing::info!(processor = %self.name(), "runner started");
                Ok(())
            }
            Err(source) => {
                lifecycle.state = ProcessorState::Stopped;
                lifecycle.thread_alive = false;
                Err(RunnerError::Spawn {
                    name: self.name().to_string(),
                    source,
                })
            }
        }
    }

    /// Ask the loop to exit at its next poll boundary
    pub fn stop(&self) {
        {
            let mut lifecycle = self.shared.lifecycle();
            if lifecycle.state != ProcessorState::Running {
                return;
            }
            lifecycle.state = ProcessorState::Stopping;
            self.shared.signal.notify_all();
        }
        tracing::info!(processor = %self.name(), "runner stopping");
        self.shared.processor.stop();
    }

    /// Best-effort forced termination.
    ///
    /// Wakes the loop, prevents any further run, and forwards `abort()` to
    /// the processor. A unit of work that ignores `abort()` still runs to
    /// completion.
    pub fn abort(&self) {
        {
            let mut lifecycle = self.shared.lifecycle();
            if !lifecycle.thread_alive {
                return;
            }
            lifecycle.abort_requested = true;
            self.shared.signal.notify_all();
        }
        tracing::info!(processor = %self.name(), "runner aborting");
        self.shared.processor.abort();
    }

    /// Admit the processor now, regardless of its trigger, and make sure
    /// the loop is running
    pub fn force(&self) -> Result<(), RunnerError> {
        if !self.shared.queue.has_pending(&self.shared.processor) {
            self.shared.queue.enqueue(Arc::clone(&self.shared.processor));
        }
        self.start()
    }

    /// Drop this processor's pending admissions; a run already admitted is kept
    pub fn cancel_pending(&self) -> usize {
        self.shared.queue.remove_pending_items(&self.shared.processor)
    }

    /// Block until the loop has exited.
    ///
    /// Returns the fatal error or panic that ended the last loop, once.
    pub fn wait_for_exit(&self) -> Result<(), RunnerError> {
        let lifecycle = self.shared.lifecycle();
        let mut lifecycle = self
            .shared
            .signal
            .wait_while(lifecycle, |l| l.thread_alive)
            .unwrap_or_else(|e| e.into_inner());
        match lifecycle.exit_error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Block until the loop has exited or `timeout` elapses.
    ///
    /// Returns true if the loop has exited.
    pub fn wait_for_exit_timeout(&self, timeout: Duration) -> bool {
        let lifecycle = self.shared.lifecycle();
        let (lifecycle, _) = self
            .shared
            .signal
            .wait_timeout_while(lifecycle, timeout, |l| l.thread_alive)
            .unwrap_or_else(|e| e.into_inner());
        !lifecycle.thread_alive
    }

    pub fn status(&self) -> RunnerStatus {
        let next_fire_time = self
            .shared
            .trigger()
            .as_mut()
            .map(|t| t.next_fire_time())
            .filter(|time| *time != NEVER);
        RunnerStatus {
            name: self.name().to_string(),
            state: self.state(),
            next_fire_time,
            admitted: self.shared.queue.is_next(&self.shared.processor),
            pending: self.shared.queue.has_pending(&self.shared.processor),
        }
    }
}

impl std::fmt::Debug for ProcessorRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorRunner")
            .field("name", &self.name())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod runner_tests;
