// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Processor contract: a recurring unit of work driven by a runner

use crate::trigger::Trigger;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Errors returned by a processor's unit of work
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("{0}")]
    Failed(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("aborted")]
    Aborted,
    /// Ends the runner's poll loop instead of being retried on the next cycle
    #[error("fatal: {0}")]
    Fatal(String),
}

impl ProcessorError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProcessorError::Fatal(_))
    }
}

/// A unit of recurring work.
///
/// `start()` runs one unit of work synchronously to completion. `stop()` and
/// `abort()` are called from other threads while `start()` may be running.
pub trait Processor: Send + Sync {
    fn name(&self) -> &str;

    /// Run one unit of work
    fn start(&self) -> Result<(), ProcessorError>;

    /// Cooperative stop request
    fn stop(&self) {}

    /// Best-effort request to halt the current unit of work
    fn abort(&self) {}
}

/// A processor paired with the trigger that schedules it.
///
/// A binding without a trigger is never scheduled and only runs when forced.
pub struct ProcessorBinding {
    pub processor: Arc<dyn Processor>,
    pub trigger: Option<Box<dyn Trigger>>,
}

impl ProcessorBinding {
    pub fn new(processor: Arc<dyn Processor>, trigger: Option<Box<dyn Trigger>>) -> Self {
        Self { processor, trigger }
    }

    pub fn name(&self) -> &str {
        self.processor.name()
    }
}

impl fmt::Debug for ProcessorBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorBinding")
            .field("processor", &self.processor.name())
            .field("trigger", &self.trigger.as_ref().map(|t| t.name().to_string()))
            .finish()
    }
}

/// Lifecycle state of a runner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessorState {
    #[default]
    Stopped,
    Running,
    Stopping,
}

impl fmt::Display for ProcessorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessorState::Stopped => write!(f, "stopped"),
            ProcessorState::Running => write!(f, "running"),
            ProcessorState::Stopping => write!(f, "stopping"),
        }
    }
}

impl FromStr for ProcessorState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stopped" => Ok(ProcessorState::Stopped),
            "running" => Ok(ProcessorState::Running),
            "stopping" => Ok(ProcessorState::Stopping),
            other => Err(format!("unknown processor state: {}", other)),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeProcessor, FakeProcessorCalls};

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{Processor, ProcessorError};
    use std::collections::VecDeque;
    use std::sync::{Arc, Condvar, Mutex};
    use std::time::Duration;

    /// Call counters for a [`FakeProcessor`]
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct FakeProcessorCalls {
        pub start: usize,
        pub stop: usize,
        pub abort: usize,
    }

    #[derive(Debug, Default)]
    struct State {
        calls: FakeProcessorCalls,
        results: VecDeque<Result<(), ProcessorError>>,
        work: Duration,
        aborted: bool,
        log: Option<Arc<Mutex<Vec<String>>>>,
    }

    /// Scriptable processor for tests.
    ///
    /// Each `start()` pops the next scripted result (default `Ok`), optionally
    /// sleeping for a configured amount of work first. `abort()` cuts that
    /// sleep short and makes the run return `Aborted`.
    #[derive(Debug, Clone)]
    pub struct FakeProcessor {
        name: String,
        state: Arc<(Mutex<State>, Condvar)>,
    }

    impl FakeProcessor {
        pub fn new(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                state: Arc::new((Mutex::new(State::default()), Condvar::new())),
            }
        }

        /// Each run takes `work` to complete
        pub fn with_work(self, work: Duration) -> Self {
            self.lock().work = work;
            self
        }

        /// Record the processor name into a shared log on every run
        pub fn with_log(self, log: Arc<Mutex<Vec<String>>>) -> Self {
            self.lock().log = Some(log);
            self
        }

        pub fn push_result(&self, result: Result<(), ProcessorError>) {
            self.lock().results.push_back(result);
        }

        pub fn calls(&self) -> FakeProcessorCalls {
            self.lock().calls.clone()
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, State> {
            self.state.0.lock().unwrap_or_else(|e| e.into_inner())
        }
    }

    impl Processor for FakeProcessor {
        fn name(&self) -> &str {
            &self.name
        }

        fn start(&self) -> Result<(), ProcessorError> {
            let (lock, condvar) = &*self.state;
            let mut state = lock.lock().unwrap_or_else(|e| e.into_inner());
            state.calls.start += 1;
            state.aborted = false;
            if let Some(log) = &state.log {
                log.lock().unwrap_or_else(|e| e.into_inner()).push(self.name.clone());
            }
            let work = state.work;
            if !work.is_zero() {
                let (guard, _) = condvar
                    .wait_timeout_while(state, work, |s| !s.aborted)
                    .unwrap_or_else(|e| e.into_inner());
                state = guard;
                if state.aborted {
                    return Err(ProcessorError::Aborted);
                }
            }
            state.results.pop_front().unwrap_or(Ok(()))
        }

        fn stop(&self) {
            self.lock().calls.stop += 1;
        }

        fn abort(&self) {
            let (lock, condvar) = &*self.state;
            let mut state = lock.lock().unwrap_or_else(|e| e.into_inner());
            state.calls.abort += 1;
            state.aborted = true;
            condvar.notify_all();
        }
    }
}
