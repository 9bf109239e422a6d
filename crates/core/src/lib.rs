// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cadence-core: in-process job scheduling
//!
//! This crate provides:
//! - Triggers deciding when a processor should run (interval, daily schedule,
//!   cron, time-window filter, boolean combination)
//! - An admission queue granting one processor at a time permission to run
//! - Per-processor runner threads and a manager controlling all of them
//! - Typed TOML configuration and the binding step that builds processors

pub mod clock;
pub mod config;
pub mod manager;
pub mod processor;
pub mod queue;
pub mod runner;
pub mod trigger;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{ConfigError, ProcessorDef, ProcessorRegistry, SchedulerConfig, TriggerDef};
pub use manager::{BindingSource, ManagerError, ProcessorManager};
pub use processor::{Processor, ProcessorBinding, ProcessorError, ProcessorState};
pub use queue::{AdmissionQueue, QueueError};
pub use runner::{ProcessorRunner, RunnerError, RunnerOptions, RunnerStatus};
pub use trigger::{
    CronTrigger, FilterTrigger, IntervalTrigger, MultipleTrigger, ScheduleTrigger, Trigger,
    TriggerError, TriggerOperator, NEVER,
};

#[cfg(any(test, feature = "test-support"))]
pub use processor::{FakeProcessor, FakeProcessorCalls};
#[cfg(any(test, feature = "test-support"))]
pub use trigger::{FakeTrigger, FakeTriggerCalls};
