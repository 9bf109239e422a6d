// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Level-triggered fixed interval trigger

use super::{Trigger, TriggerError, NEVER};
use crate::clock::{Clock, SystemClock};
use chrono::{NaiveDateTime, TimeDelta};
use std::time::Duration;

/// Fires whenever the current time has reached the next fire time.
///
/// There is no latch: repeated `fire()` calls keep returning true until
/// `processing_completed()` pushes the next fire time to "now + interval".
#[derive(Debug, Clone)]
pub struct IntervalTrigger<C: Clock = SystemClock> {
    name: String,
    interval: Duration,
    step: TimeDelta,
    next_fire_time: NaiveDateTime,
    clock: C,
}

impl IntervalTrigger<SystemClock> {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

    pub fn new(interval: Duration) -> Result<Self, TriggerError> {
        Self::with_clock(interval, SystemClock)
    }
}

impl<C: Clock> IntervalTrigger<C> {
    pub fn with_clock(interval: Duration, clock: C) -> Result<Self, TriggerError> {
        let step = to_delta(interval)?;
        let next_fire_time = advance(clock.now(), step);
        Ok(Self {
            name: "interval".to_string(),
            interval,
            step,
            next_fire_time,
            clock,
        })
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Change the interval; the next fire time is recomputed from now
    pub fn set_interval(&mut self, interval: Duration) -> Result<(), TriggerError> {
        self.step = to_delta(interval)?;
        self.interval = interval;
        self.reschedule();
        Ok(())
    }

    fn reschedule(&mut self) {
        self.next_fire_time = advance(self.clock.now(), self.step);
    }
}

fn to_delta(interval: Duration) -> Result<TimeDelta, TriggerError> {
    TimeDelta::from_std(interval).map_err(|_| TriggerError::InvalidInterval(interval))
}

fn advance(now: NaiveDateTime, delta: TimeDelta) -> NaiveDateTime {
    now.checked_add_signed(delta).unwrap_or(NEVER)
}

impl<C: Clock> Trigger for IntervalTrigger<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_fire_time(&mut self) -> NaiveDateTime {
        self.next_fire_time
    }

    fn fire(&mut self) -> bool {
        self.clock.now() >= self.next_fire_time
    }

    fn processing_completed(&mut self) {
        self.reschedule();
    }
}
