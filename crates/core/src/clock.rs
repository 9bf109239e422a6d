// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable wall-clock time handling
//!
//! Triggers compare against local wall-clock time, so the clock hands out
//! naive local timestamps rather than monotonic instants.

use chrono::{Local, NaiveDate, NaiveDateTime, TimeDelta};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A clock that provides the current local time
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> NaiveDateTime;
}

/// Real system clock
#[derive(Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Fake clock for testing with controllable time
#[derive(Clone, Debug)]
pub struct FakeClock {
    current: Arc<Mutex<NaiveDateTime>>,
}

impl FakeClock {
    /// Create a fake clock starting at the real current time
    pub fn new() -> Self {
        Self::at(SystemClock.now())
    }

    /// Create a fake clock frozen at the given time
    pub fn at(time: NaiveDateTime) -> Self {
        Self {
            current: Arc::new(Mutex::new(time)),
        }
    }

    /// Advance the clock by the given duration
    pub fn advance(&self, duration: Duration) {
        let delta = TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX);
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current = current.checked_add_signed(delta).unwrap_or(NaiveDateTime::MAX);
    }

    /// Set the clock to a specific time
    pub fn set(&self, time: NaiveDateTime) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current = time;
    }

    /// Set the clock from calendar components, ignoring invalid dates
    pub fn set_ymd_hms(&self, year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) {
        if let Some(time) =
            NaiveDate::from_ymd_opt(year, month, day).and_then(|d| d.and_hms_opt(hour, min, sec))
        {
            self.set(time);
        }
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> NaiveDateTime {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
