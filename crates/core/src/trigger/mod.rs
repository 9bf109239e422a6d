// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Triggers decide when a processor should run
//!
//! Two firing disciplines coexist:
//! - **Level-triggered** ([`IntervalTrigger`]): `fire()` is recomputed from the
//!   current time on every call, with no latch.
//! - **Edge-triggered** ([`ScheduleTrigger`], [`CronTrigger`]): `fire()` latches
//!   ("arms") on its first true result and returns false until
//!   `processing_completed()` disarms it and advances the next fire time.
//!
//! [`FilterTrigger`] and [`MultipleTrigger`] compose other triggers.

mod cron;
mod filter;
mod interval;
mod multiple;
mod schedule;

#[cfg(any(test, feature = "test-support"))]
mod fake;






pub use self::cron::CronTrigger;
pub use filter::FilterTrigger;
pub use interval::IntervalTrigger;
pub use multiple::{MultipleTrigger, TriggerOperator};
pub use schedule::ScheduleTrigger;

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeTrigger, FakeTriggerCalls};

use chrono::{Days, NaiveDateTime, Weekday};
use thiserror::Error;

/// Fire time reported by a trigger that will never fire
pub const NEVER: NaiveDateTime = NaiveDateTime::MAX;

/// Every day of the week, Sunday first
pub const ALL_WEEKDAYS: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

/// Errors raised while constructing triggers
#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("invalid cron expression '{expression}': {message}")]
    InvalidCron { expression: String, message: String },
    #[error("invalid interval: {0:?}")]
    InvalidInterval(std::time::Duration),
}

/// Decides if and when a processor should run
///
/// `fire()` is polled repeatedly by the runner and must be cheap and
/// side-effect safe to call many times. `processing_completed()` is invoked
/// when the requested run actually starts and may be called even if `fire()`
/// never returned true.
pub trait Trigger: Send {
    /// Trigger name (used in logs)
    fn name(&self) -> &str;

    /// The next time this trigger is expected to fire, computed lazily
    fn next_fire_time(&mut self) -> NaiveDateTime;

    /// Returns true if the processor should be queued now
    fn fire(&mut self) -> bool;

    /// Acknowledges that the requested run happened
    fn processing_completed(&mut self);
}

impl<T: Trigger + ?Sized> Trigger for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn next_fire_time(&mut self) -> NaiveDateTime {
        (**self).next_fire_time()
    }

    fn fire(&mut self) -> bool {
        (**self).fire()
    }

    fn processing_completed(&mut self) {
        (**self).processing_completed()
    }
}

/// Rolls `candidate` forward one day at a time until it is strictly after
/// `after` and falls on one of `weekdays` (empty means every day).
pub(crate) fn roll_to_allowed_day(
    mut candidate: NaiveDateTime,
    after: NaiveDateTime,
    weekdays: &[Weekday],
) -> NaiveDateTime {
    use chrono::Datelike;

    while candidate <= after || !weekday_allowed(weekdays, candidate.weekday()) {
        match candidate.checked_add_days(Days::new(1)) {
            Some(next) => candidate = next,
            None => return NEVER,
        }
    }
    candidate
}

pub(crate) fn weekday_allowed(weekdays: &[Weekday], day: Weekday) -> bool {
    weekdays.is_empty() || weekdays.contains(&day)
}
