// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Decorator that suppresses an inner trigger inside a time window

use super::{weekday_allowed, Trigger, NEVER};
use crate::clock::{Clock, SystemClock};
use chrono::{Datelike, NaiveDateTime, NaiveTime, Weekday};

/// Suppresses the inner trigger while the current time is inside the filter
/// window on one of the filtered weekdays.
///
/// A window with `start < end` covers that span of the same day; otherwise it
/// wraps midnight and covers everything except the span strictly between
/// `end` and `start`. Same-day windows include both bounds. An empty weekday
/// list filters every day.
pub struct FilterTrigger<C: Clock = SystemClock> {
    name: String,
    start: NaiveTime,
    end: NaiveTime,
    weekdays: Vec<Weekday>,
    inner: Box<dyn Trigger>,
    clock: C,
}

impl FilterTrigger<SystemClock> {
    pub fn new(
        start: NaiveTime,
        end: NaiveTime,
        weekdays: Vec<Weekday>,
        inner: Box<dyn Trigger>,
    ) -> Self {
        Self::with_clock(start, end, weekdays, inner, SystemClock)
    }
}

impl<C: Clock> FilterTrigger<C> {
    pub fn with_clock(
        start: NaiveTime,
        end: NaiveTime,
        weekdays: Vec<Weekday>,
        inner: Box<dyn Trigger>,
        clock: C,
    ) -> Self {
        Self {
            name: "filter".to_string(),
            start,
            end,
            weekdays,
            inner,
            clock,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    pub fn set_window(&mut self, start: NaiveTime, end: NaiveTime) {
        self.start = start;
        self.end = end;
    }

    pub fn weekdays(&self) -> &[Weekday] {
        &self.weekdays
    }

    pub fn set_weekdays(&mut self, weekdays: Vec<Weekday>) {
        self.weekdays = weekdays;
    }

    pub fn inner(&self) -> &dyn Trigger {
        self.inner.as_ref()
    }

    /// True if `time` falls inside the filter window
    pub fn is_filtered(&self, time: NaiveDateTime) -> bool {
        weekday_allowed(&self.weekdays, time.weekday()) && self.in_window(time.time())
    }

    fn in_window(&self, time_of_day: NaiveTime) -> bool {
        if self.start < self.end {
            time_of_day >= self.start && time_of_day <= self.end
        } else {
            // wraps midnight: everything except the gap strictly between end and start
            time_of_day > self.start || time_of_day < self.end
        }
    }
}

impl<C: Clock> Trigger for FilterTrigger<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_fire_time(&mut self) -> NaiveDateTime {
        let inner_time = self.inner.next_fire_time();
        if inner_time == NEVER {
            return NEVER;
        }
        if self.is_filtered(inner_time) {
            return inner_time.date().and_time(self.end);
        }
        inner_time
    }

    fn fire(&mut self) -> bool {
        if self.is_filtered(self.clock.now()) {
            return false;
        }
        self.inner.fire()
    }

    fn processing_completed(&mut self) {
        self.inner.processing_completed();
    }
}
