// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Edge-triggered daily schedule trigger

use super::{roll_to_allowed_day, weekday_allowed, Trigger, ALL_WEEKDAYS, NEVER};
use crate::clock::{Clock, SystemClock};
use chrono::{Datelike, Days, NaiveDateTime, NaiveTime, Weekday};

/// Fires once per day at a fixed time of day, on the allowed weekdays.
#[derive(Debug, Clone)]
pub struct ScheduleTrigger<C: Clock = SystemClock> {
    name: String,
    time: NaiveTime,
    weekdays: Vec<Weekday>,
    next_fire_time: Option<NaiveDateTime>,
    armed: bool,
    clock: C,
}

impl ScheduleTrigger<SystemClock> {
    /// Fire every day at `time`
    pub fn daily(time: NaiveTime) -> Self {
        Self::with_clock(time, ALL_WEEKDAYS.to_vec(), SystemClock)
    }

    pub fn new(time: NaiveTime, weekdays: Vec<Weekday>) -> Self {
        Self::with_clock(time, weekdays, SystemClock)
    }
}

impl<C: Clock> ScheduleTrigger<C> {
    /// An empty weekday list allows every day.
    pub fn with_clock(time: NaiveTime, weekdays: Vec<Weekday>, clock: C) -> Self {
        Self {
            name: "schedule".to_string(),
            time,
            weekdays,
            next_fire_time: None,
            armed: false,
            clock,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn time(&self) -> NaiveTime {
        self.time
    }

    /// Change the time of day; the next fire time is recomputed lazily
    pub fn set_time(&mut self, time: NaiveTime) {
        self.time = time;
        self.next_fire_time = None;
    }

    pub fn weekdays(&self) -> &[Weekday] {
        &self.weekdays
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// First slot strictly after now on an allowed weekday
    fn first_after_now(&self) -> NaiveDateTime {
        let now = self.clock.now();
        roll_to_allowed_day(now.date().and_time(self.time), now, &self.weekdays)
    }

    /// Next slot after the one just consumed: never the same day, never in the past
    fn after_consumed(&self, consumed: NaiveDateTime) -> NaiveDateTime {
        let now = self.clock.now();
        match consumed.date().checked_add_days(Days::new(1)) {
            Some(day) => roll_to_allowed_day(day.and_time(self.time), now, &self.weekdays),
            None => NEVER,
        }
    }
}

impl<C: Clock> Trigger for ScheduleTrigger<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_fire_time(&mut self) -> NaiveDateTime {
        match self.next_fire_time {
            Some(time) => time,
            None => {
                let time = self.first_after_now();
                self.next_fire_time = Some(time);
                time
            }
        }
    }

    fn fire(&mut self) -> bool {
        let now = self.clock.now();
        if !self.armed
            && now > self.next_fire_time()
            && weekday_allowed(&self.weekdays, now.weekday())
        {
            self.armed = true;
            return true;
        }
        false
    }

    fn processing_completed(&mut self) {
        if self.armed {
            let consumed = self.next_fire_time();
            self.next_fire_time = Some(self.after_consumed(consumed));
        }
        self.armed = false;
    }
}
