// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Edge-triggered cron expression trigger

use super::{Trigger, TriggerError, NEVER};
use crate::clock::{Clock, SystemClock};
use ::cron::Schedule;
use chrono::{NaiveDateTime, TimeZone, Utc};
use std::str::FromStr;

/// Fires once per matching cron instant, latching until processing completes.
///
/// Cron fields are evaluated against local wall-clock fields: the naive local
/// time is handed to the evaluator as if it were UTC and the answer is
/// converted back the same way, so `0 0 10 * * *` means 10:00 local.
#[derive(Debug, Clone)]
pub struct CronTrigger<C: Clock = SystemClock> {
    name: String,
    expression: String,
    schedule: Schedule,
    next_fire_time: Option<NaiveDateTime>,
    armed: bool,
    clock: C,
}

impl CronTrigger<SystemClock> {
    /// Every second
    pub const DEFAULT_EXPRESSION: &'static str = "* * * * * ?";

    pub fn new(expression: &str) -> Result<Self, TriggerError> {
        Self::with_clock(expression, SystemClock)
    }
}

impl<C: Clock> CronTrigger<C> {
    pub fn with_clock(expression: &str, clock: C) -> Result<Self, TriggerError> {
        Ok(Self {
            name: "cron".to_string(),
            expression: expression.to_string(),
            schedule: parse_expression(expression)?,
            next_fire_time: None,
            armed: false,
            clock,
        })
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Replace the expression; the cached next fire time is discarded
    pub fn set_expression(&mut self, expression: &str) -> Result<(), TriggerError> {
        self.schedule = parse_expression(expression)?;
        self.expression = expression.to_string();
        self.next_fire_time = None;
        Ok(())
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    fn next_after_now(&self) -> NaiveDateTime {
        let now = Utc.from_utc_datetime(&self.clock.now());
        self.schedule
            .after(&now)
            .next()
            .map(|next| next.naive_utc())
            .unwrap_or(NEVER)
    }
}

/// Parse a 5, 6 or 7 field cron expression.
///
/// Five fields are minute-first with Unix day-of-week numbers (0 or 7 is
/// Sunday); six and seven fields start with seconds and number days from
/// 1 = Sunday. `?` ("no specific value") is treated as `*`.
pub(crate) fn parse_expression(expression: &str) -> Result<Schedule, TriggerError> {
    let invalid = |message: String| TriggerError::InvalidCron {
        expression: expression.to_string(),
        message,
    };
    let fields: Vec<&str> = expression
        .split_whitespace()
        .map(|field| if field == "?" { "*" } else { field })
        .collect();
    let normalized = match fields.len() {
        5 => {
            let day_of_week = unix_day_of_week(fields[4]).map_err(invalid)?;
            format!("0 {} {}", fields[..4].join(" "), day_of_week)
        }
        6 | 7 => fields.join(" "),
        n => return Err(invalid(format!("expected 5 to 7 fields, found {}", n))),
    };
    Schedule::from_str(&normalized).map_err(|e| invalid(e.to_string()))
}

/// Renumber a Unix day-of-week field (0-7, Sunday = 0 or 7) to 1 = Sunday.
///
/// Day names pass through. A range ending on 7 is split so it wraps to
/// Sunday, e.g. `5-7` becomes `6-7,1`.
fn unix_day_of_week(field: &str) -> Result<String, String> {
    let mut items = Vec::new();
    for item in field.split(',') {
        let (range, step) = match item.split_once('/') {
            Some((range, step)) => (range, Some(step)),
            None => (item, None),
        };
        let with_step = |range: String| match step {
            Some(step) => format!("{}/{}", range, step),
            None => range,
        };
        match range.split_once('-') {
            Some((first_raw, last_raw)) => match (unix_day(first_raw)?, unix_day(last_raw)?) {
                (Some(first), Some(_)) if last_raw == "7" && first > 1 => {
                    if step.is_some() {
                        return Err(format!("stepped day-of-week range '{}' ending on 7", item));
                    }
                    items.push(format!("{}-7,1", first));
                }
                (Some(first), Some(_)) if last_raw == "7" => {
                    items.push(with_step(format!("{}-7", first)))
                }
                (Some(first), Some(last)) => items.push(with_step(format!("{}-{}", first, last))),
                _ => items.push(item.to_string()),
            },
            None => match unix_day(range)? {
                Some(day) => items.push(with_step(day.to_string())),
                None => items.push(item.to_string()),
            },
        }
    }
    Ok(items.join(","))
}

/// `None` for anything that is not a day number (`*`, day names)
fn unix_day(value: &str) -> Result<Option<u8>, String> {
    match value.parse::<u8>() {
        Ok(day @ 0..=6) => Ok(Some(day + 1)),
        Ok(7) => Ok(Some(1)),
        Ok(day) => Err(format!("day of week {} out of range 0-7", day)),
        Err(_) => Ok(None),
    }
}

impl<C: Clock> Trigger for CronTrigger<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_fire_time(&mut self) -> NaiveDateTime {
        match self.next_fire_time {
            Some(time) => time,
            None => {
                let time = self.next_after_now();
                self.next_fire_time = Some(time);
                time
            }
        }
    }

    fn fire(&mut self) -> bool {
        if !self.armed && self.clock.now() > self.next_fire_time() {
            self.armed = true;
            return true;
        }
        false
    }

    fn processing_completed(&mut self) {
        if self.armed {
            self.next_fire_time = Some(self.next_after_now());
        }
        self.armed = false;
    }
}
