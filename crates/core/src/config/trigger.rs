// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trigger definitions and how they are built

use super::{ConfigError, SchedulerConfig};
use crate::clock::Clock;
use crate::trigger::{
    CronTrigger, FilterTrigger, IntervalTrigger, MultipleTrigger, ScheduleTrigger, Trigger,
    TriggerOperator,
};
use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A trigger as written in configuration, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TriggerDef {
    Interval {
        #[serde(with = "humantime_serde")]
        every: Duration,
    },
    Schedule {
        #[serde(with = "time_of_day")]
        time: NaiveTime,
        #[serde(default)]
        weekdays: Vec<Weekday>,
    },
    Cron {
        expression: String,
    },
    Filter {
        #[serde(with = "time_of_day", default = "time_of_day::start_of_day")]
        start: NaiveTime,
        #[serde(with = "time_of_day", default = "time_of_day::end_of_day")]
        end: NaiveTime,
        #[serde(default)]
        weekdays: Vec<Weekday>,
        trigger: Box<TriggerDef>,
    },
    Multiple {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        first: Option<Box<TriggerDef>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        second: Option<Box<TriggerDef>>,
        #[serde(default)]
        operator: TriggerOperator,
    },
    /// A shared trigger declared under `[trigger.<name>]`
    Ref {
        name: String,
    },
}

impl TriggerDef {
    pub fn kind(&self) -> &'static str {
        match self {
            TriggerDef::Interval { .. } => "interval",
            TriggerDef::Schedule { .. } => "schedule",
            TriggerDef::Cron { .. } => "cron",
            TriggerDef::Filter { .. } => "filter",
            TriggerDef::Multiple { .. } => "multiple",
            TriggerDef::Ref { .. } => "ref",
        }
    }
}

impl SchedulerConfig {
    /// Build a trigger instance named `name`, resolving shared references
    pub fn build_trigger<C: Clock>(
        &self,
        name: &str,
        def: &TriggerDef,
        clock: &C,
    ) -> Result<Box<dyn Trigger>, ConfigError> {
        self.build(name, def, clock, &mut Vec::new())
    }

    fn build<C: Clock>(
        &self,
        name: &str,
        def: &TriggerDef,
        clock: &C,
        refs: &mut Vec<String>,
    ) -> Result<Box<dyn Trigger>, ConfigError> {
        let trigger: Box<dyn Trigger> = match def {
            TriggerDef::Interval { every } => {
                Box::new(IntervalTrigger::with_clock(*every, clock.clone())?.named(name))
            }
            TriggerDef::Schedule { time, weekdays } => Box::new(
                ScheduleTrigger::with_clock(*time, weekdays.clone(), clock.clone()).named(name),
            ),
            TriggerDef::Cron { expression } => {
                Box::new(CronTrigger::with_clock(expression, clock.clone())?.named(name))
            }
            TriggerDef::Filter {
                start,
                end,
                weekdays,
                trigger,
            } => {
                let inner = self.build(&format!("{}.inner", name), trigger, clock, refs)?;
                Box::new(
                    FilterTrigger::with_clock(*start, *end, weekdays.clone(), inner, clock.clone())
                        .named(name),
                )
            }
            TriggerDef::Multiple {
                first,
                second,
                operator,
            } => {
                let first = match first {
                    Some(def) => Some(self.build(&format!("{}.first", name), def, clock, refs)?),
                    None => None,
                };
                let second = match second {
                    Some(def) => Some(self.build(&format!("{}.second", name), def, clock, refs)?),
                    None => None,
                };
                Box::new(MultipleTrigger::new(first, second, *operator).named(name))
            }
            TriggerDef::Ref { name: target } => {
                if refs.contains(target) {
                    refs.push(target.clone());
                    return Err(ConfigError::ReferenceCycle(refs.join(" -> ")));
                }
                let shared = self
                    .triggers
                    .get(target)
                    .ok_or_else(|| ConfigError::UnknownReference(target.clone()))?;
                refs.push(target.clone());
                let built = self.build(target, shared, clock, refs);
                refs.pop();
                return built;
            }
        };
        Ok(trigger)
    }
}

/// Serde adapter for `HH:MM` / `HH:MM:SS` times of day
pub mod time_of_day {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    const END_OF_DAY: NaiveTime = match NaiveTime::from_hms_opt(23, 59, 59) {
        Some(time) => time,
        None => NaiveTime::MIN,
    };

    pub fn start_of_day() -> NaiveTime {
        NaiveTime::MIN
    }

    pub fn end_of_day() -> NaiveTime {
        END_OF_DAY
    }

    pub fn parse(s: &str) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(s, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
            .ok()
    }

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M:%S").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse(&s).ok_or_else(|| de::Error::custom(format!("invalid time of day '{}'", s)))
    }
}
