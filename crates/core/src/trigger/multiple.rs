// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Boolean combination of two triggers

use super::{Trigger, NEVER};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a [`MultipleTrigger`] combines its sub-triggers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerOperator {
    #[default]
    Or,
    And,
}

impl fmt::Display for TriggerOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerOperator::Or => write!(f, "or"),
            TriggerOperator::And => write!(f, "and"),
        }
    }
}

/// Combines two optional sub-triggers with OR / AND.
///
/// Both sub-triggers are always polled, even when the result is already
/// decided: edge-triggered sub-triggers arm as a side effect of `fire()`.
/// An absent sub-trigger never fires on its own.
pub struct MultipleTrigger {
    name: String,
    first: Option<Box<dyn Trigger>>,
    second: Option<Box<dyn Trigger>>,
    operator: TriggerOperator,
}

impl MultipleTrigger {
    pub fn new(
        first: Option<Box<dyn Trigger>>,
        second: Option<Box<dyn Trigger>>,
        operator: TriggerOperator,
    ) -> Self {
        Self {
            name: "multiple".to_string(),
            first,
            second,
            operator,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn operator(&self) -> TriggerOperator {
        self.operator
    }

    pub fn set_operator(&mut self, operator: TriggerOperator) {
        self.operator = operator;
    }

    pub fn set_first(&mut self, trigger: Option<Box<dyn Trigger>>) {
        self.first = trigger;
    }

    pub fn set_second(&mut self, trigger: Option<Box<dyn Trigger>>) {
        self.second = trigger;
    }

    fn sub_triggers(&mut self) -> impl Iterator<Item = &mut Box<dyn Trigger>> + '_ {
        self.first.iter_mut().chain(self.second.iter_mut())
    }
}

impl Default for MultipleTrigger {
    fn default() -> Self {
        Self::new(None, None, TriggerOperator::Or)
    }
}

impl Trigger for MultipleTrigger {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_fire_time(&mut self) -> NaiveDateTime {
        let first = self.first.as_mut().map_or(NEVER, |t| t.next_fire_time());
        let second = self.second.as_mut().map_or(NEVER, |t| t.next_fire_time());
        match self.operator {
            TriggerOperator::Or => first.min(second),
            TriggerOperator::And => first.max(second),
        }
    }

    fn fire(&mut self) -> bool {
        if self.first.is_none() && self.second.is_none() {
            return false;
        }
        let operator = self.operator;
        // collect first so every sub-trigger is polled
        let results: Vec<bool> = self.sub_triggers().map(|t| t.fire()).collect();
        match operator {
            TriggerOperator::Or => results.iter().any(|fired| *fired),
            TriggerOperator::And => results.iter().all(|fired| *fired),
        }
    }

    fn processing_completed(&mut self) {
        for trigger in self.sub_triggers() {
            trigger.processing_completed();
        }
    }
}
