// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scriptable trigger for tests

use super::{Trigger, NEVER};
use chrono::NaiveDateTime;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Call counters shared between a [`FakeTrigger`] and the test that owns it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FakeTriggerCalls {
    pub fire: usize,
    pub next_fire_time: usize,
    pub processing_completed: usize,
}

#[derive(Debug, Default)]
struct FakeTriggerState {
    calls: FakeTriggerCalls,
    scripted: VecDeque<bool>,
    default_fire: bool,
    next_fire_time: Option<NaiveDateTime>,
}

/// A trigger whose answers are scripted by the test.
///
/// Clones share state, so a test can keep a handle after boxing the trigger.
#[derive(Debug, Clone, Default)]
pub struct FakeTrigger {
    state: Arc<Mutex<FakeTriggerState>>,
}

impl FakeTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// A trigger whose `fire()` always returns `value`
    pub fn always(value: bool) -> Self {
        let trigger = Self::new();
        trigger.set_default_fire(value);
        trigger
    }

    /// Queue one-shot `fire()` answers, consumed before the default
    pub fn script(&self, answers: impl IntoIterator<Item = bool>) {
        self.lock().scripted.extend(answers);
    }

    pub fn set_default_fire(&self, value: bool) {
        self.lock().default_fire = value;
    }

    pub fn set_next_fire_time(&self, time: NaiveDateTime) {
        self.lock().next_fire_time = Some(time);
    }

    pub fn calls(&self) -> FakeTriggerCalls {
        self.lock().calls.clone()
    }

    pub fn boxed(&self) -> Box<dyn Trigger> {
        Box::new(self.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeTriggerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Trigger for FakeTrigger {
    fn name(&self) -> &str {
        "fake"
    }

    fn next_fire_time(&mut self) -> NaiveDateTime {
        let mut state = self.lock();
        state.calls.next_fire_time += 1;
        state.next_fire_time.unwrap_or(NEVER)
    }

    fn fire(&mut self) -> bool {
        let mut state = self.lock();
        state.calls.fire += 1;
        let default = state.default_fire;
        state.scripted.pop_front().unwrap_or(default)
    }

    fn processing_completed(&mut self) {
        self.lock().calls.processing_completed += 1;
    }
}
