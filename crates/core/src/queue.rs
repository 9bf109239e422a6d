// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admission queue shared by all runners
//!
//! The processor at the head of the queue is the only one allowed to run.
//! Entries after the head are *pending*. Processors are compared by
//! identity (the same `Arc`), never by name.
//!
//! Every operation takes the queue lock for its own duration only; callers
//! that compose several calls must tolerate interleaving from other runners.

use crate::processor::Processor;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors from queue operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("admission queue is empty")]
    Empty,
}

/// Cloneable handle to a FIFO of processors awaiting execution permission
#[derive(Clone, Default)]
pub struct AdmissionQueue {
    items: Arc<Mutex<VecDeque<Arc<dyn Processor>>>>,
}

fn same(a: &Arc<dyn Processor>, b: &Arc<dyn Processor>) -> bool {
    // compare data pointers only; vtable pointers may differ across codegen units
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

impl AdmissionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Arc<dyn Processor>>> {
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append a processor to the tail
    pub fn enqueue(&self, processor: Arc<dyn Processor>) {
        self.lock().push_back(processor);
    }

    /// Remove and return the head
    pub fn dequeue(&self) -> Result<Arc<dyn Processor>, QueueError> {
        self.lock().pop_front().ok_or(QueueError::Empty)
    }

    /// Return the head without removing it
    pub fn peek(&self) -> Result<Arc<dyn Processor>, QueueError> {
        self.lock().front().cloned().ok_or(QueueError::Empty)
    }

    /// True if `processor` is at the head, i.e. cleared to run
    pub fn is_next(&self, processor: &Arc<dyn Processor>) -> bool {
        self.lock().front().is_some_and(|head| same(head, processor))
    }

    /// True if `processor` appears anywhere in the queue
    pub fn has_item(&self, processor: &Arc<dyn Processor>) -> bool {
        self.lock().iter().any(|p| same(p, processor))
    }

    /// True if `processor` appears anywhere after the head
    pub fn has_pending(&self, processor: &Arc<dyn Processor>) -> bool {
        self.lock().iter().skip(1).any(|p| same(p, processor))
    }

    /// Remove every occurrence of `processor`, head included.
    ///
    /// Returns the number of entries removed.
    pub fn remove_items(&self, processor: &Arc<dyn Processor>) -> usize {
        Self::remove_from(&mut self.lock(), processor, 0)
    }

    /// Remove every pending occurrence of `processor`, leaving the head intact.
    ///
    /// Returns the number of entries removed.
    pub fn remove_pending_items(&self, processor: &Arc<dyn Processor>) -> usize {
        Self::remove_from(&mut self.lock(), processor, 1)
    }

    fn remove_from(
        items: &mut VecDeque<Arc<dyn Processor>>,
        processor: &Arc<dyn Processor>,
        first: usize,
    ) -> usize {
        let mut removed = 0;
        // tail to head so removals never shift indices still to be visited
        for index in (first..items.len()).rev() {
            if same(&items[index], processor) {
                items.remove(index);
                removed += 1;
            }
        }
        removed
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Processor names from head to tail
    pub fn names(&self) -> Vec<String> {
        self.lock().iter().map(|p| p.name().to_string()).collect()
    }
}

impl fmt::Debug for AdmissionQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod queue_tests;
