// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory queue of pending operations.
//!
//! The queue is the single source of truth for pending work. It is a cheap
//! cloneable handle: the caller's side keeps enqueueing through one clone
//! while a drain reads a [`snapshot`](OperationQueue::snapshot) through
//! another. The lock is held only for the copy or the mutation itself, never
//! across I/O.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::QueueConfig;
use crate::error::{Error, Result};
use crate::op::{Operation, Sequence, Verb};
use crate::sequence::SequenceClock;

/// Ordered buffer of pending operations.
#[derive(Clone, Debug)]
pub struct OperationQueue {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    clock: SequenceClock,
    max_size: Option<usize>,
    /// Sorted by sequence at all times.
    ops: Mutex<Vec<Operation>>,
}

impl OperationQueue {
    /// Creates an empty, unbounded queue.
    pub fn new() -> Self {
        Self::with_clock(SequenceClock::new(), None)
    }

    /// Creates an empty queue honoring `max_queue_size` from the config.
    pub fn from_config(config: &QueueConfig) -> Self {
        Self::with_clock(SequenceClock::new(), config.max_queue_size)
    }

    /// Creates an empty queue with an explicit sequence clock and cap.
    pub fn with_clock(clock: SequenceClock, max_size: Option<usize>) -> Self {
        OperationQueue {
            shared: Arc::new(Shared {
                clock,
                max_size,
                ops: Mutex::new(Vec::new()),
            }),
        }
    }

    fn ops(&self) -> MutexGuard<'_, Vec<Operation>> {
        self.shared.ops.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Appends a new operation and returns it with its assigned sequence.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueFull`] only when a cap is configured and
    /// reached. Nothing already queued is dropped to make room.
    pub fn enqueue(
        &self,
        verb: Verb,
        url: impl Into<String>,
        payload: serde_json::Value,
    ) -> Result<Operation> {
        let mut ops = self.ops();
        if let Some(limit) = self.shared.max_size {
            if ops.len() >= limit {
                return Err(Error::QueueFull { limit });
            }
        }

        // Sequence is drawn under the lock so insertion order matches it.
        let op = Operation::new(self.shared.clock.next(), verb, url, payload);
        ops.push(op.clone());
        tracing::debug!(sequence = op.sequence(), verb = %verb, url = op.url(), "enqueued");
        Ok(op)
    }

    /// Removes every pending operation.
    pub fn clear_all(&self) {
        self.ops().clear();
    }

    /// Removes every operation with the given verb, keeping the relative
    /// order of the rest. Returns how many were removed.
    pub fn clear_by_verb(&self, verb: Verb) -> usize {
        let mut ops = self.ops();
        let before = ops.len();
        ops.retain(|op| op.verb() != verb);
        before - ops.len()
    }

    /// Returns an owned copy of the pending operations in order.
    pub fn snapshot(&self) -> Vec<Operation> {
        self.ops().clone()
    }

    pub fn len(&self) -> usize {
        self.ops().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops().is_empty()
    }

    /// Counts pending operations with the given verb.
    pub fn count_by_verb(&self, verb: Verb) -> usize {
        self.ops().iter().filter(|op| op.verb() == verb).count()
    }

    /// Merges operations read back from a snapshot into the live queue.
    ///
    /// Operations keep their original sequences and are placed by sequence.
    /// A sequence already present is skipped, so restoring the same snapshot
    /// twice does not duplicate work. The cap does not apply: restored work
    /// is never refused. Returns how many operations were added.
    pub fn restore(&self, restored: Vec<Operation>) -> usize {
        let mut ops = self.ops();
        let mut added = 0;
        for op in restored {
            self.shared.clock.observe(op.sequence());
            if let Err(pos) = ops.binary_search_by_key(&op.sequence(), Operation::sequence) {
                ops.insert(pos, op);
                added += 1;
            }
        }
        added
    }

    /// Removes exactly the operations with the given sequences. Operations
    /// enqueued after those sequences were captured are left alone. Returns
    /// how many were removed.
    pub fn remove(&self, sequences: impl IntoIterator<Item = Sequence>) -> usize {
        let doomed: HashSet<Sequence> = sequences.into_iter().collect();
        if doomed.is_empty() {
            return 0;
        }
        let mut ops = self.ops();
        let before = ops.len();
        ops.retain(|op| !doomed.contains(&op.sequence()));
        before - ops.len()
    }
}

impl Default for OperationQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
