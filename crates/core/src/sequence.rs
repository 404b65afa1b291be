// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sequence numbers for queued operations.
//!
//! Sequences are seeded from wall clock milliseconds and then advanced by
//! one per operation, so they increase strictly within a process and, with a
//! sane clock, across restarts. That lets operations restored from an older
//! snapshot sort ahead of anything enqueued by the current process.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::op::Sequence;

/// Trait for getting the current wall clock time.
///
/// This allows injecting a mock clock for testing.
pub trait ClockSource: Send + Sync {
    /// Returns the current time in milliseconds since Unix epoch.
    fn now_ms(&self) -> u64;
}

/// System clock implementation using `std::time::SystemTime`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Generator of strictly increasing sequence numbers.
pub struct SequenceClock {
    clock: Box<dyn ClockSource>,
    last: Mutex<Sequence>,
}

impl SequenceClock {
    /// Creates a sequence clock backed by the system clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    /// Creates a sequence clock with a custom clock source.
    pub fn with_clock(clock: impl ClockSource + 'static) -> Self {
        SequenceClock {
            clock: Box::new(clock),
            last: Mutex::new(0),
        }
    }

    /// Returns the next sequence number.
    ///
    /// Never returns a value at or below one already issued or observed,
    /// even if the wall clock goes backwards.
    pub fn next(&self) -> Sequence {
        let physical = self.clock.now_ms();
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let next = physical.max(last.saturating_add(1));
        *last = next;
        next
    }

    /// Advances the clock past a sequence issued elsewhere (for example by a
    /// previous process whose snapshot was restored).
    pub fn observe(&self, seen: Sequence) {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if seen > *last {
            *last = seen;
        }
    }

    /// The most recently issued or observed sequence.
    pub fn last(&self) -> Sequence {
        *self.last.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for SequenceClock {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SequenceClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceClock")
            .field("last", &self.last())
            .finish()
    }
}

#[cfg(test)]
#[path = "sequence_tests.rs"]
mod tests;
