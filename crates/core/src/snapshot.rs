// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable snapshots of the operation queue.
//!
//! Snapshots are written only when the caller asks (at lifecycle boundaries
//! and when a drain commits), never on every enqueue. The format is a JSON
//! array of `{sequence, verb, url, payload}` records in queue order, stored
//! under a single key.

use crate::error::{Error, Result};
use crate::op::Operation;
use crate::store::PersistentStore;

/// Outcome of a lenient restore.
#[derive(Debug)]
pub struct Restored {
    /// Operations read back, in queue order. Empty if nothing usable.
    pub operations: Vec<Operation>,
    /// Set when the snapshot was unreadable or corrupt and was ignored.
    pub warning: Option<Error>,
}

/// Reads and writes the queue snapshot through a [`PersistentStore`].
#[derive(Debug)]
pub struct QueueSnapshotter<S: PersistentStore> {
    store: S,
    key: String,
}

impl<S: PersistentStore> QueueSnapshotter<S> {
    pub fn new(store: S, key: impl Into<String>) -> Self {
        QueueSnapshotter {
            store,
            key: key.into(),
        }
    }

    /// The store key the snapshot lives under.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Overwrites the snapshot with `operations`.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails. The caller's in-memory
    /// queue is not touched here, so nothing is lost and the caller can retry.
    pub fn persist(&self, operations: &[Operation]) -> Result<()> {
        let bytes = serde_json::to_vec(operations)?;
        self.store.write(&self.key, &bytes)?;
        tracing::debug!(key = %self.key, count = operations.len(), "persisted queue snapshot");
        Ok(())
    }

    /// Reads the snapshot back.
    ///
    /// Returns an empty list when no snapshot exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptedSnapshot`] if the bytes do not decode or the
    /// sequences are not strictly increasing, and a storage error if the
    /// store cannot be read.
    pub fn restore(&self) -> Result<Vec<Operation>> {
        let Some(bytes) = self.store.read(&self.key)? else {
            return Ok(Vec::new());
        };

        let operations: Vec<Operation> =
            serde_json::from_slice(&bytes).map_err(|e| self.corrupted(e.to_string()))?;

        if let Some(pair) = operations
            .windows(2)
            .find(|w| w[0].sequence() >= w[1].sequence())
        {
            return Err(self.corrupted(format!(
                "sequence {} follows {}",
                pair[1].sequence(),
                pair[0].sequence()
            )));
        }

        Ok(operations)
    }

    /// Restores, falling back to an empty queue instead of failing.
    ///
    /// A corrupt snapshot is removed so it is not hit again; an unreadable
    /// one is left in place. Either way the problem is logged and returned
    /// as a warning.
    pub fn restore_or_discard(&self) -> Restored {
        match self.restore() {
            Ok(operations) => Restored {
                operations,
                warning: None,
            },
            Err(err @ Error::CorruptedSnapshot { .. }) => {
                tracing::warn!(key = %self.key, "discarding corrupt queue snapshot: {}", err);
                if let Err(e) = self.store.remove(&self.key) {
                    tracing::warn!(key = %self.key, "failed to remove corrupt snapshot: {}", e);
                }
                Restored {
                    operations: Vec::new(),
                    warning: Some(err),
                }
            }
            Err(err) => {
                tracing::warn!(key = %self.key, "queue snapshot unreadable, starting empty: {}", err);
                Restored {
                    operations: Vec::new(),
                    warning: Some(err),
                }
            }
        }
    }

    /// Removes the snapshot. Removing an absent snapshot is not an error.
    pub fn clear(&self) -> Result<()> {
        self.store.remove(&self.key)?;
        tracing::debug!(key = %self.key, "cleared queue snapshot");
        Ok(())
    }

    fn corrupted(&self, reason: String) -> Error {
        Error::CorruptedSnapshot {
            key: self.key.clone(),
            reason,
        }
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
