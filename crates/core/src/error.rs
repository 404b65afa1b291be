// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for opq-core operations.

use thiserror::Error;

/// All possible errors that can occur in opq-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("corrupted snapshot '{key}': {reason}\n  hint: the cached queue cannot be read back; it is discarded on the next activation")]
    CorruptedSnapshot { key: String, reason: String },

    #[error("queue is full ({limit} pending operations)\n  hint: drain or clear the queue, or raise max_queue_size")]
    QueueFull { limit: usize },

    #[error("invalid verb: '{0}'\n  hint: valid verbs are: create, update")]
    InvalidVerb(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns true for failures of the durable store (read, write, or
    /// unreadable contents).
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Error::Storage(_) | Error::CorruptedSnapshot { .. } | Error::Io(_)
        )
    }
}

/// A specialized Result type for opq-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
