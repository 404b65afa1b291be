// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Queue configuration.
//!
//! Recognized options:
//! - `snapshot_key`: store key the queue snapshot lives under (default: "cache")
//! - `request_timeout_ms`: per-request replay timeout (default: 1000)
//! - `max_queue_size`: optional cap on pending operations (unbounded if absent)

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// Default store key for the queue snapshot.
pub const DEFAULT_SNAPSHOT_KEY: &str = "cache";

/// Queue options, usually embedded in a host's config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Store key the snapshot is written to.
    #[serde(default = "default_snapshot_key")]
    pub snapshot_key: String,
    /// Timeout applied to each replayed request, in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Maximum number of pending operations. `None` means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_queue_size: Option<usize>,
}

fn default_snapshot_key() -> String {
    DEFAULT_SNAPSHOT_KEY.to_string()
}

fn default_request_timeout_ms() -> u64 {
    1000
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig {
            snapshot_key: default_snapshot_key(),
            request_timeout_ms: default_request_timeout_ms(),
            max_queue_size: None,
        }
    }
}

impl QueueConfig {
    /// Per-request timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Checks option values that serde alone cannot reject.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for an empty snapshot key, a zero
    /// timeout, or a zero queue size.
    pub fn validate(&self) -> Result<()> {
        if self.snapshot_key.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "snapshot_key cannot be empty".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "request_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.max_queue_size == Some(0) {
            return Err(Error::InvalidConfig(
                "max_queue_size must be greater than 0 (omit it for no limit)".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
