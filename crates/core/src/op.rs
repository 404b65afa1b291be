// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Deferred operations.
//!
//! An operation is a mutating request captured while the remote service may
//! be out of reach. It carries:
//!
//! - a verb (create or update, the two methods worth deferring)
//! - a URL relative to the base address supplied at replay time
//! - an opaque JSON payload
//! - a sequence number fixing its place in the total order
//!
//! Operations are never edited once queued; they leave the queue whole.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Sequence number assigned at enqueue time.
pub type Sequence = u64;

/// The kind of mutating request an operation replays as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verb {
    /// Create a resource (HTTP `POST`).
    Create,
    /// Update a resource (HTTP `PUT`).
    Update,
}

impl Verb {
    /// Returns the string representation used in snapshots and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Create => "create",
            Verb::Update => "update",
        }
    }

    /// Returns the HTTP method this verb is replayed with.
    pub fn http_method(&self) -> &'static str {
        match self {
            Verb::Create => "POST",
            Verb::Update => "PUT",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Verb {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "create" | "post" => Ok(Verb::Create),
            "update" | "put" => Ok(Verb::Update),
            _ => Err(Error::InvalidVerb(s.to_string())),
        }
    }
}

/// A queued request awaiting delivery.
///
/// Fields are private so that nothing can rewrite an operation after it has
/// been assigned its sequence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Operation {
    sequence: Sequence,
    verb: Verb,
    url: String,
    payload: serde_json::Value,
}

impl Operation {
    /// Creates an operation with an already assigned sequence.
    ///
    /// Normal callers go through [`OperationQueue::enqueue`](crate::OperationQueue::enqueue),
    /// which assigns the sequence.
    pub fn new(
        sequence: Sequence,
        verb: Verb,
        url: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Operation {
            sequence,
            verb,
            url: url.into(),
            payload,
        }
    }

    pub fn sequence(&self) -> Sequence {
        self.sequence
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    /// Target path, relative to the replay base address.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }
}

impl PartialOrd for Operation {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Operation {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sequence.cmp(&other.sequence)
    }
}

#[cfg(test)]
#[path = "op_tests.rs"]
mod tests;
