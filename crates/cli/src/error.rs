// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

use crate::sync::{ReplayError, TransportError};

/// Errors surfaced by the `opq` host.
///
/// Errors provide user-friendly messages with hints for common issues.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Queue(opq_core::Error),

    #[error(transparent)]
    Replay(#[from] ReplayError),

    #[error("invalid remote: {0}")]
    Transport(#[from] TransportError),

    #[error("no remote configured\n  hint: pass --base-url or add a [remote] section to {0}")]
    NoRemote(String),

    #[error("invalid payload: {0}\n  hint: the payload must be a JSON document, e.g. '{{\"title\":\"x\"}}'")]
    InvalidPayload(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("runtime error: {0}")]
    Runtime(String),
}

/// A specialized Result type for opq host operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<opq_core::Error> for Error {
    fn from(e: opq_core::Error) -> Self {
        match e {
            opq_core::Error::InvalidConfig(s) => Error::Config(s),
            opq_core::Error::Io(e) => Error::Io(e),
            opq_core::Error::Json(e) => Error::Json(e),
            other => Error::Queue(other),
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Config(e.to_string())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
