// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Host configuration.
//!
//! Configuration is stored in `<state-dir>/config.toml` and includes:
//! - `[queue]`: queue options (snapshot key, request timeout, size cap)
//! - `[remote]`: optional remote service the queue drains to
//!
//! A missing file means defaults with no remote.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use opq_core::QueueConfig;

use crate::error::{Error, Result};
use crate::sync::{RetryPolicy, DEFAULT_AUTH_HEADER};

const CONFIG_FILE_NAME: &str = "config.toml";
const STATE_DIR_ENV: &str = "OPQ_STATE_DIR";
const APP_DIR_NAME: &str = "opq";

/// Host configuration stored in `<state-dir>/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub queue: QueueConfig,
    /// Remote service (optional; without it operations only accumulate).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteConfig>,
}

/// Remote service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base address relative operation URLs are resolved against.
    pub base_url: String,
    /// Token sent with every replayed request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// Header carrying the token (default: "x-access-token").
    #[serde(default = "default_auth_header")]
    pub auth_header: String,
    /// Timeout of the connectivity probe in milliseconds (default: 1000).
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// First retry delay of `opq watch` in milliseconds (default: 1000).
    #[serde(default = "default_retry_initial_ms")]
    pub retry_initial_ms: u64,
    /// Retry delay ceiling of `opq watch` in milliseconds (default: 30000).
    #[serde(default = "default_retry_max_ms")]
    pub retry_max_ms: u64,
}

fn default_auth_header() -> String {
    DEFAULT_AUTH_HEADER.to_string()
}

fn default_probe_timeout_ms() -> u64 {
    1000
}

fn default_retry_initial_ms() -> u64 {
    1000
}

fn default_retry_max_ms() -> u64 {
    30_000
}

impl RemoteConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        RemoteConfig {
            base_url: base_url.into(),
            auth_token: None,
            auth_header: default_auth_header(),
            probe_timeout_ms: default_probe_timeout_ms(),
            retry_initial_ms: default_retry_initial_ms(),
            retry_max_ms: default_retry_max_ms(),
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let initial = Duration::from_millis(self.retry_initial_ms);
        RetryPolicy {
            initial,
            max: Duration::from_millis(self.retry_max_ms).max(initial),
        }
    }
}

impl Config {
    /// Loads `<state_dir>/config.toml`, or defaults if the file is absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be parsed or holds
    /// invalid queue options, and [`Error::Io`] if it cannot be read.
    pub fn load(state_dir: &Path) -> Result<Self> {
        let path = state_dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;
        config.queue.validate()?;
        if let Some(remote) = &config.remote {
            if remote.probe_timeout_ms == 0 || remote.retry_initial_ms == 0 {
                return Err(Error::Config(
                    "remote probe and retry delays must be greater than 0".to_string(),
                ));
            }
        }
        Ok(config)
    }

    /// Writes the config to `<state_dir>/config.toml`.
    pub fn save(&self, state_dir: &Path) -> Result<()> {
        fs::create_dir_all(state_dir)?;
        let content = toml::to_string_pretty(self)?;
        fs::write(state_dir.join(CONFIG_FILE_NAME), content)?;
        Ok(())
    }
}

/// Default state directory: `$OPQ_STATE_DIR`, else the platform's local
/// data directory joined with `opq`.
pub fn default_state_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(STATE_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(".opq"))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
