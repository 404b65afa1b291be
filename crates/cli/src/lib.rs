// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! opq - an offline-resilient queue of write operations.
//!
//! This crate provides the host side of the queue: delivery to the remote
//! service and the `opq` command-line tool. The queue itself and its
//! snapshot storage live in `opq-core`.
//!
//! # Main Components
//!
//! - [`sync::LifecycleController`] - restores and persists the queue on
//!   activation changes and drains it when the remote is reachable
//! - [`sync::ReplayEngine`] - in-order, at-least-once delivery with a
//!   [`sync::DrainReport`] per drain
//! - [`sync::HttpClient`] / [`sync::TcpProbe`] - network collaborators
//! - [`Config`] - host configuration (`<state-dir>/config.toml`)
//! - [`Error`] - error types for all operations
//!
//! # Embedding
//!
//! ```rust,ignore
//! use opq::sync::{HttpClient, LifecycleController, RemoteTarget, TcpProbe};
//! use opq_core::{FileStore, QueueConfig, QueueSnapshotter};
//!
//! let config = QueueConfig::default();
//! let snapshotter = QueueSnapshotter::new(FileStore::open(dir)?, "cache");
//! let target = RemoteTarget::new("https://api.example.com", Some(token))?;
//! let probe = TcpProbe::for_target(&target, Duration::from_secs(1));
//! let controller = LifecycleController::new(&config, snapshotter, HttpClient::new()?, probe)
//!     .with_target(target);
//!
//! controller.on_activated().await;
//! controller.enqueue(Verb::Create, "/notes", json!({"title": "x"}))?;
//! controller.on_deactivated().await?;
//! ```

mod cli;
mod commands;

pub mod config;
pub mod error;
pub mod sync;

pub use cli::{Cli, Command, OutputFormat, RemoteArgs};
pub use config::{default_state_dir, Config, RemoteConfig};
pub use error::{Error, Result};

/// Execute a CLI invocation. This is the main entry point for library users
/// and provides a testable way to run commands without process execution.
pub fn run(cli: Cli) -> Result<()> {
    let state_dir = cli.state_dir.unwrap_or_else(default_state_dir);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Runtime(format!("tokio: {}", e)))?;

    rt.block_on(async {
        match cli.command {
            Command::Enqueue { verb, url, payload } => {
                commands::queue::enqueue(&state_dir, verb, &url, payload.as_deref()).await
            }
            Command::List { output } => commands::queue::list(&state_dir, output).await,
            Command::Clear { verb } => commands::queue::clear(&state_dir, verb).await,
            Command::Status => commands::queue::status(&state_dir),
            Command::Drain { remote, output } => {
                commands::drain::drain(&state_dir, remote, output).await
            }
            Command::Watch { remote } => commands::drain::watch(&state_dir, remote).await,
        }
    })
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
