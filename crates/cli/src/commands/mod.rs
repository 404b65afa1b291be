// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Command implementations.
//!
//! Every invocation is one activation of the queue: the snapshot is restored
//! when the session opens and written back when it closes, whatever the
//! command did in between.

pub mod drain;
pub mod queue;

use std::path::{Path, PathBuf};

use opq_core::{FileStore, QueueSnapshotter};

use crate::config::{Config, RemoteConfig};
use crate::error::Result;
use crate::sync::{
    Activation, ConnectivityProbe, DrainAttempt, HttpClient, LifecycleController, RemoteTarget,
    StaticProbe, TcpProbe,
};

/// Controller type used by the command-line host.
pub type Controller = LifecycleController<HttpClient, Box<dyn ConnectivityProbe>, FileStore>;

/// One activation of the queue stored under a state directory.
pub struct Session {
    state_dir: PathBuf,
    config: Config,
    controller: Controller,
}

impl Session {
    /// Opens the store under `state_dir`. With a remote, activation drains
    /// to it when the probe reports it reachable.
    pub fn open(state_dir: &Path, config: Config, remote: Option<RemoteConfig>) -> Result<Self> {
        let store = FileStore::open(state_dir)?;
        let snapshotter = QueueSnapshotter::new(store, config.queue.snapshot_key.clone());

        let target = remote
            .as_ref()
            .map(|r| RemoteTarget::new(&r.base_url, r.auth_token.clone()))
            .transpose()?;
        let client = match &remote {
            Some(r) => HttpClient::with_auth_header(&r.auth_header)?,
            None => HttpClient::new()?,
        };
        let probe: Box<dyn ConnectivityProbe> = match (&remote, &target) {
            (Some(r), Some(target)) => Box::new(TcpProbe::for_target(target, r.probe_timeout())),
            _ => Box::new(StaticProbe::new(false)),
        };

        let mut controller = LifecycleController::new(&config.queue, snapshotter, client, probe);
        if let Some(target) = target {
            controller = controller.with_target(target);
        }

        Ok(Session {
            state_dir: state_dir.to_path_buf(),
            config,
            controller,
        })
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Restores the queue, returning the drain attempt made on activation.
    pub async fn activate(&self) -> DrainAttempt {
        match self.controller.on_activated().await {
            Activation::Activated {
                restored,
                warning,
                drain,
            } => {
                if let Some(warning) = warning {
                    eprintln!("warning: {}", warning);
                }
                tracing::debug!(restored, "session opened");
                drain
            }
            Activation::AlreadyActive => self.controller.retry().await,
        }
    }

    /// Persists the queue. A command error takes precedence over a
    /// persist error, but the queue is always written.
    pub async fn close(self, result: Result<()>) -> Result<()> {
        let deactivation = self.controller.on_deactivated().await;
        result?;
        let deactivation = deactivation?;
        tracing::debug!(persisted = deactivation.persisted, "session closed");
        Ok(())
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
