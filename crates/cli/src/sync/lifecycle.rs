// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle handling for the operation queue.
//!
//! The host reports two transitions:
//!
//! - `on_deactivated`: the app is about to go inactive. The queue is written
//!   to the snapshot and the persisted operations leave memory, so the
//!   process can be torn down. The network is never touched here. If memory
//!   does not hold the stored operations (never activated, or deactivated
//!   already), they are merged in first so the write never loses them.
//! - `on_activated`: the app is active again. The snapshot is merged back
//!   into memory (once per activation) and, if the remote is reachable, the
//!   queue is drained.
//!
//! The controller starts inactive and can be shared between tasks: every
//! method takes `&self`.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use opq_core::{
    Operation, OperationQueue, PersistentStore, QueueConfig, QueueSnapshotter, Result, Verb,
};
use tokio_util::sync::CancellationToken;

use super::probe::ConnectivityProbe;
use super::replay::{DrainReport, ReplayEngine, ReplayError};
use super::transport::{RemoteClient, RemoteTarget};

/// Process-wide activity state reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Active,
    Inactive,
}

/// Why a drain was not started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainSkip {
    /// Nothing is queued.
    EmptyQueue,
    /// No remote target is configured.
    NoTarget,
    /// The probe reported the remote as unreachable.
    Offline,
    /// The app is not active.
    Inactive,
    /// Another drain holds the queue.
    InProgress,
    /// The stored snapshot could not be read into memory this activation,
    /// so a drain would overwrite operations it never saw.
    Unrestored,
}

impl DrainSkip {
    pub fn as_str(self) -> &'static str {
        match self {
            DrainSkip::EmptyQueue => "empty_queue",
            DrainSkip::NoTarget => "no_target",
            DrainSkip::Offline => "offline",
            DrainSkip::Inactive => "inactive",
            DrainSkip::InProgress => "in_progress",
            DrainSkip::Unrestored => "unrestored",
        }
    }
}

impl std::fmt::Display for DrainSkip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of asking for a drain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainAttempt {
    Drained(DrainReport),
    Skipped(DrainSkip),
}

impl DrainAttempt {
    pub fn report(&self) -> Option<&DrainReport> {
        match self {
            DrainAttempt::Drained(report) => Some(report),
            DrainAttempt::Skipped(_) => None,
        }
    }
}

/// Result of [`LifecycleController::on_activated`].
#[derive(Debug)]
pub enum Activation {
    /// The queue was already restored for the current activation.
    AlreadyActive,
    Activated {
        /// Operations merged back from the snapshot.
        restored: usize,
        /// Set when the snapshot could not be used and was ignored.
        warning: Option<opq_core::Error>,
        drain: DrainAttempt,
    },
}

/// Result of [`LifecycleController::on_deactivated`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deactivation {
    /// Operations written to the snapshot and released from memory.
    pub persisted: usize,
    /// True if a running drain was cancelled.
    pub cancelled_drain: bool,
}

/// Backoff for [`LifecycleController::watch_connectivity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(30),
        }
    }
}

struct Inner {
    state: LifecycleState,
    /// Incremented on every activation.
    epoch: u64,
    /// Epoch whose restore has been claimed.
    restored_epoch: Option<u64>,
    /// Memory holds every operation of the stored snapshot.
    merged: bool,
    /// Cancels drains started during the current activation.
    cancel: CancellationToken,
}

/// Drives snapshots and drains from host lifecycle notifications.
pub struct LifecycleController<C: RemoteClient, P: ConnectivityProbe, S: PersistentStore> {
    queue: OperationQueue,
    snapshotter: Arc<QueueSnapshotter<S>>,
    engine: ReplayEngine<C, S>,
    probe: P,
    target: Option<RemoteTarget>,
    inner: Mutex<Inner>,
}

impl<C: RemoteClient, P: ConnectivityProbe, S: PersistentStore> LifecycleController<C, P, S> {
    /// Creates an inactive controller. Queue size and request timeout come
    /// from `config`; the snapshot key is the one `snapshotter` was built with.
    pub fn new(
        config: &QueueConfig,
        snapshotter: QueueSnapshotter<S>,
        client: C,
        probe: P,
    ) -> Self {
        let queue = OperationQueue::from_config(config);
        let snapshotter = Arc::new(snapshotter);
        let engine = ReplayEngine::new(
            queue.clone(),
            Arc::clone(&snapshotter),
            client,
            config.request_timeout(),
        );
        LifecycleController {
            queue,
            snapshotter,
            engine,
            probe,
            target: None,
            inner: Mutex::new(Inner {
                state: LifecycleState::Inactive,
                epoch: 0,
                restored_epoch: None,
                merged: false,
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Sets the remote that activations and retries drain to.
    pub fn with_target(mut self, target: RemoteTarget) -> Self {
        self.target = Some(target);
        self
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> LifecycleState {
        self.inner().state
    }

    pub fn queue(&self) -> &OperationQueue {
        &self.queue
    }

    pub fn snapshotter(&self) -> &QueueSnapshotter<S> {
        &self.snapshotter
    }

    pub fn target(&self) -> Option<&RemoteTarget> {
        self.target.as_ref()
    }

    /// Number of operations waiting in memory.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn enqueue(
        &self,
        verb: Verb,
        url: impl Into<String>,
        payload: serde_json::Value,
    ) -> Result<Operation> {
        self.queue.enqueue(verb, url, payload)
    }

    pub fn clear_all(&self) {
        self.queue.clear_all();
    }

    pub fn clear_by_verb(&self, verb: Verb) -> usize {
        self.queue.clear_by_verb(verb)
    }

    /// Handles the app becoming active.
    ///
    /// Restores the snapshot into memory (a repeat call within the same
    /// activation is a no-op), then drains if there is work, a target and
    /// connectivity. A corrupt or unreadable snapshot never fails activation;
    /// it is reported as a warning.
    pub async fn on_activated(&self) -> Activation {
        let (epoch, cancel) = {
            let mut inner = self.inner();
            if inner.state == LifecycleState::Active && inner.restored_epoch == Some(inner.epoch) {
                tracing::debug!(epoch = inner.epoch, "already active");
                return Activation::AlreadyActive;
            }
            inner.state = LifecycleState::Active;
            inner.epoch += 1;
            inner.restored_epoch = Some(inner.epoch);
            inner.cancel = CancellationToken::new();
            (inner.epoch, inner.cancel.clone())
        };

        let (restored, warning) = {
            let _exclusive = self.engine.exclusive().await;
            let restored = self.snapshotter.restore_or_discard();
            // An unreadable snapshot is still in the store and not in memory.
            let merged = matches!(
                restored.warning,
                None | Some(opq_core::Error::CorruptedSnapshot { .. })
            );
            self.inner().merged = merged;
            (self.queue.restore(restored.operations), restored.warning)
        };
        tracing::info!(epoch, restored, pending = self.queue.len(), "activated");

        let drain = self.drain_if_possible(&cancel).await;
        Activation::Activated {
            restored,
            warning,
            drain,
        }
    }

    /// Handles the app going inactive.
    ///
    /// Cancels a running drain, waits for it to commit, then persists the
    /// queue and drops the persisted operations from memory. Connectivity is
    /// not consulted. Operations already in the store but not in memory are
    /// merged in before the write, so calling this twice, or before any
    /// activation, keeps them.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the snapshot cannot be read or written;
    /// the stored snapshot is left as it was so the caller can retry.
    pub async fn on_deactivated(&self) -> Result<Deactivation> {
        let cancelled_drain = {
            let mut inner = self.inner();
            inner.state = LifecycleState::Inactive;
            let draining = self.engine.is_draining();
            inner.cancel.cancel();
            draining
        };

        let _exclusive = self.engine.exclusive().await;
        if !self.inner().merged {
            self.merge_stored()?;
        }
        let operations = self.queue.snapshot();
        self.snapshotter.persist(&operations)?;
        let persisted = self
            .queue
            .remove(operations.iter().map(Operation::sequence));
        self.inner().merged = false;

        tracing::info!(persisted, cancelled_drain, "deactivated");
        Ok(Deactivation {
            persisted,
            cancelled_drain,
        })
    }

    /// Cancels the drain running for the current activation, if any.
    ///
    /// The drain commits what it delivered and returns. Later drains in the
    /// same activation are not affected.
    pub fn cancel_drain(&self) {
        let mut inner = self.inner();
        std::mem::replace(&mut inner.cancel, CancellationToken::new()).cancel();
    }

    /// Drains now if active, non-empty, targeted and reachable.
    pub async fn retry(&self) -> DrainAttempt {
        let cancel = {
            let inner = self.inner();
            if inner.state != LifecycleState::Active {
                return DrainAttempt::Skipped(DrainSkip::Inactive);
            }
            inner.cancel.clone()
        };
        self.drain_if_possible(&cancel).await
    }

    /// Retries in the background until `shutdown` fires.
    ///
    /// Each round calls [`retry`](Self::retry). A drain that stops early
    /// doubles the wait before the next round, up to `policy.max`; anything
    /// else resets it to `policy.initial`.
    pub async fn watch_connectivity(&self, policy: RetryPolicy, shutdown: CancellationToken) {
        let mut delay = policy.initial;
        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }

            delay = match self.retry().await {
                DrainAttempt::Drained(report) if !report.completed => {
                    std::cmp::min(delay.saturating_mul(2), policy.max)
                }
                DrainAttempt::Skipped(DrainSkip::Offline) => {
                    std::cmp::min(delay.saturating_mul(2), policy.max)
                }
                _ => policy.initial,
            };
            tracing::debug!(?delay, "next connectivity check");
        }
    }

    /// Reads the stored snapshot into memory. A corrupt snapshot is about to
    /// be overwritten, so it only warns. Runs under the exclusive lock.
    fn merge_stored(&self) -> Result<()> {
        match self.snapshotter.restore() {
            Ok(stored) => {
                let merged = self.queue.restore(stored);
                tracing::debug!(merged, "merged stored operations before persisting");
            }
            Err(err @ opq_core::Error::CorruptedSnapshot { .. }) => {
                tracing::warn!("overwriting corrupt queue snapshot: {}", err);
            }
            Err(err) => return Err(err),
        }
        self.inner().merged = true;
        Ok(())
    }

    async fn drain_if_possible(&self, cancel: &CancellationToken) -> DrainAttempt {
        if self.queue.is_empty() {
            return DrainAttempt::Skipped(DrainSkip::EmptyQueue);
        }
        if !self.inner().merged {
            tracing::info!("stored operations not restored, not draining");
            return DrainAttempt::Skipped(DrainSkip::Unrestored);
        }
        let Some(target) = &self.target else {
            return DrainAttempt::Skipped(DrainSkip::NoTarget);
        };
        if !self.probe.is_reachable().await {
            tracing::info!(pending = self.queue.len(), "remote unreachable, keeping operations queued");
            return DrainAttempt::Skipped(DrainSkip::Offline);
        }

        match self.engine.drain(target, cancel).await {
            Ok(report) => DrainAttempt::Drained(report),
            Err(ReplayError::DrainInProgress) => DrainAttempt::Skipped(DrainSkip::InProgress),
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
