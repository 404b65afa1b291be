// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Replay engine draining the queue against the remote service.
//!
//! A drain works on a copy of the queue taken when it starts and sends each
//! operation in order, one at a time. It stops at the first unreachable
//! outcome, since later operations may depend on the one that failed.
//! Rejections are recorded and skipped over.
//!
//! When the drain ends, settled operations (delivered or rejected) are
//! removed from the live queue by sequence and the snapshot is brought in
//! line: cleared after a complete drain, rewritten with what is left after a
//! partial one. Operations enqueued while the drain ran are untouched.
//!
//! The commit also runs if the drain future is dropped before it finishes,
//! so wrapping a drain in `select!` or a timeout never causes a delivered
//! operation to be sent again. Prefer the cancellation token all the same:
//! it lets the drain report what happened.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use opq_core::{Operation, OperationQueue, PersistentStore, QueueSnapshotter, Sequence};
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

use super::transport::{Outcome, RemoteClient, RemoteTarget, Request};

/// Error type for drain requests.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    /// Another drain holds the queue.
    #[error("a drain is already in progress")]
    DrainInProgress,
}

/// An operation the remote declined during a drain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub sequence: Sequence,
    pub url: String,
    pub status: Option<u16>,
    pub reason: String,
}

/// Summary of one drain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    /// Requests issued, including one left unconfirmed by a halt.
    pub attempted: usize,
    pub delivered: usize,
    pub rejected: usize,
    /// True when every operation in the drain's copy was settled.
    pub completed: bool,
    /// True when the drain was stopped by its cancellation token.
    pub cancelled: bool,
    /// False when the snapshot could not be brought in line after the drain.
    pub snapshot_synced: bool,
    /// Sequence of the first operation left queued, if the drain halted.
    pub halted_at: Option<Sequence>,
    pub rejections: Vec<Rejection>,
}

/// Drains an [`OperationQueue`] through a [`RemoteClient`].
pub struct ReplayEngine<C: RemoteClient, S: PersistentStore> {
    queue: OperationQueue,
    snapshotter: Arc<QueueSnapshotter<S>>,
    client: C,
    timeout: Duration,
    /// Held for the whole drain, including its commit.
    exclusive: Mutex<()>,
    /// Set only while a drain runs; lifecycle steps holding `exclusive` leave it clear.
    draining: AtomicBool,
}

impl<C: RemoteClient, S: PersistentStore> ReplayEngine<C, S> {
    pub fn new(
        queue: OperationQueue,
        snapshotter: Arc<QueueSnapshotter<S>>,
        client: C,
        timeout: Duration,
    ) -> Self {
        ReplayEngine {
            queue,
            snapshotter,
            client,
            timeout,
            exclusive: Mutex::new(()),
            draining: AtomicBool::new(false),
        }
    }

    pub fn queue(&self) -> &OperationQueue {
        &self.queue
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns true while a drain is running.
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    /// Waits for any running drain to commit and keeps new ones out while
    /// the guard lives. Snapshot writes outside a drain go through this.
    pub async fn exclusive(&self) -> MutexGuard<'_, ()> {
        self.exclusive.lock().await
    }

    /// Delivers the queued operations in order.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::DrainInProgress`] if another drain (or a
    /// lifecycle snapshot write) currently holds the queue.
    ///
    /// # Cancellation
    ///
    /// Cancel through `cancel`. Dropping the future also commits the
    /// settled prefix, but the unconfirmed request stays queued and no
    /// report is produced.
    pub async fn drain(
        &self,
        target: &RemoteTarget,
        cancel: &CancellationToken,
    ) -> Result<DrainReport, ReplayError> {
        let _exclusive = self
            .exclusive
            .try_lock()
            .map_err(|_| ReplayError::DrainInProgress)?;

        let batch = self.queue.snapshot();
        tracing::info!(count = batch.len(), base = target.base_address(), "draining queue");

        let mut report = DrainReport::default();
        // Declared after the lock so a dropped drain commits before releasing it.
        let mut run = DrainRun::start(self, batch.len());

        for op in &batch {
            if cancel.is_cancelled() {
                report.cancelled = true;
                report.halted_at = Some(op.sequence());
                break;
            }

            report.attempted += 1;
            let Some(outcome) = self.send(op, target, cancel).await else {
                tracing::info!(sequence = op.sequence(), "drain cancelled with request in flight");
                report.cancelled = true;
                report.halted_at = Some(op.sequence());
                break;
            };

            match outcome {
                Outcome::Delivered => {
                    tracing::debug!(sequence = op.sequence(), url = op.url(), "delivered");
                    report.delivered += 1;
                    run.settled.push(op.sequence());
                }
                Outcome::Rejected { status, reason } => {
                    tracing::warn!(
                        sequence = op.sequence(),
                        url = op.url(),
                        ?status,
                        "remote rejected operation: {}",
                        reason
                    );
                    report.rejected += 1;
                    report.rejections.push(Rejection {
                        sequence: op.sequence(),
                        url: op.url().to_string(),
                        status,
                        reason,
                    });
                    run.settled.push(op.sequence());
                }
                Outcome::Unreachable { reason } => {
                    tracing::info!(
                        sequence = op.sequence(),
                        "remote unreachable, halting drain: {}",
                        reason
                    );
                    report.halted_at = Some(op.sequence());
                    break;
                }
            }
        }

        report.completed = run.completed();
        report.snapshot_synced = run.finish();

        tracing::info!(
            delivered = report.delivered,
            rejected = report.rejected,
            completed = report.completed,
            "drain finished"
        );
        Ok(report)
    }

    /// Issues one request, or returns `None` if cancelled first.
    async fn send(
        &self,
        op: &Operation,
        target: &RemoteTarget,
        cancel: &CancellationToken,
    ) -> Option<Outcome> {
        let request = Request {
            operation: op,
            target,
            timeout: self.timeout,
        };
        tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            outcome = self.client.execute(request) => Some(outcome),
        }
    }

    /// Removes settled operations and syncs the snapshot. Returns whether the
    /// snapshot write succeeded. Runs under the exclusive lock.
    fn commit(&self, settled: &[Sequence], completed: bool) -> bool {
        self.queue.remove(settled.iter().copied());

        let result = if completed {
            self.snapshotter.clear()
        } else {
            self.snapshotter.persist(&self.queue.snapshot())
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("failed to update queue snapshot after drain: {}", e);
                false
            }
        }
    }
}

/// Settled sequences of a running drain. Commits on drop unless the drain
/// committed already, and clears the engine's draining flag.
struct DrainRun<'a, C: RemoteClient, S: PersistentStore> {
    engine: &'a ReplayEngine<C, S>,
    expected: usize,
    settled: Vec<Sequence>,
    committed: bool,
}

impl<'a, C: RemoteClient, S: PersistentStore> DrainRun<'a, C, S> {
    fn start(engine: &'a ReplayEngine<C, S>, expected: usize) -> Self {
        engine.draining.store(true, Ordering::SeqCst);
        DrainRun {
            engine,
            expected,
            settled: Vec::with_capacity(expected),
            committed: false,
        }
    }

    fn completed(&self) -> bool {
        self.settled.len() == self.expected
    }

    /// Commits and returns whether the snapshot was brought in line.
    fn finish(mut self) -> bool {
        self.committed = true;
        self.engine.commit(&self.settled, self.completed())
    }
}

impl<C: RemoteClient, S: PersistentStore> Drop for DrainRun<'_, C, S> {
    fn drop(&mut self) {
        if !self.committed && !self.settled.is_empty() {
            tracing::info!(
                settled = self.settled.len(),
                "drain dropped before finishing, committing settled operations"
            );
            self.engine.commit(&self.settled, self.completed());
        }
        self.engine.draining.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
#[path = "replay_tests.rs"]
mod tests;
