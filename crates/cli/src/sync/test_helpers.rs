// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for sync module tests.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use opq_core::{Error, MemoryStore, Operation, PersistentStore, Result, Sequence};
use tokio::sync::Notify;

use super::transport::{Outcome, RemoteClient, RemoteTarget, Request};

/// Scripted reply of a [`MockClient`].
#[derive(Debug, Clone)]
pub enum Reply {
    Outcome(Outcome),
    /// Never completes; only cancellation gets past it.
    Hang,
}

/// A request as seen by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct Sent {
    pub sequence: Sequence,
    pub method: &'static str,
    pub url: String,
    pub payload: serde_json::Value,
    pub token: Option<String>,
}

type Hook = Box<dyn Fn(&Operation) + Send + Sync>;

/// Remote client replaying a script of outcomes, delivering once the script
/// runs out.
pub struct MockClient {
    script: Mutex<VecDeque<Reply>>,
    sent: Arc<Mutex<Vec<Sent>>>,
    started: Arc<Notify>,
    hook: Option<Hook>,
}

impl MockClient {
    pub fn new() -> Self {
        MockClient {
            script: Mutex::new(VecDeque::new()),
            sent: Arc::new(Mutex::new(Vec::new())),
            started: Arc::new(Notify::new()),
            hook: None,
        }
    }

    pub fn with_script(replies: impl IntoIterator<Item = Reply>) -> Self {
        let client = Self::new();
        client.script.lock().unwrap().extend(replies);
        client
    }

    /// Runs `hook` on every request, before replying.
    pub fn on_request(mut self, hook: impl Fn(&Operation) + Send + Sync + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    /// Handle to the recorded requests, usable after the client is moved.
    pub fn sent_log(&self) -> Arc<Mutex<Vec<Sent>>> {
        Arc::clone(&self.sent)
    }

    /// Notified each time a request starts.
    pub fn started(&self) -> Arc<Notify> {
        Arc::clone(&self.started)
    }
}

impl RemoteClient for MockClient {
    fn execute<'a>(
        &'a self,
        request: Request<'a>,
    ) -> Pin<Box<dyn Future<Output = Outcome> + Send + 'a>> {
        let op = request.operation;
        self.sent.lock().unwrap().push(Sent {
            sequence: op.sequence(),
            method: op.verb().http_method(),
            url: request.target.resolve(op.url()),
            payload: op.payload().clone(),
            token: request.target.auth_token().map(str::to_string),
        });
        if let Some(hook) = &self.hook {
            hook(op);
        }
        self.started.notify_one();

        let reply = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Reply::Outcome(Outcome::Delivered));
        Box::pin(async move {
            match reply {
                Reply::Outcome(outcome) => outcome,
                Reply::Hang => std::future::pending().await,
            }
        })
    }
}

pub fn delivered() -> Reply {
    Reply::Outcome(Outcome::Delivered)
}

pub fn rejected(status: u16) -> Reply {
    Reply::Outcome(Outcome::Rejected {
        status: Some(status),
        reason: format!("HTTP {status}"),
    })
}

pub fn unreachable() -> Reply {
    Reply::Outcome(Outcome::Unreachable {
        reason: "connection refused".into(),
    })
}

pub fn test_target() -> RemoteTarget {
    RemoteTarget::new("http://remote.test", Some("secret".into())).unwrap()
}

/// In-memory store whose writes can be switched to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_writes: std::sync::atomic::AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    fn failing(&self) -> bool {
        self.fail_writes.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl PersistentStore for FlakyStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.inner.read(key)
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        if self.failing() {
            return Err(Error::Storage("disk full".into()));
        }
        self.inner.write(key, bytes)
    }

    fn remove(&self, key: &str) -> Result<()> {
        if self.failing() {
            return Err(Error::Storage("disk full".into()));
        }
        self.inner.remove(key)
    }
}
