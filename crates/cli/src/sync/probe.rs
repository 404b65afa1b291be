// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connectivity probes.
//!
//! A probe answers one question before a drain starts: is the remote worth
//! trying right now? It is a cheap gate, not a guarantee; a drain still
//! handles unreachable outcomes per request.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;

use super::transport::RemoteTarget;

/// Reports whether the remote service can currently be reached.
pub trait ConnectivityProbe: Send + Sync {
    fn is_reachable(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>>;
}

impl<P: ConnectivityProbe + ?Sized> ConnectivityProbe for Box<P> {
    fn is_reachable(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        (**self).is_reachable()
    }
}

impl<P: ConnectivityProbe + ?Sized> ConnectivityProbe for Arc<P> {
    fn is_reachable(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        (**self).is_reachable()
    }
}

/// Probe that opens (and immediately drops) a TCP connection.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    address: String,
    timeout: Duration,
}

impl TcpProbe {
    /// Probes `address` (`host:port`), giving up after `timeout`.
    pub fn new(address: impl Into<String>, timeout: Duration) -> Self {
        TcpProbe {
            address: address.into(),
            timeout,
        }
    }

    /// Probes the host and port of a remote target's base address.
    pub fn for_target(target: &RemoteTarget, timeout: Duration) -> Self {
        Self::new(target.socket_address(), timeout)
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

impl ConnectivityProbe for TcpProbe {
    fn is_reachable(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        Box::pin(async move {
            let result =
                tokio::time::timeout(self.timeout, TcpStream::connect(self.address.as_str())).await;
            let reachable = matches!(result, Ok(Ok(_)));
            tracing::debug!(address = %self.address, reachable, "probed remote");
            reachable
        })
    }
}

/// Probe with a fixed, externally switchable answer.
#[derive(Debug)]
pub struct StaticProbe {
    reachable: AtomicBool,
}

impl StaticProbe {
    pub fn new(reachable: bool) -> Self {
        StaticProbe {
            reachable: AtomicBool::new(reachable),
        }
    }

    pub fn set(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::Release);
    }
}

impl ConnectivityProbe for StaticProbe {
    fn is_reachable(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        let reachable = self.reachable.load(Ordering::Acquire);
        Box::pin(std::future::ready(reachable))
    }
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
