// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Offline-resilient delivery of queued operations.
//!
//! Writes made while the remote service is unreachable are queued in memory,
//! snapshotted when the app goes inactive, and replayed in order once the
//! app is active and the remote answers again.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Lifecycle  │────►│   Replay    │────►│   Remote    │
//! │ (Controller)│     │  (Engine)   │◄────│  (Client)   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │                   │
//!        ▼                   ▼
//! ┌─────────────┐     ┌─────────────┐
//! │ Connectivity│     │   Queue +   │  (opq-core)
//! │   (Probe)   │     │  Snapshot   │
//! └─────────────┘     └─────────────┘
//! ```
//!
//! # Features
//!
//! - At-least-once delivery in enqueue order
//! - Halt on unreachable remote, skip past rejected operations
//! - Cancellable drains, one at a time
//! - Backoff retries while the app stays active
//! - Injectable client and probe traits for testing

mod lifecycle;
mod probe;
mod replay;
mod transport;

pub use lifecycle::{
    Activation, Deactivation, DrainAttempt, DrainSkip, LifecycleController, LifecycleState,
    RetryPolicy,
};
pub use probe::{ConnectivityProbe, StaticProbe, TcpProbe};
pub use replay::{DrainReport, Rejection, ReplayEngine, ReplayError};
pub use transport::{
    HttpClient, Outcome, RemoteClient, RemoteTarget, Request, TransportError, TransportResult,
    DEFAULT_AUTH_HEADER,
};

#[cfg(test)]
mod test_helpers;
