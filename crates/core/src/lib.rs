// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! opq-core: offline operation queue primitives.
//!
//! This crate provides the data model, the in-memory queue, durable stores
//! and the snapshot protocol shared by the `opq` replay engine and CLI.

pub mod config;
pub mod error;
pub mod op;
pub mod queue;
pub mod sequence;
pub mod snapshot;
pub mod store;

pub use config::QueueConfig;
pub use error::{Error, Result};
pub use op::{Operation, Sequence, Verb};
pub use queue::OperationQueue;
pub use sequence::{ClockSource, SequenceClock, SystemClock};
pub use snapshot::{QueueSnapshotter, Restored};
pub use store::{FileStore, MemoryStore, PersistentStore};
