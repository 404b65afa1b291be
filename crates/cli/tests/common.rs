// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Allow unused items: test helpers are shared across multiple test binaries,
// and not every test file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;

pub use predicates::prelude::*;
pub use tempfile::TempDir;

pub fn opq() -> Command {
    cargo_bin_cmd!("opq")
}

/// Command bound to the state directory of `temp`.
pub fn opq_in(temp: &TempDir) -> Command {
    let mut cmd = opq();
    cmd.arg("--state-dir").arg(temp.path()).env_remove("RUST_LOG");
    cmd
}

/// Queues an operation and asserts success.
pub fn enqueue(temp: &TempDir, verb: &str, url: &str, payload: Option<&str>) {
    let mut cmd = opq_in(temp);
    cmd.arg("enqueue").arg(verb).arg(url);
    if let Some(payload) = payload {
        cmd.arg(payload);
    }
    cmd.assert().success();
}

/// A local address nothing listens on.
pub fn closed_address() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}
