// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Local queue commands: enqueue, list, clear and status.
//!
//! None of these reach the network.

use std::path::Path;

use opq_core::{Operation, Verb};

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::error::{Error, Result};

use super::Session;

/// Parses the payload argument, defaulting to an empty object.
pub(crate) fn parse_payload(payload: Option<&str>) -> Result<serde_json::Value> {
    match payload {
        None => Ok(serde_json::json!({})),
        Some(raw) => {
            serde_json::from_str(raw).map_err(|e| Error::InvalidPayload(e.to_string()))
        }
    }
}

pub(crate) fn format_operation(op: &Operation) -> String {
    format!(
        "#{} {} {} {}",
        op.sequence(),
        op.verb().http_method(),
        op.url(),
        op.payload()
    )
}

pub async fn enqueue(state_dir: &Path, verb: Verb, url: &str, payload: Option<&str>) -> Result<()> {
    let payload = parse_payload(payload)?;
    let session = Session::open(state_dir, Config::load(state_dir)?, None)?;
    session.activate().await;

    let result = session
        .controller()
        .enqueue(verb, url, payload)
        .map(|op| println!("queued {}", format_operation(&op)))
        .map_err(Error::from);
    session.close(result).await
}

pub async fn list(state_dir: &Path, output: OutputFormat) -> Result<()> {
    let session = Session::open(state_dir, Config::load(state_dir)?, None)?;
    session.activate().await;

    let operations = session.controller().queue().snapshot();
    let result = match output {
        OutputFormat::Text => {
            if operations.is_empty() {
                println!("no pending operations");
            }
            for op in &operations {
                println!("{}", format_operation(op));
            }
            Ok(())
        }
        OutputFormat::Json => serde_json::to_string_pretty(&operations)
            .map(|json| println!("{}", json))
            .map_err(Error::from),
    };
    session.close(result).await
}

pub async fn clear(state_dir: &Path, verb: Option<Verb>) -> Result<()> {
    let session = Session::open(state_dir, Config::load(state_dir)?, None)?;
    session.activate().await;

    let controller = session.controller();
    let cleared = match verb {
        Some(verb) => controller.clear_by_verb(verb),
        None => {
            let pending = controller.pending();
            controller.clear_all();
            pending
        }
    };
    println!("cleared {} operation(s)", cleared);
    session.close(Ok(())).await
}

/// Prints the persisted queue without activating it, so nothing is
/// replayed or rewritten.
pub fn status(state_dir: &Path) -> Result<()> {
    let config = Config::load(state_dir)?;
    let session = Session::open(state_dir, config, None)?;
    let snapshotter = session.controller().snapshotter();

    let operations = match snapshotter.restore() {
        Ok(operations) => operations,
        Err(e) => {
            eprintln!("warning: {}", e);
            Vec::new()
        }
    };
    let count = |verb: Verb| operations.iter().filter(|op| op.verb() == verb).count();

    println!("State dir: {}", session.state_dir().display());
    println!("Snapshot key: {}", snapshotter.key());
    println!(
        "Pending ops: {} ({} create, {} update)",
        operations.len(),
        count(Verb::Create),
        count(Verb::Update)
    );
    match &session.config().remote {
        Some(remote) => println!("Remote: {}", remote.base_url),
        None => println!("Remote: none"),
    }
    Ok(())
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
