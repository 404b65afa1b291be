// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Network commands: drain and watch.

use std::future::Future;
use std::path::Path;

use tokio_util::sync::CancellationToken;

use crate::cli::{OutputFormat, RemoteArgs};
use crate::config::{Config, RemoteConfig};
use crate::error::{Error, Result};
use crate::sync::{DrainAttempt, DrainReport, DrainSkip};

use super::Session;

/// Merges command-line overrides into the configured remote.
pub(crate) fn resolve_remote(
    config: &Config,
    args: RemoteArgs,
    state_dir: &Path,
) -> Result<RemoteConfig> {
    let mut remote = match (args.base_url, config.remote.clone()) {
        (Some(base_url), Some(mut remote)) => {
            remote.base_url = base_url;
            remote
        }
        (Some(base_url), None) => RemoteConfig::new(base_url),
        (None, Some(remote)) => remote,
        (None, None) => {
            return Err(Error::NoRemote(
                state_dir.join("config.toml").display().to_string(),
            ))
        }
    };
    if args.token.is_some() {
        remote.auth_token = args.token;
    }
    Ok(remote)
}

fn print_report(report: &DrainReport, pending: usize) {
    println!(
        "delivered {}, rejected {}, {} pending",
        report.delivered, report.rejected, pending
    );
    for rejection in &report.rejections {
        let status = rejection
            .status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  rejected #{} {} ({}): {}",
            rejection.sequence, rejection.url, status, rejection.reason
        );
    }
    if report.cancelled {
        println!("drain cancelled");
    } else if let Some(sequence) = report.halted_at {
        println!("remote became unreachable at #{}", sequence);
    }
    if !report.snapshot_synced {
        eprintln!("warning: queue snapshot could not be updated after the drain");
    }
}

fn print_attempt(attempt: &DrainAttempt, pending: usize) {
    match attempt {
        DrainAttempt::Drained(report) => print_report(report, pending),
        DrainAttempt::Skipped(DrainSkip::EmptyQueue) => println!("nothing to drain"),
        DrainAttempt::Skipped(DrainSkip::Offline) => {
            println!("remote unreachable, {} operation(s) kept queued", pending)
        }
        DrainAttempt::Skipped(skip) => {
            println!("drain skipped ({}), {} operation(s) pending", skip, pending)
        }
    }
}

/// JSON form of an attempt: the report, or the reason nothing was sent.
fn attempt_json(
    attempt: &DrainAttempt,
    pending: usize,
) -> serde_json::Result<serde_json::Value> {
    match attempt {
        DrainAttempt::Drained(report) => serde_json::to_value(report),
        DrainAttempt::Skipped(skip) => Ok(serde_json::json!({
            "skipped": skip.as_str(),
            "pending": pending,
        })),
    }
}

/// Runs `task` to completion unless Ctrl-C arrives first. On Ctrl-C the
/// watch loop and the running drain are told to stop, and `task` is still
/// awaited so the drain commits what it delivered.
async fn interruptible<F: Future>(
    session: &Session,
    shutdown: &CancellationToken,
    task: F,
) -> (F::Output, Option<std::io::Result<()>>) {
    tokio::pin!(task);
    let signal = tokio::select! {
        biased;
        output = &mut task => return (output, None),
        signal = tokio::signal::ctrl_c() => signal,
    };
    tracing::info!("interrupted, waiting for the running drain to commit");
    shutdown.cancel();
    session.controller().cancel_drain();
    (task.await, Some(signal))
}

/// Restores the queue and replays it once.
pub async fn drain(state_dir: &Path, args: RemoteArgs, output: OutputFormat) -> Result<()> {
    let config = Config::load(state_dir)?;
    let remote = resolve_remote(&config, args, state_dir)?;
    let session = Session::open(state_dir, config, Some(remote))?;

    let attempt = session.activate().await;
    let pending = session.controller().pending();
    let result = match output {
        OutputFormat::Text => {
            print_attempt(&attempt, pending);
            Ok(())
        }
        OutputFormat::Json => attempt_json(&attempt, pending)
            .and_then(|value| serde_json::to_string_pretty(&value))
            .map(|json| println!("{}", json))
            .map_err(Error::from),
    };
    session.close(result).await
}

/// Drains, then retries with backoff until Ctrl-C.
pub async fn watch(state_dir: &Path, args: RemoteArgs) -> Result<()> {
    let config = Config::load(state_dir)?;
    let remote = resolve_remote(&config, args, state_dir)?;
    let policy = remote.retry_policy();
    let session = Session::open(state_dir, config, Some(remote))?;

    let shutdown = CancellationToken::new();
    let (attempt, mut signal) = interruptible(&session, &shutdown, session.activate()).await;
    print_attempt(&attempt, session.controller().pending());

    if signal.is_none() {
        let watcher = session
            .controller()
            .watch_connectivity(policy, shutdown.clone());
        signal = interruptible(&session, &shutdown, watcher).await.1;
    }
    let result = signal.transpose().map(drop).map_err(Error::from);
    println!(
        "stopping, {} operation(s) pending",
        session.controller().pending()
    );
    session.close(result).await
}

#[cfg(test)]
#[path = "drain_tests.rs"]
mod tests;
