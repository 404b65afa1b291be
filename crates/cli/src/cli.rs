// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use opq_core::Verb;

/// Parse a string that must not be empty or whitespace-only.
fn non_empty_string(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        Err("cannot be empty".to_string())
    } else {
        Ok(s.to_string())
    }
}

fn parse_verb(s: &str) -> Result<Verb, String> {
    s.parse::<Verb>().map_err(|e| e.to_string())
}

/// Output format for commands supporting structured output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "opq")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Offline-resilient queue of write operations for a remote service")]
#[command(
    long_about = "Offline-resilient queue of write operations for a remote service.\n\n\
    Writes are queued locally and replayed in order once the remote is reachable."
)]
pub struct Cli {
    /// Directory holding the queue snapshot and config.toml
    #[arg(long, global = true, value_name = "path")]
    pub state_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Queue a write operation
    #[command(after_help = "\
Examples:
  opq enqueue create /notes '{\"title\":\"x\"}'   Queue a POST to /notes
  opq enqueue update /notes/7 '{\"done\":true}'   Queue a PUT to /notes/7")]
    Enqueue {
        /// Operation kind (create, update)
        #[arg(value_parser = parse_verb)]
        verb: Verb,

        /// Target URL, absolute or relative to the remote base address
        #[arg(value_parser = non_empty_string)]
        url: String,

        /// JSON payload (default: {})
        payload: Option<String>,
    },

    /// List pending operations in replay order
    List {
        /// Output format (text, json)
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Drop pending operations
    Clear {
        /// Only drop operations of this kind
        #[arg(long, value_parser = parse_verb)]
        verb: Option<Verb>,
    },

    /// Replay pending operations against the remote
    Drain {
        #[command(flatten)]
        remote: RemoteArgs,

        /// Output format (text, json)
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Drain now, then keep retrying with backoff until interrupted
    Watch {
        #[command(flatten)]
        remote: RemoteArgs,
    },

    /// Show queue and remote status
    Status,
}

/// Remote overrides for commands that reach the network.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct RemoteArgs {
    /// Remote base address (overrides [remote].base_url)
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Auth token (overrides [remote].auth_token)
    #[arg(long, value_name = "TOKEN")]
    pub token: Option<String>,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
