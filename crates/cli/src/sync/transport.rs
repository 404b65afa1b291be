// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Remote client abstraction for replaying operations.
//!
//! Provides a trait-based transport layer that enables:
//! - Real HTTP delivery for production
//! - Mock clients for unit testing

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use opq_core::{Operation, Verb};
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Method, Url};

/// Header the auth token is sent in unless configured otherwise.
pub const DEFAULT_AUTH_HEADER: &str = "x-access-token";

/// Longest response body excerpt kept in a rejection reason.
const MAX_REASON_LEN: usize = 200;

/// Error type for transport setup.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Base address is not an absolute http(s) URL.
    #[error("invalid base address '{address}': {reason}")]
    InvalidBaseAddress { address: String, reason: String },

    /// Auth header name is not a valid HTTP header name.
    #[error("invalid auth header name '{0}'")]
    InvalidAuthHeader(String),

    /// Auth token contains characters not allowed in a header value.
    #[error("invalid auth token: contains characters not allowed in an HTTP header")]
    InvalidAuthToken,

    /// HTTP client could not be built.
    #[error("http client error: {0}")]
    Client(String),
}

/// Result type for transport setup.
pub type TransportResult<T> = Result<T, TransportError>;

/// Where queued operations are replayed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    base: Url,
    socket_address: String,
    auth_token: Option<String>,
}

impl RemoteTarget {
    /// Validates `base_address` (absolute `http`/`https` URL with a host) and
    /// the optional auth token.
    pub fn new(base_address: &str, auth_token: Option<String>) -> TransportResult<Self> {
        let invalid = |reason: String| TransportError::InvalidBaseAddress {
            address: base_address.to_string(),
            reason,
        };

        let base = Url::parse(base_address).map_err(|e| invalid(e.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", base.scheme())));
        }
        let host = base
            .host_str()
            .ok_or_else(|| invalid("missing host".to_string()))?;
        let port = base
            .port_or_known_default()
            .ok_or_else(|| invalid("missing port".to_string()))?;
        let socket_address = format!("{host}:{port}");

        if let Some(token) = &auth_token {
            HeaderValue::from_str(token).map_err(|_| TransportError::InvalidAuthToken)?;
        }

        Ok(RemoteTarget {
            base,
            socket_address,
            auth_token,
        })
    }

    pub fn base_address(&self) -> &str {
        self.base.as_str()
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    /// `host:port` of the base address, for reachability probing.
    pub fn socket_address(&self) -> &str {
        &self.socket_address
    }

    /// Resolves an operation URL against the base address.
    ///
    /// Relative paths are appended to the base path; absolute URLs are used
    /// as they are.
    pub fn resolve(&self, url: &str) -> String {
        if url.contains("://") {
            return url.to_string();
        }
        format!(
            "{}/{}",
            self.base.as_str().trim_end_matches('/'),
            url.trim_start_matches('/')
        )
    }
}

/// A single delivery attempt.
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    pub operation: &'a Operation,
    pub target: &'a RemoteTarget,
    pub timeout: Duration,
}

/// Result of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The remote accepted the operation.
    Delivered,
    /// The remote was reached but declined the operation.
    Rejected { status: Option<u16>, reason: String },
    /// Network failure or timeout; the outcome is unknown.
    Unreachable { reason: String },
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Delivered => write!(f, "delivered"),
            Outcome::Rejected {
                status: Some(status),
                reason,
            } => write!(f, "rejected ({status}): {reason}"),
            Outcome::Rejected {
                status: None,
                reason,
            } => write!(f, "rejected: {reason}"),
            Outcome::Unreachable { reason } => write!(f, "unreachable: {reason}"),
        }
    }
}

/// Client executing one operation against the remote service.
///
/// Implementations never retry internally; a failed attempt is reported as
/// [`Outcome::Unreachable`] and retried by the next drain.
pub trait RemoteClient: Send + Sync {
    fn execute<'a>(
        &'a self,
        request: Request<'a>,
    ) -> Pin<Box<dyn Future<Output = Outcome> + Send + 'a>>;
}

/// Maps a non-success HTTP status to an outcome.
///
/// Statuses that signal a temporary condition on the way to, or at, the
/// remote are treated as unreachable so the operation is kept.
pub fn outcome_for_status(status: u16, body: &str) -> Outcome {
    match status {
        200..=299 => Outcome::Delivered,
        408 | 429 | 502 | 503 | 504 => Outcome::Unreachable {
            reason: format!("HTTP {status}"),
        },
        _ => {
            let excerpt: String = body.trim().chars().take(MAX_REASON_LEN).collect();
            let reason = if excerpt.is_empty() {
                format!("HTTP {status}")
            } else {
                excerpt
            };
            Outcome::Rejected {
                status: Some(status),
                reason,
            }
        }
    }
}

/// HTTP client: `POST` for creates, `PUT` for updates, JSON bodies.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    auth_header: HeaderName,
}

impl HttpClient {
    /// Creates a client sending the auth token in the default header.
    pub fn new() -> TransportResult<Self> {
        Self::with_auth_header(DEFAULT_AUTH_HEADER)
    }

    /// Creates a client sending the auth token in `auth_header`.
    pub fn with_auth_header(auth_header: &str) -> TransportResult<Self> {
        let auth_header = HeaderName::from_bytes(auth_header.as_bytes())
            .map_err(|_| TransportError::InvalidAuthHeader(auth_header.to_string()))?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(HttpClient {
            client,
            auth_header,
        })
    }
}

fn method_for(verb: Verb) -> Method {
    match verb {
        Verb::Create => Method::POST,
        Verb::Update => Method::PUT,
    }
}

impl RemoteClient for HttpClient {
    fn execute<'a>(
        &'a self,
        request: Request<'a>,
    ) -> Pin<Box<dyn Future<Output = Outcome> + Send + 'a>> {
        Box::pin(async move {
            let op = request.operation;
            let url = request.target.resolve(op.url());

            let mut builder = self
                .client
                .request(method_for(op.verb()), url.as_str())
                .timeout(request.timeout)
                .json(op.payload());
            if let Some(token) = request.target.auth_token() {
                builder = builder.header(self.auth_header.clone(), token);
            }

            match builder.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Outcome::Delivered;
                    }
                    let body = response.text().await.unwrap_or_default();
                    outcome_for_status(status.as_u16(), &body)
                }
                // A request that cannot even be built will never succeed.
                Err(e) if e.is_builder() => Outcome::Rejected {
                    status: None,
                    reason: e.to_string(),
                },
                Err(e) => Outcome::Unreachable {
                    reason: e.to_string(),
                },
            }
        })
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
