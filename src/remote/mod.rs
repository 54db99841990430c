//! Remote row store the queue replays into.
//!
//! The queue only needs four verbs per named table, so the backend is a
//! trait; [`RestClient`] speaks PostgREST over HTTP.

mod rest;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub use rest::RestClient;

/// A row (or partial row) keyed by column name.
pub type Row = Map<String, Value>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    /// Refused before reaching the network (e.g. no row identifier).
    #[error("rejected: {0}")]
    Rejected(String),
}

impl RemoteError {
    /// Whether the failure says anything about connectivity.
    #[must_use]
    pub const fn is_connectivity(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout)
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(e.to_string())
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Create `row` in `table`.
    async fn insert(&self, table: &str, row: &Row) -> Result<(), RemoteError>;

    /// Apply `patch` to the row of `table` whose identifier is `id`.
    async fn update(&self, table: &str, patch: &Row, id: &Value) -> Result<(), RemoteError>;

    /// Delete the row of `table` whose identifier is `id`.
    async fn delete(&self, table: &str, id: &Value) -> Result<(), RemoteError>;

    /// Cheap reachability check.
    async fn ping(&self) -> Result<(), RemoteError>;
}

/// Stand-in when no endpoint is configured: every call is refused, so
/// operations simply stay queued.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unconfigured;

#[async_trait]
impl RemoteStore for Unconfigured {
    async fn insert(&self, _table: &str, _row: &Row) -> Result<(), RemoteError> {
        Err(Self::refusal())
    }

    async fn update(&self, _table: &str, _patch: &Row, _id: &Value) -> Result<(), RemoteError> {
        Err(Self::refusal())
    }

    async fn delete(&self, _table: &str, _id: &Value) -> Result<(), RemoteError> {
        Err(Self::refusal())
    }

    async fn ping(&self) -> Result<(), RemoteError> {
        Err(Self::refusal())
    }
}

impl Unconfigured {
    fn refusal() -> RemoteError {
        RemoteError::Rejected("no remote store configured".to_string())
    }
}
