//! Error types for kitchen-queue.

use thiserror::Error;

use crate::remote::RemoteError;

/// Errors surfaced by the queue, its storage and the command-line host.
///
/// Replay failures never appear here: they are contained inside the replay
/// pass and recorded on the queued operation instead.
#[derive(Debug, Error)]
pub enum KitchenError {
    /// Configuration could not be read, parsed or resolved.
    #[error("config error: {0}")]
    Config(String),

    /// The local `SQLite` database failed.
    #[error("database error: {0}")]
    Database(String),

    /// The remote row store rejected a request or could not be reached.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// JSON (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem access failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Caller-supplied input was malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<rusqlite::Error> for KitchenError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}
