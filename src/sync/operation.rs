//! Operation types for the offline queue.
//!
//! The serialized form uses the field names the storefront writes to local
//! storage (`id`, `table`, `type`, `data`, `timestamp`), so a cache exported
//! from the browser loads unchanged.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::remote::Row;

/// The write an operation performs on its target table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Create a row
    Insert,
    /// Partially update a row addressed by its identifier
    Update,
    /// Delete a row addressed by its identifier
    Delete,
}

impl OperationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// Whether the payload must carry the row identifier.
    #[must_use]
    pub const fn addresses_row(self) -> bool {
        matches!(self, Self::Update | Self::Delete)
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OperationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "insert" => Ok(Self::Insert),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(format!("unknown operation kind: {other}")),
        }
    }
}

/// A buffered write destined for the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedOperation {
    /// `op_<unix millis>_<random suffix>`, never reused
    pub id: String,
    /// Remote table
    #[serde(rename = "table")]
    pub target: String,
    #[serde(rename = "type")]
    pub kind: OperationKind,
    /// Row (insert), patch including the identifier (update), or identifier
    /// (delete)
    #[serde(rename = "data")]
    pub payload: Row,
    /// Creation time, diagnostics only
    #[serde(rename = "timestamp", with = "chrono::serde::ts_milliseconds")]
    pub enqueued_at: DateTime<Utc>,
    /// Failed replay attempts so far
    #[serde(default, skip_serializing_if = "is_zero")]
    pub attempts: u32,
    /// Error from the most recent failed attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_zero(n: &u32) -> bool {
    *n == 0
}

impl QueuedOperation {
    /// Create a fresh operation with a newly generated id.
    pub fn new(target: impl Into<String>, kind: OperationKind, payload: Row) -> Self {
        // Millisecond precision is all the mirror keeps
        let enqueued_at = Utc::now().trunc_subsecs(3);
        Self {
            id: generate_id(enqueued_at),
            target: target.into(),
            kind,
            payload,
            enqueued_at,
            attempts: 0,
            last_error: None,
        }
    }

    /// The row identifier carried in the payload under `id_field`.
    #[must_use]
    pub fn row_id(&self, id_field: &str) -> Option<&Value> {
        self.payload.get(id_field).filter(|v| !v.is_null())
    }

    /// Payload without the identifier field, as sent in an update.
    #[must_use]
    pub fn patch(&self, id_field: &str) -> Row {
        let mut patch = self.payload.clone();
        patch.remove(id_field);
        patch
    }

    /// Forget previous failures (used when requeueing dead letters).
    pub fn reset_attempts(&mut self) {
        self.attempts = 0;
        self.last_error = None;
    }
}

fn generate_id(at: DateTime<Utc>) -> String {
    let suffix: String = uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(9)
        .collect();
    format!("op_{}_{suffix}", at.timestamp_millis())
}
