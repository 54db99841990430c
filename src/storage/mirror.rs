//! Durable mirror of the in-memory queue.
//!
//! The whole list is serialized as one JSON array under a single key and
//! rewritten wholesale on every change.

use std::sync::Arc;

use tracing::warn;

use crate::error::KitchenError;
use crate::sync::QueuedOperation;

use super::KeyValueStore;

/// A JSON-array view of a list of operations stored under one key.
#[derive(Clone)]
pub struct DurableMirror {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl DurableMirror {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Mirror for another key sharing the same store.
    #[must_use]
    pub fn sibling(&self, key: impl Into<String>) -> Self {
        Self::new(Arc::clone(&self.store), key)
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the mirrored list.
    ///
    /// A missing key yields an empty list, and so does unparsable content:
    /// a corrupt mirror must not keep the terminal from starting.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store itself cannot be read.
    pub fn load(&self) -> Result<Vec<QueuedOperation>, KitchenError> {
        let Some(raw) = self.store.get(&self.key)? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str(&raw) {
            Ok(operations) => Ok(operations),
            Err(e) => {
                warn!(key = %self.key, error = %e, "Discarding unreadable offline cache");
                Ok(Vec::new())
            }
        }
    }

    /// Rewrite the mirror with `operations`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the store write fails.
    pub fn save(&self, operations: &[QueuedOperation]) -> Result<(), KitchenError> {
        let raw = serde_json::to_string(operations)?;
        self.store.set(&self.key, &raw)
    }

    /// Remove the key entirely.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub fn clear(&self) -> Result<(), KitchenError> {
        self.store.remove(&self.key)
    }

    /// Raw stored text, for diagnostics and tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn raw(&self) -> Result<Option<String>, KitchenError> {
        self.store.get(&self.key)
    }
}
