//! Key/value stores backing the durable mirror.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::KitchenError;

use super::Database;

/// A string store addressed by key, the local-storage shape the queue
/// mirrors itself into.
pub trait KeyValueStore: Send + Sync {
    /// Read the value under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, KitchenError>;

    /// Replace the value under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), KitchenError>;

    /// Delete the value under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn remove(&self, key: &str) -> Result<(), KitchenError>;
}

/// `SQLite`-backed store.
pub struct SqliteStore {
    db: Mutex<Database>,
}

impl SqliteStore {
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    fn db(&self) -> Result<MutexGuard<'_, Database>, KitchenError> {
        self.db
            .lock()
            .map_err(|_| KitchenError::Database("Database lock poisoned".to_string()))
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, KitchenError> {
        self.db()?.get_value(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KitchenError> {
        self.db()?.set_value(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), KitchenError> {
        self.db()?.remove_value(key).map(|_| ())
    }
}

/// In-process store; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> Result<MutexGuard<'_, HashMap<String, String>>, KitchenError> {
        self.values
            .lock()
            .map_err(|_| KitchenError::Database("Memory store lock poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, KitchenError> {
        Ok(self.values()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KitchenError> {
        self.values()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), KitchenError> {
        self.values()?.remove(key);
        Ok(())
    }
}
