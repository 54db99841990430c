//! `SQLite` database connection and operations.
//!
//! The database is stored at `~/.kitchen-queue/queue.db` and contains the
//! key/value table backing the durable mirror of the offline queue.

use rusqlite::{Connection, OptionalExtension};

use crate::config::Paths;
use crate::error::KitchenError;

use super::migrations;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at the default location.
    ///
    /// Creates the database file and runs migrations if necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrations fail.
    pub fn open(paths: &Paths) -> Result<Self, KitchenError> {
        paths.ensure_dirs()?;
        Self::open_at(&paths.database)
    }

    /// Open the database at a specific path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrations fail.
    pub fn open_at(path: &std::path::Path) -> Result<Self, KitchenError> {
        let conn = Connection::open(path).map_err(|e| {
            KitchenError::Database(format!("Failed to open database {}: {e}", path.display()))
        })?;

        Self::from_connection(conn)
    }

    /// Open an in-memory database (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrations fail.
    pub fn open_in_memory() -> Result<Self, KitchenError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            KitchenError::Database(format!("Failed to open in-memory database: {e}"))
        })?;

        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, KitchenError> {
        let db = Self { conn };
        migrations::run(&db.conn)?;
        Ok(db)
    }

    /// Get the current schema version.
    ///
    /// # Errors
    ///
    /// Returns an error if the version cannot be read.
    pub fn schema_version(&self) -> Result<i32, KitchenError> {
        migrations::get_version(&self.conn)
    }

    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_value(&self, key: &str) -> Result<Option<String>, KitchenError> {
        self.conn
            .query_row("SELECT value FROM kv_store WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(|e| KitchenError::Database(format!("Failed to read key {key}: {e}")))
    }

    /// Insert or replace the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn set_value(&self, key: &str, value: &str) -> Result<(), KitchenError> {
        self.conn
            .execute(
                r"INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
                  ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                                 updated_at = excluded.updated_at",
                rusqlite::params![key, value, chrono::Utc::now().to_rfc3339()],
            )
            .map_err(|e| KitchenError::Database(format!("Failed to write key {key}: {e}")))?;
        Ok(())
    }

    /// Delete the value stored under `key`. Returns whether a row existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn remove_value(&self, key: &str) -> Result<bool, KitchenError> {
        let rows = self
            .conn
            .execute("DELETE FROM kv_store WHERE key = ?1", [key])
            .map_err(|e| KitchenError::Database(format!("Failed to remove key {key}: {e}")))?;
        Ok(rows > 0)
    }
}
