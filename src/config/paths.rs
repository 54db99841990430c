//! Path resolution for kitchen-queue configuration and data files.
//!
//! All data lives under `~/.kitchen-queue/` unless `KITCHEN_QUEUE_HOME` or
//! `--root` points elsewhere:
//! - `config.yaml` - Settings (remote endpoint, queue policy, output)
//! - `queue.db` - `SQLite` database holding the durable mirror

use std::path::PathBuf;

use crate::error::KitchenError;

/// Environment variable overriding the data root.
pub const HOME_ENV: &str = "KITCHEN_QUEUE_HOME";

/// Paths to kitchen-queue configuration and data files.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Root directory: `~/.kitchen-queue/`
    pub root: PathBuf,
    /// Config file: `~/.kitchen-queue/config.yaml`
    pub config_file: PathBuf,
    /// Database file: `~/.kitchen-queue/queue.db`
    pub database: PathBuf,
}

impl Paths {
    /// Resolve paths from `KITCHEN_QUEUE_HOME`, falling back to the user's
    /// home directory.
    ///
    /// # Errors
    ///
    /// Returns an error if neither variable is set.
    pub fn new() -> Result<Self, KitchenError> {
        if let Ok(root) = std::env::var(HOME_ENV) {
            return Ok(Self::with_root(PathBuf::from(root)));
        }

        let home = std::env::var("HOME").map_err(|_| {
            KitchenError::Config("Could not determine home directory".to_string())
        })?;

        Ok(Self::with_root(PathBuf::from(home).join(".kitchen-queue")))
    }

    /// Create paths with a custom root directory.
    #[must_use]
    pub fn with_root(root: PathBuf) -> Self {
        Self {
            config_file: root.join("config.yaml"),
            database: root.join("queue.db"),
            root,
        }
    }

    /// Ensure the root directory exists.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation fails.
    pub fn ensure_dirs(&self) -> Result<(), KitchenError> {
        if !self.root.exists() {
            std::fs::create_dir_all(&self.root).map_err(|e| {
                KitchenError::Config(format!(
                    "Failed to create directory {}: {e}",
                    self.root.display()
                ))
            })?;
        }
        Ok(())
    }
}
