//! Command implementations for kitchen-queue.
//!
//! Each command opens the queue from the data root, acts on it and returns
//! the text to print.

mod completions;
mod dead_letter;
mod queue;
mod watch;

use std::sync::Arc;

pub use completions::completions;
pub use dead_letter::dead_letter;
pub use queue::{add, clear, list, run, status};
pub use watch::watch;

use crate::cli::args::OutputFormat;
use crate::config::{Config, Paths};
use crate::error::KitchenError;
use crate::remote::{RemoteStore, RestClient, Unconfigured};
use crate::storage::{Database, DurableMirror, SqliteStore};
use crate::sync::{Notifier, OfflineQueue, QueueSettings, TerminalNotifier, TracingNotifier};

/// Everything a command needs, resolved once in `main`.
pub struct Context {
    pub paths: Paths,
    pub config: Config,
    pub format: OutputFormat,
}

impl Context {
    /// Open the queue backed by the data root's database.
    ///
    /// The queue starts offline; only `watch` flips it online.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open_queue(&self, remote: Arc<dyn RemoteStore>) -> Result<OfflineQueue, KitchenError> {
        let db = Database::open(&self.paths)?;
        let mirror = DurableMirror::new(
            Arc::new(SqliteStore::new(db)),
            self.config.queue.storage_key.clone(),
        );

        OfflineQueue::new(
            remote,
            mirror,
            self.notifier(),
            QueueSettings::from(&self.config),
            false,
        )
    }

    /// Open the queue without a remote store, for commands that never sync.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open_local_queue(&self) -> Result<OfflineQueue, KitchenError> {
        self.open_queue(Arc::new(Unconfigured))
    }

    /// Remote store from configuration.
    ///
    /// # Errors
    ///
    /// Returns a config error if the endpoint or key is missing.
    pub fn remote(&self) -> Result<Arc<dyn RemoteStore>, KitchenError> {
        Ok(Arc::new(RestClient::from_config(&self.config.remote)?))
    }

    /// Notices go to the terminal for humans and to the log for scripts.
    fn notifier(&self) -> Arc<dyn Notifier> {
        match self.format {
            OutputFormat::Pretty => Arc::new(TerminalNotifier),
            OutputFormat::Json => Arc::new(TracingNotifier),
        }
    }
}
