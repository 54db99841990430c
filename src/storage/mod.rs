//! Storage layer for kitchen-queue.
//!
//! `SQLite` persistence for the durable mirror of the offline queue, plus an
//! in-memory store for ephemeral hosts.

mod database;
mod kv;
mod migrations;
mod mirror;

pub use database::Database;
pub use kv::{KeyValueStore, MemoryStore, SqliteStore};
pub use mirror::DurableMirror;

/// Storage key of the pending-operation list.
pub const QUEUE_KEY: &str = "kitchen_offline_cache";
/// Storage key of the dead-letter list.
pub const DEAD_LETTER_KEY: &str = "kitchen_offline_dead_letter";
