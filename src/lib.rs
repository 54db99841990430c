//! kitchen-queue - offline mutation queue for the kitchen terminal
//!
//! Writes made while the terminal has no connection are queued, mirrored to
//! a local `SQLite` database and replayed in order against a PostgREST row
//! store once connectivity returns.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod remote;
pub mod storage;
pub mod sync;

pub use cli::args::{Cli, Commands, OutputFormat};
pub use error::KitchenError;
pub use remote::{RemoteStore, RestClient};
pub use sync::{OfflineQueue, OperationKind, QueuedOperation};
