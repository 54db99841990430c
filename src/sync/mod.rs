//! Offline mutation queue.
//!
//! Buffers writes made while the kitchen terminal is disconnected and
//! replays them against the remote row store once connectivity returns.
//!
//! Features:
//! - Insert, update and delete operations against any named table
//! - Durable mirror rewritten after every change, restored on startup
//! - Single-flight, strictly sequential replay in insertion order
//! - Optional dead-letter eviction after repeated failures

pub mod connectivity;
pub mod executor;
pub mod notify;
pub mod operation;
pub mod queue;

pub use connectivity::{ConnectivityEvent, ConnectivityProbe, ConnectivitySubscription};
pub use executor::{format_sync_result, ExecutionResult, ReplayExecutor, SyncReport};
pub use notify::{ChannelNotifier, Notice, Notifier, TerminalNotifier, TracingNotifier};
pub use operation::{OperationKind, QueuedOperation};
pub use queue::{OfflineQueue, QueueSettings, QueueStats, ReplayOutcome, SkipReason};
