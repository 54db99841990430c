//! Command-line host for the offline queue.

pub mod args;
pub mod commands;
