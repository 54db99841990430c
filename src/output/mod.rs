//! Output formatting for kitchen-queue.
//!
//! This module renders queue state and replay reports either for humans or
//! as JSON for scripting.

mod json;
mod pretty;

use crate::cli::args::OutputFormat;
use crate::error::KitchenError;
use crate::sync::{QueueStats, QueuedOperation, SyncReport};

pub use json::*;
pub use pretty::*;

/// Format queue statistics based on output format
///
/// # Errors
///
/// Returns `KitchenError::Serialization` if JSON serialization fails.
pub fn format_stats(stats: &QueueStats, format: OutputFormat) -> Result<String, KitchenError> {
    match format {
        OutputFormat::Pretty => Ok(format_stats_pretty(stats)),
        OutputFormat::Json => to_json(stats),
    }
}

/// Format a list of queued operations based on output format
///
/// # Errors
///
/// Returns `KitchenError::Serialization` if JSON serialization fails.
pub fn format_operations(
    operations: &[QueuedOperation],
    title: &str,
    limit: usize,
    format: OutputFormat,
) -> Result<String, KitchenError> {
    match format {
        OutputFormat::Pretty => Ok(format_operations_pretty(operations, title, limit)),
        OutputFormat::Json => format_operations_json(operations, title, limit),
    }
}

/// Format a replay report based on output format
///
/// # Errors
///
/// Returns `KitchenError::Serialization` if JSON serialization fails.
pub fn format_report(report: &SyncReport, format: OutputFormat) -> Result<String, KitchenError> {
    match format {
        OutputFormat::Pretty => Ok(format_report_pretty(report)),
        OutputFormat::Json => format_report_json(report),
    }
}
