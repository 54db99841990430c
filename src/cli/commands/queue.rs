//! Queue commands: status, list, add, run, clear.

use serde_json::{json, Value};

use super::Context;
use crate::cli::args::{AddArgs, OutputFormat};
use crate::error::KitchenError;
use crate::output::{format_operations, format_report, format_stats, to_json};
use crate::remote::Row;
use crate::sync::{OperationKind, ReplayOutcome, SyncReport};

/// Show queue status.
///
/// # Errors
///
/// Returns an error if the queue cannot be opened.
pub fn status(ctx: &Context) -> Result<String, KitchenError> {
    let queue = ctx.open_local_queue()?;
    format_stats(&queue.stats(), ctx.format)
}

/// List pending operations.
///
/// # Errors
///
/// Returns an error if the queue cannot be opened.
pub fn list(ctx: &Context, limit: usize) -> Result<String, KitchenError> {
    let queue = ctx.open_local_queue()?;
    format_operations(&queue.pending(), "Pending", limit, ctx.format)
}

/// Queue a write from the command line.
///
/// # Errors
///
/// Returns an error if `--data` is not a JSON object, if an update or delete
/// lacks the row id, or if the queue cannot be opened.
pub fn add(ctx: &Context, args: AddArgs) -> Result<String, KitchenError> {
    let kind = OperationKind::from(args.kind);
    let payload = parse_payload(&args.data)?;
    let id_field = &ctx.config.remote.id_field;

    if kind.addresses_row() && payload.get(id_field).map_or(true, Value::is_null) {
        return Err(KitchenError::InvalidInput(format!(
            "{kind} needs the row id in field '{id_field}'"
        )));
    }

    let queue = ctx.open_local_queue()?;
    let id = queue.enqueue(args.table.as_str(), kind, payload);

    match ctx.format {
        OutputFormat::Json => to_json(&json!({
            "id": id,
            "table": args.table,
            "type": kind,
            "pending": queue.pending_count(),
        })),
        OutputFormat::Pretty => Ok(format!(
            "Queued {kind} on {} (ID: {id}, {} pending)",
            args.table,
            queue.pending_count()
        )),
    }
}

/// Sync now: one replay pass against the configured remote store.
///
/// # Errors
///
/// Returns an error if the remote store is not configured or the queue
/// cannot be opened. Failures of individual operations are reported, not
/// returned.
pub async fn run(ctx: &Context) -> Result<String, KitchenError> {
    let queue = ctx.open_queue(ctx.remote()?)?;

    let report = match queue.replay().await {
        ReplayOutcome::Completed(report) => report,
        ReplayOutcome::Skipped(_) => SyncReport::empty(),
    };

    format_report(&report, ctx.format)
}

/// Remove every pending operation.
///
/// # Errors
///
/// Returns an error without `--force`, or if the mirror cannot be cleared.
pub fn clear(ctx: &Context, force: bool) -> Result<String, KitchenError> {
    if !force {
        return Err(KitchenError::InvalidInput(
            "Use --force to drop every pending operation".to_string(),
        ));
    }

    let queue = ctx.open_local_queue()?;
    let dropped = queue.pending_count();
    queue.clear()?;

    match ctx.format {
        OutputFormat::Json => to_json(&json!({ "cleared": dropped })),
        OutputFormat::Pretty => Ok(format!("Cleared {dropped} pending operations")),
    }
}

fn parse_payload(data: &str) -> Result<Row, KitchenError> {
    match serde_json::from_str::<Value>(data) {
        Ok(Value::Object(row)) => Ok(row),
        Ok(_) => Err(KitchenError::InvalidInput(
            "--data must be a JSON object".to_string(),
        )),
        Err(e) => Err(KitchenError::InvalidInput(format!("--data is not JSON: {e}"))),
    }
}
