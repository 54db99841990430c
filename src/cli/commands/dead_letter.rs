//! Dead-letter commands.

use serde_json::json;

use super::Context;
use crate::cli::args::{DeadLetterCommands, OutputFormat};
use crate::error::KitchenError;
use crate::output::{format_operations, to_json};

/// Execute dead-letter subcommands.
///
/// # Errors
///
/// Returns an error if the queue cannot be opened or its mirror written.
pub fn dead_letter(ctx: &Context, cmd: DeadLetterCommands) -> Result<String, KitchenError> {
    let queue = ctx.open_local_queue()?;

    match cmd {
        DeadLetterCommands::List { limit } => {
            format_operations(&queue.dead_letters(), "Dead letters", limit, ctx.format)
        }
        DeadLetterCommands::Retry => {
            let count = queue.requeue_dead_letters()?;
            match ctx.format {
                OutputFormat::Json => to_json(&json!({ "requeued": count })),
                OutputFormat::Pretty => Ok(format!("Moved {count} dead letters back to the queue")),
            }
        }
        DeadLetterCommands::Purge { force } => {
            if !force {
                return Err(KitchenError::InvalidInput(
                    "Use --force to drop every dead letter".to_string(),
                ));
            }
            let count = queue.purge_dead_letters()?;
            match ctx.format {
                OutputFormat::Json => to_json(&json!({ "purged": count })),
                OutputFormat::Pretty => Ok(format!("Dropped {count} dead letters")),
            }
        }
    }
}
