use chrono::Utc;
use colored::Colorize;

use crate::sync::{format_sync_result, QueueStats, QueuedOperation, SyncReport};

/// Human-readable age of a timestamp, e.g. "3 hours ago".
fn age(since: chrono::DateTime<Utc>) -> String {
    let age = Utc::now().signed_duration_since(since);
    if age.num_days() > 0 {
        format!("{} days ago", age.num_days())
    } else if age.num_hours() > 0 {
        format!("{} hours ago", age.num_hours())
    } else if age.num_minutes() > 0 {
        format!("{} minutes ago", age.num_minutes())
    } else {
        "just now".to_string()
    }
}

/// Format queue statistics as a status block
pub fn format_stats_pretty(stats: &QueueStats) -> String {
    let mut lines = Vec::new();

    lines.push("Offline Queue Status".bold().to_string());
    lines.push("─".repeat(40));

    lines.push(format!(
        "  Pending:       {} {}",
        stats.pending,
        if stats.pending > 0 {
            "operations waiting".dimmed()
        } else {
            "".dimmed()
        }
    ));

    lines.push(format!(
        "  Dead letters:  {} {}",
        stats.dead_lettered,
        if stats.dead_lettered > 0 {
            "operations need attention".red()
        } else {
            "".normal()
        }
    ));

    if let Some(oldest) = stats.oldest_pending {
        lines.push(format!("  Oldest:        {}", age(oldest).dimmed()));
    }

    if stats.pending > 0 {
        lines.push(String::new());
        lines.push(
            "Run 'kitchen-queue run' to sync pending operations"
                .dimmed()
                .to_string(),
        );
    }

    lines.join("\n")
}

/// Format queued operations as a table
pub fn format_operations_pretty(
    operations: &[QueuedOperation],
    title: &str,
    limit: usize,
) -> String {
    if operations.is_empty() {
        return format!("{title} (0 operations)\n  Nothing queued");
    }

    let mut lines = Vec::new();
    lines.push(format!("{title} ({} operations)", operations.len()));
    lines.push("─".repeat(72));
    lines.push(format!(
        "{:<30} {:<8} {:<20} {:<8} {}",
        "ID", "Type", "Table", "Tries", "Queued"
    ));
    lines.push("─".repeat(72));

    for op in operations.iter().take(limit) {
        let attempts = if op.attempts > 0 {
            op.attempts.to_string().red().to_string()
        } else {
            "0".to_string()
        };
        lines.push(format!(
            "{:<30} {:<8} {:<20} {:<8} {}",
            op.id,
            op.kind.as_str(),
            op.target,
            attempts,
            age(op.enqueued_at).dimmed()
        ));

        if let Some(error) = &op.last_error {
            let short_error = if error.chars().count() > 60 {
                format!("{}...", error.chars().take(57).collect::<String>())
            } else {
                error.clone()
            };
            lines.push(format!("    {}", short_error.red()));
        }
    }

    if operations.len() > limit {
        lines.push(
            format!("… {} more", operations.len() - limit)
                .dimmed()
                .to_string(),
        );
    }

    lines.join("\n")
}

/// Format a replay report
pub fn format_report_pretty(report: &SyncReport) -> String {
    if report.total() == 0 {
        "No pending operations to sync.".to_string()
    } else {
        format_sync_result(report)
    }
}
