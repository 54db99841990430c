//! Replay executor for queued operations.
//!
//! Dispatches each operation to the remote store, strictly one after the
//! other, and records the outcome. Failures never escape: they are reported
//! per operation so the queue can keep the entry for the next pass.

use colored::Colorize;
use tracing::{debug, warn};

use super::operation::{OperationKind, QueuedOperation};
use crate::remote::{RemoteError, RemoteStore};

/// Result of executing a single operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Operation ID
    pub id: String,
    /// Target table
    pub target: String,
    pub kind: OperationKind,
    /// Whether the remote store confirmed the write
    pub success: bool,
    /// Error message if failed
    pub error: Option<String>,
}

/// Result of one replay pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Number of operations confirmed and removed
    pub succeeded: usize,
    /// Number of operations that failed and stay queued (or were evicted)
    pub failed: usize,
    /// Failed operations moved to the dead-letter list
    pub dead_lettered: usize,
    /// Individual results, in replay order
    pub results: Vec<ExecutionResult>,
}

impl SyncReport {
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            succeeded: 0,
            failed: 0,
            dead_lettered: 0,
            results: Vec::new(),
        }
    }

    pub fn add(&mut self, result: ExecutionResult) {
        if result.success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.results.push(result);
    }

    #[must_use]
    pub const fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    #[must_use]
    pub const fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    /// Ids of operations the remote store confirmed.
    pub fn succeeded_ids(&self) -> impl Iterator<Item = &str> {
        self.results
            .iter()
            .filter(|r| r.success)
            .map(|r| r.id.as_str())
    }

    /// Ids and messages of operations that failed.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.results.iter().filter(|r| !r.success).map(|r| {
            (
                r.id.as_str(),
                r.error.as_deref().unwrap_or("Unknown error"),
            )
        })
    }
}

/// Executor for one replay pass.
pub struct ReplayExecutor<'a> {
    remote: &'a dyn RemoteStore,
    id_field: &'a str,
}

impl<'a> ReplayExecutor<'a> {
    #[must_use]
    pub fn new(remote: &'a dyn RemoteStore, id_field: &'a str) -> Self {
        Self { remote, id_field }
    }

    /// Execute `operations` in order, awaiting each before the next.
    pub async fn execute_all(&self, operations: &[QueuedOperation]) -> SyncReport {
        let mut report = SyncReport::empty();

        for operation in operations {
            let result = match self.execute_one(operation).await {
                Ok(()) => {
                    debug!(id = %operation.id, table = %operation.target, "Operation synced");
                    ExecutionResult {
                        id: operation.id.clone(),
                        target: operation.target.clone(),
                        kind: operation.kind,
                        success: true,
                        error: None,
                    }
                }
                Err(e) => {
                    warn!(
                        id = %operation.id,
                        table = %operation.target,
                        kind = %operation.kind,
                        error = %e,
                        "Offline operation failed to sync"
                    );
                    ExecutionResult {
                        id: operation.id.clone(),
                        target: operation.target.clone(),
                        kind: operation.kind,
                        success: false,
                        error: Some(e.to_string()),
                    }
                }
            };
            report.add(result);
        }

        report
    }

    /// Issue the remote write for a single operation.
    ///
    /// # Errors
    ///
    /// Returns the remote failure, or `Rejected` when an update or delete
    /// carries no row identifier.
    pub async fn execute_one(&self, operation: &QueuedOperation) -> Result<(), RemoteError> {
        match operation.kind {
            OperationKind::Insert => {
                self.remote
                    .insert(&operation.target, &operation.payload)
                    .await
            }
            OperationKind::Update => {
                let id = self.require_row_id(operation)?;
                let patch = operation.patch(self.id_field);
                self.remote.update(&operation.target, &patch, id).await
            }
            OperationKind::Delete => {
                let id = self.require_row_id(operation)?;
                self.remote.delete(&operation.target, id).await
            }
        }
    }

    fn require_row_id<'o>(
        &self,
        operation: &'o QueuedOperation,
    ) -> Result<&'o serde_json::Value, RemoteError> {
        operation.row_id(self.id_field).ok_or_else(|| {
            RemoteError::Rejected(format!(
                "{} on {} has no '{}' field",
                operation.kind, operation.target, self.id_field
            ))
        })
    }
}

/// Format a replay report for display.
#[must_use]
pub fn format_sync_result(report: &SyncReport) -> String {
    let mut lines = Vec::new();

    lines.push(format!("Sync completed: {} operations", report.total()));
    lines.push("─".repeat(40));

    if report.succeeded > 0 {
        lines.push(format!(
            "  {} {}",
            "✓".green(),
            format!("{} synced", report.succeeded).green()
        ));
    }

    if report.failed > 0 {
        lines.push(format!(
            "  {} {}",
            "✗".red(),
            format!(
                "{} still pending",
                report.failed.saturating_sub(report.dead_lettered)
            )
            .red()
        ));
    }

    if report.dead_lettered > 0 {
        lines.push(format!(
            "  {} {}",
            "○".yellow(),
            format!("{} moved to dead letters", report.dead_lettered).yellow()
        ));
    }

    if !report.all_succeeded() {
        let errors = report.results.iter().filter(|r| r.error.is_some()).take(3);
        lines.push(String::new());
        lines.push("Errors:".to_string());
        for err in errors {
            lines.push(format!(
                "  - {} {}: {}",
                err.kind,
                err.target,
                err.error.as_deref().unwrap_or("Unknown error")
            ));
        }
    }

    lines.join("\n")
}
