//! JSON output formatting for kitchen-queue.

use serde::Serialize;
use serde_json::json;

use crate::error::KitchenError;
use crate::sync::{QueuedOperation, SyncReport};

/// Format queued operations as JSON
///
/// # Errors
///
/// Returns `KitchenError::Serialization` if JSON serialization fails.
pub fn format_operations_json(
    operations: &[QueuedOperation],
    list_name: &str,
    limit: usize,
) -> Result<String, KitchenError> {
    let items: Vec<_> = operations.iter().take(limit).collect();
    let output = json!({
        "list": list_name,
        "count": operations.len(),
        "items": items,
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

/// Format a replay report as JSON
///
/// # Errors
///
/// Returns `KitchenError::Serialization` if JSON serialization fails.
pub fn format_report_json(report: &SyncReport) -> Result<String, KitchenError> {
    let results: Vec<_> = report
        .results
        .iter()
        .map(|r| {
            json!({
                "id": r.id,
                "table": r.target,
                "type": r.kind,
                "success": r.success,
                "error": r.error,
            })
        })
        .collect();

    let output = json!({
        "succeeded": report.succeeded,
        "failed": report.failed,
        "dead_lettered": report.dead_lettered,
        "total": report.total(),
        "results": results,
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

/// Generic JSON formatter for any serializable type
///
/// # Errors
///
/// Returns `KitchenError::Serialization` if JSON serialization fails.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, KitchenError> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{ExecutionResult, OperationKind};

    fn make_op(id: &str) -> QueuedOperation {
        let payload = json!({"id": id}).as_object().cloned().unwrap();
        QueuedOperation::new("orders", OperationKind::Insert, payload)
    }

    #[test]
    fn test_format_operations_json_respects_limit() {
        let ops = vec![make_op("a"), make_op("b"), make_op("c")];

        let text = format_operations_json(&ops, "Pending", 2).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["list"], "Pending");
        assert_eq!(value["count"], 3);
        assert_eq!(value["items"].as_array().unwrap().len(), 2);
        assert_eq!(value["items"][0]["table"], "orders");
    }

    #[test]
    fn test_format_report_json() {
        let mut report = SyncReport::empty();
        report.add(ExecutionResult {
            id: "op_1".to_string(),
            target: "orders".to_string(),
            kind: OperationKind::Delete,
            success: false,
            error: Some("timeout".to_string()),
        });

        let value: serde_json::Value =
            serde_json::from_str(&format_report_json(&report).unwrap()).unwrap();

        assert_eq!(value["failed"], 1);
        assert_eq!(value["total"], 1);
        assert_eq!(value["results"][0]["type"], "delete");
        assert_eq!(value["results"][0]["error"], "timeout");
    }
}
