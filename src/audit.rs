//! Trade audit log
//!
//! Appends one JSON object per line for every finished transaction plan and
//! every tool call. Writing never blocks a trade: failures are logged and
//! dropped.

use crate::orchestrator::{PlanStatus, TransactionPlan};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::Mutex;
use uuid::Uuid;

const MAX_RESULT_CHARS: usize = 1_000;

/// Entry in the audit log
#[derive(Debug, Serialize)]
struct AuditEntry<'a> {
    timestamp: DateTime<Utc>,
    entry_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    plan_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    chain_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    operation: Option<&'a str>,
    status: &'static str,
    #[serde(skip_serializing_if = "Value::is_null")]
    details: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    duration_ms: u64,
}

struct AuditLogWriter {
    path: PathBuf,
}

impl AuditLogWriter {
    fn write(&self, entry: &AuditEntry<'_>) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }
}

pub struct AuditLog {
    writer: Mutex<AuditLogWriter>,
}

impl AuditLog {
    /// # Arguments
    /// * `log_path` - Path to the audit log file (JSONL format)
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            writer: Mutex::new(AuditLogWriter { path: log_path.into() }),
        }
    }

    /// Record a finished plan, simulated or executed
    pub async fn record_plan(&self, plan: &TransactionPlan) {
        let status = match plan.status {
            PlanStatus::Simulated => "simulated",
            PlanStatus::Confirmed => "confirmed",
            PlanStatus::Failed => "failed",
        };
        let details = serde_json::json!({
            "mode": plan.mode,
            "steps": plan.steps,
            "warnings": plan.warnings,
        });
        let entry = AuditEntry {
            timestamp: Utc::now(),
            entry_type: "transaction_plan",
            tool_name: None,
            plan_id: Some(plan.id),
            chain_id: Some(plan.chain_id),
            operation: Some(plan.operation),
            status,
            details,
            error: plan
                .failure
                .as_ref()
                .map(|f| format!("{}: {}", f.step, f.reason)),
            duration_ms: (Utc::now() - plan.created_at).num_milliseconds().max(0) as u64,
        };
        self.write(&entry).await;
    }

    /// Record a completed tool call
    pub async fn record_tool_call(&self, tool_name: &str, args: &Value, result: &std::result::Result<Value, String>, duration_ms: u64) {
        let (details, error, status) = match result {
            Ok(v) => (
                serde_json::json!({ "args": args, "result": truncate(v) }),
                None,
                "success",
            ),
            Err(e) => (serde_json::json!({ "args": args }), Some(e.clone()), "error"),
        };
        let entry = AuditEntry {
            timestamp: Utc::now(),
            entry_type: "tool_call",
            tool_name: Some(tool_name),
            plan_id: None,
            chain_id: None,
            operation: None,
            status,
            details,
            error,
            duration_ms,
        };
        self.write(&entry).await;
    }

    async fn write(&self, entry: &AuditEntry<'_>) {
        let writer = self.writer.lock().await;
        if let Err(e) = writer.write(entry) {
            tracing::warn!(path = %writer.path.display(), error = %e, "Failed to write audit log entry");
        }
    }
}

/// Keep large results out of the log
fn truncate(result: &Value) -> Value {
    let s = serde_json::to_string(result).unwrap_or_default();
    if s.chars().count() > MAX_RESULT_CHARS {
        let head: String = s.chars().take(MAX_RESULT_CHARS).collect();
        serde_json::json!(format!("{}... [truncated]", head))
    } else {
        result.clone()
    }
}
