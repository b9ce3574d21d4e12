//! Plan and step records returned for every trade request

use crate::chains::Chain;
use crate::config::ExecutionMode;
use crate::rpc::Receipt;
use alloy::primitives::{Address, Bytes, B256, U256};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    ResetAllowance,
    SetAllowance,
    Execute,
}

impl StepKind {
    pub fn label(&self) -> &'static str {
        match self {
            StepKind::ResetAllowance => "reset_allowance",
            StepKind::SetAllowance => "set_allowance",
            StepKind::Execute => "execute",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Built and priced but never signed
    Simulated,
    Pending,
    Success,
    Failed,
}

/// Fully populated transaction, as it would be signed
#[derive(Debug, Clone, Serialize)]
pub struct BuiltCall {
    pub operation: &'static str,
    pub to: Address,
    pub data: Bytes,
    #[serde(with = "crate::tokens::decimal")]
    pub value: U256,
    pub nonce: u64,
    pub gas_limit: u64,
    pub gas_price: u128,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionStep {
    pub kind: StepKind,
    pub call: BuiltCall,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_payload: Option<Bytes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<B256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<Receipt>,
    pub status: StepStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Simulated,
    Confirmed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFailure {
    pub step: String,
    pub reason: String,
}

/// Ordered record of everything done (or that would be done) for one request.
///
/// Returned even when a step fails, so the caller sees which transactions
/// were already submitted.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionPlan {
    pub id: Uuid,
    pub chain: Chain,
    pub chain_id: u64,
    pub operation: &'static str,
    pub mode: ExecutionMode,
    pub status: PlanStatus,
    pub steps: Vec<TransactionStep>,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<StepFailure>,
    pub created_at: DateTime<Utc>,
}

impl TransactionPlan {
    pub fn new(chain: Chain, operation: &'static str, mode: ExecutionMode) -> Self {
        Self {
            id: Uuid::new_v4(),
            chain,
            chain_id: chain.chain_id(),
            operation,
            mode,
            status: match mode {
                ExecutionMode::Simulate => PlanStatus::Simulated,
                ExecutionMode::Execute => PlanStatus::Confirmed,
            },
            steps: Vec::new(),
            warnings: Vec::new(),
            failure: None,
            created_at: Utc::now(),
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(plan_id = %self.id, "{}", message);
        self.warnings.push(message);
    }

    /// Stop the plan; no later step may run
    pub fn fail(&mut self, step: &str, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::error!(plan_id = %self.id, step, reason = %reason, "Transaction plan failed");
        self.status = PlanStatus::Failed;
        self.failure = Some(StepFailure {
            step: step.to_string(),
            reason,
        });
    }

    pub fn is_failed(&self) -> bool {
        self.status == PlanStatus::Failed
    }

    /// The main operation's step, if it was reached
    pub fn execute_step(&self) -> Option<&TransactionStep> {
        self.steps.iter().find(|s| s.kind == StepKind::Execute)
    }

    /// Hashes of every submitted transaction, in order
    pub fn tx_hashes(&self) -> Vec<B256> {
        self.steps.iter().filter_map(|s| s.tx_hash).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_plan_status_follows_mode() {
        let simulated = TransactionPlan::new(Chain::Base, "swap", ExecutionMode::Simulate);
        assert_eq!(simulated.status, PlanStatus::Simulated);
        let live = TransactionPlan::new(Chain::Base, "swap", ExecutionMode::Execute);
        assert_eq!(live.status, PlanStatus::Confirmed);
        assert_ne!(simulated.id, live.id);
    }

    #[test]
    fn test_failure_serializes() {
        let mut plan = TransactionPlan::new(Chain::Polygon, "sell_basket", ExecutionMode::Execute);
        plan.fail("set_allowance", "receipt status failed");
        assert!(plan.is_failed());

        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["failure"]["step"], "set_allowance");
        assert_eq!(json["chain_id"], 137);
        assert_eq!(json["mode"], "execute");
        assert!(json["steps"].as_array().unwrap().is_empty());
    }
}
