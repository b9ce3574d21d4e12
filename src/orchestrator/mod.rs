//! Transaction orchestration
//!
//! Turns a validated order into an ordered, confirmed sequence of chain
//! writes: allowance reset (when the token requires zero-before-set), allowance
//! set, then the operation itself. Each step is priced, signed, submitted and
//! confirmed before the next one starts. The first failure stops the plan.

mod calls;
mod plan;

pub use calls::{encode_connector_path, SwapKind, TradeCall};
pub use plan::{BuiltCall, PlanStatus, StepFailure, StepKind, StepStatus, TransactionPlan, TransactionStep};

use crate::chains::ChainDescriptor;
use crate::config::{ApprovalPolicy, ExecutionMode};
use crate::rpc::{self, abi::IPusdConnector, ChainClient};
use crate::wallet::SecureWallet;
use crate::Result;
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, U256};
use alloy::rpc::types::TransactionRequest;
use std::time::Duration;

/// Gas estimate plus a third, rounded down
pub fn buffered_gas(estimate: u64) -> u64 {
    estimate.saturating_add(estimate / 3)
}

/// An allowance the operation needs before it can run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowanceRequirement {
    pub token: Address,
    pub spender: Address,
    pub amount: U256,
}

/// A main call plus the approvals it depends on
#[derive(Debug, Clone)]
pub struct TradeOrder {
    pub call: TradeCall,
    pub allowances: Vec<AllowanceRequirement>,
}

impl TradeOrder {
    pub fn new(call: TradeCall) -> Self {
        Self {
            call,
            allowances: Vec::new(),
        }
    }

    pub fn requiring(mut self, requirement: AllowanceRequirement) -> Self {
        self.allowances.push(requirement);
        self
    }
}

/// Approval steps needed to move `current` up to at least `required`.
///
/// Empty when the allowance already suffices. A non-zero allowance is reset
/// to zero first.
pub fn allowance_actions(current: U256, required: U256, policy: ApprovalPolicy) -> Vec<(StepKind, U256)> {
    if current >= required {
        return Vec::new();
    }
    let grant = match policy {
        ApprovalPolicy::Exact => required,
        ApprovalPolicy::Unlimited => U256::MAX,
    };
    if current.is_zero() {
        vec![(StepKind::SetAllowance, grant)]
    } else {
        vec![(StepKind::ResetAllowance, U256::ZERO), (StepKind::SetAllowance, grant)]
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OrchestratorSettings {
    pub approval: ApprovalPolicy,
    pub receipt_timeout: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            approval: ApprovalPolicy::Exact,
            receipt_timeout: Duration::from_secs(300),
        }
    }
}

pub struct TransactionOrchestrator<'a> {
    client: &'a dyn ChainClient,
    descriptor: &'a ChainDescriptor,
    wallet: &'a SecureWallet,
    settings: OrchestratorSettings,
}

impl<'a> TransactionOrchestrator<'a> {
    pub fn new(
        client: &'a dyn ChainClient,
        descriptor: &'a ChainDescriptor,
        wallet: &'a SecureWallet,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            client,
            descriptor,
            wallet,
            settings,
        }
    }

    /// Approval calls still needed for `requirement`, read from chain
    pub async fn allowance_calls(&self, requirement: &AllowanceRequirement) -> Result<Vec<(StepKind, TradeCall)>> {
        let current = self
            .client
            .allowance(requirement.token, self.wallet.address(), requirement.spender)
            .await?;
        let actions = allowance_actions(current, requirement.amount, self.settings.approval);
        tracing::debug!(
            token = %requirement.token,
            spender = %requirement.spender,
            current = %current,
            required = %requirement.amount,
            steps = actions.len(),
            "Checked allowance"
        );
        Ok(actions
            .into_iter()
            .map(|(kind, amount)| {
                (
                    kind,
                    TradeCall::Approve {
                        token: requirement.token,
                        spender: requirement.spender,
                        amount,
                    },
                )
            })
            .collect())
    }

    /// Run the order. Never returns early without a plan: failures are
    /// recorded on the plan itself.
    pub async fn run(&self, order: TradeOrder, mode: ExecutionMode) -> TransactionPlan {
        let mut plan = TransactionPlan::new(self.descriptor.chain, order.call.operation(), mode);
        tracing::info!(
            plan_id = %plan.id,
            chain = %self.descriptor.chain,
            operation = plan.operation,
            ?mode,
            "Starting transaction plan"
        );

        for requirement in &order.allowances {
            let calls = match self.allowance_calls(requirement).await {
                Ok(calls) => calls,
                Err(e) => {
                    plan.fail("allowance_check", e.to_string());
                    return plan;
                }
            };
            for (kind, call) in calls {
                if !self.run_step(&mut plan, kind, &call, mode).await {
                    return plan;
                }
            }
        }

        self.run_step(&mut plan, StepKind::Execute, &order.call, mode).await;
        tracing::info!(plan_id = %plan.id, status = ?plan.status, steps = plan.steps.len(), "Transaction plan finished");
        plan
    }

    /// Build one step and, when executing, carry it through confirmation.
    /// Returns whether the plan may continue.
    async fn run_step(&self, plan: &mut TransactionPlan, kind: StepKind, call: &TradeCall, mode: ExecutionMode) -> bool {
        let step_name = kind.label();
        let owner = self.wallet.address();

        let nonce = match self.client.transaction_count(owner).await {
            // nothing is submitted while simulating, so later steps offset by hand
            Ok(n) if mode == ExecutionMode::Simulate => n + plan.steps.len() as u64,
            Ok(n) => n,
            Err(e) => {
                plan.fail(step_name, format!("nonce read failed: {}", e));
                return false;
            }
        };

        let value = call.value().saturating_add(self.connector_fee(plan, call).await);
        let gas_price = match self.client.gas_price().await {
            Ok(price) => price,
            Err(e) => {
                let hint = u128::from(self.descriptor.gas_price_hint_gwei) * 1_000_000_000;
                plan.warn(format!(
                    "{}: gas price unavailable ({}), using {} gwei",
                    step_name, e, self.descriptor.gas_price_hint_gwei
                ));
                hint
            }
        };

        let tx = TransactionRequest::default()
            .with_from(owner)
            .with_to(call.target())
            .with_input(call.calldata())
            .with_value(value)
            .with_nonce(nonce)
            .with_chain_id(self.descriptor.chain_id)
            .with_gas_price(gas_price);

        let gas_limit = match self.client.estimate_gas(&tx).await {
            Ok(estimate) => buffered_gas(estimate),
            Err(e) => {
                let fallback = call.fallback_gas();
                plan.warn(format!(
                    "{}: gas estimation failed ({}), using fallback limit {}",
                    step_name, e, fallback
                ));
                fallback
            }
        };
        let tx = tx.with_gas_limit(gas_limit);

        let mut step = TransactionStep {
            kind,
            call: BuiltCall {
                operation: call.operation(),
                to: call.target(),
                data: call.calldata(),
                value,
                nonce,
                gas_limit,
                gas_price,
            },
            signed_payload: None,
            tx_hash: None,
            explorer_url: None,
            receipt: None,
            status: StepStatus::Simulated,
        };

        if mode == ExecutionMode::Simulate {
            plan.steps.push(step);
            return true;
        }

        step.status = StepStatus::Pending;
        let raw = match self.wallet.sign_transaction(tx).await {
            Ok(raw) => raw,
            Err(e) => return Self::abort(plan, step, e.to_string()),
        };
        step.signed_payload = Some(raw.clone());

        let tx_hash = match self.client.send_raw_transaction(raw).await {
            Ok(hash) => hash,
            Err(e) => return Self::abort(plan, step, format!("submission failed: {}", e)),
        };
        step.tx_hash = Some(tx_hash);
        step.explorer_url = Some(self.descriptor.explorer_tx_url(&tx_hash.to_string()));
        tracing::info!(plan_id = %plan.id, step = step_name, tx_hash = %tx_hash, nonce, "Transaction submitted");

        let receipt = match self
            .client
            .wait_for_receipt(tx_hash, self.settings.receipt_timeout)
            .await
        {
            Ok(receipt) => receipt,
            Err(e) => return Self::abort(plan, step, format!("confirmation failed: {}", e)),
        };
        let success = receipt.success;
        step.receipt = Some(receipt);
        if !success {
            return Self::abort(plan, step, "transaction reverted on chain".to_string());
        }

        step.status = StepStatus::Success;
        tracing::info!(plan_id = %plan.id, step = step_name, tx_hash = %tx_hash, "Transaction confirmed");
        plan.steps.push(step);
        true
    }

    fn abort(plan: &mut TransactionPlan, mut step: TransactionStep, reason: String) -> bool {
        step.status = StepStatus::Failed;
        plan.fail(step.kind.label(), reason);
        plan.steps.push(step);
        false
    }

    /// Native fee charged by connector contracts; zero with a warning when
    /// it cannot be read
    async fn connector_fee(&self, plan: &mut TransactionPlan, call: &TradeCall) -> U256 {
        let Some((connector, data)) = call.gas_fee_query() else {
            return U256::ZERO;
        };
        let read = async {
            let out = self.client.call(connector, data).await?;
            rpc::decode::<IPusdConnector::gas_feeCall>(&out)
        };
        match read.await {
            Ok(fee) => fee,
            Err(e) => {
                plan.warn(format!("could not read connector gas fee ({}), assuming zero", e));
                U256::ZERO
            }
        }
    }
}
