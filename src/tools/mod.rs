//! Tool surface for the agent
//!
//! Every tool is a unit struct implementing [`PadexTool`] on a typed input.
//! The [`ToolRegistry`] erases those types so requests can be dispatched by
//! name with plain JSON arguments.

mod account;
mod chains;
mod market;
mod trade;
mod types;

use crate::context::AppContext;
use crate::error::ErrorInfo;
use crate::{Error, Result};
use async_trait::async_trait;
use schemars::{JsonSchema, SchemaGenerator};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Instant;

pub use account::{GetAccountInfoTool, GetAddressBalancesTool, GetEtfBalanceTool, GetPusdBalanceTool};
pub use chains::{GetChainInfoTool, ListSupportedChainsTool};
pub use market::{GetEtfPriceTool, GetEtfTokensTool, GetPriceTool, QuoteSwapTool};
pub use trade::{AddLiquidityTool, BuyTokenTool, RemoveLiquidityTool, SellTokenTool, SwapTokensTool};
pub use types::{AnyJson, ChainInput, ChainRequest, NoInput};

#[async_trait]
pub trait PadexTool: Send + Sync {
    const NAME: &'static str;

    type Input: DeserializeOwned + JsonSchema + Send;
    type Output: Serialize;

    fn description(&self) -> &'static str;

    async fn execute(&self, ctx: &AppContext, args: Self::Input) -> Result<Self::Output>;
}

/// Object-safe view of a [`PadexTool`]
#[async_trait]
pub trait DynTool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn input_schema(&self) -> Value;
    async fn call(&self, ctx: &AppContext, args: Value) -> Result<Value>;
}

#[async_trait]
impl<T: PadexTool> DynTool for T {
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn description(&self) -> &'static str {
        PadexTool::description(self)
    }

    fn input_schema(&self) -> Value {
        SchemaGenerator::default()
            .into_root_schema_for::<T::Input>()
            .to_value()
    }

    async fn call(&self, ctx: &AppContext, args: Value) -> Result<Value> {
        let input: T::Input = serde_json::from_value(args)
            .map_err(|e| Error::Validation(format!("Invalid arguments for {}: {}", T::NAME, e)))?;
        let output = self.execute(ctx, input).await?;
        Ok(serde_json::to_value(output)?)
    }
}

/// Catalogue entry printed by `padex-agent tools`
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

pub struct ToolRegistry {
    tools: BTreeMap<&'static str, Box<dyn DynTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Registry holding every tool the agent ships with
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(GetAccountInfoTool);
        registry.register(GetAddressBalancesTool);
        registry.register(GetPusdBalanceTool);
        registry.register(GetEtfBalanceTool);
        registry.register(GetChainInfoTool);
        registry.register(ListSupportedChainsTool);
        registry.register(GetEtfTokensTool);
        registry.register(GetEtfPriceTool);
        registry.register(GetPriceTool);
        registry.register(QuoteSwapTool);
        registry.register(BuyTokenTool);
        registry.register(SellTokenTool);
        registry.register(SwapTokensTool);
        registry.register(AddLiquidityTool);
        registry.register(RemoveLiquidityTool);
        registry
    }

    pub fn register<T: PadexTool + 'static>(&mut self, tool: T) {
        self.tools.insert(T::NAME, Box::new(tool));
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.keys().copied().collect()
    }

    pub fn catalogue(&self) -> Vec<ToolInfo> {
        self.tools
            .values()
            .map(|tool| ToolInfo {
                name: tool.name(),
                description: tool.description(),
                input_schema: tool.input_schema(),
            })
            .collect()
    }

    pub async fn dispatch(&self, ctx: &AppContext, name: &str, args: Value) -> Result<Value> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| Error::Validation(format!("Unknown tool '{}'", name)))?;
        tool.call(ctx, args).await
    }

    /// Dispatch with logging, timing and auditing
    pub async fn invoke(&self, ctx: &AppContext, name: &str, args: Value) -> Result<Value> {
        let started = Instant::now();
        let outcome = self.dispatch(ctx, name, args.clone()).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match &outcome {
            Ok(_) => tracing::info!(tool = name, duration_ms, "Tool call completed"),
            Err(e) => tracing::warn!(tool = name, duration_ms, kind = e.kind(), error = %e, "Tool call failed"),
        }

        if let Some(audit) = &ctx.audit {
            let logged = match &outcome {
                Ok(value) => Ok(value.clone()),
                Err(e) => Err(e.to_string()),
            };
            audit.record_tool_call(name, &args, &logged, duration_ms).await;
        }
        outcome
    }

    /// Like [`invoke`](Self::invoke), with a failure rendered as
    /// `{"error": {...}}`
    pub async fn respond(&self, ctx: &AppContext, name: &str, args: Value) -> Value {
        match self.invoke(ctx, name, args).await {
            Ok(value) => value,
            Err(e) => json!({ "error": ErrorInfo::from(&e) }),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditLog;
    use crate::chains::{Chain, ContractRole};
    use crate::context::tests::{descriptor, test_context};
    use crate::rpc::mock::MockChainClient;
    use alloy::primitives::address;
    use std::sync::Arc;

    #[test]
    fn test_catalogue_lists_every_tool() {
        let registry = ToolRegistry::with_defaults();
        let names = registry.names();
        assert_eq!(names.len(), 15);
        for expected in [
            "get_account_info",
            "get_address_balances",
            "get_pusd_balance",
            "get_etf_balance",
            "get_chain_info",
            "list_supported_chains",
            "get_etf_tokens",
            "get_etf_price",
            "get_price",
            "quote_swap",
            "buy_token",
            "sell_token",
            "swap_tokens",
            "add_liquidity",
            "remove_liquidity",
        ] {
            assert!(names.contains(&expected), "missing {}", expected);
        }

        let buy = registry
            .catalogue()
            .into_iter()
            .find(|t| t.name == "buy_token")
            .unwrap();
        let properties = &buy.input_schema["properties"];
        assert!(properties.get("chain_id").is_some());
        assert!(properties.get("output_token").is_some());
        assert!(properties.get("amount").is_some());
    }

    #[tokio::test]
    async fn test_unknown_tool_is_validation_error() {
        let ctx = test_context(vec![], vec![], None);
        let response = ToolRegistry::with_defaults()
            .respond(&ctx, "launch_rocket", json!({}))
            .await;
        assert_eq!(response["error"]["kind"], "validation_error");
        assert_eq!(response["error"]["retryable"], false);
    }

    #[tokio::test]
    async fn test_bad_arguments_are_rejected() {
        let ctx = test_context(vec![], vec![], None);
        let response = ToolRegistry::with_defaults()
            .respond(&ctx, "get_chain_info", json!({ "chain": 1 }))
            .await;
        assert_eq!(response["error"]["kind"], "validation_error");
        assert!(response["error"]["message"]
            .as_str()
            .unwrap()
            .contains("get_chain_info"));
    }

    #[tokio::test]
    async fn test_unsupported_chain_issues_no_calls() {
        let client = Arc::new(MockChainClient::new(Chain::Base));
        let ctx = test_context(vec![descriptor(Chain::Base, &[])], vec![client.clone()], None);

        let response = ToolRegistry::with_defaults()
            .respond(
                &ctx,
                "buy_token",
                json!({
                    "chain_id": "999",
                    "output_token": "0x2222222222222222222222222222222222222222",
                    "input_token": "native",
                    "amount": "1"
                }),
            )
            .await;

        assert_eq!(response["error"]["kind"], "configuration_error");
        assert_eq!(
            response["error"]["message"],
            "Configuration error: Unsupported chain ID '999'"
        );
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_tool_calls_are_audited() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let base = descriptor(
            Chain::Base,
            &[(ContractRole::StableToken, address!("1111111111111111111111111111111111111111"))],
        );
        let mut ctx = test_context(vec![base], vec![Arc::new(MockChainClient::new(Chain::Base))], None);
        ctx.audit = Some(AuditLog::new(file.path()));

        let registry = ToolRegistry::with_defaults();
        registry.respond(&ctx, "list_supported_chains", json!({})).await;
        registry
            .respond(&ctx, "get_chain_info", json!({ "chain_id": "999" }))
            .await;

        let logged: Vec<Value> = std::fs::read_to_string(file.path())
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(logged.len(), 2);
        assert_eq!(logged[0]["tool_name"], "list_supported_chains");
        assert_eq!(logged[0]["status"], "success");
        assert_eq!(logged[1]["status"], "error");
    }
}
