//! Shared tool input shapes and schema helpers.

use schemars::{JsonSchema, Schema, SchemaGenerator};
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn schema_any(_: &mut SchemaGenerator) -> Schema {
    true.into()
}

/// Wrapper for arbitrary JSON payloads when a tool output is dynamic.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[schemars(schema_with = "schema_any")]
pub struct AnyJson(pub Value);

impl From<Value> for AnyJson {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Input for tools that take no arguments
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct NoInput {}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ChainInput {
    /// Chain ID as a decimal string (e.g. "8453") or a chain name (e.g. "base")
    pub chain_id: String,
}

/// A chain-scoped request: `chain_id` next to the request's own fields
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ChainRequest<R> {
    /// Chain ID as a decimal string (e.g. "8453") or a chain name (e.g. "base")
    pub chain_id: String,
    #[serde(flatten)]
    pub request: R,
}
