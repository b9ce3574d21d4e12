//! Line-delimited JSON tool server
//!
//! Reads one request per line, `{"id": .., "tool": "..", "arguments": {..}}`,
//! and writes one response per line: `{"id": .., "result": ..}` or
//! `{"id": .., "error": {"kind", "message", "retryable"}}`.
//!
//! Requests are handled strictly in order. Trades share one signing key and
//! its nonce sequence, so they must never interleave.

use crate::context::AppContext;
use crate::error::ErrorInfo;
use crate::tools::ToolRegistry;
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

#[derive(Debug, Deserialize)]
struct ToolRequest {
    #[serde(default)]
    id: Value,
    tool: String,
    #[serde(default = "empty_arguments")]
    arguments: Value,
}

fn empty_arguments() -> Value {
    json!({})
}

pub struct ToolServer {
    ctx: Arc<AppContext>,
    registry: ToolRegistry,
}

impl ToolServer {
    pub fn new(ctx: Arc<AppContext>, registry: ToolRegistry) -> Self {
        Self { ctx, registry }
    }

    /// Serve stdin/stdout until stdin closes
    pub async fn serve_stdio(&self) -> Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve(stdin, stdout).await
    }

    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tracing::info!(tools = self.registry.names().len(), "Tool server listening on stdio");
        let mut lines = reader.lines();
        let mut handled = 0u64;

        while let Some(line) = lines.next_line().await? {
            let Some(response) = self.handle_line(&line).await else {
                continue;
            };
            let mut encoded = serde_json::to_string(&response)?;
            encoded.push('\n');
            writer.write_all(encoded.as_bytes()).await?;
            writer.flush().await?;
            handled += 1;
        }

        tracing::info!(handled, "Input closed, tool server stopping");
        Ok(())
    }

    /// Response for one input line; blank lines get none
    pub async fn handle_line(&self, line: &str) -> Option<Value> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let request: ToolRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed request line");
                let err = Error::Validation(format!("Malformed request: {}", e));
                return Some(json!({ "id": Value::Null, "error": ErrorInfo::from(&err) }));
            }
        };

        tracing::debug!(id = %request.id, tool = %request.tool, "Handling request");
        let response = match self
            .registry
            .invoke(&self.ctx, &request.tool, request.arguments)
            .await
        {
            Ok(result) => json!({ "id": request.id, "result": result }),
            Err(e) => json!({ "id": request.id, "error": ErrorInfo::from(&e) }),
        };
        Some(response)
    }
}
