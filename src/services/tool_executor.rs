use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::context::RequestContext;
use crate::errors::{McpError, ToolError};
use crate::mcp::middleware::ToolInvocationMiddleware;
use crate::mcp::protocol::{CallToolRequest, CallToolResult};
use crate::utils::suggest::suggest;

/// One tool, or a manager dispatching several tools on `request.name`.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn handle(
        &self,
        ctx: &RequestContext,
        request: CallToolRequest,
    ) -> Result<CallToolResult, ToolError>;
}

/// Routes tool calls to their handlers. Every registered handler sits
/// behind [`ToolInvocationMiddleware`], so `execute` only fails for protocol
/// faults such as an unknown tool name.
#[derive(Clone, Default)]
pub struct ToolExecutor {
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
}

impl ToolExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tools: &[&str], handler: Arc<dyn ToolHandler>) -> &mut Self {
        let wrapped = ToolInvocationMiddleware::wrap(handler);
        for tool in tools {
            self.handlers.insert((*tool).to_string(), wrapped.clone());
        }
        self
    }

    pub fn handler(&self, tool: &str) -> Option<Arc<dyn ToolHandler>> {
        self.handlers.get(tool).cloned()
    }

    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Fails when a listed tool has no handler.
    pub fn validate_wiring<'a>(
        &self,
        tools: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), ToolError> {
        let mut missing: Vec<String> = tools
            .into_iter()
            .filter(|tool| !self.handlers.contains_key(*tool))
            .map(|tool| tool.to_string())
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        missing.sort();
        Err(ToolError::internal("Tool wiring is incomplete")
            .with_hint("Every tool in tool_catalog.json must have a registered handler.")
            .with_details(serde_json::json!({ "missing_tools": missing })))
    }

    pub async fn execute(
        &self,
        ctx: &RequestContext,
        request: CallToolRequest,
    ) -> Result<CallToolResult, McpError> {
        let Some(handler) = self.handlers.get(&request.name) else {
            let suggestions = suggest(&request.name, &self.tool_names(), 3);
            let message = if suggestions.is_empty() {
                format!("Unknown tool: {}", request.name)
            } else {
                format!(
                    "Unknown tool: {}. Did you mean: {}?",
                    request.name,
                    suggestions.join(", ")
                )
            };
            return Err(McpError::invalid_params(message));
        };
        let tool = request.name.clone();
        handler.handle(ctx, request).await.map_err(|err| {
            warn!(tool = %tool, error = %err, "handler error escaped the invocation middleware");
            McpError::internal(err.message)
        })
    }
}
