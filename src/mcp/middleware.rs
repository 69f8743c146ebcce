//! Tool invocation boundary: correlation ids, entry/exit logging and the
//! translation of handler failures into error envelopes.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::constants::limits::LOG_ARGUMENT_STRING;
use crate::context::RequestContext;
use crate::errors::ToolError;
use crate::mcp::protocol::{CallToolRequest, CallToolResult};
use crate::services::tool_executor::ToolHandler;
use crate::utils::redact::redact_object;

/// Returns a context that carries a correlation id, and the id itself.
/// Precedence: the context's own id, then `_meta.correlationId` on the
/// request, then a fresh UUID v4.
pub fn ensure_correlation_id(
    ctx: &RequestContext,
    request: &CallToolRequest,
) -> (RequestContext, String) {
    if let Some(id) = ctx.correlation_id().filter(|id| !id.is_empty()) {
        return (ctx.clone(), id.to_string());
    }
    let id = request
        .correlation_id()
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    (ctx.with_correlation_id(id.clone()), id)
}

/// The envelope a caller sees for any failed invocation.
pub fn error_envelope(message: &str, correlation_id: &str) -> CallToolResult {
    CallToolResult::error(format!(
        "Error details: {}; CorrelationID: {}",
        message, correlation_id
    ))
}

pub struct ToolInvocationMiddleware;

impl ToolInvocationMiddleware {
    pub fn wrap(handler: Arc<dyn ToolHandler>) -> Arc<dyn ToolHandler> {
        Arc::new(WrappedHandler { inner: handler })
    }
}

pub struct WrappedHandler {
    inner: Arc<dyn ToolHandler>,
}

impl WrappedHandler {
    fn failure(err: &ToolError, correlation_id: &str) -> CallToolResult {
        let mut result = error_envelope(&err.message, correlation_id);
        if let Some(hint) = &err.hint {
            result = CallToolResult {
                content: result
                    .content
                    .into_iter()
                    .chain(CallToolResult::text(format!("Hint: {}", hint)).content)
                    .collect(),
                is_error: true,
            };
        }
        result
    }
}

#[async_trait]
impl ToolHandler for WrappedHandler {
    async fn handle(
        &self,
        ctx: &RequestContext,
        request: CallToolRequest,
    ) -> Result<CallToolResult, ToolError> {
        let (ctx, correlation_id) = ensure_correlation_id(ctx, &request);
        let tool = request.name.clone();
        let arguments = redact_object(request.args(), LOG_ARGUMENT_STRING);
        info!(
            tool = %tool,
            correlation_id = %correlation_id,
            arguments = %arguments,
            "processing tool call"
        );

        match self.inner.handle(&ctx, request).await {
            Ok(result) => {
                info!(tool = %tool, correlation_id = %correlation_id, "tool call processed");
                Ok(result)
            }
            Err(err) => {
                error!(
                    tool = %tool,
                    correlation_id = %correlation_id,
                    kind = ?err.kind,
                    code = %err.code,
                    error = %err,
                    "tool call failed"
                );
                Ok(Self::failure(&err, &correlation_id))
            }
        }
    }
}
