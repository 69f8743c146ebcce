use crate::app::App;
use crate::constants::protocol::MCP_PROTOCOL_VERSION;
use crate::context::RequestContext;
use crate::errors::{ErrorCode, McpError, ToolError};
use crate::mcp::catalog::{tool_catalog, validate_tool_args};
use crate::mcp::middleware::{ensure_correlation_id, error_envelope};
use crate::mcp::protocol::{CallToolRequest, CallToolResult, JsonRpcRequest, JsonRpcResponse};
use crate::services::tool_executor::ToolExecutor;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const RESPONSE_QUEUE: usize = 64;

#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// Line-delimited JSON-RPC over any reader/writer pair. Each `tools/call`
/// runs on its own task; a single writer task owns the output stream.
pub struct McpServer {
    executor: Arc<ToolExecutor>,
    info: ServerInfo,
    in_flight: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

impl McpServer {
    pub fn new(executor: Arc<ToolExecutor>, info: ServerInfo) -> Self {
        Self {
            executor,
            info,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn handle_initialize(&self) -> Value {
        serde_json::json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {"tools": {"listChanged": false}},
            "serverInfo": {"name": self.info.name, "version": self.info.version},
        })
    }

    fn handle_tools_list(&self) -> Value {
        serde_json::json!({ "tools": tool_catalog() })
    }

    /// Cancels the in-flight call named by `params.requestId`, if any.
    async fn handle_cancelled(&self, params: &Value) {
        let Some(request_id) = params.get("requestId") else {
            return;
        };
        if let Some(token) = self.in_flight.lock().await.get(&request_id.to_string()) {
            debug!(request_id = %request_id, "cancelling tool call");
            token.cancel();
        }
    }

    /// Everything except `tools/call`, which needs its own task.
    async fn dispatch(&self, request: &JsonRpcRequest) -> Option<JsonRpcResponse> {
        match request.method.as_str() {
            "notifications/cancelled" => {
                self.handle_cancelled(&request.params).await;
                None
            }
            _ if request.method.starts_with("notifications/") => request
                .id
                .clone()
                .map(|id| JsonRpcResponse::success(id, serde_json::json!({}))),
            "initialize" => request
                .id
                .clone()
                .map(|id| JsonRpcResponse::success(id, self.handle_initialize())),
            "ping" => request
                .id
                .clone()
                .map(|id| JsonRpcResponse::success(id, serde_json::json!({}))),
            "tools/list" => request
                .id
                .clone()
                .map(|id| JsonRpcResponse::success(id, self.handle_tools_list())),
            _ => request.id.clone().map(|id| {
                JsonRpcResponse::failure(
                    id,
                    ErrorCode::MethodNotFound.as_i32(),
                    "Method not found".to_string(),
                )
            }),
        }
    }

    fn parse_call(params: &Value) -> Result<CallToolRequest, McpError> {
        let request: CallToolRequest = serde_json::from_value(params.clone())
            .map_err(|err| McpError::invalid_params(format!("Invalid tool call: {}", err)))?;
        if request.name.trim().is_empty() {
            return Err(McpError::invalid_params("Missing tool name"));
        }
        validate_tool_args(&request.name, request.args())?;
        Ok(request)
    }

    /// Claims `id` for a new call. `None` while another call with the same
    /// id is still running, since its cancellation handle would be lost.
    async fn register(&self, id: &Value) -> Option<CancellationToken> {
        let mut in_flight = self.in_flight.lock().await;
        let key = id.to_string();
        if in_flight.contains_key(&key) {
            return None;
        }
        let cancel = CancellationToken::new();
        in_flight.insert(key, cancel.clone());
        Some(cancel)
    }

    /// Runs one tool call to completion, containing any panic in the handler.
    async fn call_tool(
        &self,
        id: Value,
        request: CallToolRequest,
        cancel: CancellationToken,
    ) -> JsonRpcResponse {
        let key = id.to_string();
        let base = RequestContext::new().with_cancellation(cancel);
        let (ctx, correlation_id) = ensure_correlation_id(&base, &request);
        let tool = request.name.clone();
        let executor = self.executor.clone();
        let outcome = tokio::spawn(async move { executor.execute(&ctx, request).await }).await;

        self.in_flight.lock().await.remove(&key);

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                return JsonRpcResponse::failure(id, err.code.as_i32(), err.message);
            }
            Err(join_error) => {
                let reason = if join_error.is_panic() {
                    "tool handler panicked"
                } else {
                    "tool call was aborted"
                };
                error!(
                    tool = %tool,
                    correlation_id = %correlation_id,
                    error = %join_error,
                    "tool call recovered from fault"
                );
                error_envelope(&format!("internal error: {}", reason), &correlation_id)
            }
        };
        Self::to_response(id, &result)
    }

    fn to_response(id: Value, result: &CallToolResult) -> JsonRpcResponse {
        match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(err) => JsonRpcResponse::failure(
                id,
                ErrorCode::InternalError.as_i32(),
                format!("Failed to encode tool result: {}", err),
            ),
        }
    }

    pub async fn serve<R, W>(self: Arc<Self>, input: R, output: W) -> Result<(), ToolError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<JsonRpcResponse>(RESPONSE_QUEUE);
        let writer_task = tokio::spawn(async move {
            let mut writer = BufWriter::new(output);
            while let Some(response) = rx.recv().await {
                let payload = encode_line(&response.id, &response);
                writer.write_all(payload.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
            Ok::<_, std::io::Error>(())
        });

        let mut lines = BufReader::new(input).lines();
        while let Some(line) = lines.next_line().await? {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let parsed: Value = match serde_json::from_str(trimmed) {
                Ok(value) => value,
                Err(_) => {
                    let response = JsonRpcResponse::failure(
                        Value::Null,
                        ErrorCode::ParseError.as_i32(),
                        "Parse error".to_string(),
                    );
                    if tx.send(response).await.is_err() {
                        break;
                    }
                    continue;
                }
            };

            let request: JsonRpcRequest = match serde_json::from_value(parsed) {
                Ok(req) => req,
                Err(_) => {
                    let response = JsonRpcResponse::failure(
                        Value::Null,
                        ErrorCode::InvalidRequest.as_i32(),
                        "Invalid request".to_string(),
                    );
                    if tx.send(response).await.is_err() {
                        break;
                    }
                    continue;
                }
            };

            if request.method != "tools/call" {
                if let Some(response) = self.dispatch(&request).await {
                    if tx.send(response).await.is_err() {
                        break;
                    }
                }
                continue;
            }

            let Some(id) = request.id.clone() else {
                warn!("tools/call without an id ignored");
                continue;
            };
            let call = match Self::parse_call(&request.params) {
                Ok(call) => call,
                Err(err) => {
                    let response = JsonRpcResponse::failure(id, err.code.as_i32(), err.message);
                    if tx.send(response).await.is_err() {
                        break;
                    }
                    continue;
                }
            };

            // Registered before spawning so a reused id is seen even when the
            // first call has not started yet.
            let Some(cancel) = self.register(&id).await else {
                warn!(id = %id, "tools/call reuses the id of a call still in flight");
                let response = JsonRpcResponse::failure(
                    id,
                    ErrorCode::InvalidRequest.as_i32(),
                    "Request id is already in use by an in-flight call".to_string(),
                );
                if tx.send(response).await.is_err() {
                    break;
                }
                continue;
            };
            let server = self.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let response = server.call_tool(id, call, cancel).await;
                if tx.send(response).await.is_err() {
                    warn!("response dropped: output closed");
                }
            });
        }

        // In-flight calls hold sender clones; the writer drains them before exiting.
        drop(tx);
        match writer_task.await {
            Ok(result) => result.map_err(ToolError::from),
            Err(err) => Err(ToolError::internal(format!("response writer failed: {}", err))),
        }
    }

    pub async fn run_stdio(self: Arc<Self>) -> Result<(), ToolError> {
        info!(name = %self.info.name, version = %self.info.version, "serving MCP over stdio");
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }
}

/// One protocol line. A message that cannot be encoded is replaced by an
/// internal-error response for the same id, so the peer never sees a blank
/// line or a missing reply.
fn encode_line<T: Serialize>(id: &Value, message: &T) -> String {
    match serde_json::to_string(message) {
        Ok(line) => line,
        Err(err) => {
            error!(id = %id, error = %err, "failed to encode response");
            let fallback = JsonRpcResponse::failure(
                id.clone(),
                ErrorCode::InternalError.as_i32(),
                format!("Failed to encode response: {}", err),
            );
            serde_json::to_string(&fallback).unwrap_or_else(|_| {
                r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"Failed to encode response"}}"#
                    .to_string()
            })
        }
    }
}

pub async fn run_stdio() -> Result<(), ToolError> {
    let app = App::initialize().await?;
    let server = Arc::new(McpServer::new(app.tool_executor.clone(), app.server_info()));
    server.run_stdio().await
}
