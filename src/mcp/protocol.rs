use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::protocol::{CORRELATION_META_KEY, JSONRPC_VERSION};

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, code: i32, message: String) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(JsonRpcError { code, message }),
        }
    }
}

static EMPTY_ARGS: Lazy<Value> = Lazy::new(|| Value::Object(Map::new()));

/// `tools/call` parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallToolRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
    #[serde(default, rename = "_meta")]
    pub meta: Option<Map<String, Value>>,
}

impl CallToolRequest {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
            meta: None,
        }
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.meta
            .get_or_insert_with(Map::new)
            .insert(CORRELATION_META_KEY.to_string(), Value::String(id.into()));
        self
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.meta
            .as_ref()
            .and_then(|meta| meta.get(CORRELATION_META_KEY))
            .and_then(|v| v.as_str())
            .filter(|id| !id.trim().is_empty())
    }

    /// Arguments as an object; anything else is treated as no arguments.
    pub fn args(&self) -> &Value {
        if self.arguments.is_object() {
            &self.arguments
        } else {
            &EMPTY_ARGS
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text { text: String },
}

/// `tools/call` result. Business failures travel here with `is_error` set,
/// never as a JSON-RPC error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallToolResult {
    pub content: Vec<Content>,
    #[serde(rename = "isError", default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl CallToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self::texts([text.into()])
    }

    pub fn texts(texts: impl IntoIterator<Item = String>) -> Self {
        Self {
            content: texts.into_iter().map(|text| Content::Text { text }).collect(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
            is_error: true,
        }
    }

    /// All text blocks joined with newlines.
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .map(|content| match content {
                Content::Text { text } => text.as_str(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_rpc_request_allows_missing_id_for_notifications() {
        let raw = r#"{"jsonrpc":"2.0","method":"notifications/initialized","params":{}}"#;
        let parsed: JsonRpcRequest = serde_json::from_str(raw).expect("must parse");
        assert!(parsed.id.is_none());
        assert_eq!(parsed.method, "notifications/initialized");
    }

    #[test]
    fn call_tool_request_reads_correlation_id_from_meta() {
        let raw = r#"{"name":"bitbucket_read_pr","arguments":{"pr_id":1},"_meta":{"correlationId":"abc"}}"#;
        let parsed: CallToolRequest = serde_json::from_str(raw).expect("must parse");
        assert_eq!(parsed.correlation_id(), Some("abc"));
        assert_eq!(parsed.args()["pr_id"], 1);
    }

    #[test]
    fn non_object_arguments_read_as_empty() {
        let request = CallToolRequest::new("jira_get_ticket", Value::Null);
        assert!(request.args().as_object().expect("object").is_empty());
    }

    #[test]
    fn error_result_serializes_is_error_flag() {
        let value = serde_json::to_value(CallToolResult::error("boom")).expect("serialize");
        assert_eq!(value["isError"], true);
        assert_eq!(value["content"][0]["type"], "text");
        assert_eq!(value["content"][0]["text"], "boom");

        let ok = serde_json::to_value(CallToolResult::text("fine")).expect("serialize");
        assert!(ok.get("isError").is_none());
    }
}
