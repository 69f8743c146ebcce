#![allow(dead_code)]

use atlasgate::config::GatewayConfig;
use atlasgate::mcp::server::{McpServer, ServerInfo};
use atlasgate::services::tool_executor::ToolExecutor;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{
    AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf,
};
use tokio::task::JoinHandle;

pub const ACCOUNTS_JSON: &str = r#"{
  "accounts": [
    {
      "name": "work",
      "default": true,
      "bitbucket": {"token": "bb-default-token", "workspace": "acme"},
      "jira": {"token": "jira-default-token", "domain": "acme"}
    },
    {
      "name": "personal",
      "bitbucket": {"token": "bb-personal-token", "workspace": "me"}
    }
  ]
}"#;

pub fn write_accounts(dir: &Path, raw: &str) -> PathBuf {
    let path = dir.join("accounts.json");
    std::fs::write(&path, raw).expect("write accounts file");
    path
}

/// Config pointing both products at a mock server. The Jira base keeps the
/// domain as a path segment so mocks can match on it.
pub fn config_for(server_uri: &str, accounts_file: PathBuf) -> GatewayConfig {
    GatewayConfig {
        accounts_file,
        bitbucket_base_url: format!("{}/2.0", server_uri),
        jira_base_url: format!("{}/{{domain}}/rest/api/3", server_uri),
        http_timeout: Duration::from_secs(5),
        server_name: "atlasgate".to_string(),
        server_version: "test".to_string(),
    }
}

/// A client end of an in-process stdio session.
pub struct Session {
    writer: WriteHalf<DuplexStream>,
    lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    server: JoinHandle<()>,
}

impl Session {
    pub fn start(executor: Arc<ToolExecutor>) -> Self {
        let (client, server_side) = tokio::io::duplex(256 * 1024);
        let (server_read, server_write) = tokio::io::split(server_side);
        let server = Arc::new(McpServer::new(
            executor,
            ServerInfo {
                name: "atlasgate".to_string(),
                version: "test".to_string(),
            },
        ));
        let handle = tokio::spawn(async move {
            server
                .serve(server_read, server_write)
                .await
                .expect("server loop");
        });
        let (read, writer) = tokio::io::split(client);
        Self {
            writer,
            lines: BufReader::new(read).lines(),
            server: handle,
        }
    }

    pub async fn send(&mut self, message: Value) {
        let mut line = serde_json::to_string(&message).expect("encode request");
        line.push('\n');
        self.writer
            .write_all(line.as_bytes())
            .await
            .expect("write request");
    }

    pub async fn recv(&mut self) -> Value {
        let line = tokio::time::timeout(Duration::from_secs(10), self.lines.next_line())
            .await
            .expect("response within timeout")
            .expect("read response")
            .expect("server closed the stream");
        serde_json::from_str(&line).expect("response is JSON")
    }

    pub async fn call(&mut self, message: Value) -> Value {
        self.send(message).await;
        self.recv().await
    }

    /// Closes input, waits for the server loop to drain and exit, and
    /// returns any responses not yet read.
    pub async fn finish(mut self) -> Vec<Value> {
        self.writer.shutdown().await.expect("close input");
        let mut rest = Vec::new();
        while let Ok(Some(line)) = self.lines.next_line().await {
            rest.push(serde_json::from_str(&line).expect("response is JSON"));
        }
        self.server.await.expect("server task");
        rest
    }
}

pub fn tool_call(id: u64, name: &str, arguments: Value) -> Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments},
    })
}

pub fn result_text(response: &Value) -> String {
    response["result"]["content"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["text"].as_str())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}

pub fn is_error(response: &Value) -> bool {
    response["result"]["isError"].as_bool().unwrap_or(false)
}
