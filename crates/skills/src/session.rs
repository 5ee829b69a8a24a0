//! Client sessions with tool servers.
//!
//! Sessions run the MCP client role from `rmcp`: a child process over stdio,
//! or a streamable HTTP endpoint. The handshake happens in [`McpSession::connect`].

use std::collections::HashMap;
use std::process::Stdio;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use rmcp::model::{CallToolRequestParam, CallToolResult};
use rmcp::service::{Peer, RunningService};
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::{StreamableHttpClientTransport, TokioChildProcess};
use rmcp::{RoleClient, ServiceExt};
use serde_json::Value;
use tokio::process::Command;
use tokio::sync::Mutex;

use doc_agent_core::{Error, Result, ToolOutput};

use crate::mcp_adapter::McpTransport;

/// An initialized connection to one tool server.
#[async_trait]
pub trait ToolSession: Send + Sync {
    /// Names of the tools the server offers.
    async fn list_tools(&self) -> Result<Vec<String>>;

    /// Call one tool with JSON object arguments.
    async fn call_tool(&self, tool: &str, args: Value) -> Result<ToolOutput>;

    /// Release the connection. Stdio servers are stopped.
    async fn close(&self);
}

/// `rmcp` client session.
pub struct McpSession {
    server: String,
    peer: Peer<RoleClient>,
    service: Mutex<Option<RunningService<RoleClient, ()>>>,
}

impl McpSession {
    /// Open the transport and run the `initialize` handshake.
    pub async fn connect(name: &str, transport: &McpTransport) -> Result<Self> {
        let service = match transport {
            McpTransport::Stdio { command, args, env } => {
                let mut cmd = Command::new(command);
                cmd.args(args).envs(env).stderr(Stdio::null());
                let process = TokioChildProcess::new(cmd).map_err(|e| {
                    Error::tool_unavailable(format!("{}: failed to spawn '{}': {}", name, command, e))
                })?;
                tracing::debug!(server = %name, command = %command, "Spawned tool server");
                ().serve(process).await
            }
            McpTransport::Http { url, headers } => {
                let client = http_client(name, headers)?;
                let config = StreamableHttpClientTransportConfig::with_uri(url.as_str());
                ().serve(StreamableHttpClientTransport::with_client(client, config)).await
            }
        }
        .map_err(|e| Error::tool_unavailable(format!("{}: initialize failed: {}", name, e)))?;

        Ok(Self::from_service(name, service))
    }

    /// Wrap an already initialized client.
    pub fn from_service(name: &str, service: RunningService<RoleClient, ()>) -> Self {
        Self {
            server: name.to_string(),
            peer: service.peer().clone(),
            service: Mutex::new(Some(service)),
        }
    }
}

fn http_client(name: &str, headers: &HashMap<String, String>) -> Result<reqwest::Client> {
    let mut default_headers = HeaderMap::new();
    for (key, value) in headers {
        let key = HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| Error::config(format!("{}: bad header name '{}': {}", name, key, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::config(format!("{}: bad value for header '{}': {}", name, key, e)))?;
        default_headers.insert(key, value);
    }
    reqwest::Client::builder()
        .default_headers(default_headers)
        .build()
        .map_err(|e| Error::config(format!("{}: cannot build HTTP client: {}", name, e)))
}

#[async_trait]
impl ToolSession for McpSession {
    async fn list_tools(&self) -> Result<Vec<String>> {
        let tools = self
            .peer
            .list_all_tools()
            .await
            .map_err(|e| Error::tool(format!("{}: tools/list failed: {}", self.server, e)))?;
        Ok(tools.into_iter().map(|t| t.name.to_string()).collect())
    }

    async fn call_tool(&self, tool: &str, args: Value) -> Result<ToolOutput> {
        let request = CallToolRequestParam {
            name: tool.to_string().into(),
            arguments: args.as_object().cloned(),
        };
        let result = self
            .peer
            .call_tool(request)
            .await
            .map_err(|e| Error::tool(format!("{}: {}", self.server, e)))?;
        into_output(result)
    }

    async fn close(&self) {
        if let Some(service) = self.service.lock().await.take() {
            if let Err(e) = service.cancel().await {
                tracing::debug!(server = %self.server, error = %e, "Tool server session did not stop cleanly");
            }
        }
    }
}

/// Convert a `tools/call` result.
///
/// Text blocks are joined with newlines. Structured content, or text that
/// parses as a JSON object or array, is exposed as `data`. `is_error` turns
/// into a tool error.
pub fn into_output(result: CallToolResult) -> Result<ToolOutput> {
    let text = result
        .content
        .iter()
        .filter_map(|c| c.as_text().map(|t| t.text.as_str()))
        .collect::<Vec<_>>()
        .join("\n");

    if result.is_error.unwrap_or(false) {
        let message = if text.is_empty() { "tool reported an error".to_string() } else { text };
        return Err(Error::tool(message));
    }

    let data = result
        .structured_content
        .filter(|v| !v.is_null())
        .or_else(|| serde_json::from_str::<Value>(text.trim()).ok().filter(|v| v.is_object() || v.is_array()));

    let mut output = ToolOutput::text(text);
    output.data = data;
    Ok(output)
}
