//! MCP tool adapter.
//!
//! Routes tool calls to the server that owns the tool according to the
//! startup availability snapshot.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use doc_agent_core::{traits::ToolInvoker, Error, Result, ToolAvailability, ToolOutput};
use doc_agent_governance::track_tool_call;

use crate::session::{McpSession, ToolSession};

/// How to reach a tool server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum McpTransport {
    /// Child process speaking MCP over stdin/stdout.
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: HashMap<String, String>,
    },
    /// Streamable HTTP endpoint.
    Http {
        url: String,
        #[serde(default)]
        headers: HashMap<String, String>,
    },
}

impl McpTransport {
    /// Open an initialized session. Stdio servers are spawned here.
    pub async fn connect(&self, name: &str) -> Result<Arc<dyn ToolSession>> {
        Ok(Arc::new(McpSession::connect(name, self).await?))
    }
}

/// `ToolInvoker` over connected MCP servers.
pub struct McpToolAdapter {
    sessions: HashMap<String, Arc<dyn ToolSession>>,
    availability: Arc<ToolAvailability>,
}

impl McpToolAdapter {
    pub fn new(
        sessions: HashMap<String, Arc<dyn ToolSession>>,
        availability: ToolAvailability,
    ) -> Self {
        Self {
            sessions,
            availability: Arc::new(availability),
        }
    }

    /// Adapter with no servers; every tool is unavailable.
    pub fn empty() -> Self {
        Self::new(HashMap::new(), ToolAvailability::empty())
    }

    /// Snapshot taken at startup.
    pub fn availability(&self) -> Arc<ToolAvailability> {
        self.availability.clone()
    }

    /// Close every session.
    pub async fn shutdown(&self) {
        for (name, session) in &self.sessions {
            tracing::debug!(server = %name, "Closing tool server session");
            session.close().await;
        }
    }
}

#[async_trait]
impl ToolInvoker for McpToolAdapter {
    async fn invoke(&self, tool: &str, args: Value, timeout: Duration) -> Result<ToolOutput> {
        let server = self
            .availability
            .server_for(tool)
            .ok_or_else(|| Error::tool_unavailable(tool))?;
        let session = self
            .sessions
            .get(server)
            .ok_or_else(|| Error::tool_unavailable(format!("{} (server {} not connected)", tool, server)))?;

        tracing::debug!(server = %server, tool = %tool, "Calling tool");
        let started = Instant::now();

        let outcome = match tokio::time::timeout(timeout, session.call_tool(tool, args)).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout(timeout)),
        };

        let elapsed = started.elapsed().as_secs_f64();
        track_tool_call(server, tool, outcome.is_ok(), elapsed);
        if let Err(ref e) = outcome {
            tracing::warn!(server = %server, tool = %tool, error = %e, "Tool call failed");
        }
        outcome
    }

    fn is_available(&self, tool: &str) -> bool {
        self.availability.is_available(tool)
    }
}
