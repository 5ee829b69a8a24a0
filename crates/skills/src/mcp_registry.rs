//! MCP server registry.
//!
//! Loads server definitions from an `mcpServers` JSON file, connects to every
//! server concurrently at startup and records which tools answered. The
//! resulting availability snapshot is fixed for the rest of the process.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use doc_agent_core::{Error, Result, ServerStatus, ToolAvailability};

use crate::mcp_adapter::{McpToolAdapter, McpTransport};
use crate::session::ToolSession;

/// One entry of the `mcpServers` map.
///
/// Either `command` (stdio) or `url` (HTTP) must be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McpServerConfig {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub description: String,
    /// Tools this server is expected to provide; used when it cannot be listed.
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub disabled: bool,
}

impl McpServerConfig {
    pub fn transport(&self, name: &str) -> Result<McpTransport> {
        match (&self.command, &self.url) {
            (Some(command), None) => Ok(McpTransport::Stdio {
                command: command.clone(),
                args: self.args.clone(),
                env: self.env.clone(),
            }),
            (None, Some(url)) => Ok(McpTransport::Http {
                url: url.clone(),
                headers: self.headers.clone(),
            }),
            (Some(_), Some(_)) => Err(Error::config(format!(
                "MCP server '{}' sets both command and url",
                name
            ))),
            (None, None) => Err(Error::config(format!(
                "MCP server '{}' needs a command or a url",
                name
            ))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct McpServersFile {
    #[serde(rename = "mcpServers", default)]
    servers: BTreeMap<String, McpServerConfig>,
}

/// Information about a registered MCP server.
#[derive(Debug, Clone)]
pub struct McpServerInfo {
    pub name: String,
    pub description: String,
    pub transport: McpTransport,
    pub declared_tools: Vec<String>,
    pub enabled: bool,
}

/// Registry of configured MCP servers.
#[derive(Debug, Clone, Default)]
pub struct McpRegistry {
    servers: Vec<McpServerInfo>,
}

impl McpRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a server.
    pub fn register(&mut self, info: McpServerInfo) {
        tracing::debug!(server = %info.name, "Registered MCP server");
        self.servers.push(info);
    }

    /// Parse an `{"mcpServers": {...}}` document.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: McpServersFile = serde_json::from_str(json)?;
        let mut registry = Self::new();
        for (name, config) in file.servers {
            let transport = config.transport(&name)?;
            registry.register(McpServerInfo {
                name,
                description: config.description,
                transport,
                declared_tools: config.tools,
                enabled: !config.disabled,
            });
        }
        Ok(registry)
    }

    /// Load from a file; a missing file yields an empty registry.
    pub async fn load(path: &Path) -> Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(json) => Self::from_json(&json),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No MCP server file; external tools disabled");
                Ok(Self::new())
            }
            Err(e) => Err(Error::config(format!("cannot read {}: {}", path.display(), e))),
        }
    }

    pub fn servers(&self) -> &[McpServerInfo] {
        &self.servers
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Connect to every server concurrently and build the tool adapter.
    ///
    /// Each server gets `timeout` for `initialize` and `tools/list`; servers
    /// that fail are recorded as unavailable and never retried.
    pub async fn connect_all(&self, timeout: Duration) -> McpToolAdapter {
        let outcomes = join_all(self.servers.iter().map(|info| connect_server(info, timeout))).await;

        let mut availability = ToolAvailability::empty();
        let mut sessions = HashMap::new();
        for (status, session) in outcomes {
            if status.available {
                tracing::info!(server = %status.name, tools = ?status.tools, "MCP server ready");
            } else {
                tracing::warn!(
                    server = %status.name,
                    detail = status.detail.as_deref().unwrap_or_default(),
                    "MCP server unavailable"
                );
            }
            if let Some(session) = session {
                sessions.insert(status.name.clone(), session);
            }
            availability = availability.with_server(status);
        }

        McpToolAdapter::new(sessions, availability)
    }
}

async fn connect_server(
    info: &McpServerInfo,
    timeout: Duration,
) -> (ServerStatus, Option<Arc<dyn ToolSession>>) {
    if !info.enabled {
        return (
            ServerStatus::unavailable(&info.name, info.declared_tools.clone(), "disabled"),
            None,
        );
    }

    let handshake = async {
        let session = info.transport.connect(&info.name).await?;
        let tools = session.list_tools().await?;
        Ok::<_, Error>((session, tools))
    };

    match tokio::time::timeout(timeout, handshake).await {
        Ok(Ok((session, mut names))) => {
            if names.is_empty() {
                names = info.declared_tools.clone();
            }
            (ServerStatus::available(&info.name, names), Some(session))
        }
        Ok(Err(e)) => (
            ServerStatus::unavailable(&info.name, info.declared_tools.clone(), e.to_string()),
            None,
        ),
        Err(_) => (
            ServerStatus::unavailable(
                &info.name,
                info.declared_tools.clone(),
                format!("health check timed out after {} ms", timeout.as_millis()),
            ),
            None,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_servers_file() {
        let registry = McpRegistry::from_json(
            r#"{
                "mcpServers": {
                    "webresearch": {
                        "command": "npx",
                        "args": ["-y", "@mzxrai/mcp-webresearch"],
                        "description": "Web search",
                        "tools": ["web-search"]
                    },
                    "content-summarizer": {"url": "http://localhost:9000/mcp"},
                    "mcp-pandoc": {"command": "uvx", "args": ["mcp-pandoc"], "disabled": true}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(registry.len(), 3);
        let web = registry.servers().iter().find(|s| s.name == "webresearch").unwrap();
        assert_eq!(web.declared_tools, vec!["web-search"]);
        assert!(matches!(web.transport, McpTransport::Stdio { .. }));
        let pandoc = registry.servers().iter().find(|s| s.name == "mcp-pandoc").unwrap();
        assert!(!pandoc.enabled);
    }

    #[test]
    fn test_server_needs_exactly_one_transport() {
        assert!(McpRegistry::from_json(r#"{"mcpServers": {"x": {}}}"#).is_err());
        assert!(McpRegistry::from_json(
            r#"{"mcpServers": {"x": {"command": "a", "url": "http://b"}}}"#
        )
        .is_err());
        assert!(McpRegistry::from_json("{}").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_registry() {
        let registry = McpRegistry::load(Path::new("/nonexistent/mcpserver.json")).await.unwrap();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_failed_servers_are_marked_unavailable() {
        let mut registry = McpRegistry::new();
        registry.register(McpServerInfo {
            name: "ghost".to_string(),
            description: String::new(),
            transport: McpTransport::Stdio {
                command: "/definitely/not/a/binary".to_string(),
                args: Vec::new(),
                env: HashMap::new(),
            },
            declared_tools: vec!["web-search".to_string()],
            enabled: true,
        });

        let adapter = registry.connect_all(Duration::from_secs(2)).await;
        let availability = adapter.availability();
        let status = availability.servers().next().unwrap();

        assert!(!status.available);
        assert_eq!(status.tools, vec!["web-search"]);
        assert!(!availability.is_available("web-search"));
    }
}
