//! External tools for the document agent.
//!
//! This crate provides:
//! - MCP client sessions (stdio child processes and streamable HTTP) on `rmcp`
//! - The MCP registry that connects servers at startup
//! - `McpToolAdapter`, the `ToolInvoker` used by skill handlers

pub mod mcp_adapter;
pub mod mcp_registry;
pub mod session;

pub use mcp_adapter::{McpToolAdapter, McpTransport};
pub use mcp_registry::{McpRegistry, McpServerConfig, McpServerInfo};
pub use session::{McpSession, ToolSession};
