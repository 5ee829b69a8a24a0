//! Error types for the document agent.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using the agent's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the document agent.
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Gateway Errors
    // =========================================================================
    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Classification failed: {0}")]
    Classification(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    // =========================================================================
    // Controller Errors
    // =========================================================================
    #[error("No handler registered for intent: {0}")]
    HandlerNotFound(String),

    #[error("Operation timed out after {0} ms")]
    Timeout(u64),

    // =========================================================================
    // Model Errors
    // =========================================================================
    #[error("Upstream model error: {0}")]
    Upstream(String),

    // =========================================================================
    // Skills Errors
    // =========================================================================
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool unavailable: {0}")]
    ToolUnavailable(String),

    #[error("Tool execution failed: {0}")]
    Tool(String),

    // =========================================================================
    // Store Errors
    // =========================================================================
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Knowledge lookup failed: {0}")]
    Knowledge(String),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Template error: {0}")]
    Template(String),

    // =========================================================================
    // Generic Errors
    // =========================================================================
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Error taxonomy exposed to callers in response envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Classification,
    Validation,
    Upstream,
    Tool,
    Timeout,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Classification => "classification",
            ErrorKind::Validation => "validation",
            ErrorKind::Upstream => "upstream",
            ErrorKind::Tool => "tool",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Create a gateway error.
    pub fn gateway(msg: impl Into<String>) -> Self {
        Self::Gateway(msg.into())
    }

    /// Create a classification error.
    pub fn classification(msg: impl Into<String>) -> Self {
        Self::Classification(msg.into())
    }

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an upstream (model provider) error.
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    /// Create a tool execution error.
    pub fn tool(msg: impl Into<String>) -> Self {
        Self::Tool(msg.into())
    }

    /// Create a tool unavailable error.
    pub fn tool_unavailable(name: impl Into<String>) -> Self {
        Self::ToolUnavailable(name.into())
    }

    /// Create a tool not found error.
    pub fn tool_not_found(name: impl Into<String>) -> Self {
        Self::ToolNotFound(name.into())
    }

    /// Create a timeout error from a duration.
    pub fn timeout(after: std::time::Duration) -> Self {
        Self::Timeout(after.as_millis() as u64)
    }

    /// Create a storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a knowledge lookup error.
    pub fn knowledge(msg: impl Into<String>) -> Self {
        Self::Knowledge(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Map this error onto the caller-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Classification(_) => ErrorKind::Classification,
            Error::Validation(_) | Error::Gateway(_) => ErrorKind::Validation,
            Error::Upstream(_) => ErrorKind::Upstream,
            Error::Tool(_)
            | Error::ToolUnavailable(_)
            | Error::ToolNotFound(_)
            | Error::Knowledge(_) => ErrorKind::Tool,
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::HandlerNotFound(_)
            | Error::Storage(_)
            | Error::Config(_)
            | Error::Template(_)
            | Error::Serialization(_)
            | Error::Internal(_)
            | Error::Other(_) => ErrorKind::Internal,
        }
    }

    /// Whether a retry may succeed where the first attempt failed.
    ///
    /// A tool that is unknown to every server never becomes available during
    /// the process lifetime, so `ToolNotFound` is not transient.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Upstream(_)
                | Error::Tool(_)
                | Error::ToolUnavailable(_)
                | Error::Knowledge(_)
                | Error::Timeout(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(Error::upstream("503").is_transient());
        assert!(Error::tool("server crashed").is_transient());
        assert!(Error::timeout(std::time::Duration::from_secs(3)).is_transient());
        assert!(!Error::validation("bad field").is_transient());
        assert!(!Error::storage("disk full").is_transient());
        assert!(!Error::classification("empty").is_transient());
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(Error::knowledge("down").kind(), ErrorKind::Tool);
        assert_eq!(Error::Timeout(10).kind(), ErrorKind::Timeout);
        assert_eq!(Error::storage("x").kind(), ErrorKind::Internal);
        assert_eq!(
            serde_json::to_string(&ErrorKind::Classification).unwrap(),
            "\"classification\""
        );
    }

    #[test]
    fn test_timeout_message() {
        let err = Error::timeout(std::time::Duration::from_millis(1500));
        assert_eq!(err.to_string(), "Operation timed out after 1500 ms");
    }
}
