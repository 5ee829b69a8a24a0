//! Skill handler and tool traits.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::types::{AgentRequest, ClassificationResult, HandlerContract, HandlerResult, Intent, ToolOutput};

/// Everything a handler receives for one invocation.
#[derive(Debug, Clone)]
pub struct HandlerInput {
    pub request_id: String,
    pub request: AgentRequest,
    pub classification: ClassificationResult,
    /// Set when this handler stands in for a capability that failed.
    pub degraded_from: Option<Intent>,
}

impl HandlerInput {
    pub fn new(
        request_id: impl Into<String>,
        request: AgentRequest,
        classification: ClassificationResult,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            request,
            classification,
            degraded_from: None,
        }
    }

    pub fn degraded_from(mut self, intent: Intent) -> Self {
        self.degraded_from = Some(intent);
        self
    }

    pub fn question(&self) -> &str {
        self.request.trimmed_question()
    }
}

/// One skill bound to one intent.
#[async_trait]
pub trait SkillHandler: Send + Sync {
    fn contract(&self) -> &HandlerContract;

    async fn handle(&self, input: &HandlerInput) -> Result<HandlerResult>;
}

/// Calls tools hosted by external tool servers.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// Invoke `tool` with JSON arguments, bounded by `timeout`.
    async fn invoke(&self, tool: &str, args: Value, timeout: Duration) -> Result<ToolOutput>;

    /// Whether the startup snapshot lists `tool` as callable.
    fn is_available(&self, tool: &str) -> bool;
}
