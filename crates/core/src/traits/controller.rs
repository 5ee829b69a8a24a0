//! Controller trait.

use async_trait::async_trait;

use crate::types::{AgentRequest, ResponseEnvelope};

/// Entry point that turns a request into a response envelope.
///
/// Never fails: every error is folded into a failure envelope.
#[async_trait]
pub trait Controller: Send + Sync {
    async fn submit(&self, request: AgentRequest) -> ResponseEnvelope;
}
