//! Skill handlers, one per intent.

pub mod document;
pub mod general;
pub mod knowledge;
pub mod url_summary;
pub mod web_search;

pub use document::DocumentHandler;
pub use general::GeneralQaHandler;
pub use knowledge::KnowledgeHandler;
pub use url_summary::UrlSummaryHandler;
pub use web_search::WebSearchHandler;

use std::collections::BTreeMap;

use doc_agent_core::types::AgentRequest;

/// Request context flattened to strings for prompt rendering.
pub(crate) fn context_entries(request: &AgentRequest) -> BTreeMap<String, String> {
    request
        .context
        .iter()
        .map(|(key, value)| {
            let rendered = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), rendered)
        })
        .collect()
}

/// Time left before `deadline`; zero once it has passed.
pub(crate) fn remaining(deadline: tokio::time::Instant) -> std::time::Duration {
    deadline.saturating_duration_since(tokio::time::Instant::now())
}
