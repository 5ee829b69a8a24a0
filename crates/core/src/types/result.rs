use std::path::PathBuf;

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::intent::{ClassificationResult, Intent};
use crate::error::{Error, ErrorKind, Result};

// =============================================================================
// Handler Output
// =============================================================================

/// Body produced by a handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Payload {
    Text(String),
    Binary(#[serde(with = "base64_bytes")] Vec<u8>),
}

mod base64_bytes {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

impl Payload {
    pub fn is_empty(&self) -> bool {
        match self {
            Payload::Text(text) => text.trim().is_empty(),
            Payload::Binary(bytes) => bytes.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            Payload::Binary(_) => None,
        }
    }
}

/// Result of a successful handler invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerResult {
    pub payload: Payload,
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_path: Option<PathBuf>,
    pub generated_at: DateTime<Utc>,
    /// URLs or references the content was built from.
    #[serde(default)]
    pub sources: Vec<String>,
}

impl HandlerResult {
    /// Plain-text answer.
    pub fn text(content: impl Into<String>) -> Self {
        Self::with_content_type(Payload::Text(content.into()), "text/plain")
    }

    /// Markdown answer.
    pub fn markdown(content: impl Into<String>) -> Self {
        Self::with_content_type(Payload::Text(content.into()), "text/markdown")
    }

    pub fn with_content_type(payload: Payload, content_type: impl Into<String>) -> Self {
        Self {
            payload,
            content_type: content_type.into(),
            title: None,
            saved_path: None,
            generated_at: Utc::now(),
            sources: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_saved_path(mut self, path: PathBuf) -> Self {
        self.saved_path = Some(path);
        self
    }

    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = sources;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

// =============================================================================
// Request Lifecycle
// =============================================================================

/// Lifecycle of a request inside the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    Received,
    Classified,
    Dispatched,
    Succeeded,
    Degraded,
    Failed,
}

impl RequestState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestState::Succeeded | RequestState::Degraded | RequestState::Failed
        )
    }

    /// Allowed forward edges; `Failed` is reachable from every live state.
    pub fn can_transition_to(&self, next: RequestState) -> bool {
        use RequestState::*;
        match (self, next) {
            (current, _) if current.is_terminal() => false,
            (_, Failed) => true,
            (Received, Classified) => true,
            (Classified, Dispatched) => true,
            (Dispatched, Succeeded) | (Dispatched, Degraded) => true,
            _ => false,
        }
    }

    /// Move to `next`, rejecting backwards or skipping transitions.
    pub fn advance(&mut self, next: RequestState) -> Result<()> {
        if !self.can_transition_to(next) {
            return Err(Error::internal(format!(
                "illegal state transition {:?} -> {:?}",
                self, next
            )));
        }
        *self = next;
        Ok(())
    }
}

// =============================================================================
// Response Envelope
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeStatus {
    Success,
    Partial,
    Failure,
}

impl EnvelopeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvelopeStatus::Success => "success",
            EnvelopeStatus::Partial => "partial",
            EnvelopeStatus::Failure => "failure",
        }
    }
}

/// What the caller receives for every submitted request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
    pub status: EnvelopeStatus,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<HandlerResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<ClassificationResult>,
    pub state: RequestState,
    /// Handler invocations spent on this request.
    #[serde(default)]
    pub attempts: u32,
}

impl ResponseEnvelope {
    pub fn success(request_id: impl Into<String>, intent: Intent, result: HandlerResult) -> Self {
        Self {
            request_id: request_id.into(),
            intent: Some(intent),
            status: EnvelopeStatus::Success,
            reason: "completed".to_string(),
            result: Some(result),
            error_kind: None,
            classification: None,
            state: RequestState::Succeeded,
            attempts: 0,
        }
    }

    pub fn partial(
        request_id: impl Into<String>,
        intent: Intent,
        result: HandlerResult,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            intent: Some(intent),
            status: EnvelopeStatus::Partial,
            reason: reason.into(),
            result: Some(result),
            error_kind: None,
            classification: None,
            state: RequestState::Degraded,
            attempts: 0,
        }
    }

    pub fn failure(request_id: impl Into<String>, intent: Option<Intent>, error: &Error) -> Self {
        Self {
            request_id: request_id.into(),
            intent,
            status: EnvelopeStatus::Failure,
            reason: error.to_string(),
            result: None,
            error_kind: Some(error.kind()),
            classification: None,
            state: RequestState::Failed,
            attempts: 0,
        }
    }

    pub fn with_classification(mut self, classification: ClassificationResult) -> Self {
        self.classification = Some(classification);
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_error_kind(mut self, kind: ErrorKind) -> Self {
        self.error_kind = Some(kind);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == EnvelopeStatus::Success
    }
}
