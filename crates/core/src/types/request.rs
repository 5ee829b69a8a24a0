use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// =============================================================================
// Request Types
// =============================================================================

/// Output format a caller may ask for when generating documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Html,
    #[serde(alias = "md")]
    Markdown,
    #[serde(alias = "txt", alias = "plain")]
    Text,
}

impl DocumentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Html => "html",
            DocumentFormat::Markdown => "markdown",
            DocumentFormat::Text => "text",
        }
    }

    /// File extension used when the document is saved.
    pub fn extension(&self) -> &'static str {
        match self {
            DocumentFormat::Html => "html",
            DocumentFormat::Markdown => "md",
            DocumentFormat::Text => "txt",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            DocumentFormat::Html => "text/html",
            DocumentFormat::Markdown => "text/markdown",
            DocumentFormat::Text => "text/plain",
        }
    }
}

impl FromStr for DocumentFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "html" | "htm" => Ok(DocumentFormat::Html),
            "markdown" | "md" => Ok(DocumentFormat::Markdown),
            "text" | "txt" | "plain" => Ok(DocumentFormat::Text),
            other => Err(Error::validation(format!("unsupported format '{}'", other))),
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inbound request accepted by the agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentRequest {
    /// Free-form natural-language question.
    pub question: String,

    /// Preferred output format for document generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<DocumentFormat>,

    /// Extra facts handed to the handler prompt.
    #[serde(default)]
    pub context: HashMap<String, serde_json::Value>,

    /// Caller metadata, passed through untouched.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl AgentRequest {
    /// Create a request from a plain question.
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }

    /// Set the requested output format.
    pub fn with_format(mut self, format: DocumentFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Add a context entry.
    pub fn with_context(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Decode a JSON request body.
    ///
    /// The question is checked before any other field is decoded, so a blank
    /// or missing question is a classification failure even when the rest of
    /// the body is malformed.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| Error::validation(format!("invalid request body: {}", e)))?;

        let question = value.get("question").and_then(|q| q.as_str()).unwrap_or_default();
        if question.trim().is_empty() {
            return Err(Error::classification("question is empty"));
        }

        serde_json::from_value(value).map_err(|e| Error::validation(format!("invalid request body: {}", e)))
    }

    /// Question with surrounding whitespace removed.
    pub fn trimmed_question(&self) -> &str {
        self.question.trim()
    }

    /// Check the request contract.
    ///
    /// A blank question is a classification failure no matter what the other
    /// fields contain; only then are the remaining fields checked.
    pub fn validate(&self, max_entries: usize) -> Result<()> {
        if self.trimmed_question().is_empty() {
            return Err(Error::classification("question is empty"));
        }
        for (name, map) in [("context", &self.context), ("metadata", &self.metadata)] {
            if map.len() > max_entries {
                return Err(Error::validation(format!(
                    "{} holds {} entries, at most {} allowed",
                    name,
                    map.len(),
                    max_entries
                )));
            }
            if map.keys().any(|k| k.trim().is_empty()) {
                return Err(Error::validation(format!("{} contains an empty key", name)));
            }
        }
        Ok(())
    }
}
