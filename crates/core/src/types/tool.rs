use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::intent::Intent;

// =============================================================================
// Tool Types
// =============================================================================

/// Output from a tool invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Concatenated text content.
    pub content: String,

    /// Optional structured data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ToolOutput {
    /// Create a text output.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            data: None,
        }
    }

    /// Attach structured data.
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Health of one tool server as observed at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatus {
    pub name: String,
    pub available: bool,
    /// Tools the server exposes (or was configured to expose, when down).
    pub tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ServerStatus {
    pub fn available(name: impl Into<String>, tools: Vec<String>) -> Self {
        Self {
            name: name.into(),
            available: true,
            tools,
            detail: None,
        }
    }

    pub fn unavailable(name: impl Into<String>, tools: Vec<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            available: false,
            tools,
            detail: Some(detail.into()),
        }
    }
}

/// Immutable snapshot of which tools can be called.
///
/// Built once during startup; an unavailable tool stays unavailable for the
/// lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct ToolAvailability {
    servers: BTreeMap<String, ServerStatus>,
    tools: HashMap<String, String>,
}

impl ToolAvailability {
    /// Snapshot with no tool servers.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Record a server. The first available server exposing a tool owns it.
    pub fn with_server(mut self, status: ServerStatus) -> Self {
        if status.available {
            for tool in &status.tools {
                self.tools
                    .entry(tool.clone())
                    .or_insert_with(|| status.name.clone());
            }
        }
        self.servers.insert(status.name.clone(), status);
        self
    }

    pub fn is_available(&self, tool: &str) -> bool {
        self.tools.contains_key(tool)
    }

    /// Server that answers calls for `tool`.
    pub fn server_for(&self, tool: &str) -> Option<&str> {
        self.tools.get(tool).map(String::as_str)
    }

    /// Subset of `required` that cannot be called.
    pub fn missing<'a>(&self, required: &'a [String]) -> Vec<&'a str> {
        required
            .iter()
            .filter(|tool| !self.is_available(tool))
            .map(String::as_str)
            .collect()
    }

    pub fn servers(&self) -> impl Iterator<Item = &ServerStatus> {
        self.servers.values()
    }
}

// =============================================================================
// Handler Contract
// =============================================================================

/// Shape of the input a handler expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputRequirement {
    Question,
    QuestionWithUrl,
}

/// Shape of the output a handler produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputShape {
    Document,
    Text,
}

/// What a handler declares about itself at registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerContract {
    pub intent: Intent,
    pub name: String,
    pub description: String,
    pub input: InputRequirement,
    pub output: OutputShape,
    /// External tools that must be available for the handler to run.
    #[serde(default)]
    pub required_tools: Vec<String>,
    /// Example prompts shown on the agent card.
    #[serde(default)]
    pub examples: Vec<String>,
}

impl HandlerContract {
    pub fn new(intent: Intent, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            intent,
            name: name.into(),
            description: description.into(),
            input: InputRequirement::Question,
            output: OutputShape::Text,
            required_tools: Vec::new(),
            examples: Vec::new(),
        }
    }

    pub fn with_input(mut self, input: InputRequirement) -> Self {
        self.input = input;
        self
    }

    pub fn with_output(mut self, output: OutputShape) -> Self {
        self.output = output;
        self
    }

    pub fn requires_tool(mut self, tool: impl Into<String>) -> Self {
        self.required_tools.push(tool.into());
        self
    }

    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.examples.push(example.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_server_exposes_nothing() {
        let snapshot = ToolAvailability::empty()
            .with_server(ServerStatus::available("search", vec!["web-search".into()]))
            .with_server(ServerStatus::unavailable(
                "pandoc",
                vec!["pandoc_convert".into()],
                "spawn failed",
            ));

        assert!(snapshot.is_available("web-search"));
        assert!(!snapshot.is_available("pandoc_convert"));
        assert_eq!(snapshot.server_for("web-search"), Some("search"));

        let required = vec!["web-search".to_string(), "pandoc_convert".to_string()];
        assert_eq!(snapshot.missing(&required), vec!["pandoc_convert"]);
        assert_eq!(snapshot.servers().count(), 2);
    }

    #[test]
    fn test_first_server_owns_duplicate_tool() {
        let snapshot = ToolAvailability::empty()
            .with_server(ServerStatus::available("a", vec!["fetch".into()]))
            .with_server(ServerStatus::available("b", vec!["fetch".into()]));
        assert_eq!(snapshot.server_for("fetch"), Some("a"));
    }
}
