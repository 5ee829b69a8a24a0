//! HTML / Markdown / text document generation.
//!
//! The model writes the body, the optional converter tool fixes up the
//! format, and the finished document is written through the document store.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde_json::json;
use tokio::time::Instant;

use doc_agent_core::{
    template::PromptTemplates,
    text::{normalize_query, strip_code_fence},
    traits::{CompletionRequest, DocumentStore, HandlerInput, LlmClient, SkillHandler, ToolInvoker},
    types::{AgentRequest, DocumentFormat, HandlerContract, HandlerResult, Intent, OutputShape, Payload},
    Error, Result,
};

use super::{context_entries, remaining};
use crate::prompts::{DOCUMENT_SYSTEM, DOCUMENT_USER, TITLE_SYSTEM};

const BODY_MAX_TOKENS: u64 = 4000;
const BODY_TEMPERATURE: f64 = 0.7;
const TITLE_MAX_TOKENS: u64 = 50;
const TITLE_TEMPERATURE: f64 = 0.5;
const TITLE_MAX_WORDS: usize = 10;
const DEFAULT_TITLE: &str = "Generated Document";

static HTML_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid title pattern"));
static HTML_H1: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h1[^>]*>(.*?)</h1>").expect("valid h1 pattern"));
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid tag pattern"));
static MARKDOWN_H1: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#\s+(.+?)\s*#*\s*$").expect("valid heading pattern"));

/// Collaborators and limits for the document handler.
pub struct DocumentHandler {
    contract: HandlerContract,
    llm: Arc<dyn LlmClient>,
    tools: Arc<dyn ToolInvoker>,
    store: Arc<dyn DocumentStore>,
    prompts: Arc<PromptTemplates>,
    default_format: DocumentFormat,
    convert_tool: String,
    tool_timeout: Duration,
    budget: Duration,
    title_timeout: Duration,
}

impl DocumentHandler {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: Arc<dyn ToolInvoker>,
        store: Arc<dyn DocumentStore>,
        prompts: Arc<PromptTemplates>,
    ) -> Self {
        let contract = HandlerContract::new(
            Intent::DocumentGeneration,
            "Document Generation",
            "Writes complete HTML or Markdown documents and saves them to the output directory",
        )
        .with_output(OutputShape::Document)
        .with_example("Create an HTML page about quantum computing")
        .with_example("Write a markdown guide for Python beginners");

        Self {
            contract,
            llm,
            tools,
            store,
            prompts,
            default_format: DocumentFormat::Html,
            convert_tool: "pandoc_convert".to_string(),
            tool_timeout: Duration::from_secs(30),
            budget: Duration::from_secs(58),
            title_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_default_format(mut self, format: DocumentFormat) -> Self {
        self.default_format = format;
        self
    }

    pub fn with_convert_tool(mut self, tool: impl Into<String>, timeout: Duration) -> Self {
        self.convert_tool = tool.into();
        self.tool_timeout = timeout;
        self
    }

    /// Deadline for the whole handler; keep it under the dispatcher's timeout.
    ///
    /// The body completion gets the budget minus the title reserve. The title
    /// call and the converter only use what is left.
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_title_timeout(mut self, timeout: Duration) -> Self {
        self.title_timeout = timeout;
        self
    }

    /// Explicit format, then a keyword in the question, then the default.
    pub fn resolve_format(&self, request: &AgentRequest) -> DocumentFormat {
        if let Some(format) = request.format {
            return format;
        }
        let words = normalize_query(request.trimmed_question());
        let has = |term: &str| {
            words
                .split(|c: char| !c.is_alphanumeric())
                .any(|w| w == term)
        };
        if has("markdown") || has("md") || words.contains("마크다운") {
            DocumentFormat::Markdown
        } else if has("html") {
            DocumentFormat::Html
        } else {
            self.default_format
        }
    }

    async fn generate_body(&self, input: &HandlerInput, format: DocumentFormat) -> Result<String> {
        let system = self
            .prompts
            .render(DOCUMENT_SYSTEM, &json!({ "format": format.as_str() }))?;
        let prompt = self.prompts.render(
            DOCUMENT_USER,
            &json!({
                "question": input.question(),
                "context": context_entries(&input.request),
            }),
        )?;

        let response = self
            .llm
            .complete(
                CompletionRequest::new(prompt)
                    .with_system(system)
                    .with_max_tokens(BODY_MAX_TOKENS)
                    .with_temperature(BODY_TEMPERATURE)
                    .with_timeout(self.budget.saturating_sub(self.title_timeout)),
            )
            .await?;

        let body = strip_code_fence(&response.content);
        if body.is_empty() {
            return Err(Error::upstream("model returned an empty document"));
        }
        Ok(body.to_string())
    }

    /// Model-written title, else one lifted from the body.
    async fn title(&self, question: &str, body: &str, deadline: Instant) -> String {
        let limit = self.title_timeout.min(remaining(deadline));
        let reply = if limit.is_zero() {
            Err(Error::timeout(self.title_timeout))
        } else {
            match self.prompts.render(TITLE_SYSTEM, &json!({})) {
                Ok(system) => {
                    let request = CompletionRequest::new(question)
                        .with_system(system)
                        .with_max_tokens(TITLE_MAX_TOKENS)
                        .with_temperature(TITLE_TEMPERATURE)
                        .with_timeout(limit);
                    self.llm.complete(request).await
                }
                Err(e) => Err(e),
            }
        };

        match reply {
            Ok(response) => match clean_title(&response.content) {
                Some(title) => return title,
                None => tracing::debug!("Model title was empty"),
            },
            Err(e) => tracing::warn!(error = %e, "Title generation failed"),
        }
        title_from_body(body).unwrap_or_else(|| DEFAULT_TITLE.to_string())
    }

    async fn convert(&self, text: &str, from: &str, to: &str, deadline: Instant) -> Option<String> {
        let limit = self.tool_timeout.min(remaining(deadline));
        if limit.is_zero() || !self.tools.is_available(&self.convert_tool) {
            return None;
        }
        let args = json!({ "text": text, "from_format": from, "to_format": to });
        match self.tools.invoke(&self.convert_tool, args, limit).await {
            Ok(output) if !output.content.trim().is_empty() => Some(output.content),
            Ok(_) => {
                tracing::warn!(tool = %self.convert_tool, "Converter returned nothing");
                None
            }
            Err(e) => {
                tracing::warn!(tool = %self.convert_tool, error = %e, "Conversion failed");
                None
            }
        }
    }

    /// Make the body match the requested format.
    async fn normalize(&self, body: String, format: DocumentFormat, title: &str, deadline: Instant) -> String {
        match format {
            DocumentFormat::Html if is_full_html(&body) => body,
            DocumentFormat::Html => {
                let fragment = if looks_like_html(&body) {
                    body
                } else {
                    match self.convert(&body, "markdown", "html5", deadline).await {
                        Some(html) => html,
                        None => format!("<pre>{}</pre>", escape_html(&body)),
                    }
                };
                if is_full_html(&fragment) {
                    fragment
                } else {
                    wrap_html(title, &fragment)
                }
            }
            DocumentFormat::Markdown if is_full_html(&body) => {
                self.convert(&body, "html", "markdown", deadline).await.unwrap_or(body)
            }
            DocumentFormat::Markdown | DocumentFormat::Text => body,
        }
    }
}

#[async_trait]
impl SkillHandler for DocumentHandler {
    fn contract(&self) -> &HandlerContract {
        &self.contract
    }

    async fn handle(&self, input: &HandlerInput) -> Result<HandlerResult> {
        let deadline = Instant::now() + self.budget;
        let format = self.resolve_format(&input.request);
        tracing::debug!(request_id = %input.request_id, format = %format, "Generating document");

        let body = self.generate_body(input, format).await?;
        let title = self.title(input.question(), &body, deadline).await;
        let content = self.normalize(body, format, &title, deadline).await;

        let file_name = format!("{}.{}", title, format.extension());
        let saved = self.store.save(content.as_bytes(), &file_name).await?;
        tracing::info!(request_id = %input.request_id, path = %saved.display(), "Document saved");

        Ok(HandlerResult::with_content_type(Payload::Text(content), format.mime_type())
            .with_title(title)
            .with_saved_path(saved))
    }
}

fn is_full_html(text: &str) -> bool {
    let head = text.trim_start().get(..15).unwrap_or(text.trim_start()).to_ascii_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

fn looks_like_html(text: &str) -> bool {
    let trimmed = text.trim_start();
    trimmed.starts_with('<') && HTML_TAG.is_match(trimmed)
}

fn clean_title(raw: &str) -> Option<String> {
    let line = raw.trim().lines().next()?.trim();
    let line = line.trim_start_matches('#').trim();
    let line = line.trim_matches(|c: char| c == '"' || c == '\'' || c == '*' || c == '`').trim();
    let line = line.strip_prefix("Title:").unwrap_or(line).trim();
    if line.is_empty() {
        return None;
    }
    Some(line.split_whitespace().take(TITLE_MAX_WORDS).collect::<Vec<_>>().join(" "))
}

fn title_from_body(body: &str) -> Option<String> {
    HTML_TITLE
        .captures(body)
        .or_else(|| HTML_H1.captures(body))
        .map(|c| HTML_TAG.replace_all(&c[1], "").to_string())
        .or_else(|| MARKDOWN_H1.captures(body).map(|c| c[1].to_string()))
        .and_then(|t| clean_title(&t))
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn wrap_html(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{}</title>
    <style>
        body {{ font-family: Arial, sans-serif; max-width: 800px; margin: 0 auto; padding: 20px; line-height: 1.6; }}
        h1, h2, h3 {{ color: #333; }}
        code {{ background-color: #f4f4f4; padding: 2px 4px; border-radius: 3px; }}
        pre {{ background-color: #f4f4f4; padding: 10px; border-radius: 5px; overflow-x: auto; white-space: pre-wrap; }}
    </style>
</head>
<body>
{}
</body>
</html>
"#,
        escape_html(title),
        body.trim()
    )
}
