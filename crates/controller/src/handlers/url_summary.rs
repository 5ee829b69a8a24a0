//! Answers questions about a linked page.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::time::Instant;

use doc_agent_core::{
    template::PromptTemplates,
    text::{find_link, without_span},
    traits::{CompletionRequest, HandlerInput, LlmClient, SkillHandler, ToolInvoker},
    types::{HandlerContract, HandlerResult, InputRequirement, Intent},
    Error, Result,
};

use super::remaining;
use crate::prompts::{URL_SYSTEM, URL_USER};

const MAX_TOKENS: u64 = 500;
const TEMPERATURE: f64 = 0.3;
const DEFAULT_QUESTION: &str = "Summarize the main points of this page.";

pub struct UrlSummaryHandler {
    contract: HandlerContract,
    llm: Arc<dyn LlmClient>,
    tools: Arc<dyn ToolInvoker>,
    prompts: Arc<PromptTemplates>,
    tool: String,
    tool_timeout: Duration,
    budget: Duration,
}

impl UrlSummaryHandler {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: Arc<dyn ToolInvoker>,
        prompts: Arc<PromptTemplates>,
        tool: impl Into<String>,
    ) -> Self {
        let tool = tool.into();
        let contract = HandlerContract::new(
            Intent::UrlSummary,
            "URL Summary",
            "Fetches a web page and summarizes it or answers questions about it",
        )
        .with_input(InputRequirement::QuestionWithUrl)
        .requires_tool(tool.clone())
        .with_example("Summarize https://www.rust-lang.org")
        .with_example("What does https://example.com/post say about pricing?");

        Self {
            contract,
            llm,
            tools,
            prompts,
            tool,
            tool_timeout: Duration::from_secs(30),
            budget: Duration::from_secs(43),
        }
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    /// Deadline for the fetch plus the answer; keep it under the dispatcher's timeout.
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    async fn answer(&self, url: &str, summary: &str, question: &str, limit: Duration) -> Result<String> {
        let system = self.prompts.render(URL_SYSTEM, &json!({}))?;
        let prompt = self.prompts.render(
            URL_USER,
            &json!({ "url": url, "summary": summary, "question": question }),
        )?;
        let response = self
            .llm
            .complete(
                CompletionRequest::new(prompt)
                    .with_system(system)
                    .with_max_tokens(MAX_TOKENS)
                    .with_temperature(TEMPERATURE)
                    .with_timeout(limit),
            )
            .await?;
        Ok(response.content.trim().to_string())
    }
}

#[async_trait]
impl SkillHandler for UrlSummaryHandler {
    fn contract(&self) -> &HandlerContract {
        &self.contract
    }

    async fn handle(&self, input: &HandlerInput) -> Result<HandlerResult> {
        let deadline = Instant::now() + self.budget;
        let text = input.question();
        let found = find_link(text).ok_or_else(|| Error::validation("no URL found in the question"))?;
        let rest = without_span(text, found.start, found.end);
        let question = if rest.is_empty() { DEFAULT_QUESTION } else { rest.as_str() };

        let output = self
            .tools
            .invoke(
                &self.tool,
                json!({ "url": found.url, "query": question }),
                self.tool_timeout.min(self.budget),
            )
            .await?;
        let summary = output.content.trim();
        if summary.is_empty() {
            return Err(Error::tool(format!("{} returned no content for {}", self.tool, found.url)));
        }

        let limit = remaining(deadline);
        let reply = if limit.is_zero() {
            Err(Error::timeout(self.budget))
        } else {
            self.answer(&found.url, summary, question, limit).await
        };
        let answer = match reply {
            Ok(answer) if !answer.is_empty() => answer,
            Ok(_) => summary.to_string(),
            Err(e) => {
                tracing::warn!(request_id = %input.request_id, error = %e, "Answer generation failed, returning page summary");
                summary.to_string()
            }
        };

        Ok(HandlerResult::markdown(format!("{}\n\nSource: {}", answer, found.url))
            .with_sources(vec![found.url]))
    }
}
