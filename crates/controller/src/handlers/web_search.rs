//! Web search through an external tool, summarized by the model.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use serde::Serialize;
use serde_json::{json, Value};

use doc_agent_core::{
    template::PromptTemplates,
    traits::{CompletionRequest, HandlerInput, LlmClient, SkillHandler, ToolInvoker},
    types::{HandlerContract, HandlerResult, Intent, ToolOutput},
    Error, Result,
};

use super::remaining;
use crate::prompts::{WEB_SEARCH_SYSTEM, WEB_SEARCH_USER};

const MAX_TOKENS: u64 = 600;
const TEMPERATURE: f64 = 0.3;
const SNIPPET_CHARS: usize = 300;

/// One normalized search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

pub struct WebSearchHandler {
    contract: HandlerContract,
    llm: Arc<dyn LlmClient>,
    tools: Arc<dyn ToolInvoker>,
    prompts: Arc<PromptTemplates>,
    tool: String,
    max_results: usize,
    tool_timeout: Duration,
    budget: Duration,
}

impl WebSearchHandler {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: Arc<dyn ToolInvoker>,
        prompts: Arc<PromptTemplates>,
        tool: impl Into<String>,
    ) -> Self {
        let tool = tool.into();
        let contract = HandlerContract::new(
            Intent::WebSearch,
            "Web Search",
            "Searches the web for current information and answers with cited sources",
        )
        .requires_tool(tool.clone())
        .with_example("What are the latest Rust release notes?")
        .with_example("Search for today's AI news");

        Self {
            contract,
            llm,
            tools,
            prompts,
            tool,
            max_results: 5,
            tool_timeout: Duration::from_secs(30),
            budget: Duration::from_secs(43),
        }
    }

    pub fn with_limits(mut self, max_results: usize, tool_timeout: Duration) -> Self {
        self.max_results = max_results.max(1);
        self.tool_timeout = tool_timeout;
        self
    }

    /// Deadline for the search plus its summary; keep it under the dispatcher's timeout.
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    async fn summarize(&self, query: &str, results: &[SearchResult], limit: Duration) -> Result<String> {
        let system = self.prompts.render(WEB_SEARCH_SYSTEM, &json!({}))?;
        let prompt = self
            .prompts
            .render(WEB_SEARCH_USER, &json!({ "query": query, "results": results }))?;
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
impl SkillHandler for WebSearchHandler {
    fn contract(&self) -> &HandlerContract {
        &self.contract
    }

    async fn handle(&self, input: &HandlerInput) -> Result<HandlerResult> {
        let deadline = Instant::now() + self.budget;
        let query = input.question();
        let output = self
            .tools
            .invoke(
                &self.tool,
                json!({ "query": query, "max_results": self.max_results }),
                self.tool_timeout.min(self.budget),
            )
            .await?;

        let mut results = parse_results(&output);
        results.truncate(self.max_results);
        tracing::debug!(request_id = %input.request_id, results = results.len(), "Search completed");

        if results.is_empty() {
            return Ok(HandlerResult::text(format!("No search results were found for \"{}\".", query)));
        }

        let limit = remaining(deadline);
        let summary = if limit.is_zero() {
            Err(Error::timeout(self.budget))
        } else {
            self.summarize(query, &results, limit).await
        };
        let answer = match summary {
            Ok(answer) if !answer.is_empty() => answer,
            Ok(_) => list_results(&results),
            Err(e) => {
                tracing::warn!(request_id = %input.request_id, error = %e, "Search summary failed, listing results");
                list_results(&results)
            }
        };

        let sources: Vec<String> = results.iter().map(|r| r.url.clone()).filter(|u| !u.is_empty()).collect();
        let mut body = answer;
        body.push_str("\n\nSources:\n");
        for (i, r) in results.iter().enumerate() {
            body.push_str(&format!("{}. [{}]({})\n", i + 1, r.title, r.url));
        }

        Ok(HandlerResult::markdown(body.trim_end()).with_sources(sources))
    }
}

/// Pull hits out of whatever shape the search server answered with.
///
/// Accepts `{"results": [...]}` or a bare array in structured data, and falls
/// back to parsing the text content as JSON.
pub fn parse_results(output: &ToolOutput) -> Vec<SearchResult> {
    let parsed;
    let value = match &output.data {
        Some(data) => data,
        None => match serde_json::from_str::<Value>(&output.content) {
            Ok(v) => {
                parsed = v;
                &parsed
            }
            Err(_) => return Vec::new(),
        },
    };

    let items = match value {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("results").or_else(|| map.get("items")) {
            Some(Value::Array(items)) => items,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    items.iter().filter_map(to_result).collect()
}

fn to_result(item: &Value) -> Option<SearchResult> {
    let field = |names: &[&str]| {
        names
            .iter()
            .find_map(|n| item.get(*n).and_then(Value::as_str))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };
    let url = field(&["url", "link", "href"])?;
    let snippet = field(&["snippet", "description", "content"]).unwrap_or_default();
    Some(SearchResult {
        title: field(&["title", "name"]).unwrap_or_else(|| "Untitled".to_string()),
        url,
        snippet: snippet.chars().take(SNIPPET_CHARS).collect(),
    })
}

fn list_results(results: &[SearchResult]) -> String {
    let mut out = String::from("Here is what the search found:\n");
    for r in results {
        out.push_str(&format!("\n- **{}**: {}", r.title, r.snippet));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::default_prompts;
    use doc_agent_core::mocks::{MockLlm, MockToolInvoker};
    use doc_agent_core::types::{AgentRequest, ClassificationResult, ClassificationTier};
    use doc_agent_core::Error;

    fn input(question: &str) -> HandlerInput {
        HandlerInput::new(
            "req-search",
            AgentRequest::new(question),
            ClassificationResult::new(Intent::WebSearch, 0.9, ClassificationTier::Rules),
        )
    }

    fn search_output() -> ToolOutput {
        ToolOutput::text("2 results").with_data(json!({
            "results": [
                {"title": "Rust 1.80", "url": "https://blog.rust-lang.org/1.80", "snippet": "LazyLock lands"},
                {"link": "https://example.com/news", "description": "More news"}
            ]
        }))
    }

    fn handler(llm: Arc<MockLlm>, tools: MockToolInvoker) -> WebSearchHandler {
        WebSearchHandler::new(llm, Arc::new(tools), Arc::new(default_prompts().unwrap()), "web-search")
    }

    #[test]
    fn test_contract_requires_tool() {
        let h = handler(Arc::new(MockLlm::constant("")), MockToolInvoker::new());
        assert_eq!(h.contract().required_tools, vec!["web-search".to_string()]);
    }

    #[test]
    fn test_parse_result_shapes() {
        let results = parse_results(&search_output());
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].title, "Untitled");
        assert_eq!(results[1].url, "https://example.com/news");

        let from_text = parse_results(&ToolOutput::text(r#"[{"title":"A","url":"https://a.example"}]"#));
        assert_eq!(from_text[0].snippet, "");

        assert!(parse_results(&ToolOutput::text("no json here")).is_empty());
        assert!(parse_results(&ToolOutput::text(r#"[{"title":"no url"}]"#)).is_empty());
    }

    #[tokio::test]
    async fn test_answer_with_sources() {
        let llm = Arc::new(MockLlm::constant("Rust 1.80 stabilized LazyLock [1]."));
        let tools = MockToolInvoker::new().with_tool("web-search", search_output());
        let h = handler(llm.clone(), tools).with_limits(3, Duration::from_secs(5));

        let result = h.handle(&input("latest rust release")).await.unwrap();

        let text = result.payload.as_text().unwrap();
        assert!(text.starts_with("Rust 1.80 stabilized LazyLock [1]."));
        assert!(text.contains("1. [Rust 1.80](https://blog.rust-lang.org/1.80)"));
        assert_eq!(result.content_type, "text/markdown");
        assert_eq!(result.sources.len(), 2);
        assert!(llm.requests()[0].prompt.contains("[1] Rust 1.80"));
    }

    #[tokio::test]
    async fn test_passes_query_and_limit_to_tool() {
        let tools = Arc::new(MockToolInvoker::new().with_tool("web-search", search_output()));
        let h = WebSearchHandler::new(
            Arc::new(MockLlm::constant("ok")),
            tools.clone(),
            Arc::new(default_prompts().unwrap()),
            "web-search",
        )
        .with_limits(1, Duration::from_secs(5));

        let result = h.handle(&input("  rust news ")).await.unwrap();

        assert_eq!(tools.calls()[0].1, json!({"query": "rust news", "max_results": 1}));
        assert_eq!(result.sources, vec!["https://blog.rust-lang.org/1.80".to_string()]);
    }

    #[tokio::test]
    async fn test_model_failure_lists_results() {
        let tools = MockToolInvoker::new().with_tool("web-search", search_output());
        let h = handler(Arc::new(MockLlm::failing("overloaded")), tools);

        let result = h.handle(&input("rust news")).await.unwrap();
        let text = result.payload.as_text().unwrap();
        assert!(text.contains("- **Rust 1.80**: LazyLock lands"));
        assert!(text.contains("Sources:"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_summary_lists_results_within_budget() {
        let tools = MockToolInvoker::new().with_tool("web-search", search_output());
        let llm = Arc::new(MockLlm::hanging());
        let h = handler(llm.clone(), tools).with_budget(Duration::from_secs(12));

        let started = tokio::time::Instant::now();
        let result = h.handle(&input("rust news")).await.unwrap();

        assert!(result.payload.as_text().unwrap().contains("- **Rust 1.80**: LazyLock lands"));
        assert!(llm.requests()[0].timeout <= Duration::from_secs(12));
        assert!(started.elapsed() <= Duration::from_secs(12));
    }

    #[tokio::test]
    async fn test_no_results_is_success() {
        let tools = MockToolInvoker::new().with_tool("web-search", ToolOutput::text("[]"));
        let llm = Arc::new(MockLlm::constant("unused"));
        let h = handler(llm.clone(), tools);

        let result = h.handle(&input("obscure query")).await.unwrap();
        assert!(result.payload.as_text().unwrap().contains("No search results"));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_tool_failure_propagates() {
        let tools = MockToolInvoker::new().with_failing_tool("web-search", "rate limited");
        let h = handler(Arc::new(MockLlm::constant("unused")), tools);

        let err = h.handle(&input("rust news")).await.unwrap_err();
        assert!(matches!(err, Error::Tool(_)));
        assert!(err.is_transient());
    }
}
