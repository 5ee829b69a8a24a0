use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use doc_agent_controller::{
    default_prompts, CapabilityRegistry, Dispatcher, DocumentHandler, GeneralQaHandler, UrlSummaryHandler,
    WebSearchHandler,
};
use doc_agent_core::config::DispatcherConfig;
use doc_agent_core::mocks::{MockClassifier, MockDocumentStore, MockLlm, MockToolInvoker};
use doc_agent_core::traits::{Controller, HandlerInput, SkillHandler};
use doc_agent_core::types::{
    AgentRequest, EnvelopeStatus, HandlerContract, HandlerResult, Intent, RequestState, ServerStatus,
    ToolAvailability, ToolOutput,
};
use doc_agent_core::{Error, ErrorKind, Result};
use serde_json::json;

/// Handler scripted per call: each entry is taken in order, the last repeats.
struct Scripted {
    contract: HandlerContract,
    script: Vec<Step>,
    calls: AtomicUsize,
}

#[derive(Clone)]
enum Step {
    Answer(&'static str),
    Fail(fn() -> Error),
    Hang,
}

impl Scripted {
    fn new(intent: Intent, script: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            contract: HandlerContract::new(intent, "Scripted", "scripted test handler"),
            script,
            calls: AtomicUsize::new(0),
        })
    }

    fn requiring(intent: Intent, tool: &str) -> Arc<Self> {
        Arc::new(Self {
            contract: HandlerContract::new(intent, "Scripted", "scripted test handler").requires_tool(tool),
            script: vec![Step::Answer("unreachable")],
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SkillHandler for Scripted {
    fn contract(&self) -> &HandlerContract {
        &self.contract
    }

    async fn handle(&self, _input: &HandlerInput) -> Result<HandlerResult> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.script.get(n).or(self.script.last()).cloned().unwrap_or(Step::Hang);
        match step {
            Step::Answer(text) => Ok(HandlerResult::text(text)),
            Step::Fail(make) => Err(make()),
            Step::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}

fn general(llm: Arc<MockLlm>) -> Arc<dyn SkillHandler> {
    Arc::new(GeneralQaHandler::new(llm, Arc::new(default_prompts().unwrap()), "Doc Agent"))
}

fn search_tools() -> Arc<ToolAvailability> {
    Arc::new(ToolAvailability::empty().with_server(ServerStatus::available("search", vec!["web-search".into()])))
}

fn dispatcher(intent: Intent, handlers: Vec<Arc<dyn SkillHandler>>, tools: Arc<ToolAvailability>) -> Dispatcher {
    let registry = handlers
        .into_iter()
        .try_fold(CapabilityRegistry::builder(), |b, h| b.with(h))
        .and_then(|b| b.build())
        .unwrap();
    Dispatcher::new(
        Arc::new(MockClassifier::new(intent)),
        Arc::new(registry),
        tools,
        DispatcherConfig::default(),
    )
}

#[tokio::test]
async fn test_general_question_succeeds_first_try() {
    let llm = Arc::new(MockLlm::constant("Hi there!"));
    let d = dispatcher(Intent::GeneralQa, vec![general(llm.clone())], search_tools());

    let envelope = d.submit(AgentRequest::new("Hello")).await;

    assert_eq!(envelope.status, EnvelopeStatus::Success);
    assert_eq!(envelope.intent, Some(Intent::GeneralQa));
    assert_eq!(envelope.state, RequestState::Succeeded);
    assert_eq!(envelope.attempts, 1);
    assert_eq!(envelope.result.unwrap().payload.as_text(), Some("Hi there!"));
    assert_eq!(envelope.classification.unwrap().intent, Intent::GeneralQa);
}

#[tokio::test]
async fn test_transient_failure_retried_once() {
    let flaky = Scripted::new(
        Intent::WebSearch,
        vec![Step::Fail(|| Error::upstream("502 from provider")), Step::Answer("found it")],
    );
    let d = dispatcher(
        Intent::WebSearch,
        vec![general(Arc::new(MockLlm::constant("unused"))), flaky.clone()],
        search_tools(),
    );

    let envelope = d.submit(AgentRequest::new("search rust news")).await;

    assert_eq!(envelope.status, EnvelopeStatus::Success);
    assert_eq!(envelope.attempts, 2);
    assert_eq!(flaky.calls(), 2);
}

#[tokio::test]
async fn test_search_tool_failure_degrades_to_model_answer() {
    // 1. Search tool is up at startup but every call fails
    let llm = Arc::new(MockLlm::constant("From what I know, Python 3.13 is current."));
    let tools = Arc::new(MockToolInvoker::new().with_failing_tool("web-search", "connection reset"));
    let search = Arc::new(WebSearchHandler::new(
        llm.clone(),
        tools.clone(),
        Arc::new(default_prompts().unwrap()),
        "web-search",
    ));
    let d = dispatcher(Intent::WebSearch, vec![general(llm.clone()), search], search_tools());

    // 2. Two tool attempts, then one fallback answer
    let envelope = d.submit(AgentRequest::new("What is the latest Python version?")).await;

    assert_eq!(envelope.status, EnvelopeStatus::Partial);
    assert_eq!(envelope.state, RequestState::Degraded);
    assert_eq!(envelope.intent, Some(Intent::WebSearch));
    assert_eq!(envelope.attempts, 3);
    assert_eq!(tools.call_count(), 2);
    assert!(envelope.reason.starts_with("web_search unavailable"));
    assert!(envelope.result.is_some());

    // 3. The fallback prompt names the lost capability
    let system = llm.requests()[0].system.clone().unwrap();
    assert!(system.contains("web_search capability is unavailable"));
}

#[tokio::test]
async fn test_unavailable_tool_degrades_without_probing() {
    let llm = Arc::new(MockLlm::constant("Answer from memory."));
    let tools = Arc::new(MockToolInvoker::new());
    let search = Arc::new(WebSearchHandler::new(
        llm.clone(),
        tools.clone(),
        Arc::new(default_prompts().unwrap()),
        "web-search",
    ));
    let d = dispatcher(
        Intent::WebSearch,
        vec![general(llm.clone()), search],
        Arc::new(ToolAvailability::empty()),
    );

    let (a, b) = tokio::join!(
        d.submit(AgentRequest::new("latest news on rust")),
        d.submit(AgentRequest::new("latest news on tokio"))
    );

    for envelope in [a, b] {
        assert_eq!(envelope.status, EnvelopeStatus::Partial);
        assert_eq!(envelope.attempts, 1);
        assert!(envelope.reason.contains("required tools unavailable: web-search"));
    }
    assert_eq!(tools.call_count(), 0);
    assert_eq!(llm.call_count(), 2);
}

#[tokio::test]
async fn test_unavailable_tool_fails_non_degradable_intent() {
    let doc = Scripted::requiring(Intent::DocumentGeneration, "pdf-render");
    let d = dispatcher(
        Intent::DocumentGeneration,
        vec![general(Arc::new(MockLlm::constant("unused"))), doc.clone()],
        search_tools(),
    );

    let envelope = d.submit(AgentRequest::new("write a pdf report")).await;

    assert_eq!(envelope.status, EnvelopeStatus::Failure);
    assert_eq!(envelope.error_kind, Some(ErrorKind::Tool));
    assert_eq!(envelope.attempts, 0);
    assert_eq!(doc.calls(), 0);
}

#[tokio::test]
async fn test_document_failure_is_not_degraded() {
    let llm = Arc::new(MockLlm::failing("model overloaded"));
    let store = Arc::new(MockDocumentStore::new());
    let doc = Arc::new(DocumentHandler::new(
        llm.clone(),
        Arc::new(MockToolInvoker::new()),
        store.clone(),
        Arc::new(default_prompts().unwrap()),
    ));
    let d = dispatcher(Intent::DocumentGeneration, vec![general(llm.clone()), doc], search_tools());

    let envelope = d.submit(AgentRequest::new("Generate an HTML document about tides")).await;

    assert_eq!(envelope.status, EnvelopeStatus::Failure);
    assert_eq!(envelope.state, RequestState::Failed);
    assert_eq!(envelope.error_kind, Some(ErrorKind::Upstream));
    assert_eq!(envelope.attempts, 2);
    assert_eq!(llm.call_count(), 2);
    assert!(store.saved().is_empty());
}

#[tokio::test]
async fn test_blank_question_never_reaches_handlers() {
    let llm = Arc::new(MockLlm::constant("unused"));
    let d = dispatcher(Intent::GeneralQa, vec![general(llm.clone())], search_tools());

    let request = AgentRequest::new("   \n")
        .with_format(doc_agent_core::types::DocumentFormat::Html)
        .with_context("topic", json!("tides"));
    let envelope = d.submit(request).await;

    assert_eq!(envelope.status, EnvelopeStatus::Failure);
    assert_eq!(envelope.error_kind, Some(ErrorKind::Classification));
    assert_eq!(envelope.attempts, 0);
    assert!(envelope.classification.is_none());
    assert_eq!(llm.call_count(), 0);
}

#[tokio::test]
async fn test_invalid_context_is_validation_failure() {
    let d = dispatcher(Intent::GeneralQa, vec![general(Arc::new(MockLlm::constant("x")))], search_tools());

    let envelope = d.submit(AgentRequest::new("hi").with_context(" ", json!(1))).await;

    assert_eq!(envelope.error_kind, Some(ErrorKind::Validation));
}

#[tokio::test(start_paused = true)]
async fn test_hanging_url_handler_times_out_then_degrades() {
    let hanging = Scripted::new(Intent::UrlSummary, vec![Step::Hang]);
    let d = dispatcher(
        Intent::UrlSummary,
        vec![general(Arc::new(MockLlm::constant("The page is probably about X."))), hanging.clone()],
        search_tools(),
    );

    let envelope = d.submit(AgentRequest::new("summarize https://slow.example")).await;

    assert_eq!(hanging.calls(), 2);
    assert_eq!(envelope.status, EnvelopeStatus::Partial);
    assert!(envelope.reason.contains("timed out after 45000 ms"));
}

#[tokio::test(start_paused = true)]
async fn test_hanging_document_handler_fails_with_timeout() {
    let hanging = Scripted::new(Intent::DocumentGeneration, vec![Step::Hang]);
    let d = dispatcher(
        Intent::DocumentGeneration,
        vec![general(Arc::new(MockLlm::constant("unused"))), hanging.clone()],
        search_tools(),
    );

    let envelope = d.submit(AgentRequest::new("create a markdown guide")).await;

    assert_eq!(hanging.calls(), 2);
    assert_eq!(envelope.status, EnvelopeStatus::Failure);
    assert_eq!(envelope.error_kind, Some(ErrorKind::Timeout));
    assert_eq!(envelope.attempts, 2);
}

#[tokio::test]
async fn test_non_transient_error_is_not_retried() {
    let strict = Scripted::new(Intent::WebSearch, vec![Step::Fail(|| Error::validation("bad query"))]);
    let d = dispatcher(
        Intent::WebSearch,
        vec![general(Arc::new(MockLlm::constant("unused"))), strict.clone()],
        search_tools(),
    );

    let envelope = d.submit(AgentRequest::new("search for x")).await;

    assert_eq!(strict.calls(), 1);
    assert_eq!(envelope.status, EnvelopeStatus::Failure);
    assert_eq!(envelope.error_kind, Some(ErrorKind::Validation));
}

#[tokio::test]
async fn test_empty_result_counts_as_upstream_failure() {
    let blank = Scripted::new(Intent::KnowledgeQa, vec![Step::Answer("  "), Step::Answer("I can write documents.")]);
    let d = dispatcher(
        Intent::KnowledgeQa,
        vec![general(Arc::new(MockLlm::constant("unused"))), blank.clone()],
        search_tools(),
    );

    let envelope = d.submit(AgentRequest::new("what can you do?")).await;

    assert_eq!(envelope.status, EnvelopeStatus::Success);
    assert_eq!(envelope.attempts, 2);
    assert_eq!(
        envelope.result.unwrap().payload.as_text(),
        Some("I can write documents.")
    );
}

#[tokio::test]
async fn test_tool_output_flows_to_envelope() {
    let llm = Arc::new(MockLlm::constant("Python 3.13 is the latest [1]."));
    let tools = Arc::new(MockToolInvoker::new().with_tool(
        "web-search",
        ToolOutput::text("").with_data(json!({"results": [{"title": "Python", "url": "https://python.org", "snippet": "3.13"}]})),
    ));
    let search = Arc::new(WebSearchHandler::new(
        llm.clone(),
        tools,
        Arc::new(default_prompts().unwrap()),
        "web-search",
    ));
    let d = dispatcher(Intent::WebSearch, vec![general(llm), search], search_tools());

    let envelope = d.submit(AgentRequest::new("What is the latest Python version?")).await;

    let result = envelope.result.unwrap();
    assert_eq!(result.sources, vec!["https://python.org".to_string()]);
}

fn url_summary_setup(llm: Arc<MockLlm>) -> (Dispatcher, Arc<MockToolInvoker>) {
    let tools = Arc::new(MockToolInvoker::new().with_tool("summarize-content", ToolOutput::text("A pricing page.")));
    let handler = Arc::new(UrlSummaryHandler::new(
        llm.clone(),
        tools.clone(),
        Arc::new(default_prompts().unwrap()),
        "summarize-content",
    ));
    let availability = Arc::new(
        ToolAvailability::empty().with_server(ServerStatus::available("summarizer", vec!["summarize-content".into()])),
    );
    (dispatcher(Intent::UrlSummary, vec![general(llm), handler], availability), tools)
}

#[tokio::test]
async fn test_url_intent_without_link_is_answered_directly() {
    let llm = Arc::new(MockLlm::constant("Pricing usually lists plans and limits."));
    let (d, tools) = url_summary_setup(llm);

    let envelope = d.submit(AgentRequest::new("summarize the pricing page")).await;

    assert_eq!(envelope.status, EnvelopeStatus::Partial);
    assert_eq!(envelope.intent, Some(Intent::UrlSummary));
    assert_eq!(envelope.state, RequestState::Degraded);
    assert_eq!(envelope.attempts, 1);
    assert!(envelope.reason.contains("no link"), "{}", envelope.reason);
    assert_eq!(envelope.result.unwrap().payload.as_text(), Some("Pricing usually lists plans and limits."));
    assert_eq!(tools.call_count(), 0);
}

#[tokio::test]
async fn test_url_intent_with_bare_domain_fetches_page() {
    let llm = Arc::new(MockLlm::constant("Plans start at $5."));
    let (d, tools) = url_summary_setup(llm);

    let envelope = d.submit(AgentRequest::new("summarize example.com")).await;

    assert_eq!(envelope.status, EnvelopeStatus::Success);
    assert_eq!(tools.calls()[0].1["url"], "https://example.com/");
}
