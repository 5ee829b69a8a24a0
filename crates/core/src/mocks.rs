//! Mock implementations of core traits for testing.
//!
//! Every seam of the agent has a scripted stand-in here so that classifier,
//! dispatcher and server tests can run without models, tool servers or disk.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    traits::{
        ClassificationCache, CompletionRequest, Controller, DocumentStore, IntentClassifier,
        LlmClient, LlmResponse, ModelClassifier, ToolInvoker,
    },
    types::{
        AgentRequest, ClassificationResult, ClassificationTier, Intent, ResponseEnvelope,
        ToolOutput,
    },
    Error, Result,
};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    /// Fail with an upstream error.
    Fail(String),
    /// Stall until the request's own timeout, then fail with `Timeout`.
    Hang,
}

impl MockReply {
    async fn play<T>(self, timeout: Duration, ok: impl FnOnce(String) -> T) -> Result<T> {
        match self {
            MockReply::Text(text) => Ok(ok(text)),
            MockReply::Fail(msg) => Err(Error::upstream(msg)),
            MockReply::Hang => {
                tokio::time::sleep(timeout).await;
                Err(Error::timeout(timeout))
            }
        }
    }
}

// =============================================================================
// Mock LLM Client
// =============================================================================

/// Scripted mock LLM.
///
/// Replies are taken from the queue first; once it is empty, the first rule
/// whose needle occurs in the prompt answers, then the default reply.
pub struct MockLlm {
    queue: Mutex<VecDeque<MockReply>>,
    rules: Vec<(String, MockReply)>,
    default: MockReply,
    requests: Mutex<Vec<CompletionRequest>>,
    call_count: AtomicUsize,
}

impl MockLlm {
    /// Create a mock that always returns the same response.
    pub fn constant(response: &str) -> Self {
        Self::with_default(MockReply::Text(response.to_string()))
    }

    /// Create a mock that fails every call.
    pub fn failing(message: &str) -> Self {
        Self::with_default(MockReply::Fail(message.to_string()))
    }

    /// Create a mock that never answers.
    pub fn hanging() -> Self {
        Self::with_default(MockReply::Hang)
    }

    pub fn with_default(default: MockReply) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            rules: Vec::new(),
            default,
            requests: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    /// Queue replies consumed in order before rules apply.
    pub fn then(self, reply: MockReply) -> Self {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(reply);
        }
        self
    }

    /// Answer prompts (system or user) containing `needle` with `reply`.
    pub fn on(mut self, needle: &str, reply: MockReply) -> Self {
        self.rules.push((needle.to_string(), reply));
        self
    }

    /// Get the number of calls made to this mock.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn next_reply(&self, request: &CompletionRequest) -> MockReply {
        if let Some(reply) = self.queue.lock().ok().and_then(|mut q| q.pop_front()) {
            return reply;
        }
        let system = request.system.as_deref().unwrap_or_default();
        self.rules
            .iter()
            .find(|(needle, _)| request.prompt.contains(needle) || system.contains(needle))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.default.clone())
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn complete(&self, request: CompletionRequest) -> Result<LlmResponse> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let reply = self.next_reply(&request);
        let timeout = request.timeout;
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        reply.play(timeout, |text| LlmResponse::text(text)).await
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        // Bag-of-letters vector: similar words land close together.
        let mut vector = vec![0.0f32; 26];
        for c in text.to_lowercase().chars().filter(|c| c.is_ascii_lowercase()) {
            vector[(c as u8 - b'a') as usize] += 1.0;
        }
        Ok(vector)
    }
}

// =============================================================================
// Mock Classifiers
// =============================================================================

/// Model classifier returning a fixed label.
pub struct MockModelClassifier {
    reply: std::result::Result<Intent, String>,
    call_count: AtomicUsize,
}

impl MockModelClassifier {
    pub fn returning(intent: Intent) -> Self {
        Self {
            reply: Ok(intent),
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelClassifier for MockModelClassifier {
    async fn classify_with_model(&self, _text: &str) -> Result<Intent> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.reply.clone().map_err(|msg| Error::upstream(msg))
    }
}

/// Classifier that always answers with the same intent.
pub struct MockClassifier {
    intent: Intent,
}

impl MockClassifier {
    pub fn new(intent: Intent) -> Self {
        Self { intent }
    }
}

#[async_trait]
impl IntentClassifier for MockClassifier {
    async fn classify(&self, request: &AgentRequest) -> Result<ClassificationResult> {
        if request.trimmed_question().is_empty() {
            return Err(Error::classification("question is empty"));
        }
        Ok(ClassificationResult::new(self.intent, 1.0, ClassificationTier::Rules))
    }
}

/// In-memory cache without expiry.
#[derive(Default)]
pub struct MockClassificationCache {
    entries: Mutex<HashMap<String, ClassificationResult>>,
}

impl MockClassificationCache {
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ClassificationCache for MockClassificationCache {
    async fn get(&self, key: &str) -> Option<ClassificationResult> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    async fn insert(&self, key: String, result: ClassificationResult) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key, result);
        }
    }
}

// =============================================================================
// Mock Tools
// =============================================================================

/// Tool invoker with scripted outputs per tool.
#[derive(Default)]
pub struct MockToolInvoker {
    available: HashSet<String>,
    outputs: HashMap<String, ToolOutput>,
    failures: HashMap<String, String>,
    hanging: HashSet<String>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl MockToolInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `tool` available and answer with `output`.
    pub fn with_tool(mut self, tool: &str, output: ToolOutput) -> Self {
        self.available.insert(tool.to_string());
        self.outputs.insert(tool.to_string(), output);
        self
    }

    /// Make `tool` available but fail every call with a tool error.
    pub fn with_failing_tool(mut self, tool: &str, message: &str) -> Self {
        self.available.insert(tool.to_string());
        self.failures.insert(tool.to_string(), message.to_string());
        self
    }

    /// Make `tool` available but never answer.
    pub fn with_hanging_tool(mut self, tool: &str) -> Self {
        self.available.insert(tool.to_string());
        self.hanging.insert(tool.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }

    /// Recorded `(tool, args)` pairs.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ToolInvoker for MockToolInvoker {
    async fn invoke(&self, tool: &str, args: Value, timeout: Duration) -> Result<ToolOutput> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((tool.to_string(), args));
        }
        if !self.available.contains(tool) {
            return Err(Error::tool_unavailable(tool));
        }
        if self.hanging.contains(tool) {
            tokio::time::sleep(timeout).await;
            return Err(Error::timeout(timeout));
        }
        if let Some(message) = self.failures.get(tool) {
            return Err(Error::tool(message.clone()));
        }
        self.outputs
            .get(tool)
            .cloned()
            .ok_or_else(|| Error::tool_not_found(tool))
    }

    fn is_available(&self, tool: &str) -> bool {
        self.available.contains(tool)
    }
}

// =============================================================================
// Mock Stores
// =============================================================================

/// Document store that keeps saved files in memory.
#[derive(Default)]
pub struct MockDocumentStore {
    saved: Mutex<Vec<(String, Vec<u8>)>>,
    fail: bool,
}

impl MockDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            saved: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// `(suggested_name, bytes)` of every save.
    pub fn saved(&self) -> Vec<(String, Vec<u8>)> {
        self.saved.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MockDocumentStore {
    async fn save(&self, bytes: &[u8], suggested_name: &str) -> Result<PathBuf> {
        if self.fail {
            return Err(Error::storage("disk unavailable"));
        }
        if let Ok(mut saved) = self.saved.lock() {
            saved.push((suggested_name.to_string(), bytes.to_vec()));
        }
        Ok(PathBuf::from("memory").join(suggested_name))
    }
}

// =============================================================================
// Mock Controller
// =============================================================================

/// Controller returning a prepared envelope.
pub struct MockController {
    envelope: ResponseEnvelope,
    submitted: Mutex<Vec<AgentRequest>>,
}

impl MockController {
    pub fn new(envelope: ResponseEnvelope) -> Self {
        Self {
            envelope,
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn submitted(&self) -> Vec<AgentRequest> {
        self.submitted.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Controller for MockController {
    async fn submit(&self, request: AgentRequest) -> ResponseEnvelope {
        if let Ok(mut submitted) = self.submitted.lock() {
            submitted.push(request);
        }
        self.envelope.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_llm_queue_then_rules() {
        let llm = MockLlm::constant("default")
            .then(MockReply::Text("first".into()))
            .on("title", MockReply::Text("A Title".into()));

        let first = llm.complete(CompletionRequest::new("anything")).await.unwrap();
        let titled = llm.complete(CompletionRequest::new("give a title")).await.unwrap();
        let other = llm.complete(CompletionRequest::new("other")).await.unwrap();

        assert_eq!(first.content, "first");
        assert_eq!(titled.content, "A Title");
        assert_eq!(other.content, "default");
        assert_eq!(llm.call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_tool_unavailable() {
        let tools = MockToolInvoker::new().with_tool("web-search", ToolOutput::text("ok"));
        let err = tools
            .invoke("pandoc_convert", Value::Null, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ToolUnavailable(_)));
        assert_eq!(tools.call_count(), 1);
    }
}
