//! Rig LLM client adapter.
//!
//! Wraps Rig's Agent for integration with our LlmClient trait.

use std::time::Duration;

use async_trait::async_trait;

use doc_agent_core::{
    traits::{CompletionRequest, LlmClient, LlmResponse, LlmUsage},
    Error, Result,
};

// Import required Rig traits
use rig::client::{CompletionClient, EmbeddingsClient, ProviderClient};
use rig::completion::Prompt;

/// Provider type for Rig clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigProvider {
    OpenAI,
    Anthropic,
}

impl RigProvider {
    /// Environment variable holding the provider's API key.
    pub fn api_key_var(&self) -> &'static str {
        match self {
            RigProvider::OpenAI => "OPENAI_API_KEY",
            RigProvider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

impl std::str::FromStr for RigProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(RigProvider::OpenAI),
            "anthropic" => Ok(RigProvider::Anthropic),
            other => Err(Error::config(format!("unsupported model provider '{}'", other))),
        }
    }
}

/// Configuration for Rig client.
#[derive(Debug, Clone)]
pub struct RigConfig {
    /// Provider to use.
    pub provider: RigProvider,
    /// Model name.
    pub model: String,
}

impl RigConfig {
    /// Create config for OpenAI.
    pub fn openai(model: impl Into<String>) -> Self {
        Self {
            provider: RigProvider::OpenAI,
            model: model.into(),
        }
    }

    /// Create config for Anthropic.
    pub fn anthropic(model: impl Into<String>) -> Self {
        Self {
            provider: RigProvider::Anthropic,
            model: model.into(),
        }
    }
}

/// Rig-based LLM client.
///
/// Each completion builds a Rig agent with the request's preamble, temperature
/// and token limit, and bounds the call with the request timeout.
pub struct RigLlmClient {
    config: RigConfig,
}

impl RigLlmClient {
    /// Create a new Rig client with the given configuration.
    pub fn new(config: RigConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RigConfig {
        &self.config
    }

    fn ensure_key(&self) -> Result<()> {
        // Rig's from_env panics on a missing key.
        let var = self.config.provider.api_key_var();
        if std::env::var(var).is_err() {
            return Err(Error::upstream(format!("{} not set", var)));
        }
        Ok(())
    }

    /// Call OpenAI via Rig.
    async fn call_openai(&self, request: &CompletionRequest) -> Result<String> {
        use rig::providers::openai;

        let client = openai::Client::from_env();

        let mut agent_builder = client
            .agent(&self.config.model)
            .temperature(request.temperature)
            .max_tokens(request.max_tokens);

        if let Some(ref system) = request.system {
            agent_builder = agent_builder.preamble(system);
        }

        let agent = agent_builder.build();

        agent
            .prompt(request.prompt.as_str())
            .await
            .map_err(|e| Error::upstream(format!("OpenAI error: {}", e)))
    }

    /// Call Anthropic via Rig.
    async fn call_anthropic(&self, request: &CompletionRequest) -> Result<String> {
        use rig::providers::anthropic;

        let client = anthropic::Client::from_env();

        let mut agent_builder = client
            .agent(&self.config.model)
            .temperature(request.temperature)
            .max_tokens(request.max_tokens);

        if let Some(ref system) = request.system {
            agent_builder = agent_builder.preamble(system);
        }

        let agent = agent_builder.build();

        agent
            .prompt(request.prompt.as_str())
            .await
            .map_err(|e| Error::upstream(format!("Anthropic error: {}", e)))
    }
}

/// Rough token estimate; Rig's prompt API does not report usage.
fn estimate_usage(prompt: &str, completion: &str) -> LlmUsage {
    let prompt_tokens = (prompt.len() / 4) as u64;
    let completion_tokens = (completion.len() / 4) as u64;
    LlmUsage {
        prompt_tokens,
        completion_tokens,
        total_tokens: prompt_tokens + completion_tokens,
    }
}

#[async_trait]
impl LlmClient for RigLlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<LlmResponse> {
        self.ensure_key()?;

        tracing::debug!(
            provider = ?self.config.provider,
            model = %self.config.model,
            prompt_len = request.prompt.len(),
            max_tokens = request.max_tokens,
            "Calling LLM"
        );

        let call = async {
            match self.config.provider {
                RigProvider::OpenAI => self.call_openai(&request).await,
                RigProvider::Anthropic => self.call_anthropic(&request).await,
            }
        };

        let content = tokio::time::timeout(request.timeout, call)
            .await
            .map_err(|_| Error::timeout(request.timeout))??;

        let usage = estimate_usage(&request.prompt, &content);
        Ok(LlmResponse {
            content,
            finish_reason: "stop".to_string(),
            usage,
        })
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        use rig::embeddings::EmbeddingsBuilder;
        use rig::providers::openai;

        if std::env::var("OPENAI_API_KEY").is_err() {
            return Err(Error::upstream("OPENAI_API_KEY not set for embeddings"));
        }

        let client = openai::Client::from_env();
        let embedding_model = client.embedding_model(openai::TEXT_EMBEDDING_3_SMALL);

        let build = EmbeddingsBuilder::new(embedding_model)
            .document(text.to_string())
            .map_err(|e| Error::upstream(format!("Embedding builder error: {}", e)))?
            .build();

        let result = tokio::time::timeout(EMBED_TIMEOUT, build)
            .await
            .map_err(|_| Error::timeout(EMBED_TIMEOUT))?
            .map_err(|e| Error::upstream(format!("Embedding error: {}", e)))?;

        // Rig returns Vec<(document, OneOrMany<Embedding>)> with f64 vectors.
        if let Some((_, one_or_many)) = result.into_iter().next() {
            if let Some(embedding) = one_or_many.into_iter().next() {
                return Ok(embedding.vec.into_iter().map(|x| x as f32).collect());
            }
        }

        Err(Error::upstream("No embedding returned"))
    }
}

const EMBED_TIMEOUT: Duration = Duration::from_secs(20);
