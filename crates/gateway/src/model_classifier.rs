//! LLM-backed second classification tier.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use doc_agent_core::{
    config::ClassifierConfig,
    traits::{CompletionRequest, LlmClient, ModelClassifier},
    types::Intent,
    Error, Result,
};

const SYSTEM_PROMPT: &str = "You route questions for a document assistant. \
Answer with exactly one label and nothing else:\n\
DOCUMENT_GENERATION - the user wants an HTML or Markdown document written\n\
WEB_SEARCH - the answer needs current information from the web\n\
URL_SUMMARY - the user wants a specific web page summarized or explained\n\
KNOWLEDGE_QA - the user asks about this assistant, its skills or features\n\
GENERAL_QA - anything else";

/// Asks a model for one of the intent labels.
pub struct LlmModelClassifier {
    llm: Arc<dyn LlmClient>,
    timeout: Duration,
    max_tokens: u64,
}

impl LlmModelClassifier {
    pub fn new(llm: Arc<dyn LlmClient>, config: &ClassifierConfig) -> Self {
        Self {
            llm,
            timeout: config.model_timeout(),
            max_tokens: config.model_max_tokens,
        }
    }
}

#[async_trait]
impl ModelClassifier for LlmModelClassifier {
    async fn classify_with_model(&self, text: &str) -> Result<Intent> {
        let request = CompletionRequest::new(text)
            .with_system(SYSTEM_PROMPT)
            .with_max_tokens(self.max_tokens)
            .with_temperature(0.0)
            .with_timeout(self.timeout);

        let response = tokio::time::timeout(self.timeout, self.llm.complete(request))
            .await
            .map_err(|_| Error::timeout(self.timeout))??;

        Ok(parse_intent_label(&response.content))
    }
}

/// Map a model answer to an intent. Anything unrecognised is GeneralQa.
pub fn parse_intent_label(answer: &str) -> Intent {
    let first_line = answer.trim().lines().next().unwrap_or_default();
    let label = first_line
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_uppercase()
        .replace([' ', '-'], "_");

    Intent::from_label(&label).unwrap_or_else(|| {
        tracing::warn!(answer = %first_line, "Unrecognised intent label, using general_qa");
        Intent::GeneralQa
    })
}
