//! Direct model answers. Also the landing spot for substitution and degradation.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use doc_agent_core::{
    template::PromptTemplates,
    traits::{CompletionRequest, HandlerInput, LlmClient, SkillHandler},
    types::{HandlerContract, HandlerResult, Intent},
    Error, Result,
};

use super::context_entries;
use crate::prompts::{GENERAL_SYSTEM, GENERAL_USER};

const MAX_TOKENS: u64 = 300;
const TEMPERATURE: f64 = 0.7;

pub struct GeneralQaHandler {
    contract: HandlerContract,
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptTemplates>,
    agent_name: String,
}

impl GeneralQaHandler {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptTemplates>, agent_name: impl Into<String>) -> Self {
        let contract = HandlerContract::new(
            Intent::GeneralQa,
            "General Q&A",
            "Answers general questions and small talk directly with the language model",
        )
        .with_example("Explain the difference between a process and a thread")
        .with_example("Hello!");

        Self {
            contract,
            llm,
            prompts,
            agent_name: agent_name.into(),
        }
    }
}

#[async_trait]
impl SkillHandler for GeneralQaHandler {
    fn contract(&self) -> &HandlerContract {
        &self.contract
    }

    async fn handle(&self, input: &HandlerInput) -> Result<HandlerResult> {
        let system = self.prompts.render(
            GENERAL_SYSTEM,
            &json!({
                "agent_name": self.agent_name,
                "degraded_from": input.degraded_from.map(|i| i.as_str()),
            }),
        )?;
        let prompt = self.prompts.render(
            GENERAL_USER,
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
                    .with_max_tokens(MAX_TOKENS)
                    .with_temperature(TEMPERATURE),
            )
            .await?;

        let answer = response.content.trim();
        if answer.is_empty() {
            return Err(Error::upstream("model returned an empty answer"));
        }
        Ok(HandlerResult::text(answer))
    }
}
