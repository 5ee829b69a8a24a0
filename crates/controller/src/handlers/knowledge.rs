//! Questions about the agent itself, answered from reference knowledge.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use doc_agent_core::{
    template::PromptTemplates,
    traits::{CompletionRequest, HandlerInput, KnowledgeStore, LlmClient, SkillHandler},
    types::{HandlerContract, HandlerResult, Intent},
    Error, Result,
};

use crate::prompts::{KNOWLEDGE_SYSTEM, KNOWLEDGE_USER};

const MAX_TOKENS: u64 = 500;
const TEMPERATURE: f64 = 0.5;

pub struct KnowledgeHandler {
    contract: HandlerContract,
    llm: Arc<dyn LlmClient>,
    knowledge: Arc<dyn KnowledgeStore>,
    prompts: Arc<PromptTemplates>,
    agent_name: String,
    top_k: usize,
}

impl KnowledgeHandler {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        knowledge: Arc<dyn KnowledgeStore>,
        prompts: Arc<PromptTemplates>,
        agent_name: impl Into<String>,
    ) -> Self {
        let contract = HandlerContract::new(
            Intent::KnowledgeQa,
            "Agent Knowledge",
            "Explains what this agent can do, using its reference knowledge",
        )
        .with_example("What can you do?")
        .with_example("How do I ask you for a markdown document?");

        Self {
            contract,
            llm,
            knowledge,
            prompts,
            agent_name: agent_name.into(),
            top_k: 3,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }
}

#[async_trait]
impl SkillHandler for KnowledgeHandler {
    fn contract(&self) -> &HandlerContract {
        &self.contract
    }

    async fn handle(&self, input: &HandlerInput) -> Result<HandlerResult> {
        let question = input.question();
        let hits = self.knowledge.search(question, self.top_k).await?;
        tracing::debug!(request_id = %input.request_id, hits = hits.len(), "Knowledge search completed");

        let system = self
            .prompts
            .render(KNOWLEDGE_SYSTEM, &json!({ "agent_name": self.agent_name }))?;
        let prompt = self
            .prompts
            .render(KNOWLEDGE_USER, &json!({ "hits": hits, "question": question }))?;

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::default_prompts;
    use doc_agent_core::mocks::MockLlm;
    use doc_agent_core::types::{AgentRequest, ClassificationResult, ClassificationTier, KnowledgeHit};

    struct FixedKnowledge(Result<Vec<KnowledgeHit>>);

    #[async_trait]
    impl KnowledgeStore for FixedKnowledge {
        async fn search(&self, _query: &str, top_k: usize) -> Result<Vec<KnowledgeHit>> {
            match &self.0 {
                Ok(hits) => Ok(hits.iter().take(top_k).cloned().collect()),
                Err(e) => Err(Error::knowledge(e.to_string())),
            }
        }
    }

    fn hit(text: &str) -> KnowledgeHit {
        KnowledgeHit {
            text: text.to_string(),
            score: 0.9,
            category: None,
        }
    }

    fn input() -> HandlerInput {
        HandlerInput::new(
            "req-kb",
            AgentRequest::new("what can you do?"),
            ClassificationResult::new(Intent::KnowledgeQa, 0.9, ClassificationTier::Rules),
        )
    }

    #[tokio::test]
    async fn test_hits_reach_prompt() {
        let llm = Arc::new(MockLlm::constant("I write documents."));
        let knowledge = Arc::new(FixedKnowledge(Ok(vec![hit("Writes HTML documents"), hit("Searches the web")])));
        let h = KnowledgeHandler::new(llm.clone(), knowledge, Arc::new(default_prompts().unwrap()), "Doc Agent")
            .with_top_k(1);

        let result = h.handle(&input()).await.unwrap();

        assert_eq!(result.payload.as_text(), Some("I write documents."));
        let request = &llm.requests()[0];
        assert!(request.prompt.contains("- Writes HTML documents"));
        assert!(!request.prompt.contains("Searches the web"));
        assert!(request.system.as_deref().unwrap().starts_with("You are Doc Agent."));
    }

    #[tokio::test]
    async fn test_no_hits_still_answers() {
        let llm = Arc::new(MockLlm::constant("I am not sure."));
        let h = KnowledgeHandler::new(
            llm.clone(),
            Arc::new(FixedKnowledge(Ok(Vec::new()))),
            Arc::new(default_prompts().unwrap()),
            "Doc Agent",
        );

        h.handle(&input()).await.unwrap();
        assert!(llm.requests()[0].prompt.contains("(none found)"));
    }

    #[tokio::test]
    async fn test_search_failure_propagates() {
        let h = KnowledgeHandler::new(
            Arc::new(MockLlm::constant("unused")),
            Arc::new(FixedKnowledge(Err(Error::knowledge("index offline")))),
            Arc::new(default_prompts().unwrap()),
            "Doc Agent",
        );

        let err = h.handle(&input()).await.unwrap_err();
        assert!(matches!(err, Error::Knowledge(_)));
        assert!(err.is_transient());
    }
}
