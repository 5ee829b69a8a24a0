//! Request dispatcher.
//!
//! Classifies a request, resolves the handler registered for its intent and
//! invokes it under a per-intent timeout. Transient failures get exactly one
//! retry; after that, capabilities that depend on external tools degrade to a
//! direct model answer while document generation fails outright.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::Instrument;
use uuid::Uuid;

use doc_agent_core::{
    config::DispatcherConfig,
    text::find_link,
    traits::{Controller, HandlerInput, IntentClassifier, SkillHandler},
    types::{
        AgentRequest, HandlerResult, InputRequirement, Intent, RequestState, ResponseEnvelope,
        ToolAvailability,
    },
    Error, Result,
};
use doc_agent_governance::track_dispatch;

use crate::registry::CapabilityRegistry;

const MAX_ATTEMPTS: u32 = 2;

/// Per-request bookkeeping.
struct Run {
    request_id: String,
    state: RequestState,
    attempts: u32,
}

impl Run {
    fn new() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            state: RequestState::Received,
            attempts: 0,
        }
    }

    fn advance(&mut self, next: RequestState) {
        if let Err(e) = self.state.advance(next) {
            tracing::error!(request_id = %self.request_id, error = %e, "Dispatcher state machine violated");
        }
    }

    fn fail(&mut self, intent: Option<Intent>, error: &Error) -> ResponseEnvelope {
        self.advance(RequestState::Failed);
        ResponseEnvelope::failure(self.request_id.clone(), intent, error).with_attempts(self.attempts)
    }
}

/// Why a request is being answered by the fallback handler.
enum Substitute {
    /// No handler registered for the intent.
    Unregistered,
    /// Handler exists but its capability is down.
    Degraded(String),
    /// The request lacks the input the handler needs.
    Rerouted(String),
}

pub struct Dispatcher {
    classifier: Arc<dyn IntentClassifier>,
    registry: Arc<CapabilityRegistry>,
    tools: Arc<ToolAvailability>,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(
        classifier: Arc<dyn IntentClassifier>,
        registry: Arc<CapabilityRegistry>,
        tools: Arc<ToolAvailability>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            classifier,
            registry,
            tools,
            config,
        }
    }

    async fn dispatch(&self, run: &mut Run, request: AgentRequest) -> ResponseEnvelope {
        if let Err(e) = request.validate(self.config.max_context_entries) {
            tracing::info!(request_id = %run.request_id, error = %e, "Request rejected");
            return run.fail(None, &e);
        }

        let classification = match self.classifier.classify(&request).await {
            Ok(c) => c,
            Err(e) => {
                tracing::info!(request_id = %run.request_id, error = %e, "Classification failed");
                return run.fail(None, &e);
            }
        };
        run.advance(RequestState::Classified);

        let intent = classification.intent;
        tracing::info!(
            request_id = %run.request_id,
            intent = %intent,
            tier = classification.tier.as_str(),
            confidence = classification.confidence,
            "Request classified"
        );

        let input = HandlerInput::new(run.request_id.clone(), request, classification.clone());
        let envelope = match self.registry.resolve(intent) {
            Ok(handler) => self.run_handler(run, intent, handler, input).await,
            Err(e) => {
                tracing::warn!(request_id = %run.request_id, intent = %intent, error = %e, "Using fallback handler");
                self.substitute(run, intent, input, Substitute::Unregistered).await
            }
        };
        envelope.with_classification(classification)
    }

    async fn run_handler(
        &self,
        run: &mut Run,
        intent: Intent,
        handler: Arc<dyn SkillHandler>,
        input: HandlerInput,
    ) -> ResponseEnvelope {
        let missing = self.tools.missing(&handler.contract().required_tools);
        if !missing.is_empty() {
            let reason = format!("required tools unavailable: {}", missing.join(", "));
            if intent.is_degradable() {
                tracing::warn!(request_id = %run.request_id, intent = %intent, %reason, "Degrading without invoking handler");
                return self.substitute(run, intent, input, Substitute::Degraded(reason)).await;
            }
            let error = Error::tool_unavailable(missing.join(", "));
            return run.fail(Some(intent), &error);
        }

        if handler.contract().input == InputRequirement::QuestionWithUrl && find_link(input.question()).is_none() {
            tracing::info!(request_id = %run.request_id, intent = %intent, "No link in question, rerouting");
            let reason = "the question contains no link".to_string();
            return self.substitute(run, intent, input, Substitute::Rerouted(reason)).await;
        }

        run.advance(RequestState::Dispatched);
        let timeout = self.config.timeout_for(intent);
        let mut last_error = None;

        while run.attempts < MAX_ATTEMPTS {
            run.attempts += 1;
            let attempt = run.attempts;
            match invoke(handler.as_ref(), &input, timeout).await {
                Ok(result) => {
                    run.advance(RequestState::Succeeded);
                    return ResponseEnvelope::success(run.request_id.clone(), intent, result)
                        .with_attempts(run.attempts);
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!(request_id = %run.request_id, intent = %intent, attempt, error = %e, "Handler attempt failed");
                    last_error = Some(e);
                }
                Err(e) => {
                    tracing::warn!(request_id = %run.request_id, intent = %intent, attempt, error = %e, "Handler failed, not retrying");
                    return run.fail(Some(intent), &e);
                }
            }
        }

        let error = last_error.unwrap_or_else(|| Error::internal("handler was never invoked"));
        if intent.is_degradable() {
            let reason = error.to_string();
            return self.substitute(run, intent, input, Substitute::Degraded(reason)).await;
        }
        run.fail(Some(intent), &error)
    }

    /// Answer through the GeneralQa handler; always at most one attempt.
    async fn substitute(
        &self,
        run: &mut Run,
        intent: Intent,
        input: HandlerInput,
        why: Substitute,
    ) -> ResponseEnvelope {
        let fallback = self.registry.fallback();
        let input = match why {
            Substitute::Unregistered | Substitute::Rerouted(_) => input,
            Substitute::Degraded(_) => input.degraded_from(intent),
        };

        if run.state == RequestState::Classified {
            run.advance(RequestState::Dispatched);
        }
        run.attempts += 1;

        let timeout = self.config.timeout_for(Intent::GeneralQa);
        match invoke(fallback.as_ref(), &input, timeout).await {
            Ok(result) => {
                let reason = match why {
                    Substitute::Unregistered => {
                        format!("no handler registered for {}; answered by general_qa", intent)
                    }
                    Substitute::Degraded(cause) => {
                        format!("{} unavailable ({}); answered directly by the model", intent, cause)
                    }
                    Substitute::Rerouted(cause) => {
                        format!("{} not possible ({}); answered by general_qa", intent, cause)
                    }
                };
                run.advance(RequestState::Degraded);
                ResponseEnvelope::partial(run.request_id.clone(), intent, result, reason)
                    .with_attempts(run.attempts)
            }
            Err(e) => {
                tracing::warn!(request_id = %run.request_id, intent = %intent, error = %e, "Fallback handler failed");
                run.fail(Some(intent), &e)
            }
        }
    }
}

/// One bounded handler call; the future is dropped on timeout.
async fn invoke(handler: &dyn SkillHandler, input: &HandlerInput, timeout: Duration) -> Result<HandlerResult> {
    let result = tokio::time::timeout(timeout, handler.handle(input))
        .await
        .map_err(|_| Error::timeout(timeout))??;
    if result.is_empty() {
        return Err(Error::upstream(format!("{} returned an empty result", handler.contract().intent)));
    }
    Ok(result)
}

#[async_trait]
impl Controller for Dispatcher {
    async fn submit(&self, request: AgentRequest) -> ResponseEnvelope {
        let started = Instant::now();
        let mut run = Run::new();
        let span = tracing::info_span!("dispatch", request_id = %run.request_id);

        let mut envelope = self.dispatch(&mut run, request).instrument(span).await;
        envelope.state = run.state;
        envelope.attempts = run.attempts;

        let intent = envelope
            .classification
            .as_ref()
            .map(|c| c.intent.as_str())
            .unwrap_or("unclassified");
        let latency = started.elapsed().as_secs_f64();
        track_dispatch(intent, envelope.status.as_str(), run.attempts, latency);
        tracing::info!(
            request_id = %envelope.request_id,
            intent,
            status = envelope.status.as_str(),
            attempts = run.attempts,
            latency_ms = (latency * 1000.0) as u64,
            "Request finished"
        );
        envelope
    }
}
