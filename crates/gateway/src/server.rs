//! Axum-based HTTP server for the agent.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use doc_agent_core::{
    config::ServerConfig,
    traits::{Controller, IntentClassifier},
    types::{AgentRequest, EnvelopeStatus, ResponseEnvelope, ToolAvailability},
    Error, ErrorKind, Result,
};
use doc_agent_governance::track_request;

use crate::agent_card::AgentCard;

/// Shared application state.
pub struct AppState {
    pub classifier: Arc<dyn IntentClassifier>,
    pub controller: Arc<dyn Controller>,
    /// Tool snapshot taken at startup.
    pub tools: Arc<ToolAvailability>,
    pub card: AgentCard,
    pub started: Instant,
}

/// HTTP front door.
pub struct GatewayServer {
    config: ServerConfig,
    state: Arc<AppState>,
    metrics_handle: Option<PrometheusHandle>,
}

impl GatewayServer {
    pub fn new(
        config: ServerConfig,
        classifier: Arc<dyn IntentClassifier>,
        controller: Arc<dyn Controller>,
        tools: Arc<ToolAvailability>,
        card: AgentCard,
    ) -> Self {
        Self {
            config,
            state: Arc::new(AppState {
                classifier,
                controller,
                tools,
                card,
                started: Instant::now(),
            }),
            metrics_handle: None,
        }
    }

    /// Expose `/metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    /// Build the Axum router.
    pub fn build_router(&self) -> Router {
        let mut router = Router::new()
            .route("/", post(agent_handler))
            .route("/v1/classify", post(classify_handler))
            .route("/health", get(health_handler))
            .route("/.well-known/agent.json", get(agent_card_handler))
            .with_state(self.state.clone());

        if let Some(handle) = &self.metrics_handle {
            let handle = handle.clone();
            router = router.route("/metrics", get(move || async move { handle.render() }));
        }

        if self.config.enable_cors {
            router = router.layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));
        }

        router.layer(TraceLayer::new_for_http())
    }

    /// Serve until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::gateway(format!("Failed to bind {}: {}", addr, e)))?;

        tracing::info!(addr = %addr, "Agent server starting");

        axum::serve(listener, self.build_router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Error::gateway(format!("Server error: {}", e)))?;

        tracing::info!("Agent server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    /// Tool server name to `available` / `unavailable`.
    pub tools: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub kind: ErrorKind,
    pub message: String,
}

/// Accept a JSON `AgentRequest` or a plain-text question.
fn parse_request(headers: &HeaderMap, body: &Bytes) -> Result<AgentRequest> {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/json"))
        .unwrap_or(false);
    let text = std::str::from_utf8(body).map_err(|_| Error::validation("request body is not UTF-8"))?;

    if is_json || text.trim_start().starts_with('{') {
        AgentRequest::from_json(text)
    } else {
        Ok(AgentRequest::new(text))
    }
}

/// HTTP status for an envelope.
pub fn status_for(envelope: &ResponseEnvelope) -> StatusCode {
    match envelope.status {
        EnvelopeStatus::Success | EnvelopeStatus::Partial => StatusCode::OK,
        EnvelopeStatus::Failure => match envelope.error_kind {
            Some(ErrorKind::Classification) | Some(ErrorKind::Validation) => StatusCode::BAD_REQUEST,
            Some(ErrorKind::Timeout) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        },
    }
}

// =============================================================================
// Handlers
// =============================================================================

async fn agent_handler(State(state): State<Arc<AppState>>, headers: HeaderMap, body: Bytes) -> Response {
    let started = Instant::now();

    let envelope = match parse_request(&headers, &body) {
        Ok(request) => state.controller.submit(request).await,
        Err(e) => {
            tracing::info!(error = %e, "Rejected malformed request");
            ResponseEnvelope::failure(Uuid::new_v4().to_string(), None, &e)
        }
    };

    let status = status_for(&envelope);
    track_request("POST", "/", status.as_u16(), started.elapsed().as_secs_f64());
    (status, Json(envelope)).into_response()
}

async fn classify_handler(State(state): State<Arc<AppState>>, headers: HeaderMap, body: Bytes) -> Response {
    let started = Instant::now();

    let outcome = match parse_request(&headers, &body) {
        Ok(request) => state.classifier.classify(&request).await,
        Err(e) => Err(e),
    };

    let response = match outcome {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => {
            let status = match e.kind() {
                ErrorKind::Classification | ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
                _ => StatusCode::BAD_GATEWAY,
            };
            let body = ErrorResponse {
                kind: e.kind(),
                message: e.to_string(),
            };
            (status, Json(body)).into_response()
        }
    };

    track_request("POST", "/v1/classify", response.status().as_u16(), started.elapsed().as_secs_f64());
    response
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let tools = state
        .tools
        .servers()
        .map(|s| {
            let status = if s.available { "available" } else { "unavailable" };
            (s.name.clone(), status.to_string())
        })
        .collect();

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.started.elapsed().as_secs(),
        tools,
    })
}

async fn agent_card_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.card.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_agent_core::types::{HandlerResult, Intent};

    #[test]
    fn test_status_mapping() {
        let ok = ResponseEnvelope::success("r1", Intent::GeneralQa, HandlerResult::text("hi"));
        assert_eq!(status_for(&ok), StatusCode::OK);

        let partial = ResponseEnvelope::partial("r2", Intent::WebSearch, HandlerResult::text("hi"), "degraded");
        assert_eq!(status_for(&partial), StatusCode::OK);

        let bad = ResponseEnvelope::failure("r3", None, &Error::classification("empty"));
        assert_eq!(status_for(&bad), StatusCode::BAD_REQUEST);

        let slow = ResponseEnvelope::failure("r4", Some(Intent::DocumentGeneration), &Error::timeout(std::time::Duration::from_secs(60)));
        assert_eq!(status_for(&slow), StatusCode::GATEWAY_TIMEOUT);

        let upstream = ResponseEnvelope::failure("r5", Some(Intent::DocumentGeneration), &Error::upstream("503"));
        assert_eq!(status_for(&upstream), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_parse_plain_text_and_json() {
        let empty = HeaderMap::new();
        let request = parse_request(&empty, &Bytes::from_static(b"what is rust?")).unwrap();
        assert_eq!(request.question, "what is rust?");

        let request = parse_request(&empty, &Bytes::from_static(br#"{"question": "hi", "format": "md"}"#)).unwrap();
        assert_eq!(request.question, "hi");
        assert!(request.format.is_some());

        let err = parse_request(&empty, &Bytes::from_static(b"{not json")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
