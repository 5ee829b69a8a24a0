use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use doc_agent_core::config::{AppConfig, ServerConfig};
use doc_agent_core::mocks::{MockClassifier, MockController};
use doc_agent_core::types::{
    HandlerContract, HandlerResult, Intent, ResponseEnvelope, ServerStatus, ToolAvailability,
};
use doc_agent_core::Error;
use doc_agent_gateway::{AgentCard, GatewayServer};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app_with(envelope: ResponseEnvelope) -> (Router, Arc<MockController>) {
    let controller = Arc::new(MockController::new(envelope));
    let tools = Arc::new(
        ToolAvailability::empty()
            .with_server(ServerStatus::available("webresearch", vec!["web-search".into()]))
            .with_server(ServerStatus::unavailable("mcp-pandoc", vec!["pandoc_convert".into()], "spawn failed")),
    );
    let contracts = vec![HandlerContract::new(Intent::GeneralQa, "General Q&A", "Direct answers")];
    let card = AgentCard::build(&AppConfig::default(), &contracts, &tools);

    let server = GatewayServer::new(
        ServerConfig::default(),
        Arc::new(MockClassifier::new(Intent::WebSearch)),
        controller.clone(),
        tools,
        card,
    );
    (server.build_router(), controller)
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn post(uri: &str, content_type: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", content_type)
        .body(body.into())
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint_reports_tools() {
    let (app, _) = app_with(ResponseEnvelope::success("r", Intent::GeneralQa, HandlerResult::text("ok")));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["tools"]["webresearch"], "available");
    assert_eq!(json["tools"]["mcp-pandoc"], "unavailable");
}

#[tokio::test]
async fn test_agent_card_endpoint() {
    let (app, _) = app_with(ResponseEnvelope::success("r", Intent::GeneralQa, HandlerResult::text("ok")));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/.well-known/agent.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["name"], "Document Agent");
    assert_eq!(json["skills"][0]["id"], "general_qa");
    assert_eq!(json["skills"][1]["id"], "mcp_webresearch");
}

#[tokio::test]
async fn test_json_request_reaches_controller() {
    let (app, controller) = app_with(ResponseEnvelope::success(
        "r-1",
        Intent::GeneralQa,
        HandlerResult::text("Rust is a systems language."),
    ));

    let response = app
        .oneshot(post(
            "/",
            "application/json",
            json!({"question": "what is rust?", "context": {"lang": "en"}}).to_string(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["result"]["payload"]["data"], "Rust is a systems language.");

    let submitted = controller.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].question, "what is rust?");
    assert_eq!(submitted[0].context["lang"], "en");
}

#[tokio::test]
async fn test_plain_text_body_is_the_question() {
    let (app, controller) = app_with(ResponseEnvelope::success("r", Intent::GeneralQa, HandlerResult::text("hi")));

    let response = app
        .oneshot(post("/", "text/plain", "hello there"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(controller.submitted()[0].question, "hello there");
}

#[tokio::test]
async fn test_malformed_json_is_rejected_without_dispatch() {
    let (app, controller) = app_with(ResponseEnvelope::success("r", Intent::GeneralQa, HandlerResult::text("hi")));

    let response = app
        .oneshot(post("/", "application/json", r#"{"question": "#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["status"], "failure");
    assert_eq!(json["error_kind"], "validation");
    assert!(controller.submitted().is_empty());
}

#[tokio::test]
async fn test_blank_json_question_is_classification_error_whatever_else_is_sent() {
    let bodies = [
        json!({"question": "   ", "format": "pdf"}),
        json!({"question": "  ", "context": 5}),
        json!({"format": "html"}),
    ];

    for body in bodies {
        let (app, controller) = app_with(ResponseEnvelope::success("r", Intent::GeneralQa, HandlerResult::text("hi")));
        let response = app
            .oneshot(post("/", "application/json", body.to_string()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "for {}", body);
        let json = body_json(response).await;
        assert_eq!(json["status"], "failure");
        assert_eq!(json["error_kind"], "classification", "for {}", body);
        assert!(controller.submitted().is_empty());
    }
}

#[tokio::test]
async fn test_failure_envelopes_map_to_status_codes() {
    let cases = [
        (Error::classification("question is empty"), StatusCode::BAD_REQUEST),
        (Error::timeout(std::time::Duration::from_secs(60)), StatusCode::GATEWAY_TIMEOUT),
        (Error::upstream("model returned 503"), StatusCode::BAD_GATEWAY),
    ];

    for (error, expected) in cases {
        let (app, _) = app_with(ResponseEnvelope::failure("r", Some(Intent::DocumentGeneration), &error));
        let response = app
            .oneshot(post("/", "application/json", json!({"question": "x"}).to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), expected, "for {}", error);
    }
}

#[tokio::test]
async fn test_classify_endpoint() {
    let (app, _) = app_with(ResponseEnvelope::success("r", Intent::GeneralQa, HandlerResult::text("hi")));

    let response = app
        .clone()
        .oneshot(post("/v1/classify", "text/plain", "latest rust news"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["intent"], "web_search");

    let response = app
        .oneshot(post("/v1/classify", "text/plain", "   "))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["kind"], "classification");
}
