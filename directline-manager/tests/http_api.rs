use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use directline_channels::{DirectLineSession, SessionHandle};
use directline_core::config::{DirectLineConfig, GatewayConfig};
use directline_manager::{build_router, routes, serve, AppState};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN_PATH: &str = "/v3/directline/tokens/generate";
const CONVERSATIONS_PATH: &str = "/v3/directline/conversations";
const ACTIVITIES_PATH: &str = "/v3/directline/conversations/C1/activities";

async fn upstream() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "T1" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(CONVERSATIONS_PATH))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "conversationId": "C1" })))
        .mount(&server)
        .await;
    server
}

async fn state_for(server: &MockServer) -> AppState {
    let config = DirectLineConfig {
        secret: "S".to_string(),
        bot_endpoint: format!("{}{}", server.uri(), CONVERSATIONS_PATH),
        token_endpoint: format!("{}{}", server.uri(), TOKEN_PATH),
        poll_interval_ms: 10,
        ..DirectLineConfig::default()
    };
    let session = DirectLineSession::connect(&config).await.expect("connect");
    let (handle, _task) = SessionHandle::spawn(session);
    AppState::new(handle, &GatewayConfig::default())
}

async fn app_for(server: &MockServer) -> Router {
    build_router(state_for(server).await)
}

/// Accept the outbound message and never answer it
async fn mount_silent_bot(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(ACTIVITIES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "C1|1" })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(ACTIVITIES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "activities": [] })))
        .mount(server)
        .await;
}

async fn wait_for_poll(server: &MockServer) {
    for _ in 0..100 {
        let requests = server.received_requests().await.unwrap_or_default();
        if requests.iter().any(|r| r.method.as_str() == "GET") {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("session never started polling");
}

async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_and_root() {
    let server = upstream().await;
    let app = app_for(&server).await;

    let (status, body) = call(app.clone(), get("/checkHealth")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "healthy" }));

    let (status, body) = call(app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("Welcome"));
}

#[tokio::test]
async fn test_api_info_reports_gateway_metadata() {
    let server = upstream().await;
    let app = app_for(&server).await;

    let (status, body) = call(app, get("/api-info")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Direct Line Bridge");
    assert_eq!(body["version"], "1.0.0");
    assert_eq!(body["contact"]["email"], "support@example.com");
}

#[tokio::test]
async fn test_index_lists_every_route() {
    let server = upstream().await;
    let app = app_for(&server).await;

    let (status, body) = call(app, get("/index")).await;
    assert_eq!(status, StatusCode::OK);

    let routes = body["routes"].as_array().unwrap();
    assert_eq!(routes.len(), directline_manager::routes().len());
    assert!(routes
        .iter()
        .any(|r| r["path"] == "/send" && r["methods"] == json!(["POST"])));
}

#[tokio::test]
async fn test_every_listed_route_is_mounted() {
    let server = upstream().await;
    let app = app_for(&server).await;

    for route in routes().iter().filter(|r| r.methods.contains(&"GET")) {
        let (status, _) = call(app.clone(), get(route.path)).await;
        assert_eq!(status, StatusCode::OK, "route {}", route.path);
    }
}

#[tokio::test]
async fn test_listed_methods_match_mounted_methods() {
    let server = upstream().await;
    let app = app_for(&server).await;

    for route in routes() {
        for listed in route.methods {
            let request = Request::builder()
                .method(*listed)
                .uri(route.path)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap();
            let (status, _) = call(app.clone(), request).await;
            assert_ne!(status, StatusCode::NOT_FOUND, "{} {}", listed, route.path);
            assert_ne!(status, StatusCode::METHOD_NOT_ALLOWED, "{} {}", listed, route.path);
        }
    }

    let (status, _) = call(app, get("/send")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_send_returns_bot_reply() {
    let server = upstream().await;
    Mock::given(method("POST"))
        .and(path(ACTIVITIES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "C1|1" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(ACTIVITIES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "activities": [
                {"id": "C1|1", "type": "message", "from": {"id": "user1"}, "text": "hi"},
                {
                    "id": "C1|2",
                    "type": "message",
                    "from": {"id": "bot"},
                    "text": "hello",
                    "entities": [{"type": "https://schema.org/Message", "citation": {"name": "doc"}}]
                }
            ]
        })))
        .mount(&server)
        .await;
    let app = app_for(&server).await;

    let (status, body) = call(app, post_json("/send", json!({ "message": "hi", "name": "Ada" }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "bot_response": "hello",
            "citations": {"name": "doc"},
            "conversationId": "C1",
            "name": "Ada"
        })
    );
}

#[tokio::test]
async fn test_send_with_empty_reply_text() {
    let server = upstream().await;
    Mock::given(method("POST"))
        .and(path(ACTIVITIES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "C1|1" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(ACTIVITIES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "activities": [{"id": "C1|2", "type": "message", "from": {"id": "bot"}}]
        })))
        .mount(&server)
        .await;
    let app = app_for(&server).await;

    let (status, body) = call(app, post_json("/send", json!({ "message": "hi" }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bot_response"], "No response from the bot.");
    assert_eq!(body["citations"], Value::Null);
    assert_eq!(body["name"], Value::Null);
}

#[tokio::test]
async fn test_send_upstream_failure_is_500_with_detail() {
    let server = upstream().await;
    Mock::given(method("POST"))
        .and(path(ACTIVITIES_PATH))
        .respond_with(ResponseTemplate::new(502).set_body_string("bot unavailable"))
        .mount(&server)
        .await;
    let app = app_for(&server).await;

    let (status, body) = call(app, post_json("/send", json!({ "message": "hi" }))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.contains("502"));
    assert!(detail.contains("bot unavailable"));
}

#[tokio::test]
async fn test_send_rejects_missing_message() {
    let server = upstream().await;
    let app = app_for(&server).await;

    let (status, _) = call(app, post_json("/send", json!({ "name": "Ada" }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_abandoned_send_releases_the_session() {
    let server = upstream().await;
    mount_silent_bot(&server).await;
    let app = app_for(&server).await;

    let abandoned = tokio::time::timeout(
        Duration::from_millis(200),
        call(app.clone(), post_json("/send", json!({ "message": "first" }))),
    )
    .await;
    assert!(abandoned.is_err());

    Mock::given(method("GET"))
        .and(path(ACTIVITIES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "activities": [{"id": "C1|2", "type": "message", "from": {"id": "bot"}, "text": "hello"}]
        })))
        .with_priority(1)
        .mount(&server)
        .await;

    let (status, body) = tokio::time::timeout(
        Duration::from_secs(5),
        call(app, post_json("/send", json!({ "message": "second" }))),
    )
    .await
    .expect("session still busy with the abandoned request");

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bot_response"], "hello");
}

#[tokio::test]
async fn test_shutdown_completes_with_send_in_flight() {
    let server = upstream().await;
    mount_silent_bot(&server).await;
    let state = state_for(&server).await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let gateway = tokio::spawn(serve(listener, state, shutdown_rx));

    let pending = tokio::spawn(async move {
        reqwest::Client::new()
            .post(format!("http://{}/send", addr))
            .json(&json!({ "message": "hi" }))
            .send()
            .await
    });
    wait_for_poll(&server).await;

    shutdown_tx.send(()).unwrap();
    let stopped = tokio::time::timeout(Duration::from_secs(3), gateway)
        .await
        .expect("graceful shutdown hung on the pending /send");
    assert!(stopped.unwrap().is_ok());

    let response = pending.await.unwrap().unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    assert!(body["detail"].as_str().unwrap().contains("cancelled"));
}
