// ABOUTME: Integration tests for the webhook HTTP surface.
// ABOUTME: Drives the axum router directly and checks status codes and callbacks.

mod support;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use redeploy::config::Config;
use redeploy::index::ImageIndex;
use redeploy::redeploy::Redeployer;
use redeploy::server::{self, AppState};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use support::{Call, FakeEngine, Op, RecordingNotifier};
use tokio::sync::mpsc::UnboundedReceiver;
use tower::ServiceExt;

const CONFIG: &str = r#"
services:
  web:
    image: acme/app
"#;

fn app(engine: Arc<FakeEngine>, path: &str) -> (axum::Router, UnboundedReceiver<String>) {
    let config = Config::from_yaml(CONFIG).unwrap();
    let index = Arc::new(ImageIndex::new(&config.services));
    let redeployer = Arc::new(Redeployer::new(engine, index));
    let (notifier, callbacks) = RecordingNotifier::new();
    let state = AppState::new(redeployer, Arc::new(notifier));
    (server::router(state, path), callbacks)
}

fn push(repo_name: &str, tag: &str) -> String {
    json!({
        "callback_url": "http://cb/done",
        "push_data": { "tag": tag, "pusher": "ci", "pushed_at": 1_700_000_000 },
        "repository": { "repo_name": repo_name, "is_private": true }
    })
    .to_string()
}

fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

async fn next_callback(callbacks: &mut UnboundedReceiver<String>) -> Option<String> {
    tokio::time::timeout(Duration::from_secs(1), callbacks.recv())
        .await
        .ok()
        .flatten()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn handled_push_answers_ok_and_calls_back() {
    support::init_tracing();
    let engine = Arc::new(FakeEngine::new().with_container("old-web", "web"));
    let (app, mut callbacks) = app(engine.clone(), "/");

    let response = app.oneshot(post("/", push("acme/app", "latest"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "");
    assert_eq!(next_callback(&mut callbacks).await.as_deref(), Some("http://cb/done"));
    assert_eq!(
        engine.calls(),
        vec![
            Call::Pull("acme/app:latest".to_string()),
            Call::List,
            Call::Stop("old-web".to_string()),
            Call::Remove("old-web".to_string()),
            Call::Create("web".to_string()),
            Call::Start("new-web".to_string()),
        ]
    );
}

#[tokio::test]
async fn untracked_push_answers_ok_with_one_callback() {
    let engine = Arc::new(FakeEngine::new());
    let (app, mut callbacks) = app(engine.clone(), "/");

    let response = app.oneshot(post("/", push("acme/other", "latest"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    drop(response);
    assert_eq!(next_callback(&mut callbacks).await.as_deref(), Some("http://cb/done"));
    assert_eq!(next_callback(&mut callbacks).await, None);
    assert!(engine.mutations().is_empty());
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let engine = Arc::new(FakeEngine::new());
    let (app, mut callbacks) = app(engine.clone(), "/");

    let response = app.oneshot(post("/", "{not json")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "invalid request");
    assert_eq!(next_callback(&mut callbacks).await, None);
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn missing_tag_is_rejected() {
    let engine = Arc::new(FakeEngine::new());
    let (app, _callbacks) = app(engine.clone(), "/");
    let body = json!({
        "callback_url": "http://cb/done",
        "push_data": {},
        "repository": { "repo_name": "acme/app" }
    })
    .to_string();

    let response = app.oneshot(post("/", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn create_failure_is_an_internal_error_without_callback() {
    let engine = Arc::new(FakeEngine::new().failing(Op::Create));
    let (app, mut callbacks) = app(engine.clone(), "/");

    let response = app.oneshot(post("/", push("acme/app", "latest"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, "internal error");
    assert_eq!(next_callback(&mut callbacks).await, None);
}

#[tokio::test]
async fn pull_failure_is_an_internal_error() {
    let engine = Arc::new(FakeEngine::new().failing(Op::Pull));
    let (app, mut callbacks) = app(engine.clone(), "/");

    let response = app.oneshot(post("/", push("acme/app", "latest"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(next_callback(&mut callbacks).await, None);
    assert_eq!(engine.calls(), vec![Call::Pull("acme/app:latest".to_string())]);
}

#[tokio::test]
async fn stop_failure_still_calls_back() {
    let engine = Arc::new(
        FakeEngine::new()
            .with_container("old-web", "web")
            .failing(Op::Stop),
    );
    let (app, mut callbacks) = app(engine, "/");

    let response = app.oneshot(post("/", push("acme/app", "latest"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    drop(response);
    assert_eq!(next_callback(&mut callbacks).await.as_deref(), Some("http://cb/done"));
}

#[tokio::test]
async fn callback_waits_for_the_response_to_be_sent() {
    let engine = Arc::new(FakeEngine::new());
    let (app, mut callbacks) = app(engine, "/");

    let response = app.oneshot(post("/", push("acme/app", "latest"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let early = tokio::time::timeout(Duration::from_millis(100), callbacks.recv()).await;
    assert!(early.is_err(), "callback sent before the response body was consumed");

    assert_eq!(body_text(response).await, "");
    assert_eq!(next_callback(&mut callbacks).await.as_deref(), Some("http://cb/done"));
}

#[tokio::test]
async fn serves_on_configured_path() {
    let engine = Arc::new(FakeEngine::new());
    let (app, _callbacks) = app(engine, "hooks/docker");

    let response = app
        .clone()
        .oneshot(post("/hooks/docker", push("acme/other", "latest")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(post("/", push("acme/other", "latest"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn only_post_is_routed() {
    let engine = Arc::new(FakeEngine::new());
    let (app, _callbacks) = app(engine, "/");

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
