//! HTTP integration tests: drive the full middleware stack with
//! `tower::ServiceExt::oneshot`, no sockets involved.
//!
//! Run with:
//!   cargo test --test http

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, Response, StatusCode};
use common::{entry_names, Failure, FakeEngine};
use pagezip::server::{build_app, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const LIMIT: usize = 1024 * 1024;

// ── Test helpers ─────────────────────────────────────────────────────────────

async fn send(engine: &Arc<FakeEngine>, request: Request<Body>) -> Response<Body> {
    send_with_limit(engine, request, LIMIT).await
}

async fn send_with_limit(
    engine: &Arc<FakeEngine>,
    request: Request<Body>,
    limit: usize,
) -> Response<Body> {
    let app = build_app(AppState::new(engine.clone(), limit));
    app.oneshot(request).await.expect("router should respond")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("request should build")
}

fn post(uri: &str, body: &'static [u8]) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::from(body))
        .expect("request should build")
}

async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable")
        .to_vec()
}

async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).expect("body should be JSON")
}

fn three_pages() -> Arc<FakeEngine> {
    Arc::new(FakeEngine::with_pages(&[(40, 30), (30, 40), (20, 20)]))
}

// ── Probes ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_ok() {
    let response = send(&three_pages(), get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"status": "OK"}));
}

#[tokio::test]
async fn version_is_a_json_string() {
    let response = send(&three_pages(), get("/version")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!(pagezip::VERSION));
}

#[tokio::test]
async fn responses_are_not_cacheable() {
    let response = send(&three_pages(), get("/health")).await;
    assert_eq!(
        response.headers()[header::CACHE_CONTROL],
        "no-cache, no-store, must-revalidate"
    );
}

#[tokio::test]
async fn trailing_slash_is_ignored() {
    let response = send(&three_pages(), get("/health/")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ── Conversion ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn three_pages_with_defaults() {
    let engine = three_pages();
    let response = send(&engine, post("/convert", b"FAKE document")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");
    let archive = body_bytes(response).await;
    assert_eq!(entry_names(&archive), vec!["0000.jpg", "0001.jpg", "0002.jpg"]);
    assert_eq!(engine.opened(), 1);
    assert_eq!(engine.documents_released(), 1);
}

#[tokio::test]
async fn parameters_are_case_insensitive() {
    let engine = three_pages();
    let response = send(
        &engine,
        post("/convert/?format=png&layout=portrait&quality=90&density=72", b"FAKE"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let archive = body_bytes(response).await;
    assert_eq!(entry_names(&archive), vec!["0000.png", "0001.png", "0002.png"]);
    assert_eq!(*engine.resolution.lock().unwrap(), Some((72.0, 72.0)));
}

#[tokio::test]
async fn unknown_parameters_are_ignored() {
    let response = send(&three_pages(), post("/convert?colour=blue&format=", b"FAKE")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn bogus_format_is_rejected_before_the_engine_opens() {
    let engine = three_pages();
    let response = send(&engine, post("/convert?format=bogus", b"FAKE document")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({"error": "invalid output format"})
    );
    assert_eq!(engine.opened(), 0);
}

#[tokio::test]
async fn every_parameter_has_its_own_message() {
    for (query, message) in [
        ("density=abc", "invalid density"),
        ("quality=-1", "invalid compression quality"),
        ("quality=high", "invalid compression quality"),
        ("format=gif", "invalid output format"),
        ("layout=diagonal", "invalid output layout"),
    ] {
        let engine = three_pages();
        let response = send(&engine, post(&format!("/convert?{query}"), b"FAKE")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{query}");
        assert_eq!(body_json(response).await, json!({ "error": message }), "{query}");
        assert_eq!(engine.opened(), 0, "{query}");
    }
}

#[tokio::test]
async fn undecodable_body_is_a_server_error() {
    let engine = three_pages();
    let response = send(&engine, post("/convert", b"not a fake document")).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({"error": "failed to read image"})
    );
    assert_eq!(engine.documents_released(), 1);
}

#[tokio::test]
async fn page_failure_returns_no_archive() {
    let engine = Arc::new(FakeEngine::with_pages(&[(10, 10); 3]).failing(Failure::Serialize(1)));
    let response = send(&engine, post("/convert", b"FAKE")).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({"error": "failed to get output blob"})
    );
    assert_eq!(engine.pages_released(), engine.pages_extracted());
}

#[tokio::test]
async fn oversized_body_is_refused() {
    let engine = three_pages();
    let response = send_with_limit(&engine, post("/convert", b"FAKE and then some"), 8).await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(
        body_json(response).await,
        json!({"error": "request body too large"})
    );
    assert_eq!(engine.opened(), 0);
}

#[tokio::test]
async fn convert_requires_post() {
    let response = send(&three_pages(), get("/convert")).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
