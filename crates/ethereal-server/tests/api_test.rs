//! Router-level tests: requests go through the full axum stack via `oneshot`.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use ethereal_core::config::EtherealConfig;
use ethereal_server::metrics::ApiMetrics;
use ethereal_server::{router, AppState};
use ethereal_store::{KvStore, MemoryStore};
use serde_json::{json, Value};
use tower::ServiceExt;

fn config(remote_enabled: bool) -> EtherealConfig {
    let mut config = EtherealConfig::default();
    config.local.cookie.secret = Some("test-cookie-secret".into());
    config.remote.enabled = remote_enabled;
    config.remote.default_ttl_secs = 1000;
    config.remote.max_ttl_secs = 5000;
    config.remote.max_length = 128;
    config
}

fn app_with(remote_enabled: bool) -> (Arc<MemoryStore>, Router) {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(&config(remote_enabled), store.clone(), ApiMetrics::default()).unwrap();
    (store, router(state))
}

fn app() -> (Arc<MemoryStore>, Router) {
    app_with(true)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, body)
}

fn post(body: Value) -> Request<Body> {
    Request::post("/")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn create(app: &Router, body: Value) -> String {
    let (status, _, body) = send(app, post(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    body["key"].as_str().unwrap().to_string()
}

// ── Session secret ───────────────────────────────────────────────────────

#[tokio::test]
async fn session_key_is_stable_for_a_session() {
    let (_, app) = app();

    let (status, headers, body) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    let key = body["key"].as_str().unwrap().to_string();
    let set_cookie = headers[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(set_cookie.contains("HttpOnly"));

    let cookie = set_cookie.split(';').next().unwrap().to_string();
    let request = Request::get("/")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["key"], key);
    assert!(headers.get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn new_session_per_cookieless_request() {
    let (_, app) = app();
    let (_, _, a) = send(&app, get("/")).await;
    let (_, _, b) = send(&app, get("/")).await;
    assert_ne!(a["key"], b["key"]);
}

#[tokio::test]
async fn forged_cookie_starts_new_session() {
    let (_, app) = app();
    let request = Request::get("/")
        .header(header::COOKIE, "sessionid=chosen.AAAA")
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    let set_cookie = headers[header::SET_COOKIE].to_str().unwrap();
    assert!(!set_cookie.starts_with("sessionid=chosen."));
}

#[tokio::test]
async fn security_headers_are_set() {
    let (_, app) = app();
    let (_, headers, _) = send(&app, get("/")).await;
    assert_eq!(headers[header::CACHE_CONTROL], "no-store");
    assert_eq!(headers[header::REFERRER_POLICY], "no-referrer");
    assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(headers[header::CONTENT_SECURITY_POLICY], "default-src 'self'");
}

// ── Remote secrets ───────────────────────────────────────────────────────

#[tokio::test]
async fn create_retrieve_delete() {
    let (_, app) = app();

    let (status, _, body) = send(&app, post(json!({"data": "envelope"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let key = body["key"].as_str().unwrap().to_string();
    assert!(ethereal_core::is_uuid(&key));
    assert!(body["expiryDate"].as_str().unwrap().ends_with("GMT"));

    let (status, _, body) = send(&app, get(&format!("/{key}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], "envelope");
    assert!(body["expiryDate"].is_string());

    let (status, _, _) = send(&app, delete(&format!("/{key}"))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(&app, get(&format!("/{key}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // deleting again is fine
    let (status, _, _) = send(&app, delete(&format!("/{key}"))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn create_rejects_bad_payloads() {
    let (_, app) = app();
    for body in [json!({}), json!({"data": ""}), json!({"data": "x".repeat(129)})] {
        let (status, _, _) = send(&app, post(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let request = Request::post("/").body(Body::from("not json")).unwrap();
    let (status, _, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ttl_falls_back_to_default() {
    let (store, app) = app();
    for ttl in [json!(999_999), json!("foo"), json!(-1), json!(1.5)] {
        let key = create(&app, json!({"data": "envelope", "ttl": ttl})).await;
        assert_eq!(store.ttl(&format!("remote:{key}")).await.unwrap(), 1000);
    }
    let key = create(&app, json!({"data": "envelope", "ttl": 1337})).await;
    assert_eq!(store.ttl(&format!("remote:{key}")).await.unwrap(), 1337);
}

#[tokio::test]
async fn malformed_key_is_rejected() {
    let (_, app) = app();
    let (status, _, _) = send(&app, get("/foobar")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _, _) = send(&app, delete("/foobar")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_key_is_not_found() {
    let (_, app) = app();
    let (status, _, _) = send(&app, get("/decafbad-dead-dead-dead-decafbadadad")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn second_factor_is_enforced() {
    let (store, app) = app();
    let key = create(&app, json!({"data": "envelope", "secondFactor": "a b&c"})).await;

    let sf_key = format!("remote:{key}:secondFactor");
    assert_eq!(
        store.ttl(&sf_key).await.unwrap(),
        store.ttl(&format!("remote:{key}")).await.unwrap()
    );

    for query in ["", "?secondFactor=nope", "?secondFactor=a%20b%26c&secondFactor=a%20b%26c"] {
        let (status, _, _) = send(&app, get(&format!("/{key}{query}"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "GET {query}");
        let (status, _, _) = send(&app, delete(&format!("/{key}{query}"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "DELETE {query}");
    }

    let (status, _, body) = send(&app, get(&format!("/{key}?secondFactor=a%20b%26c"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], "envelope");

    let (status, _, _) = send(&app, delete(&format!("/{key}?secondFactor=a%20b%26c"))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!store.exists(&sf_key).await.unwrap());
    assert!(!store.exists(&format!("remote:{key}")).await.unwrap());
}

#[tokio::test]
async fn numeric_second_factor_is_stored_as_text() {
    let (_, app) = app();
    let key = create(&app, json!({"data": "envelope", "secondFactor": 1234})).await;

    let (status, _, _) = send(&app, get(&format!("/{key}"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _, body) = send(&app, get(&format!("/{key}?secondFactor=1234"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], "envelope");

    // a structured second factor is still a bad request
    let (status, _, _) = send(&app, post(json!({"data": "envelope", "secondFactor": [1]}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn trailing_slash_after_key() {
    let (store, app) = app();
    let key = create(&app, json!({"data": "envelope"})).await;

    let (status, _, body) = send(&app, get(&format!("/{key}/"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], "envelope");

    let (status, _, _) = send(&app, delete(&format!("/{key}/"))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!store.exists(&format!("remote:{key}")).await.unwrap());

    let (status, _, _) = send(&app, get("/foobar/")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn remote_routes_absent_when_disabled() {
    let (_, app) = app_with(false);

    let (status, _, body) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["key"].is_string());

    let (status, _, _) = send(&app, post(json!({"data": "envelope"}))).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    let (status, _, _) = send(&app, get("/decafbad-dead-dead-dead-decafbadadad")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
