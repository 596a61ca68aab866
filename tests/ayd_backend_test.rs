//! Integration tests for the AskYourDatabase HTTP client.
//!
//! An axum app on a loopback port plays the backend: session creation, a
//! login callback that sets the token cookie on a redirect, and an SSE ask
//! endpoint that rejects unknown tokens with 401.

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::StreamExt;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use ayd_relay::backend::{AnswerFragment, BackendError};
use ayd_relay::{
    AydBackend, CsvSessionStore, GatewayConfig, GatewaySettings, QueryBackend, SessionGateway,
    SessionStore,
};

const API_KEY: &str = "test-key";
const ISSUED_TOKEN: &str = "tok-abc";

// ============================================================================
// Fake backend server
// ============================================================================

#[derive(Default)]
struct Counters {
    sessions: AtomicUsize,
    asks: AtomicUsize,
}

#[derive(Clone)]
struct FakeState {
    base: String,
    counters: Arc<Counters>,
}

async fn create_session(
    State(state): State<FakeState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.counters.sessions.fetch_add(1, Ordering::SeqCst);

    let expected = format!("Bearer {}", API_KEY);
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(expected.as_str());
    if !authorized {
        return (StatusCode::FORBIDDEN, "bad key").into_response();
    }
    if body["chatbotid"] != "bot-1" {
        return (StatusCode::BAD_REQUEST, "bad bot").into_response();
    }

    Json(json!({ "url": format!("{}/login?code=xyz", state.base) })).into_response()
}

async fn login(Query(params): Query<HashMap<String, String>>) -> Response {
    if params.get("code").map(String::as_str) != Some("xyz") {
        return (StatusCode::BAD_REQUEST, "bad code").into_response();
    }
    (
        StatusCode::FOUND,
        [
            (
                header::SET_COOKIE,
                format!("accessToken={}; Path=/; HttpOnly", ISSUED_TOKEN),
            ),
            (header::LOCATION, "/chat".to_string()),
        ],
    )
        .into_response()
}

async fn chat() -> &'static str {
    "<html></html>"
}

async fn ask(State(state): State<FakeState>, headers: HeaderMap) -> Response {
    state.counters.asks.fetch_add(1, Ordering::SeqCst);

    let token = headers
        .get("x-ayd-access-token")
        .and_then(|v| v.to_str().ok());
    if token != Some(ISSUED_TOKEN) {
        return (StatusCode::UNAUTHORIZED, "expired").into_response();
    }

    let events = vec![
        Event::default().data(r#"{"isText": true, "content": "Hel"}"#),
        Event::default().comment("keep-alive"),
        Event::default().data(r#"{"isText": false, "content": "SELECT 1"}"#),
        Event::default().data(r#"{"isText": true, "content": "lo"}"#),
        Event::default().data(r#"{"isText": true, "content": " world"}"#),
    ];
    Sse::new(futures::stream::iter(events.into_iter().map(Ok::<_, Infallible>))).into_response()
}

/// Start the fake backend, returning its base URL
async fn spawn_server() -> (String, Arc<Counters>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let counters = Arc::new(Counters::default());

    let app = Router::new()
        .route("/api/chatbot/v2/session", post(create_session))
        .route("/login", get(login))
        .route("/chat", get(chat))
        .route("/api/ask", post(ask))
        .with_state(FakeState {
            base: base.clone(),
            counters: counters.clone(),
        });

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (base, counters)
}

fn config(base: &str) -> GatewayConfig {
    GatewayConfig::new(API_KEY, "bot-1")
        .with_base_url(base)
        .with_request_timeout(Duration::from_secs(5))
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn handshake_reads_token_cookie_set_on_redirect() {
    let (base, counters) = spawn_server().await;
    let backend = AydBackend::new(&config(&base)).unwrap();

    let token = backend.create_session("whatsapp:+15550001111").await.unwrap();

    assert_eq!(token, ISSUED_TOKEN);
    assert_eq!(counters.sessions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn handshake_with_wrong_key_fails() {
    let (base, _counters) = spawn_server().await;
    let backend = AydBackend::new(&GatewayConfig::new("wrong", "bot-1").with_base_url(&base)).unwrap();

    let err = backend.create_session("alice").await.unwrap_err();
    assert!(matches!(err, BackendError::Status { status: 403, .. }));
}

#[tokio::test]
async fn ask_streams_fragments() {
    let (base, _counters) = spawn_server().await;
    let backend = AydBackend::new(&config(&base)).unwrap();

    let stream = backend.ask(ISSUED_TOKEN, "greet me").await.unwrap();
    let fragments: Vec<AnswerFragment> = stream.map(|r| r.unwrap()).collect().await;

    assert_eq!(
        fragments,
        vec![
            AnswerFragment::text("Hel"),
            AnswerFragment::other("SELECT 1"),
            AnswerFragment::text("lo"),
            AnswerFragment::text(" world"),
        ]
    );
}

#[tokio::test]
async fn ask_with_expired_token_is_unauthorized() {
    let (base, _counters) = spawn_server().await;
    let backend = AydBackend::new(&config(&base)).unwrap();

    let result = backend.ask("stale", "greet me").await;
    assert!(matches!(result, Err(BackendError::Unauthorized)));
}

#[tokio::test]
async fn unreachable_backend_is_transport_error() {
    // Bind and drop to get a port nothing listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let backend = AydBackend::new(&config(&base)).unwrap();
    let result = backend.ask(ISSUED_TOKEN, "hi").await;
    assert!(matches!(result, Err(BackendError::Transport(_))));
}

#[tokio::test]
async fn gateway_renews_stale_session_end_to_end() {
    let (base, counters) = spawn_server().await;
    let temp = tempfile::TempDir::new().unwrap();
    let config = config(&base).with_sessions_file(temp.path().join("sessions.csv"));

    let store = Arc::new(CsvSessionStore::new(&config.sessions_file));
    let far_future = chrono::Utc::now().timestamp() + 3600;
    store.save("whatsapp:+15550001111", "stale", far_future);

    let backend = Arc::new(AydBackend::new(&config).unwrap());
    let gateway = SessionGateway::new(
        store.clone(),
        backend,
        GatewaySettings::from_config(&config),
    );

    let outcome = gateway.ask("whatsapp:+15550001111", "greet me").await;

    assert!(outcome.success, "unexpected outcome: {:?}", outcome);
    assert_eq!(outcome.answer_text, "Hello world");
    assert_eq!(counters.sessions.load(Ordering::SeqCst), 1);
    assert_eq!(counters.asks.load(Ordering::SeqCst), 2);
    assert_eq!(
        store.get("whatsapp:+15550001111").unwrap().token,
        ISSUED_TOKEN
    );
}
