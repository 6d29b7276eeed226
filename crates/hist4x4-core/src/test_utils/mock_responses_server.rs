// src/test_utils/mock_responses_server.rs
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{routing::post, Json, Router};
use serde_json::Value;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// A queued reply. A `Value::String` body is sent verbatim as text, anything
/// else is sent as JSON.
pub type MockReply = (u16, Value);

#[derive(Clone)]
struct MockServerState {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    requests: Arc<Mutex<Vec<Value>>>,
    authorizations: Arc<Mutex<Vec<String>>>,
    delay: Option<Duration>,
}

async fn responses_handler(
    State(state): State<MockServerState>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Response {
    log::debug!("Mock Responses server received request: {}", payload);
    state.requests.lock().unwrap().push(payload);
    if let Some(auth) = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        state.authorizations.lock().unwrap().push(auth.to_string());
    }

    if let Some(delay) = state.delay {
        tokio::time::sleep(delay).await;
    }

    let next = state.replies.lock().unwrap().pop_front();
    match next {
        Some((status, body)) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            match body {
                Value::String(text) => (status, text).into_response(),
                json => (status, Json(json)).into_response(),
            }
        }
        None => {
            log::error!("Mock Responses server ran out of replies!");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

pub struct MockResponsesServer {
    addr: SocketAddr,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
    recorded_requests: Arc<Mutex<Vec<Value>>>,
    recorded_authorizations: Arc<Mutex<Vec<String>>>,
}

impl MockResponsesServer {
    pub async fn start(replies: Vec<MockReply>) -> Self {
        Self::start_inner(replies, None).await
    }

    pub async fn start_with_delay(replies: Vec<MockReply>, delay: Duration) -> Self {
        Self::start_inner(replies, Some(delay)).await
    }

    /// A plain-text reply body.
    pub fn raw(text: &str) -> Value {
        Value::String(text.to_string())
    }

    async fn start_inner(replies: Vec<MockReply>, delay: Option<Duration>) -> Self {
        let state = MockServerState {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            requests: Arc::new(Mutex::new(Vec::new())),
            authorizations: Arc::new(Mutex::new(Vec::new())),
            delay,
        };
        let recorded_requests = state.requests.clone();
        let recorded_authorizations = state.authorizations.clone();

        let app = Router::new()
            .route("/v1/responses", post(responses_handler))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap_or_else(|e| {
            panic!("Failed to bind mock server to 127.0.0.1:0. Error: {}", e);
        });
        let addr = listener.local_addr().unwrap();
        log::info!("Mock Responses server listening on {}", addr);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap_or_else(|e| {
                    log::error!("Mock Responses server error: {}", e);
                });
        });

        MockResponsesServer {
            addr,
            shutdown_tx,
            recorded_requests,
            recorded_authorizations,
        }
    }

    pub fn address(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn get_requests(&self) -> Vec<Value> {
        self.recorded_requests.lock().unwrap().clone()
    }

    pub fn authorization_headers(&self) -> Vec<String> {
        self.recorded_authorizations.lock().unwrap().clone()
    }

    pub async fn shutdown(self) {
        if self.shutdown_tx.send(()).is_err() {
            log::warn!("Mock Responses server shutdown signal already sent or receiver dropped.");
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
