#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use sentilens_lib::host::HostEvent;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Long enough to outlive any client timeout used in the tests.
pub const SLOW_RESPONSE: Duration = Duration::from_secs(5);

#[derive(Clone, Default)]
pub struct MockState {
    hits: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockState {
    fn record(&self, label: String, text: String) {
        self.hits.lock().expect("hits lock").push((label, text));
    }

    /// `(label, request text)` pairs in arrival order.
    pub fn hits(&self) -> Vec<(String, String)> {
        self.hits.lock().expect("hits lock").clone()
    }

    pub fn labels(&self) -> Vec<String> {
        self.hits().into_iter().map(|(label, _)| label).collect()
    }
}

#[derive(Debug, Deserialize)]
struct SentimentRequest {
    text: String,
}

fn body_for(label: &str) -> Value {
    json!({"sentiment": label, "polarity": 0.6, "subjectivity": 0.9})
}

async fn ok(
    State(state): State<MockState>,
    Path(label): Path<String>,
    Json(request): Json<SentimentRequest>,
) -> Json<Value> {
    state.record(label.clone(), request.text);
    Json(body_for(&label))
}

async fn fail(
    State(state): State<MockState>,
    Path(label): Path<String>,
    Json(request): Json<SentimentRequest>,
) -> StatusCode {
    state.record(label, request.text);
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn garbage(
    State(state): State<MockState>,
    Path(label): Path<String>,
    Json(request): Json<SentimentRequest>,
) -> (StatusCode, &'static str) {
    state.record(label, request.text);
    (StatusCode::OK, "<html>maintenance</html>")
}

async fn slow(
    State(state): State<MockState>,
    Path(label): Path<String>,
    Json(request): Json<SentimentRequest>,
) -> Json<Value> {
    state.record(label.clone(), request.text);
    tokio::time::sleep(SLOW_RESPONSE).await;
    Json(body_for(&label))
}

pub struct MockService {
    pub base_url: String,
    pub state: MockState,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl MockService {
    /// Routes: `/ok/{label}`, `/fail/{label}`, `/garbage/{label}`, `/slow/{label}`.
    pub async fn start() -> Self {
        let state = MockState::default();
        let app = Router::new()
            .route("/ok/{label}", post(ok))
            .route("/fail/{label}", post(fail))
            .route("/garbage/{label}", post(garbage))
            .route("/slow/{label}", post(slow))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock service listener");
        let address: SocketAddr = listener.local_addr().expect("mock listener local addr");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            server.await.expect("run mock service");
        });

        Self {
            base_url: format!("http://{address}"),
            state,
            shutdown: Some(shutdown_tx),
            handle,
        }
    }

    pub fn url(&self, route: &str) -> String {
        format!("{}/{}", self.base_url, route)
    }

    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        self.handle.abort();
        let _ = self.handle.await;
    }
}

/// An address nothing listens on.
pub async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind throwaway listener");
    let address = listener.local_addr().expect("throwaway local addr");
    drop(listener);
    format!("http://{address}/api/sentiment")
}

/// First finished rendering (result or error) published by the host.
pub async fn next_rendering(
    events: &mut mpsc::UnboundedReceiver<HostEvent>,
    within: Duration,
) -> Option<String> {
    tokio::time::timeout(within, async {
        while let Some(event) = events.recv().await {
            if let Some(rendering) = event.final_rendering() {
                return Some(rendering);
            }
        }
        None
    })
    .await
    .ok()
    .flatten()
}
