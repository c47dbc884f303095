#![allow(dead_code)]
//! Shared test helpers: an in-process mock prediction node and request
//! plumbing for exercising the router.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use fpo_common::config::{OrchestratorConfig, Timeouts};
use fpo_common::types::NodeDescriptor;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Scripted behaviour and observed traffic of one mock node
pub struct MockNodeState {
    /// Bodies of training-session preambles, in arrival order
    pub start_requests: Mutex<Vec<Value>>,
    /// (ordinal, discharge id) of every training push, in arrival order
    pub pushes: Mutex<Vec<(u64, String)>>,
    pub predict_response: Mutex<Value>,
    pub health_response: Mutex<Value>,
    /// Answer 500 to the training preamble
    pub reject_start: AtomicBool,
    /// Ordinals whose push should be answered with 500
    pub fail_ordinals: Mutex<HashSet<u64>>,
    /// Answer 500 to predict calls
    pub fail_predict: AtomicBool,
}

impl Default for MockNodeState {
    fn default() -> Self {
        Self {
            start_requests: Mutex::new(Vec::new()),
            pushes: Mutex::new(Vec::new()),
            predict_response: Mutex::new(json!({"prediction": 0, "confidence": 1.0})),
            health_response: Mutex::new(json!({"status": "online", "version": "0.1.0"})),
            reject_start: AtomicBool::new(false),
            fail_ordinals: Mutex::new(HashSet::new()),
            fail_predict: AtomicBool::new(false),
        }
    }
}

impl MockNodeState {
    pub fn set_prediction(&self, response: Value) {
        *self.predict_response.lock() = response;
    }

    pub fn observed_ordinals(&self) -> Vec<u64> {
        self.pushes.lock().iter().map(|(ordinal, _)| *ordinal).collect()
    }

    pub fn observed_ids(&self) -> Vec<String> {
        self.pushes.lock().iter().map(|(_, id)| id.clone()).collect()
    }
}

/// A mock node listening on an ephemeral local port
pub struct MockNode {
    pub key: String,
    pub addr: SocketAddr,
    pub state: Arc<MockNodeState>,
}

impl MockNode {
    pub async fn spawn(key: &str) -> Self {
        let state = Arc::new(MockNodeState::default());
        let addr = serve_on_ephemeral_port(Arc::clone(&state)).await;
        Self {
            key: key.to_string(),
            addr,
            state,
        }
    }

    pub fn descriptor(&self) -> NodeDescriptor {
        descriptor_for(&self.key, self.addr, true)
    }

    pub fn disabled_descriptor(&self) -> NodeDescriptor {
        descriptor_for(&self.key, self.addr, false)
    }
}

pub fn descriptor_for(key: &str, addr: SocketAddr, enabled: bool) -> NodeDescriptor {
    NodeDescriptor {
        key: key.to_string(),
        display_name: key.to_uppercase(),
        predict_url: format!("http://{}/predict", addr),
        train_url: format!("http://{}/train", addr),
        health_url: format!("http://{}/health", addr),
        enabled,
    }
}

pub fn mock_node_router(state: Arc<MockNodeState>) -> Router {
    Router::new()
        .route("/train", post(start_training))
        .route("/train/:ordinal", post(push_discharge))
        .route("/predict", post(predict))
        .route("/health", get(health))
        .with_state(state)
}

async fn serve_on_ephemeral_port(state: Arc<MockNodeState>) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    serve_on(listener, state);
    addr
}

/// Serve a mock node on an already-bound listener (used by the retry tests
/// to take a node down and bring it back on a known port)
pub fn serve_on(
    listener: tokio::net::TcpListener,
    state: Arc<MockNodeState>,
) -> tokio::task::JoinHandle<()> {
    let app = mock_node_router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    })
}

async fn start_training(
    State(state): State<Arc<MockNodeState>>,
    Json(body): Json<Value>,
) -> axum::response::Response {
    state.start_requests.lock().push(body.clone());
    if state.reject_start.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "training unavailable"})),
        )
            .into_response();
    }
    Json(json!({"expectedDischarges": body.get("totalDischarges")})).into_response()
}

async fn push_discharge(
    State(state): State<Arc<MockNodeState>>,
    Path(ordinal): Path<u64>,
    Json(body): Json<Value>,
) -> axum::response::Response {
    let id = body
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    state.pushes.lock().push((ordinal, id));

    if state.fail_ordinals.lock().contains(&ordinal) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "training step failed"})),
        )
            .into_response();
    }
    Json(json!({"ok": true})).into_response()
}

async fn predict(State(state): State<Arc<MockNodeState>>) -> axum::response::Response {
    if state.fail_predict.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "inference failed"})),
        )
            .into_response();
    }
    Json(state.predict_response.lock().clone()).into_response()
}

async fn health(State(state): State<Arc<MockNodeState>>) -> Json<Value> {
    Json(state.health_response.lock().clone())
}

/// Orchestrator config pointing at the given nodes, with timeouts short
/// enough for tests
pub fn test_config(nodes: Vec<NodeDescriptor>) -> OrchestratorConfig {
    OrchestratorConfig {
        port: None,
        timeouts: Timeouts {
            model_ms: 2_000,
            training_ms: 2_000,
        },
        nodes,
    }
}

/// Build a one-signal discharge fixture
pub fn discharge(id: &str, samples: usize) -> fpo_common::types::Discharge {
    let times: Vec<f64> = (0..samples).map(|i| i as f64 * 0.1).collect();
    let values: Vec<f64> = (0..samples).map(|i| (i as f64).sin()).collect();
    fpo_common::types::Discharge {
        id: id.to_string(),
        length: samples,
        times,
        signals: vec![fpo_common::types::Signal {
            file_name: "density.txt".to_string(),
            values,
        }],
        anomaly_time: None,
    }
}

/// Issue one request against the router and decode the JSON body if any
pub async fn make_request(
    app: &Router,
    method: &str,
    path: &str,
    body: Option<Value>,
) -> (StatusCode, Option<Value>) {
    use axum::body::Body;
    use http::{Method, Request};
    use tower::ServiceExt;

    let method = match method {
        "GET" => Method::GET,
        "POST" => Method::POST,
        "PUT" => Method::PUT,
        "DELETE" => Method::DELETE,
        _ => panic!("Unsupported method"),
    };

    let mut request = Request::builder().method(method).uri(path);
    if body.is_some() {
        request = request.header("content-type", "application/json");
    }
    let request = match body {
        Some(json_body) => request.body(Body::from(json_body.to_string())).unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json_body = if bytes.is_empty() {
        None
    } else {
        serde_json::from_slice(&bytes).ok()
    };

    (status, json_body)
}
