//! Health check endpoint

use crate::services::health::ModelHealth;
use crate::AppState;
use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Orchestrator status, always "ok" when we can answer at all
    pub server_status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub timestamp: chrono::DateTime<Utc>,
    pub models: Vec<ModelHealth>,
    pub available_models: usize,
}

/// GET /api/health
///
/// Probes every registered node in parallel; disabled nodes are listed
/// without being called.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let report = state.prober.probe_all().await;

    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    Json(HealthResponse {
        server_status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        timestamp: report.timestamp,
        models: report.models,
        available_models: report.available_models,
    })
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
