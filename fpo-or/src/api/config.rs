//! Node registry and timeout CRUD endpoints
//!
//! Every mutation returns the full registry snapshot so clients can render
//! the updated state without a second round trip.

use crate::error::{ApiError, ApiResult};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use fpo_common::config::Timeouts;
use fpo_common::types::NodeDescriptor;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SetEnabledRequest {
    pub enabled: bool,
}

/// GET /api/config/models
pub async fn list_models(State(state): State<AppState>) -> Json<Vec<NodeDescriptor>> {
    Json(state.registry.snapshot())
}

/// POST /api/config/models
pub async fn add_model(
    State(state): State<AppState>,
    Json(node): Json<NodeDescriptor>,
) -> ApiResult<Json<Vec<NodeDescriptor>>> {
    if node.key.is_empty() {
        return Err(ApiError::BadRequest("Node key must not be empty".to_string()));
    }
    let replaced = state.registry.upsert(node);
    tracing::info!(replaced, "Node registered");
    Ok(Json(state.registry.snapshot()))
}

/// PUT /api/config/models/:key
pub async fn update_model(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(mut node): Json<NodeDescriptor>,
) -> ApiResult<Json<Vec<NodeDescriptor>>> {
    if state.registry.get(&key).is_none() {
        return Err(ApiError::NotFound(format!("Unknown node: {}", key)));
    }
    node.key = key;
    state.registry.upsert(node);
    Ok(Json(state.registry.snapshot()))
}

/// DELETE /api/config/models/:key
pub async fn delete_model(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<Vec<NodeDescriptor>>> {
    if state.registry.remove(&key).is_none() {
        return Err(ApiError::NotFound(format!("Unknown node: {}", key)));
    }
    tracing::info!(node = %key, "Node removed");
    Ok(Json(state.registry.snapshot()))
}

/// PUT /api/config/models/:key/enabled
pub async fn set_enabled(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(request): Json<SetEnabledRequest>,
) -> ApiResult<Json<Vec<NodeDescriptor>>> {
    if !state.registry.set_enabled(&key, request.enabled) {
        return Err(ApiError::NotFound(format!("Unknown node: {}", key)));
    }
    tracing::info!(node = %key, enabled = request.enabled, "Node enabled flag changed");
    Ok(Json(state.registry.snapshot()))
}

/// GET /api/config/timeouts
pub async fn get_timeouts(State(state): State<AppState>) -> Json<Timeouts> {
    Json(state.registry.timeouts())
}

/// PUT /api/config/timeouts
pub async fn set_timeouts(
    State(state): State<AppState>,
    Json(timeouts): Json<Timeouts>,
) -> Json<Timeouts> {
    state.registry.set_timeouts(timeouts);
    Json(state.registry.timeouts())
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/config/models", get(list_models).post(add_model))
        .route(
            "/config/models/:key",
            put(update_model).delete(delete_model),
        )
        .route("/config/models/:key/enabled", put(set_enabled))
        .route("/config/timeouts", get(get_timeouts).put(set_timeouts))
}
