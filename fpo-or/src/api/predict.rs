//! Prediction endpoint

use crate::api::dto::RawDischarge;
use crate::error::{ApiError, ApiResult};
use crate::services::prediction::ModelOutcome;
use crate::services::voting::VoteTally;
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub discharges: Vec<RawDischarge>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictResponse {
    pub discharge_id: String,
    /// Winning class, absent on tie or when no node answered
    pub class: Option<u8>,
    pub confidence: f64,
    pub votes: VoteTally,
    pub total_votes: usize,
    pub total_models: usize,
    pub message: String,
    pub details: Vec<ModelOutcome>,
}

/// POST /api/predict
///
/// Fan the first discharge out to all enabled nodes and vote. A tie is a
/// 409 carrying the same body shape so callers can inspect the split.
pub async fn predict(
    State(state): State<AppState>,
    Json(request): Json<PredictRequest>,
) -> ApiResult<Response> {
    let discharges = request
        .discharges
        .into_iter()
        .enumerate()
        .map(|(idx, raw)| raw.materialize(idx))
        .collect::<fpo_common::Result<Vec<_>>>()?;

    let result = state
        .orchestrator
        .orchestrate(&discharges)
        .await
        .map_err(ApiError::from)?;

    let status = if result.outcome.is_tie() {
        StatusCode::CONFLICT
    } else {
        StatusCode::OK
    };

    let response = PredictResponse {
        discharge_id: result.discharge_id,
        class: result.outcome.decision,
        confidence: result.outcome.confidence,
        votes: result.outcome.votes,
        total_votes: result.outcome.total_votes,
        total_models: result.outcome.total_models,
        message: result.outcome.message,
        details: result.models,
    };

    Ok((status, Json(response)).into_response())
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/predict", post(predict))
}
