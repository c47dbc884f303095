//! Training endpoints
//!
//! A session is started explicitly (`/train/start`) or implicitly by the
//! first batch that carries `totalDischarges` (which auto-finishes once the
//! total is reached). Batches stream in via JSON (`/train`) or multipart
//! (`/train/raw`); open-ended sessions end with `/train/finish`. Nodes
//! report asynchronous completion through `/trainingCompleted`.

use crate::api::dto::RawDischarge;
use crate::error::{ApiError, ApiResult};
use crate::services::training::{BatchReport, FinishReport, StartReport};
use crate::AppState;
use axum::{
    extract::{Multipart, State},
    routing::{get, post},
    Json, Router,
};
use fpo_common::types::{Discharge, SensorFile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTrainingRequest {
    pub total_discharges: usize,
    #[serde(default)]
    pub auto_finish: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainBatchRequest {
    pub discharges: Vec<RawDischarge>,
    #[serde(default)]
    pub total_discharges: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainBatchResponse {
    /// Present when this batch implicitly started the session
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started: Option<StartReport>,
    #[serde(flatten)]
    pub batch: BatchReport,
}

/// Per-discharge metadata accompanying a multipart batch
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBatchMetadata {
    #[serde(default)]
    pub total_discharges: Option<usize>,
    #[serde(default)]
    pub discharges: Vec<RawDischargeMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDischargeMetadata {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub anomaly_time: Option<f64>,
}

/// POST /api/train/start
pub async fn start_training(
    State(state): State<AppState>,
    Json(request): Json<StartTrainingRequest>,
) -> ApiResult<Json<StartReport>> {
    let report = state
        .training
        .start(request.total_discharges, request.auto_finish)
        .await?;
    Ok(Json(report))
}

/// POST /api/train
///
/// Submit one batch of discharges as JSON.
pub async fn send_batch(
    State(state): State<AppState>,
    Json(request): Json<TrainBatchRequest>,
) -> ApiResult<Json<TrainBatchResponse>> {
    let discharges = request
        .discharges
        .into_iter()
        .enumerate()
        .map(|(idx, raw)| raw.materialize(idx).map(Arc::new))
        .collect::<fpo_common::Result<Vec<_>>>()?;

    submit_batch(&state, discharges, request.total_discharges).await
}

/// POST /api/train/raw
///
/// Multipart variant: a `metadata` JSON part plus `discharge<N>` sensor
/// file parts, grouped by index into one discharge each.
pub async fn send_raw_batch(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<TrainBatchResponse>> {
    let mut metadata = RawBatchMetadata::default();
    let mut groups: BTreeMap<usize, Vec<SensorFile>> = BTreeMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "metadata" {
            let text = field
                .text()
                .await
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            metadata = serde_json::from_str(&text)
                .map_err(|e| ApiError::BadRequest(format!("Invalid metadata: {}", e)))?;
            continue;
        }

        let Some(idx) = name
            .strip_prefix("discharge")
            .and_then(|s| s.parse::<usize>().ok())
        else {
            return Err(ApiError::BadRequest(format!(
                "Unexpected multipart field '{}'",
                name
            )));
        };

        let file_name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("signal_{}", groups.get(&idx).map_or(0, Vec::len)));
        let content = field
            .text()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        groups.entry(idx).or_default().push(SensorFile {
            name: file_name,
            content,
        });
    }

    if groups.is_empty() {
        return Err(ApiError::BadRequest(
            "No discharge files in multipart upload".to_string(),
        ));
    }

    let mut discharges = Vec::with_capacity(groups.len());
    for (idx, files) in groups {
        let meta = metadata.discharges.get(idx).cloned().unwrap_or_default();
        let id = meta.id.unwrap_or_else(|| Discharge::default_id(idx));
        let discharge =
            crate::services::sensor_parser::build_discharge(id, &files, meta.anomaly_time)?;
        discharges.push(Arc::new(discharge));
    }

    submit_batch(&state, discharges, metadata.total_discharges).await
}

async fn submit_batch(
    state: &AppState,
    discharges: Vec<Arc<Discharge>>,
    total_discharges: Option<usize>,
) -> ApiResult<Json<TrainBatchResponse>> {
    let started = state.training.ensure_started(total_discharges).await?;
    let batch = state.training.send_batch(discharges).await?;
    Ok(Json(TrainBatchResponse { started, batch }))
}

/// POST /api/train/finish
pub async fn finish_training(State(state): State<AppState>) -> ApiResult<Json<FinishReport>> {
    let report = state.training.finish().await?;
    Ok(Json(report))
}

/// POST /api/trainingCompleted
///
/// Nodes call back here when their asynchronous training run ends.
pub async fn training_completed(
    State(state): State<AppState>,
    Json(summary): Json<serde_json::Value>,
) -> ApiResult<Json<serde_json::Value>> {
    state.summaries.record(summary)?;
    Ok(Json(serde_json::json!({"ok": true})))
}

/// GET /api/trainingCompleted
pub async fn training_summaries(
    State(state): State<AppState>,
) -> Json<Vec<serde_json::Value>> {
    Json(state.summaries.all())
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/train", post(send_batch))
        .route("/train/start", post(start_training))
        .route("/train/raw", post(send_raw_batch))
        .route("/train/finish", post(finish_training))
        .route(
            "/trainingCompleted",
            get(training_summaries).post(training_completed),
        )
}
