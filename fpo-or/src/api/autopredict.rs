//! Automated-predict session endpoints

use crate::error::{ApiError, ApiResult};
use crate::services::autopredict::ThresholdSettings;
use crate::AppState;
use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use fpo_common::types::SensorFile;
use uuid::Uuid;

/// POST /api/automated-predicts/session
pub async fn start_session(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    let id = state.autopredict.start().await.map_err(ApiError::from)?;
    Ok(Json(serde_json::json!({"sessionId": id})))
}

/// POST /api/automated-predicts/session/:id
///
/// Upload one discharge as multipart: repeated `file` parts carrying the
/// sensor files, optional `dischargeId` and `thresholds` JSON parts.
pub async fn upload(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    mut multipart: Multipart,
) -> ApiResult<Json<serde_json::Value>> {
    let mut files = Vec::new();
    let mut discharge_id = None;
    let mut thresholds = ThresholdSettings::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        match field.name().unwrap_or_default() {
            "file" => {
                let name = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("signal_{}", files.len()));
                let content = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                files.push(SensorFile { name, content });
            }
            "dischargeId" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                if !text.is_empty() {
                    discharge_id = Some(text);
                }
            }
            "thresholds" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                thresholds = serde_json::from_str(&text)
                    .map_err(|e| ApiError::BadRequest(format!("Invalid thresholds: {}", e)))?;
            }
            other => {
                return Err(ApiError::BadRequest(format!(
                    "Unexpected multipart field '{}'",
                    other
                )));
            }
        }
    }

    if files.is_empty() {
        return Err(ApiError::BadRequest(
            "No sensor files in multipart upload".to_string(),
        ));
    }

    state
        .autopredict
        .upload(session_id, &files, discharge_id, thresholds)
        .await?;

    Ok(Json(serde_json::json!({"ok": true})))
}

/// GET /api/automated-predicts/session/:id/zip
///
/// Finalise the session: stream the archive and tear the session down.
pub async fn finalize(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Response> {
    let archive = state.autopredict.finalize(session_id).await?;

    let headers = [
        (header::CONTENT_TYPE, "application/zip".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"automated-predicts-{}.zip\"", session_id),
        ),
    ];
    Ok((headers, archive).into_response())
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/automated-predicts/session", post(start_session))
        .route("/automated-predicts/session/:id", post(upload))
        .route("/automated-predicts/session/:id/zip", get(finalize))
}
