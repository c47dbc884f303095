//! API error types
//!
//! Maps the orchestrator's error taxonomy onto HTTP statuses with
//! `{error: {code, message}}` bodies.

use crate::services::autopredict::AutoPredictError;
use crate::services::prediction::OrchestrateError;
use crate::services::training::TrainingError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// No enabled nodes to serve the request (400)
    #[error("No prediction nodes are enabled")]
    NoModelsEnabled,

    /// Unknown automated-predict session (400)
    #[error("Unknown session: {0}")]
    SessionNotFound(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Conflict (409) - e.g., training session already running
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// fpo-common error
    #[error(transparent)]
    Common(#[from] fpo_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::NoModelsEnabled => (
                StatusCode::BAD_REQUEST,
                "NO_MODELS_ENABLED",
                "No prediction nodes are enabled".to_string(),
            ),
            ApiError::SessionNotFound(id) => (
                StatusCode::BAD_REQUEST,
                "SESSION_NOT_FOUND",
                format!("Unknown session: {}", id),
            ),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", msg),
            ApiError::Io(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL",
                err.to_string(),
            ),
            ApiError::Other(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL",
                err.to_string(),
            ),
            ApiError::Common(err) => return common_error_response(err),
        };

        error_response(status, error_code, message)
    }
}

fn common_error_response(err: fpo_common::Error) -> Response {
    use fpo_common::Error;

    let (status, error_code) = match &err {
        Error::Parse { .. } => (StatusCode::BAD_REQUEST, "PARSE_ERROR"),
        Error::InvalidInput(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
        Error::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        Error::Config(_) | Error::Io(_) | Error::Internal(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL")
        }
    };

    error_response(status, error_code, err.to_string())
}

fn error_response(status: StatusCode, error_code: &str, message: String) -> Response {
    let body = Json(json!({
        "error": {
            "code": error_code,
            "message": message,
        }
    }));

    (status, body).into_response()
}

impl From<OrchestrateError> for ApiError {
    fn from(err: OrchestrateError) -> Self {
        match err {
            OrchestrateError::EmptyRequest => ApiError::BadRequest(err.to_string()),
            OrchestrateError::NoModelsEnabled => ApiError::NoModelsEnabled,
        }
    }
}

impl From<TrainingError> for ApiError {
    fn from(err: TrainingError) -> Self {
        match err {
            TrainingError::SessionActive => ApiError::Conflict(err.to_string()),
            TrainingError::NoModelsEnabled => ApiError::NoModelsEnabled,
            TrainingError::NoActiveSession
            | TrainingError::NoNodesAccepted
            | TrainingError::InvalidTotal => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl From<AutoPredictError> for ApiError {
    fn from(err: AutoPredictError) -> Self {
        match err {
            AutoPredictError::SessionNotFound(id) => ApiError::SessionNotFound(id.to_string()),
            AutoPredictError::Common(e) => ApiError::Common(e),
            AutoPredictError::Orchestrate(e) => e.into(),
            AutoPredictError::Archive(msg) => ApiError::Internal(msg),
        }
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
