//! HTTP surface: routing and request handlers
//!
//! All routes live under `/api`. Handlers translate DTOs to service calls
//! and map service errors onto the HTTP taxonomy via `ApiError`.

pub mod autopredict;
pub mod config;
pub mod dto;
pub mod health;
pub mod predict;
pub mod train;

use crate::AppState;
use axum::Router;
use tower_http::cors::CorsLayer;

/// Build the application router
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(predict::routes())
        .merge(train::routes())
        .merge(autopredict::routes())
        .merge(health::routes())
        .merge(config::routes());

    Router::new()
        .nest("/api", api)
        .with_state(state)
        .layer(CorsLayer::permissive())
}
