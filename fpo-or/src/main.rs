//! fpo-or - Prediction Orchestrator Service
//!
//! Front door for a fleet of independent prediction nodes: majority-vote
//! prediction fan-out, streaming multi-batch training sessions with
//! per-node ordered delivery, automated-prediction statistics sessions,
//! and fleet health probing.

use anyhow::Result;
use fpo_common::config::OrchestratorConfig;
use fpo_or::{api, AppState};
use std::net::SocketAddr;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting fpo-or (Prediction Orchestrator)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config_arg = std::env::args().nth(1);
    let config = OrchestratorConfig::load(config_arg.as_deref())?;
    info!(
        nodes = config.nodes.len(),
        model_timeout_ms = config.timeouts.model_ms,
        training_timeout_ms = config.timeouts.training_ms,
        "Configuration loaded"
    );

    let port = config.port();
    let state = AppState::new(&config)?;
    let app = api::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/api/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
