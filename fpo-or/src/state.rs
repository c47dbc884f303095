//! Shared application state

use crate::registry::NodeRegistry;
use crate::services::{
    AutoPredictManager, HealthProber, NodeClient, PredictionOrchestrator, SummaryStore,
    TrainingManager,
};
use fpo_common::config::OrchestratorConfig;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<NodeRegistry>,
    pub orchestrator: Arc<PredictionOrchestrator>,
    pub prober: Arc<HealthProber>,
    pub training: Arc<TrainingManager>,
    pub autopredict: Arc<AutoPredictManager>,
    pub summaries: Arc<SummaryStore>,
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(config: &OrchestratorConfig) -> fpo_common::Result<Self> {
        let registry = Arc::new(NodeRegistry::new(config));
        let client = Arc::new(NodeClient::new()?);
        let summaries = Arc::new(SummaryStore::new());

        let orchestrator = Arc::new(PredictionOrchestrator::new(
            Arc::clone(&registry),
            Arc::clone(&client),
        ));
        let prober = Arc::new(HealthProber::new(Arc::clone(&registry), Arc::clone(&client)));
        let training = Arc::new(TrainingManager::new(
            Arc::clone(&registry),
            Arc::clone(&client),
            Arc::clone(&summaries),
        ));
        let autopredict = Arc::new(AutoPredictManager::new(Arc::clone(&orchestrator)));

        Ok(Self {
            registry,
            orchestrator,
            prober,
            training,
            autopredict,
            summaries,
            startup_time: chrono::Utc::now(),
        })
    }
}
