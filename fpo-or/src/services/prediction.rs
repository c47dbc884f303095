//! Prediction fan-out orchestrator
//!
//! Dispatches one discharge to every enabled node in parallel, normalises
//! the heterogeneous answers at the boundary, and feeds the ballots to the
//! voting engine. Per-node failures are recorded alongside the successes;
//! they never fail the whole call.

use crate::registry::NodeRegistry;
use crate::services::node_client::NodeClient;
use crate::services::voting::{vote, VoteOutcome};
use fpo_common::protocol::NodePrediction;
use fpo_common::types::{Discharge, NodeDescriptor};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestrateError {
    #[error("Request contained no discharges")]
    EmptyRequest,

    #[error("No prediction nodes are enabled")]
    NoModelsEnabled,
}

/// One node's contribution to an orchestration
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelOutcome {
    pub model: String,
    pub display_name: String,
    /// `"success"` or `"error"`
    pub status: String,
    /// Normalised class, present on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<u8>,
    /// Node confidence, defaulted to 1.0 when the node omitted it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Wall-clock time of the node call as observed here
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The node's raw answer, kept for result archives
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<NodePrediction>,
}

/// Aggregated result of one fan-out
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationResult {
    pub discharge_id: String,
    pub outcome: VoteOutcome,
    pub models: Vec<ModelOutcome>,
}

pub struct PredictionOrchestrator {
    registry: Arc<NodeRegistry>,
    client: Arc<NodeClient>,
}

impl PredictionOrchestrator {
    pub fn new(registry: Arc<NodeRegistry>, client: Arc<NodeClient>) -> Self {
        Self { registry, client }
    }

    /// Fan one request out to all enabled nodes and vote on the answers
    ///
    /// Only `discharges[0]` is used; the predictor is one-at-a-time.
    pub async fn orchestrate(
        &self,
        discharges: &[Discharge],
    ) -> Result<OrchestrationResult, OrchestrateError> {
        let discharge = discharges.first().ok_or(OrchestrateError::EmptyRequest)?;

        // Snapshot the enabled set up front so registry CRUD mid-call
        // cannot produce an inconsistent dispatch.
        let nodes = self.registry.enabled();
        if nodes.is_empty() {
            return Err(OrchestrateError::NoModelsEnabled);
        }
        let timeout = Duration::from_millis(self.registry.timeouts().model_ms);

        tracing::debug!(
            discharge = %discharge.id,
            nodes = nodes.len(),
            "Dispatching predict fan-out"
        );

        let calls = nodes
            .into_iter()
            .map(|node| self.call_one(node, discharge, timeout));
        let models = futures::future::join_all(calls).await;

        let ballots: Vec<(u8, f64)> = models
            .iter()
            .filter_map(|m| Some((m.prediction?, m.confidence.unwrap_or(1.0))))
            .collect();
        let outcome = vote(&ballots, models.len());

        tracing::info!(
            discharge = %discharge.id,
            decision = ?outcome.decision,
            votes_normal = outcome.votes.normal,
            votes_anomaly = outcome.votes.anomaly,
            "Prediction vote complete"
        );

        Ok(OrchestrationResult {
            discharge_id: discharge.id.clone(),
            outcome,
            models,
        })
    }

    async fn call_one(
        &self,
        node: NodeDescriptor,
        discharge: &Discharge,
        timeout: Duration,
    ) -> ModelOutcome {
        let started = std::time::Instant::now();

        match self.client.predict(&node, discharge, timeout).await {
            Ok(response) => {
                let prediction = response.prediction.as_ref().map(|p| p.normalise());
                let confidence = prediction.map(|_| response.confidence.unwrap_or(1.0));
                ModelOutcome {
                    model: node.key,
                    display_name: node.display_name,
                    status: "success".to_string(),
                    prediction,
                    confidence,
                    elapsed_ms: started.elapsed().as_millis() as u64,
                    error: None,
                    response: Some(response),
                }
            }
            Err(e) => {
                tracing::warn!(node = %node.key, error = %e, "Predict call failed");
                ModelOutcome {
                    model: node.key,
                    display_name: node.display_name,
                    status: "error".to_string(),
                    prediction: None,
                    confidence: None,
                    elapsed_ms: started.elapsed().as_millis() as u64,
                    error: Some(e.to_string()),
                    response: None,
                }
            }
        }
    }
}
