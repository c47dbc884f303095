//! Health prober
//!
//! Probes every registered node concurrently. Disabled nodes are reported
//! without a call; each live probe is bounded by the model timeout, so one
//! hung node cannot stall the aggregate beyond that bound.

use crate::registry::NodeRegistry;
use crate::services::node_client::{NodeClient, NodeError};
use fpo_common::types::NodeDescriptor;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Aggregate health across the fleet
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub models: Vec<ModelHealth>,
    /// Count of nodes reporting `status == "online"`
    pub available_models: usize,
}

/// One node's probe result
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelHealth {
    pub model: String,
    pub display_name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct HealthProber {
    registry: Arc<NodeRegistry>,
    client: Arc<NodeClient>,
}

impl HealthProber {
    pub fn new(registry: Arc<NodeRegistry>, client: Arc<NodeClient>) -> Self {
        Self { registry, client }
    }

    /// Probe all registered nodes in parallel
    pub async fn probe_all(&self) -> HealthReport {
        let nodes = self.registry.snapshot();
        let timeout = Duration::from_millis(self.registry.timeouts().model_ms);

        let probes = nodes.into_iter().map(|node| self.probe_one(node, timeout));
        let models = futures::future::join_all(probes).await;

        let available_models = models.iter().filter(|m| m.status == "online").count();

        HealthReport {
            timestamp: chrono::Utc::now(),
            models,
            available_models,
        }
    }

    async fn probe_one(&self, node: NodeDescriptor, timeout: Duration) -> ModelHealth {
        if !node.enabled {
            return ModelHealth {
                model: node.key,
                display_name: node.display_name,
                status: "disabled".to_string(),
                version: None,
                details: None,
                error: None,
            };
        }

        match self.client.health(&node, timeout).await {
            Ok(health) => ModelHealth {
                model: node.key,
                display_name: node.display_name,
                status: health.status,
                version: health.version,
                details: if health.extra.is_empty() {
                    None
                } else {
                    Some(serde_json::Value::Object(health.extra))
                },
                error: None,
            },
            Err(e) => {
                tracing::debug!(node = %node.key, error = %e, "Health probe failed");
                let status = match &e {
                    NodeError::Transport(_) | NodeError::Timeout => "unreachable",
                    NodeError::Protocol { .. } | NodeError::Decode(_) => "error",
                };
                ModelHealth {
                    model: node.key,
                    display_name: node.display_name,
                    status: status.to_string(),
                    version: None,
                    details: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}
