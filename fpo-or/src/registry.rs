//! Node registry
//!
//! Mutable mapping of node key to descriptor plus the shared timeouts,
//! seeded from configuration and mutated at runtime via the config
//! endpoints. Readers may observe updates mid-operation; orchestrations
//! snapshot the enabled set at dispatch time.

use fpo_common::config::{OrchestratorConfig, Timeouts};
use fpo_common::types::NodeDescriptor;
use parking_lot::RwLock;
use std::collections::HashMap;

pub struct NodeRegistry {
    nodes: RwLock<HashMap<String, NodeDescriptor>>,
    timeouts: RwLock<Timeouts>,
}

impl NodeRegistry {
    pub fn new(config: &OrchestratorConfig) -> Self {
        let mut nodes = HashMap::new();
        for node in &config.nodes {
            if nodes
                .insert(node.key.clone(), node.clone())
                .is_some()
            {
                tracing::warn!(key = %node.key, "Duplicate node key in config, keeping last");
            }
        }

        Self {
            nodes: RwLock::new(nodes),
            timeouts: RwLock::new(config.timeouts),
        }
    }

    /// All registered nodes, sorted by key for stable output
    pub fn snapshot(&self) -> Vec<NodeDescriptor> {
        let mut nodes: Vec<_> = self.nodes.read().values().cloned().collect();
        nodes.sort_by(|a, b| a.key.cmp(&b.key));
        nodes
    }

    /// Enabled nodes only, sorted by key
    pub fn enabled(&self) -> Vec<NodeDescriptor> {
        let mut nodes: Vec<_> = self
            .nodes
            .read()
            .values()
            .filter(|n| n.enabled)
            .cloned()
            .collect();
        nodes.sort_by(|a, b| a.key.cmp(&b.key));
        nodes
    }

    pub fn get(&self, key: &str) -> Option<NodeDescriptor> {
        self.nodes.read().get(key).cloned()
    }

    /// Insert or replace a node; returns true if a node was replaced
    pub fn upsert(&self, node: NodeDescriptor) -> bool {
        self.nodes.write().insert(node.key.clone(), node).is_some()
    }

    /// Remove a node; returns the removed descriptor if it existed
    pub fn remove(&self, key: &str) -> Option<NodeDescriptor> {
        self.nodes.write().remove(key)
    }

    /// Flip a node's enabled flag; returns false for an unknown key
    pub fn set_enabled(&self, key: &str, enabled: bool) -> bool {
        match self.nodes.write().get_mut(key) {
            Some(node) => {
                node.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn timeouts(&self) -> Timeouts {
        *self.timeouts.read()
    }

    pub fn set_timeouts(&self, timeouts: Timeouts) {
        *self.timeouts.write() = timeouts;
    }
}
