//! Core data model: discharges, signals, node descriptors
//!
//! A discharge is one experiment's bundle of time-aligned sensor signals,
//! optionally labelled with an anomaly time. Signal order within a discharge
//! is preserved end-to-end; prediction nodes rely on it.

use serde::{Deserialize, Serialize};

/// One sensor's value sequence within a discharge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    /// Originating file name, kept as the signal's label
    pub file_name: String,
    pub values: Vec<f64>,
}

/// A labelled bundle of per-sensor signals sharing a common time axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discharge {
    /// Stable identifier, client-supplied or auto-generated `discharge_<idx>`
    pub id: String,
    /// Shared x-axis for all signals
    pub times: Vec<f64>,
    /// Number of samples; equals `times.len()`
    pub length: usize,
    pub signals: Vec<Signal>,
    /// Training-time label: when the anomaly occurred, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anomaly_time: Option<f64>,
}

impl Discharge {
    /// Auto-generated identifier for the idx-th discharge of a request
    pub fn default_id(idx: usize) -> String {
        format!("discharge_{}", idx)
    }
}

/// A raw sensor file prior to parsing: textual `<time> <value>` lines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorFile {
    pub name: String,
    pub content: String,
}

/// One registered prediction node
///
/// Unique by `key`. Lifecycle is owned by the node registry: created via
/// CRUD, mutated in place, destroyed on delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    pub key: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "predictURL")]
    pub predict_url: String,
    #[serde(rename = "trainURL")]
    pub train_url: String,
    #[serde(rename = "healthURL")]
    pub health_url: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discharge_serialises_camel_case() {
        let discharge = Discharge {
            id: "d1".to_string(),
            times: vec![0.0, 0.1],
            length: 2,
            signals: vec![Signal {
                file_name: "density.txt".to_string(),
                values: vec![1.0, 2.0],
            }],
            anomaly_time: Some(0.05),
        };

        let json = serde_json::to_value(&discharge).unwrap();
        assert_eq!(json["anomalyTime"], 0.05);
        assert_eq!(json["signals"][0]["fileName"], "density.txt");
    }

    #[test]
    fn anomaly_time_omitted_when_absent() {
        let discharge = Discharge {
            id: "d1".to_string(),
            times: vec![],
            length: 0,
            signals: vec![],
            anomaly_time: None,
        };

        let json = serde_json::to_value(&discharge).unwrap();
        assert!(json.get("anomalyTime").is_none());
    }

    #[test]
    fn node_descriptor_enabled_defaults_true() {
        let node: NodeDescriptor = serde_json::from_value(serde_json::json!({
            "key": "lstm",
            "displayName": "LSTM baseline",
            "predictURL": "http://localhost:9001/predict",
            "trainURL": "http://localhost:9001/train",
            "healthURL": "http://localhost:9001/health",
        }))
        .unwrap();
        assert!(node.enabled);
    }
}
