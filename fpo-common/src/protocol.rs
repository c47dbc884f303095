//! Node wire protocol v0.1.0
//!
//! Request/response types for the four endpoints every prediction node
//! implements:
//! - `POST {trainURL}`: training-session preamble
//! - `POST {trainURL}/<ordinal>`: one discharge, 1-based strictly monotonic
//! - `POST {predictURL}`: one discharge, returns a prediction
//! - `GET {healthURL}`: liveness and version
//!
//! Nodes are heterogeneous; unknown response fields are preserved via
//! `serde(flatten)` so they survive into raw result archives untouched.

use serde::{Deserialize, Serialize};

/// Training-session preamble sent to `{trainURL}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingStartRequest {
    pub total_discharges: usize,
    pub timeout_seconds: u64,
}

/// Node acknowledgement of a training-session start
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingStartResponse {
    #[serde(default)]
    pub expected_discharges: Option<usize>,
}

/// A node's class label, either numeric or textual
///
/// Heterogeneous nodes answer `0`/`1` or `"normal"`/`"anomaly"`. The label is
/// normalised once at the boundary into the voting engine, which stays
/// numeric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionLabel {
    Number(i64),
    Text(String),
}

impl PredictionLabel {
    /// Coerce the label to a class in {0, 1}
    ///
    /// `"anomaly"` (any case) and the integer 1 map to 1; everything else
    /// maps to 0.
    pub fn normalise(&self) -> u8 {
        match self {
            PredictionLabel::Number(n) => u8::from(*n == 1),
            PredictionLabel::Text(s) => u8::from(s.eq_ignore_ascii_case("anomaly")),
        }
    }
}

/// One prediction window with its justification score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionWindow {
    #[serde(default)]
    pub justification: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A node's answer to a predict call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePrediction {
    #[serde(default)]
    pub prediction: Option<PredictionLabel>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub justification: Option<f64>,
    #[serde(default)]
    pub windows: Option<Vec<PredictionWindow>>,
    #[serde(default)]
    pub execution_time_ms: Option<f64>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A node's answer to a health probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeHealth {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub uptime: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalises_text_labels() {
        assert_eq!(PredictionLabel::Text("anomaly".into()).normalise(), 1);
        assert_eq!(PredictionLabel::Text("Anomaly".into()).normalise(), 1);
        assert_eq!(PredictionLabel::Text("normal".into()).normalise(), 0);
        assert_eq!(PredictionLabel::Text("garbage".into()).normalise(), 0);
    }

    #[test]
    fn normalises_numeric_labels() {
        assert_eq!(PredictionLabel::Number(1).normalise(), 1);
        assert_eq!(PredictionLabel::Number(0).normalise(), 0);
        assert_eq!(PredictionLabel::Number(7).normalise(), 0);
        assert_eq!(PredictionLabel::Number(-1).normalise(), 0);
    }

    #[test]
    fn parses_string_prediction_response() {
        let raw = serde_json::json!({
            "prediction": "anomaly",
            "confidence": 0.92,
            "windows": [{"justification": 0.8, "start": 1.5}],
            "model": "lstm-v2",
        });
        let parsed: NodePrediction = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.prediction.unwrap().normalise(), 1);
        let windows = parsed.windows.unwrap();
        assert_eq!(windows[0].justification, Some(0.8));
        assert_eq!(windows[0].extra["start"], 1.5);
    }

    #[test]
    fn parses_numeric_prediction_without_confidence() {
        let raw = serde_json::json!({ "prediction": 0 });
        let parsed: NodePrediction = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.prediction.unwrap().normalise(), 0);
        assert!(parsed.confidence.is_none());
    }
}
