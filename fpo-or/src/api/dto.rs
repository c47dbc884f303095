//! Request DTOs shared across handlers

use fpo_common::types::{Discharge, SensorFile};
use fpo_common::{Error, Result};
use serde::Deserialize;

/// A discharge as submitted by clients
///
/// Either fully materialised (`times` + `signals`) or raw sensor files to
/// run through the parser. Identifiers are optional; absent ones are
/// auto-generated from the batch index.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDischarge {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub times: Option<Vec<f64>>,
    #[serde(default)]
    pub signals: Option<Vec<fpo_common::types::Signal>>,
    #[serde(default)]
    pub files: Option<Vec<SensorFile>>,
    #[serde(default)]
    pub anomaly_time: Option<f64>,
}

impl RawDischarge {
    /// Materialise a full discharge, parsing sensor files when present
    pub fn materialize(self, idx: usize) -> Result<Discharge> {
        let id = self.id.unwrap_or_else(|| Discharge::default_id(idx));

        if let Some(files) = self.files {
            return crate::services::sensor_parser::build_discharge(id, &files, self.anomaly_time);
        }

        let times = self
            .times
            .ok_or_else(|| Error::InvalidInput(format!("Discharge {} has no times", id)))?;
        let signals = self
            .signals
            .ok_or_else(|| Error::InvalidInput(format!("Discharge {} has no signals", id)))?;

        for signal in &signals {
            if signal.values.len() != times.len() {
                tracing::warn!(
                    discharge = %id,
                    signal = %signal.file_name,
                    expected = times.len(),
                    actual = signal.values.len(),
                    "Signal length differs from discharge time axis"
                );
            }
        }

        Ok(Discharge {
            id,
            length: times.len(),
            times,
            signals,
            anomaly_time: self.anomaly_time,
        })
    }
}
