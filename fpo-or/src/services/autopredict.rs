//! Automated-predict session manager
//!
//! A long-lived server-side session accumulates per-discharge, per-model,
//! per-window justification scores across many uploads. Each upload runs the
//! normal prediction fan-out, archives the raw orchestration output, and
//! extends the per-window threshold series (plain threshold plus a
//! streak-of-N detector). Finalisation packages raw results and derived
//! CSVs into a ZIP and tears the session down.
//!
//! Each session owns a scratch directory; abandonment is covered by the
//! directory being removed when the session drops.

use crate::services::prediction::{OrchestrateError, PredictionOrchestrator};
use fpo_common::types::SensorFile;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AutoPredictError {
    #[error("Unknown automated-predict session: {0}")]
    SessionNotFound(Uuid),

    #[error(transparent)]
    Common(#[from] fpo_common::Error),

    #[error(transparent)]
    Orchestrate(#[from] OrchestrateError),

    #[error("Archive error: {0}")]
    Archive(String),
}

/// Two-stage threshold rule applied to per-window justifications
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThresholdSettings {
    /// Per-window rule: a window passes when its justification exceeds this
    pub justification: f64,
    /// Streak rule: the streak flag is set when the last `count` windows
    /// all passed
    pub count: usize,
}

impl Default for ThresholdSettings {
    fn default() -> Self {
        Self {
            justification: 0.0,
            count: 1,
        }
    }
}

/// Justification series and derived threshold columns for one
/// (model, discharge) pair
#[derive(Debug, Default, Clone)]
struct SeriesTriplet {
    justifications: Vec<f64>,
    thresholds: Vec<u8>,
    count_thresholds: Vec<u8>,
}

impl SeriesTriplet {
    fn append(&mut self, justification: f64, settings: &ThresholdSettings) {
        let pass = u8::from(justification > settings.justification);
        self.justifications.push(justification);
        self.thresholds.push(pass);

        let count = settings.count.max(1);
        let streak = self.thresholds.len() >= count
            && self.thresholds[self.thresholds.len() - count..]
                .iter()
                .all(|&t| t == 1);
        self.count_thresholds.push(u8::from(streak));
    }

    fn len(&self) -> usize {
        self.justifications.len()
    }
}

#[derive(Debug, Default)]
struct ModelStats {
    discharges: HashMap<String, SeriesTriplet>,
    /// First-sight order of discharges for this model
    discharge_ids: Vec<String>,
}

struct AutoPredictSession {
    dir: TempDir,
    discharge_order: Vec<String>,
    stats: HashMap<String, ModelStats>,
}

impl AutoPredictSession {
    fn raw_dir(&self) -> PathBuf {
        self.dir.path().join("raw")
    }
}

pub struct AutoPredictManager {
    orchestrator: Arc<PredictionOrchestrator>,
    sessions: Mutex<HashMap<Uuid, AutoPredictSession>>,
}

impl AutoPredictManager {
    pub fn new(orchestrator: Arc<PredictionOrchestrator>) -> Self {
        Self {
            orchestrator,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Open a session with a fresh scratch directory
    pub async fn start(&self) -> Result<Uuid, AutoPredictError> {
        let dir = tempfile::Builder::new()
            .prefix("fpo-autopredict-")
            .tempdir()
            .map_err(fpo_common::Error::Io)?;
        std::fs::create_dir(dir.path().join("raw")).map_err(fpo_common::Error::Io)?;

        let id = Uuid::new_v4();
        let session = AutoPredictSession {
            dir,
            discharge_order: Vec::new(),
            stats: HashMap::new(),
        };
        self.sessions.lock().await.insert(id, session);

        tracing::info!(session = %id, "Automated-predict session started");
        Ok(id)
    }

    /// Run one discharge through the fleet and fold the answers into the
    /// session's statistics
    pub async fn upload(
        &self,
        session_id: Uuid,
        files: &[SensorFile],
        discharge_id: Option<String>,
        thresholds: ThresholdSettings,
    ) -> Result<(), AutoPredictError> {
        // Resolve the discharge id before the fan-out; auto-ids follow the
        // session's first-sight counter.
        let discharge_id = {
            let sessions = self.sessions.lock().await;
            let session = sessions
                .get(&session_id)
                .ok_or(AutoPredictError::SessionNotFound(session_id))?;
            discharge_id
                .unwrap_or_else(|| fpo_common::types::Discharge::default_id(session.discharge_order.len()))
        };

        let discharge =
            crate::services::sensor_parser::build_discharge(discharge_id.clone(), files, None)?;
        let result = self.orchestrator.orchestrate(std::slice::from_ref(&discharge)).await?;

        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or(AutoPredictError::SessionNotFound(session_id))?;

        let raw_path = session
            .raw_dir()
            .join(format!("{}.json", safe_name(&discharge_id)));
        let raw = serde_json::to_vec_pretty(&result)
            .map_err(|e| fpo_common::Error::Internal(e.to_string()))?;
        std::fs::write(&raw_path, raw).map_err(fpo_common::Error::Io)?;

        if !session.discharge_order.contains(&discharge_id) {
            session.discharge_order.push(discharge_id.clone());
        }

        for model in &result.models {
            if model.status != "success" {
                continue;
            }
            let justifications: Vec<f64> = model
                .response
                .as_ref()
                .and_then(|r| r.windows.as_ref())
                .map(|windows| {
                    windows
                        .iter()
                        .filter_map(|w| w.justification)
                        .filter(|j| j.is_finite())
                        .collect()
                })
                .unwrap_or_default();
            if justifications.is_empty() {
                continue;
            }

            let stats = session.stats.entry(model.model.clone()).or_default();
            if !stats.discharge_ids.contains(&discharge_id) {
                stats.discharge_ids.push(discharge_id.clone());
            }
            let triplet = stats.discharges.entry(discharge_id.clone()).or_default();
            for justification in justifications {
                triplet.append(justification, &thresholds);
            }
        }

        tracing::debug!(
            session = %session_id,
            discharge = %discharge_id,
            models = result.models.len(),
            "Automated-predict upload folded in"
        );
        Ok(())
    }

    /// Package raw results and per-model CSVs into a ZIP and tear the
    /// session down
    pub async fn finalize(&self, session_id: Uuid) -> Result<Vec<u8>, AutoPredictError> {
        let session = self
            .sessions
            .lock()
            .await
            .remove(&session_id)
            .ok_or(AutoPredictError::SessionNotFound(session_id))?;

        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = zip::write::FileOptions::default();

        let mut raw_files: Vec<PathBuf> = std::fs::read_dir(session.raw_dir())
            .map_err(fpo_common::Error::Io)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .collect();
        raw_files.sort();
        for path in raw_files {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            zip.start_file(format!("raw/{}", name), options)
                .map_err(|e| AutoPredictError::Archive(e.to_string()))?;
            let content = std::fs::read(&path).map_err(fpo_common::Error::Io)?;
            zip.write_all(&content).map_err(fpo_common::Error::Io)?;
        }

        let mut models: Vec<&String> = session.stats.keys().collect();
        models.sort();
        for model in models {
            let csv = build_model_csv(&session.discharge_order, &session.stats[model])
                .map_err(|e| AutoPredictError::Archive(e.to_string()))?;
            zip.start_file(format!("stats/{}.csv", safe_name(model)), options)
                .map_err(|e| AutoPredictError::Archive(e.to_string()))?;
            zip.write_all(&csv).map_err(fpo_common::Error::Io)?;
        }

        let cursor = zip
            .finish()
            .map_err(|e| AutoPredictError::Archive(e.to_string()))?;

        tracing::info!(session = %session_id, "Automated-predict session finalised");
        // Dropping the session removes its scratch directory.
        Ok(cursor.into_inner())
    }
}

/// One column-triplet per discharge in session first-sight order; rows run
/// to the longest series, shorter columns padded with blanks
fn build_model_csv(
    discharge_order: &[String],
    stats: &ModelStats,
) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = Vec::with_capacity(discharge_order.len() * 3);
    for id in discharge_order {
        let safe = safe_name(id);
        header.push(format!("{}_justification", safe));
        header.push(format!("{}_justification_threshold", safe));
        header.push(format!("{}_count_threshold", safe));
    }
    writer.write_record(&header)?;

    let rows = discharge_order
        .iter()
        .filter_map(|id| stats.discharges.get(id))
        .map(SeriesTriplet::len)
        .max()
        .unwrap_or(0);

    for row in 0..rows {
        let mut record = Vec::with_capacity(discharge_order.len() * 3);
        for id in discharge_order {
            match stats.discharges.get(id) {
                Some(triplet) if row < triplet.len() => {
                    record.push(triplet.justifications[row].to_string());
                    record.push(triplet.thresholds[row].to_string());
                    record.push(triplet.count_thresholds[row].to_string());
                }
                _ => {
                    record.push(String::new());
                    record.push(String::new());
                    record.push(String::new());
                }
            }
        }
        writer.write_record(&record)?;
    }

    writer.into_inner().map_err(|e| {
        csv::Error::from(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
    })
}

/// Collapse a discharge or model identifier to filesystem- and CSV-safe form
fn safe_name(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
