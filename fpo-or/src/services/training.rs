//! Training session manager
//!
//! One process-wide session at a time, moving Idle → Active → Idle. Every
//! node that accepts the session preamble gets a serial delivery queue: an
//! unbounded channel drained by one consumer task, which is the sole
//! mechanism guaranteeing that ordinals reach the node in strict increasing
//! order with no gaps, across client batches and transport retries.
//!
//! Discharges are shared across queues by refcount rather than deep copy;
//! the last consumer's drop releases the signal buffers, which bounds memory
//! when training sets are large.

use crate::registry::NodeRegistry;
use crate::services::node_client::NodeClient;
use crate::services::summary::SummaryStore;
use fpo_common::types::Discharge;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("A training session is already active")]
    SessionActive,

    #[error("No training session is active")]
    NoActiveSession,

    #[error("No prediction nodes are enabled")]
    NoModelsEnabled,

    #[error("No nodes accepted the training session")]
    NoNodesAccepted,

    #[error("totalDischarges must be at least 1")]
    InvalidTotal,
}

/// Outcome of a session start, per node
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStartDetail {
    pub model: String,
    /// `"accepted"` or `"rejected"`
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_discharges: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartReport {
    pub successful: usize,
    pub failed: usize,
    pub details: Vec<NodeStartDetail>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeFailure {
    pub model: String,
    pub error: String,
}

/// Outcome of one batch submission
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    /// Unique discharges accepted and enqueued from this batch
    pub accepted: usize,
    /// Discharges skipped because their id was already seen this session
    pub skipped_duplicates: usize,
    /// Discharges rejected because the session total was already reached
    pub rejected: usize,
    pub enqueued: usize,
    pub total_discharges: usize,
    /// Deliveries that failed on a poisoned or failing node
    pub failed_deliveries: Vec<NodeFailure>,
    /// True when this batch auto-finished the session
    pub finished: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishReport {
    pub total_discharges: usize,
    pub enqueued: usize,
    pub successful: Vec<String>,
    pub failed: Vec<NodeFailure>,
}

enum TaskAck {
    Delivered,
    Skipped,
    Failed(String),
}

struct QueueTask {
    ordinal: u64,
    discharge: Arc<Discharge>,
    ack: oneshot::Sender<TaskAck>,
}

struct NodeQueue {
    tx: mpsc::UnboundedSender<QueueTask>,
    consumer: JoinHandle<()>,
    /// First non-transport delivery error; set once, poisons the queue
    failure: Arc<parking_lot::Mutex<Option<String>>>,
}

struct ActiveSession {
    total: usize,
    enqueued: usize,
    seen: HashSet<String>,
    auto_finish: bool,
    nodes: HashMap<String, NodeQueue>,
    rejected_at_start: Vec<NodeFailure>,
    started_at: chrono::DateTime<chrono::Utc>,
}

enum SessionState {
    Idle,
    Active(ActiveSession),
}

pub struct TrainingManager {
    registry: Arc<NodeRegistry>,
    client: Arc<NodeClient>,
    summaries: Arc<SummaryStore>,
    state: Mutex<SessionState>,
}

impl TrainingManager {
    pub fn new(
        registry: Arc<NodeRegistry>,
        client: Arc<NodeClient>,
        summaries: Arc<SummaryStore>,
    ) -> Self {
        Self {
            registry,
            client,
            summaries,
            state: Mutex::new(SessionState::Idle),
        }
    }

    pub async fn is_active(&self) -> bool {
        matches!(*self.state.lock().await, SessionState::Active(_))
    }

    /// Start a training session across all enabled nodes
    ///
    /// Nodes that reject the preamble are excluded from the session; the
    /// rest proceed. Fails without state change when another session is
    /// active, no node is enabled, or every node rejects.
    pub async fn start(&self, total: usize, auto_finish: bool) -> Result<StartReport, TrainingError> {
        let mut state = self.state.lock().await;
        self.start_locked(&mut state, total, auto_finish).await
    }

    /// Start a session if none is active
    ///
    /// Used by the batch endpoint's implicit-start path: a client that
    /// submits `totalDischarges` with its first batch gets an auto-finishing
    /// session. Returns None when a session was already active.
    pub async fn ensure_started(
        &self,
        total: Option<usize>,
    ) -> Result<Option<StartReport>, TrainingError> {
        let mut state = self.state.lock().await;
        if matches!(*state, SessionState::Active(_)) {
            return Ok(None);
        }
        let total = total.ok_or(TrainingError::NoActiveSession)?;
        let report = self.start_locked(&mut state, total, true).await?;
        Ok(Some(report))
    }

    /// Submit one batch of discharges to the active session
    ///
    /// Per discharge, atomically: de-duplicate on id, assign the next
    /// ordinal, and append a delivery task to every node queue. The call
    /// returns once every node has acknowledged (delivered, skipped, or
    /// failed) each discharge of the batch.
    pub async fn send_batch(
        &self,
        discharges: Vec<Arc<Discharge>>,
    ) -> Result<BatchReport, TrainingError> {
        let mut accepted = 0_usize;
        let mut skipped_duplicates = 0_usize;
        let mut rejected = 0_usize;
        let mut acks = Vec::new();
        let (enqueued, total) = {
            let mut state = self.state.lock().await;
            let session = match &mut *state {
                SessionState::Active(session) => session,
                SessionState::Idle => return Err(TrainingError::NoActiveSession),
            };

            for discharge in discharges {
                if session.seen.contains(&discharge.id) {
                    tracing::debug!(discharge = %discharge.id, "Duplicate discharge skipped");
                    skipped_duplicates += 1;
                    continue;
                }
                if session.auto_finish && session.enqueued >= session.total {
                    tracing::warn!(
                        discharge = %discharge.id,
                        total = session.total,
                        "Discharge beyond session total rejected"
                    );
                    rejected += 1;
                    continue;
                }

                session.seen.insert(discharge.id.clone());
                session.enqueued += 1;
                if !session.auto_finish && session.enqueued > session.total {
                    // Open-ended sessions grow their total as batches stream in.
                    session.total = session.enqueued;
                }
                let ordinal = session.enqueued as u64;

                for (key, queue) in &session.nodes {
                    let (ack_tx, ack_rx) = oneshot::channel();
                    let task = QueueTask {
                        ordinal,
                        discharge: Arc::clone(&discharge),
                        ack: ack_tx,
                    };
                    if queue.tx.send(task).is_ok() {
                        acks.push((key.clone(), ordinal, ack_rx));
                    }
                }
                accepted += 1;
            }

            (session.enqueued, session.total)
        };

        // Await every node's acknowledgement outside the session lock so
        // deliveries from interleaved batches can proceed.
        let mut failed_deliveries = Vec::new();
        for (model, ordinal, ack_rx) in acks {
            match ack_rx.await {
                Ok(TaskAck::Delivered) | Ok(TaskAck::Skipped) => {}
                Ok(TaskAck::Failed(error)) => {
                    failed_deliveries.push(NodeFailure { model, error });
                }
                Err(_) => {
                    failed_deliveries.push(NodeFailure {
                        model,
                        error: format!("delivery of ordinal {} was cancelled", ordinal),
                    });
                }
            }
        }

        let finished = self.try_auto_finish().await;

        Ok(BatchReport {
            accepted,
            skipped_duplicates,
            rejected,
            enqueued,
            total_discharges: total,
            failed_deliveries,
            finished,
        })
    }

    /// Explicitly end the active session
    pub async fn finish(&self) -> Result<FinishReport, TrainingError> {
        let mut state = self.state.lock().await;
        match std::mem::replace(&mut *state, SessionState::Idle) {
            SessionState::Active(session) => Ok(self.finish_session(session).await),
            SessionState::Idle => Err(TrainingError::NoActiveSession),
        }
    }

    async fn start_locked(
        &self,
        state: &mut SessionState,
        total: usize,
        auto_finish: bool,
    ) -> Result<StartReport, TrainingError> {
        if matches!(state, SessionState::Active(_)) {
            return Err(TrainingError::SessionActive);
        }
        if total == 0 {
            return Err(TrainingError::InvalidTotal);
        }

        let nodes = self.registry.enabled();
        if nodes.is_empty() {
            return Err(TrainingError::NoModelsEnabled);
        }

        let timeouts = self.registry.timeouts();
        let timeout = Duration::from_millis(timeouts.training_ms);
        let timeout_seconds = timeouts.training_seconds();

        tracing::info!(total, auto_finish, nodes = nodes.len(), "Starting training session");

        let starts = nodes.iter().map(|node| {
            let client = Arc::clone(&self.client);
            async move {
                client
                    .start_training(node, total, timeout_seconds, timeout)
                    .await
            }
        });
        let results = futures::future::join_all(starts).await;

        let mut details = Vec::with_capacity(nodes.len());
        let mut queues = HashMap::new();
        let mut rejected_at_start = Vec::new();

        for (node, result) in nodes.into_iter().zip(results) {
            match result {
                Ok(response) => {
                    details.push(NodeStartDetail {
                        model: node.key.clone(),
                        status: "accepted".to_string(),
                        expected_discharges: response.expected_discharges,
                        error: None,
                    });

                    let (tx, rx) = mpsc::unbounded_channel();
                    let failure = Arc::new(parking_lot::Mutex::new(None));
                    let consumer = tokio::spawn(run_queue(
                        node.key.clone(),
                        node.train_url.clone(),
                        Arc::clone(&self.client),
                        timeout,
                        rx,
                        Arc::clone(&failure),
                    ));
                    queues.insert(node.key, NodeQueue { tx, consumer, failure });
                }
                Err(e) => {
                    tracing::warn!(node = %node.key, error = %e, "Node rejected training session");
                    details.push(NodeStartDetail {
                        model: node.key.clone(),
                        status: "rejected".to_string(),
                        expected_discharges: None,
                        error: Some(e.to_string()),
                    });
                    rejected_at_start.push(NodeFailure {
                        model: node.key,
                        error: e.to_string(),
                    });
                }
            }
        }

        let successful = queues.len();
        let failed = rejected_at_start.len();
        if successful == 0 {
            return Err(TrainingError::NoNodesAccepted);
        }

        *state = SessionState::Active(ActiveSession {
            total,
            enqueued: 0,
            seen: HashSet::new(),
            auto_finish,
            nodes: queues,
            rejected_at_start,
            started_at: chrono::Utc::now(),
        });

        Ok(StartReport {
            successful,
            failed,
            details,
        })
    }

    /// End the session when an auto-finishing one has consumed its total
    async fn try_auto_finish(&self) -> bool {
        let mut state = self.state.lock().await;
        let should_finish = match &*state {
            SessionState::Active(session) => {
                session.auto_finish && session.enqueued >= session.total
            }
            SessionState::Idle => false,
        };
        if !should_finish {
            return false;
        }

        match std::mem::replace(&mut *state, SessionState::Idle) {
            SessionState::Active(session) => {
                tracing::info!(enqueued = session.enqueued, "Training session auto-finished");
                self.finish_session(session).await;
                true
            }
            SessionState::Idle => false,
        }
    }

    /// Drain the queues, join the consumers, and record the session summary
    async fn finish_session(&self, session: ActiveSession) -> FinishReport {
        let ActiveSession {
            total,
            enqueued,
            nodes,
            rejected_at_start,
            started_at,
            ..
        } = session;

        let mut successful = Vec::new();
        let mut failed = rejected_at_start;

        for (key, queue) in nodes {
            // Closing the channel lets the consumer drain remaining tasks
            // and exit.
            drop(queue.tx);
            if let Err(e) = queue.consumer.await {
                tracing::error!(node = %key, error = %e, "Training queue consumer panicked");
            }

            match queue.failure.lock().take() {
                Some(error) => failed.push(NodeFailure { model: key, error }),
                None => successful.push(key),
            }
        }
        successful.sort();

        let status = if failed.is_empty() {
            "completed"
        } else {
            "completed_with_failures"
        };
        let summary = serde_json::json!({
            "status": status,
            "totalDischarges": total,
            "enqueued": enqueued,
            "startedAt": started_at.to_rfc3339(),
            "successfulModels": successful,
            "failedModels": failed.iter().map(|f| serde_json::json!({
                "model": f.model,
                "error": f.error,
            })).collect::<Vec<_>>(),
        });
        if let Err(e) = self.summaries.record(summary) {
            tracing::error!(error = %e, "Failed to record training summary");
        }

        tracing::info!(
            enqueued,
            successful = successful.len(),
            failed = failed.len(),
            "Training session finished"
        );

        FinishReport {
            total_discharges: total,
            enqueued,
            successful,
            failed,
        }
    }
}

/// Per-node serial delivery loop
///
/// Strict FIFO: a task begins only after the prior one fully completes,
/// including its transport retries. A non-transport failure poisons the
/// queue; remaining tasks are drained and skipped so other nodes continue
/// unaffected.
async fn run_queue(
    key: String,
    train_url: String,
    client: Arc<NodeClient>,
    timeout: Duration,
    mut rx: mpsc::UnboundedReceiver<QueueTask>,
    failure: Arc<parking_lot::Mutex<Option<String>>>,
) {
    while let Some(task) = rx.recv().await {
        let QueueTask { ordinal, discharge, ack } = task;

        if failure.lock().is_some() {
            drop(discharge);
            let _ = ack.send(TaskAck::Skipped);
            continue;
        }

        let result = client
            .push_discharge(&key, &train_url, ordinal, &discharge, timeout)
            .await;
        // Drop the discharge before acknowledging: once the last queue has
        // acked, no copy of the signal buffers remains in the session.
        drop(discharge);

        match result {
            Ok(()) => {
                tracing::debug!(node = %key, ordinal, "Discharge delivered");
                let _ = ack.send(TaskAck::Delivered);
            }
            Err(e) => {
                tracing::error!(
                    node = %key,
                    ordinal,
                    error = %e,
                    "Training delivery failed; node excluded for the rest of the session"
                );
                *failure.lock() = Some(e.to_string());
                let _ = ack.send(TaskAck::Failed(e.to_string()));
            }
        }
    }
}
