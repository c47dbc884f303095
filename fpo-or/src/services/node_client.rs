//! HTTP client for the node protocol
//!
//! Wraps one shared `reqwest::Client` with per-call timeouts. Errors are
//! classified so callers can tell transport failures (connection refused,
//! DNS, reset, truncated body) apart from application failures (HTTP status,
//! timeout, undecodable body): training deliveries retry the former
//! indefinitely and surface the latter immediately.

use fpo_common::protocol::{
    NodeHealth, NodePrediction, TrainingStartRequest, TrainingStartResponse,
};
use fpo_common::types::{Discharge, NodeDescriptor};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

/// Fixed backoff between transport-error retries
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Node call errors, classified for retry decisions
#[derive(Debug, Error)]
pub enum NodeError {
    /// Network-transport failure: connection refused, DNS, reset,
    /// truncated response
    #[error("Transport error: {0}")]
    Transport(String),

    /// The per-attempt timeout elapsed
    #[error("Request timed out")]
    Timeout,

    /// The node answered with a non-success HTTP status
    #[error("Node returned HTTP {status}: {body}")]
    Protocol { status: u16, body: String },

    /// The node answered 2xx but the body did not decode
    #[error("Invalid node response: {0}")]
    Decode(String),
}

impl NodeError {
    /// True for the error class that training deliveries retry forever
    pub fn is_transport(&self) -> bool {
        matches!(self, NodeError::Transport(_))
    }

    fn from_send_error(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            NodeError::Timeout
        } else {
            NodeError::Transport(e.to_string())
        }
    }
}

/// HTTP client for the four node endpoints
pub struct NodeClient {
    http: reqwest::Client,
}

impl NodeClient {
    pub fn new() -> fpo_common::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("FPO/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| fpo_common::Error::Internal(format!("HTTP client init: {}", e)))?;

        Ok(Self { http })
    }

    /// POST one discharge to a node's predict endpoint
    pub async fn predict(
        &self,
        node: &NodeDescriptor,
        discharge: &Discharge,
        timeout: Duration,
    ) -> Result<NodePrediction, NodeError> {
        self.post_json(&node.predict_url, discharge, timeout).await
    }

    /// POST the training-session preamble to a node
    ///
    /// Retries indefinitely on transport errors: a node mid-restart must not
    /// lose the session.
    pub async fn start_training(
        &self,
        node: &NodeDescriptor,
        total_discharges: usize,
        timeout_seconds: u64,
        timeout: Duration,
    ) -> Result<TrainingStartResponse, NodeError> {
        let request = TrainingStartRequest {
            total_discharges,
            timeout_seconds,
        };

        loop {
            match self.post_json(&node.train_url, &request, timeout).await {
                Err(e) if e.is_transport() => {
                    tracing::warn!(
                        node = %node.key,
                        error = %e,
                        "Training start unreachable, retrying"
                    );
                    tokio::time::sleep(RETRY_BACKOFF).await;
                }
                other => return other,
            }
        }
    }

    /// POST one training discharge to `{trainURL}/<ordinal>` (1-based)
    ///
    /// Retries indefinitely on transport errors; any other failure surfaces
    /// immediately so the caller can poison the node's queue.
    pub async fn push_discharge(
        &self,
        node_key: &str,
        train_url: &str,
        ordinal: u64,
        discharge: &Discharge,
        timeout: Duration,
    ) -> Result<(), NodeError> {
        let url = format!("{}/{}", train_url.trim_end_matches('/'), ordinal);

        loop {
            match self.try_push(&url, discharge, timeout).await {
                Err(e) if e.is_transport() => {
                    tracing::warn!(
                        node = %node_key,
                        ordinal,
                        error = %e,
                        "Discharge delivery unreachable, retrying"
                    );
                    tokio::time::sleep(RETRY_BACKOFF).await;
                }
                other => return other,
            }
        }
    }

    /// GET a node's health endpoint
    pub async fn health(
        &self,
        node: &NodeDescriptor,
        timeout: Duration,
    ) -> Result<NodeHealth, NodeError> {
        let response = self
            .http
            .get(&node.health_url)
            .timeout(timeout)
            .send()
            .await
            .map_err(NodeError::from_send_error)?;

        decode_response(response).await
    }

    async fn try_push(
        &self,
        url: &str,
        discharge: &Discharge,
        timeout: Duration,
    ) -> Result<(), NodeError> {
        let response = self
            .http
            .post(url)
            .timeout(timeout)
            .json(discharge)
            .send()
            .await
            .map_err(NodeError::from_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NodeError::Protocol {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }

    async fn post_json<B, R>(
        &self,
        url: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<R, NodeError>
    where
        B: serde::Serialize,
        R: DeserializeOwned,
    {
        let response = self
            .http
            .post(url)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(NodeError::from_send_error)?;

        decode_response(response).await
    }
}

/// Split a node answer into protocol / transport / decode error classes
async fn decode_response<R: DeserializeOwned>(response: reqwest::Response) -> Result<R, NodeError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(NodeError::Protocol {
            status: status.as_u16(),
            body,
        });
    }

    // A failure while reading the body is a truncated transfer, which
    // counts as transport; a body that reads fine but will not decode is an
    // application error.
    let bytes = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            NodeError::Timeout
        } else {
            NodeError::Transport(e.to_string())
        }
    })?;

    serde_json::from_slice(&bytes).map_err(|e| NodeError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_classification() {
        assert!(NodeError::Transport("connection refused".into()).is_transport());
        assert!(!NodeError::Timeout.is_transport());
        assert!(!NodeError::Protocol {
            status: 500,
            body: String::new()
        }
        .is_transport());
        assert!(!NodeError::Decode("eof".into()).is_transport());
    }

    #[test]
    fn ordinal_url_handles_trailing_slash() {
        let url = format!("{}/{}", "http://localhost:9001/train/".trim_end_matches('/'), 3);
        assert_eq!(url, "http://localhost:9001/train/3");
    }
}
