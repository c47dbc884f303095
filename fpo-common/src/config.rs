//! Configuration loading
//!
//! The orchestrator reads one TOML file resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. `FPO_CONFIG` environment variable
//! 3. Platform config directory (`<config_dir>/fpo/config.toml`)
//! 4. Compiled defaults (no file)
//!
//! A missing file yields the defaults with an empty node registry; a file
//! that exists but fails to parse is an error.

use crate::types::NodeDescriptor;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default HTTP listen port for the orchestrator
pub const DEFAULT_PORT: u16 = 5731;

/// Per-operation timeouts, milliseconds
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Timeouts {
    /// Bound on a single predict or health call to one node
    pub model_ms: u64,
    /// Bound on a single training HTTP attempt (hours scale; transport
    /// errors retry beyond it, application errors do not)
    pub training_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            model_ms: 30_000,
            training_ms: 7_200_000,
        }
    }
}

impl Timeouts {
    /// Training timeout in whole seconds, rounded up, as sent to nodes in
    /// the session preamble
    pub fn training_seconds(&self) -> u64 {
        self.training_ms.div_ceil(1000)
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub port: Option<u16>,
    pub timeouts: Timeouts,
    /// Initial node registry; mutable at runtime via the config endpoints
    pub nodes: Vec<NodeDescriptor>,
}

impl OrchestratorConfig {
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// Load configuration following the resolution priority order
    pub fn load(cli_arg: Option<&str>) -> Result<Self> {
        match resolve_config_path(cli_arg) {
            Some(path) if path.exists() => Self::from_file(&path),
            Some(path) => {
                tracing::warn!(path = %path.display(), "Config file not found, using defaults");
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse a specific TOML config file
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }
}

/// Resolve the config file path: CLI argument, then environment variable,
/// then platform default location
fn resolve_config_path(cli_arg: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(PathBuf::from(path));
    }

    if let Ok(path) = std::env::var("FPO_CONFIG") {
        return Some(PathBuf::from(path));
    }

    dirs::config_dir().map(|d| d.join("fpo").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_file() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.port(), DEFAULT_PORT);
        assert_eq!(config.timeouts.model_ms, 30_000);
        assert_eq!(config.timeouts.training_ms, 7_200_000);
        assert!(config.nodes.is_empty());
    }

    #[test]
    fn training_seconds_rounds_up() {
        let timeouts = Timeouts {
            model_ms: 30_000,
            training_ms: 1500,
        };
        assert_eq!(timeouts.training_seconds(), 2);
        assert_eq!(Timeouts::default().training_seconds(), 7200);
    }
}
