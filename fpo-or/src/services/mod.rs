//! Service modules for the orchestrator core

pub mod autopredict;
pub mod health;
pub mod node_client;
pub mod prediction;
pub mod sensor_parser;
pub mod summary;
pub mod training;
pub mod voting;

pub use autopredict::{AutoPredictError, AutoPredictManager, ThresholdSettings};
pub use health::{HealthProber, HealthReport, ModelHealth};
pub use node_client::{NodeClient, NodeError};
pub use prediction::{ModelOutcome, OrchestrateError, OrchestrationResult, PredictionOrchestrator};
pub use sensor_parser::{build_discharge, parse_signal_file, ParsedSignal};
pub use summary::SummaryStore;
pub use training::{BatchReport, FinishReport, StartReport, TrainingError, TrainingManager};
pub use voting::{vote, VoteOutcome, VoteTally};
