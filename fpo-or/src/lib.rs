//! fpo-or - Prediction Orchestrator Service
//!
//! Sits between a user-facing client and a dynamic fleet of independent
//! prediction nodes. Fans predict requests out to all enabled nodes and
//! aggregates their answers by majority vote; manages streaming multi-batch
//! training sessions with per-node ordered delivery; accumulates
//! automated-prediction statistics and packages them at finalisation.

pub mod api;
pub mod error;
pub mod registry;
pub mod services;
pub mod state;

pub use state::AppState;
