//! Common error types for FPO

use thiserror::Error;

/// Common result type for FPO operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the orchestrator
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Parse error in {file} line {line}: {message}")]
    Parse {
        file: String,
        line: usize,
        message: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}
