//! Error types for pmsports-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Unknown sport: {0}")]
    UnknownSport(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
