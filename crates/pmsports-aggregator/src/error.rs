//! Aggregator error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AggregatorError {
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type AggregatorResult<T> = Result<T, AggregatorError>;
