//! Dashboard error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use pmsports_aggregator::AggregatorError;
use pmsports_telemetry::TelemetryError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Stats unavailable: {0}")]
    Stats(#[from] AggregatorError),

    #[error("Metrics unavailable: {0}")]
    Metrics(#[from] TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DashboardResult<T> = Result<T, DashboardError>;

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        error!(error = %self, "Request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "Something went wrong!",
                "message": self.to_string(),
            })),
        )
            .into_response()
    }
}
