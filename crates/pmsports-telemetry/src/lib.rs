//! Prometheus metrics and structured logging for pmsports.
//!
//! - Structured logging with tracing (JSON in production)
//! - Prometheus metrics for the feed, the stats cache and the dashboard

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::{gather_text, Metrics};
