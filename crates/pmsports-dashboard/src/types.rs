//! Dashboard API types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// `/health` response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    /// `null` until the first successful refresh.
    pub last_update: Option<DateTime<Utc>>,
    pub market_count: usize,
    /// Feed connection state, or `disabled`.
    pub feed: String,
}

/// Message pushed to dashboard WebSocket clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardMessage {
    /// Raw update event from the market feed.
    FeedUpdate { timestamp_ms: i64, payload: Value },
    /// New stats snapshot stored by the poller.
    StatsRefreshed {
        timestamp_ms: i64,
        sports_market_count: usize,
    },
}

impl DashboardMessage {
    pub fn feed_update(payload: Value) -> Self {
        Self::FeedUpdate {
            timestamp_ms: Utc::now().timestamp_millis(),
            payload,
        }
    }

    pub fn stats_refreshed(sports_market_count: usize) -> Self {
        Self::StatsRefreshed {
            timestamp_ms: Utc::now().timestamp_millis(),
            sports_market_count,
        }
    }
}
