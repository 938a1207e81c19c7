//! Prometheus metrics for pmsports.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means a
//! duplicate metric name, which is a programming error and panics on first
//! use of the metric.

use crate::error::TelemetryResult;
use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_histogram, register_int_gauge,
    Counter, CounterVec, Encoder, Gauge, Histogram, IntGauge, TextEncoder,
};

/// Feed connection state (1 = connected, 0 = otherwise).
pub static FEED_CONNECTED: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "pmsports_feed_connected",
        "Feed WebSocket connection state (1=connected)"
    )
    .unwrap()
});

/// Feed reconnection attempts.
pub static FEED_RECONNECT_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "pmsports_feed_reconnect_total",
        "Total feed reconnection attempts"
    )
    .unwrap()
});

/// Update events received from the feed.
pub static FEED_UPDATES_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "pmsports_feed_updates_total",
        "Total update events received from the feed"
    )
    .unwrap()
});

/// Size of the feed subscription set.
pub static FEED_SUBSCRIBED_MARKETS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "pmsports_feed_subscribed_markets",
        "Number of market identifiers in the subscription set"
    )
    .unwrap()
});

/// Stats refreshes by outcome (ok/error).
pub static STATS_REFRESH_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "pmsports_stats_refresh_total",
        "Total stats refreshes",
        &["outcome"]
    )
    .unwrap()
});

/// Stats refresh duration in seconds.
pub static STATS_REFRESH_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "pmsports_stats_refresh_duration_seconds",
        "Duration of a REST poll plus aggregation",
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap()
});

/// Sports markets in the latest snapshot.
pub static CACHED_MARKETS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "pmsports_cached_markets",
        "Sports markets in the cached stats snapshot"
    )
    .unwrap()
});

/// Connected dashboard WebSocket clients.
pub static DASHBOARD_WS_CLIENTS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "pmsports_dashboard_ws_clients",
        "Connected dashboard WebSocket clients"
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record the feed connection state.
    pub fn feed_connected(connected: bool) {
        FEED_CONNECTED.set(if connected { 1.0 } else { 0.0 });
    }

    pub fn feed_reconnect() {
        FEED_RECONNECT_TOTAL.inc();
    }

    pub fn feed_update() {
        FEED_UPDATES_TOTAL.inc();
    }

    pub fn feed_subscribed_markets(count: usize) {
        FEED_SUBSCRIBED_MARKETS.set(count as i64);
    }

    /// Record a stats refresh and how long it took.
    pub fn stats_refresh(ok: bool, duration_secs: f64) {
        let outcome = if ok { "ok" } else { "error" };
        STATS_REFRESH_TOTAL.with_label_values(&[outcome]).inc();
        STATS_REFRESH_DURATION.observe(duration_secs);
    }

    pub fn cached_markets(count: usize) {
        CACHED_MARKETS.set(count as i64);
    }

    pub fn dashboard_ws_clients(count: usize) {
        DASHBOARD_WS_CLIENTS.set(count as i64);
    }
}

/// Render the default registry in Prometheus text format.
pub fn gather_text() -> TelemetryResult<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
