//! Single-slot, time-based stats cache.

use crate::aggregator::Aggregator;
use crate::error::AggregatorResult;
use parking_lot::RwLock;
use pmsports_core::MarketStats;
use pmsports_telemetry::Metrics;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex as TokioMutex;
use tracing::{debug, warn};

/// Holds the latest `MarketStats` and when it was stored.
///
/// Readers take the slot lock only long enough to clone the `Arc`.
/// Refreshes are serialized through `refresh_lock`, so concurrent misses
/// trigger a single upstream fetch.
pub struct StatsCache {
    aggregator: Aggregator,
    ttl: Duration,
    slot: RwLock<Option<(Arc<MarketStats>, Instant)>>,
    refresh_lock: TokioMutex<()>,
}

impl StatsCache {
    pub fn new(aggregator: Aggregator, ttl: Duration) -> Self {
        Self {
            aggregator,
            ttl,
            slot: RwLock::new(None),
            refresh_lock: TokioMutex::new(()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached stats if younger than the TTL.
    pub fn get(&self) -> Option<Arc<MarketStats>> {
        let slot = self.slot.read();
        match slot.as_ref() {
            Some((stats, stored_at)) if stored_at.elapsed() < self.ttl => Some(stats.clone()),
            _ => None,
        }
    }

    /// Cached stats regardless of age.
    pub fn latest(&self) -> Option<Arc<MarketStats>> {
        self.slot.read().as_ref().map(|(stats, _)| stats.clone())
    }

    /// Age of the cached value.
    pub fn age(&self) -> Option<Duration> {
        self.slot.read().as_ref().map(|(_, stored_at)| stored_at.elapsed())
    }

    pub fn store(&self, stats: MarketStats) -> Arc<MarketStats> {
        Metrics::cached_markets(stats.sports_market_count);
        let stats = Arc::new(stats);
        *self.slot.write() = Some((stats.clone(), Instant::now()));
        stats
    }

    /// Fetch through the aggregator and store the result.
    pub async fn refresh(&self) -> AggregatorResult<Arc<MarketStats>> {
        let _guard = self.refresh_lock.lock().await;
        let stats = self.aggregator.refresh().await?;
        Ok(self.store(stats))
    }

    /// Fresh cached stats, refreshing when stale.
    ///
    /// When the refresh fails the previous snapshot is returned if there
    /// is one.
    pub async fn get_or_refresh(&self) -> AggregatorResult<Arc<MarketStats>> {
        if let Some(stats) = self.get() {
            return Ok(stats);
        }

        let _guard = self.refresh_lock.lock().await;

        // Another task may have refreshed while we waited
        if let Some(stats) = self.get() {
            debug!("Stats refreshed by concurrent request");
            return Ok(stats);
        }

        match self.aggregator.refresh().await {
            Ok(stats) => Ok(self.store(stats)),
            Err(e) => match self.latest() {
                Some(stale) => {
                    warn!(error = %e, "Stats refresh failed, serving stale snapshot");
                    Ok(stale)
                }
                None => Err(e),
            },
        }
    }
}

impl std::fmt::Debug for StatsCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsCache")
            .field("ttl", &self.ttl)
            .field("age", &self.age())
            .finish_non_exhaustive()
    }
}
