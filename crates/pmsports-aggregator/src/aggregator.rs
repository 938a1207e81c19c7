//! Sports filtering and aggregate computation.

use crate::error::AggregatorResult;
use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use pmsports_core::{is_sports_title, MarketStats, MarketSummary, RawMarket};
use pmsports_telemetry::Metrics;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Source of active market records.
pub trait MarketSource: Send + Sync {
    fn fetch_active_markets(&self) -> BoxFuture<'_, AggregatorResult<Vec<RawMarket>>>;
}

/// Supplies market identifiers for the feed's subscription set.
pub trait MarketIdSource {
    fn market_ids(&self) -> Vec<String>;
}

impl MarketIdSource for MarketStats {
    fn market_ids(&self) -> Vec<String> {
        MarketStats::market_ids(self)
    }
}

/// True when the market title names a tracked sport.
pub fn is_sports_market(market: &RawMarket) -> bool {
    is_sports_title(market.title())
}

/// Keep sports markets and sum their volume and open interest.
///
/// Missing numeric fields count as zero.
pub fn compute_stats(markets: Vec<RawMarket>, now: DateTime<Utc>) -> MarketStats {
    let total = markets.len();
    let sports: Vec<MarketSummary> = markets
        .into_iter()
        .filter(is_sports_market)
        .map(MarketSummary::from)
        .collect();

    debug!(total, sports = sports.len(), "Filtered sports markets");
    MarketStats::from_markets(sports, now)
}

/// Fetches markets and computes stats.
#[derive(Clone)]
pub struct Aggregator {
    source: Arc<dyn MarketSource>,
}

impl Aggregator {
    pub fn new(source: Arc<dyn MarketSource>) -> Self {
        Self { source }
    }

    /// Fetch the current market list and compute a fresh snapshot.
    pub async fn refresh(&self) -> AggregatorResult<MarketStats> {
        let started = Instant::now();
        let markets = match self.source.fetch_active_markets().await {
            Ok(markets) => markets,
            Err(e) => {
                Metrics::stats_refresh(false, started.elapsed().as_secs_f64());
                return Err(e);
            }
        };
        let stats = compute_stats(markets, Utc::now());
        Metrics::stats_refresh(true, started.elapsed().as_secs_f64());

        info!(
            sports_markets = stats.sports_market_count,
            volume24h = %stats.volume24h,
            open_interest = %stats.open_interest,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Computed market stats"
        );
        Ok(stats)
    }
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator").finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::AggregatorError;
    use parking_lot::Mutex;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted market source for aggregator and cache tests.
    pub(crate) struct FakeSource {
        responses: Mutex<Vec<AggregatorResult<Vec<RawMarket>>>>,
        pub calls: AtomicUsize,
    }

    impl FakeSource {
        pub fn new(responses: Vec<AggregatorResult<Vec<RawMarket>>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses),
                calls: AtomicUsize::new(0),
            })
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl MarketSource for FakeSource {
        fn fetch_active_markets(&self) -> BoxFuture<'_, AggregatorResult<Vec<RawMarket>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = {
                let mut responses = self.responses.lock();
                if responses.is_empty() {
                    Ok(Vec::new())
                } else {
                    responses.remove(0)
                }
            };
            Box::pin(async move {
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                next
            })
        }
    }

    pub(crate) fn raw(
        id: &str,
        title: &str,
        volume: Option<Decimal>,
        oi: Option<Decimal>,
    ) -> RawMarket {
        RawMarket {
            id: Some(id.to_string()),
            title: Some(title.to_string()),
            volume24h: volume,
            open_interest: oi,
            ..Default::default()
        }
    }

    #[test]
    fn test_is_sports_market() {
        assert!(is_sports_market(&raw("a", "NBA: Lakers vs Celtics", None, None)));
        assert!(is_sports_market(&raw("b", "Premier League soccer", None, None)));
        assert!(!is_sports_market(&raw("c", "Will BTC hit 100k?", None, None)));
        assert!(!is_sports_market(&RawMarket::default()));
    }

    #[test]
    fn test_compute_stats_filters_and_sums() {
        let now = Utc::now();
        let stats = compute_stats(
            vec![
                raw("a", "NFL Week 1", Some(dec!(100.5)), Some(dec!(20))),
                raw("b", "US election", Some(dec!(9999)), Some(dec!(9999))),
                raw("c", "MLB All-Star", None, Some(dec!(5))),
                raw("d", "College Football", Some(dec!(50)), None),
            ],
            now,
        );

        assert_eq!(stats.sports_market_count, 3);
        assert_eq!(stats.volume24h, dec!(150.5));
        assert_eq!(stats.open_interest, dec!(25));
        assert_eq!(stats.last_updated, now);
        assert_eq!(stats.market_ids(), vec!["a", "c", "d"]);
    }

    #[test]
    fn test_compute_stats_survives_overflowing_volumes() {
        let body = serde_json::json!({"markets": [
            {"id": "a", "title": "NBA one", "volume24h": "79228162514264337593543950335"},
            {"id": "b", "title": "NBA two", "volume24h": "1"}
        ]});
        let markets = pmsports_core::decode_markets(&body);
        assert_eq!(markets.len(), 2);

        let stats = compute_stats(markets, Utc::now());
        assert_eq!(stats.sports_market_count, 2);
        assert_eq!(stats.volume24h, Decimal::MAX);
    }

    #[test]
    fn test_compute_stats_empty() {
        let stats = compute_stats(Vec::new(), Utc::now());
        assert_eq!(stats.sports_market_count, 0);
        assert_eq!(stats.volume24h, Decimal::ZERO);
    }

    #[test]
    fn test_market_id_source_for_stats() {
        let stats = compute_stats(vec![raw("x", "NBA", None, None)], Utc::now());
        let source: &dyn MarketIdSource = &stats;
        assert_eq!(source.market_ids(), vec!["x"]);
    }

    #[tokio::test]
    async fn test_refresh() {
        let source = FakeSource::new(vec![Ok(vec![raw("a", "NBA", Some(dec!(1)), None)])]);
        let aggregator = Aggregator::new(source.clone());

        let stats = aggregator.refresh().await.unwrap();
        assert_eq!(stats.sports_market_count, 1);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_refresh_propagates_error() {
        let source = FakeSource::new(vec![Err(AggregatorError::Status {
            status: 500,
            body: String::new(),
        })]);
        let aggregator = Aggregator::new(source);

        assert!(matches!(
            aggregator.refresh().await,
            Err(AggregatorError::Status { status: 500, .. })
        ));
    }
}
