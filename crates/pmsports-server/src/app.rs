//! Main application orchestration.
//!
//! Coordinates:
//! - Periodic REST poll into the stats cache
//! - Feed subscriptions for every polled sports market
//! - Dashboard server and live push of feed updates

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use parking_lot::Mutex;
use pmsports_aggregator::{Aggregator, MarketIdSource, MarketSource, MarketsClient, StatsCache};
use pmsports_dashboard::{run_server, AppState, Broadcaster, DashboardMessage};
use pmsports_telemetry::Metrics;
use pmsports_ws::{ConnectionState, FeedClient};
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Main application.
pub struct Application {
    config: AppConfig,
    cache: Arc<StatsCache>,
    feed: Option<FeedClient>,
    broadcaster: Broadcaster,
    shutdown: CancellationToken,
}

impl Application {
    /// Create the application against the configured REST endpoint.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let client = MarketsClient::new(&config.api_url, &config.markets_path)?;
        info!(url = %client.markets_url(), "Markets endpoint configured");
        Ok(Self::with_source(config, Arc::new(client)))
    }

    /// Create the application with an explicit market source.
    pub fn with_source(config: AppConfig, source: Arc<dyn MarketSource>) -> Self {
        let cache = Arc::new(StatsCache::new(Aggregator::new(source), config.cache_ttl()));
        let broadcaster = Broadcaster::new(config.dashboard.broadcast_capacity);

        let feed = if config.feed.enabled {
            let feed = FeedClient::new(config.feed.clone().into());
            wire_feed(&feed, &broadcaster);
            Some(feed)
        } else {
            info!("Live feed disabled");
            None
        };

        Self {
            config,
            cache,
            feed,
            broadcaster,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn feed(&self) -> Option<&FeedClient> {
        self.feed.as_ref()
    }

    pub fn cache(&self) -> &Arc<StatsCache> {
        &self.cache
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Token that stops `run()` when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// One poll cycle: refresh the cache and subscribe to any new markets.
    ///
    /// Returns how many identifiers were new to the feed.
    pub async fn poll_once(&self) -> AppResult<usize> {
        let stats = self.cache.refresh().await?;

        let added = match &self.feed {
            Some(feed) => subscribe_from(feed, stats.as_ref()),
            None => 0,
        };

        self.broadcaster
            .publish(&DashboardMessage::stats_refreshed(stats.sports_market_count));

        info!(
            sports_markets = stats.sports_market_count,
            new_subscriptions = added,
            "Market poll complete"
        );
        Ok(added)
    }

    /// Run until ctrl-c, the shutdown token, or a dashboard server failure.
    pub async fn run(self) -> AppResult<()> {
        let state = AppState::new(
            self.cache.clone(),
            self.broadcaster.clone(),
            self.feed.clone(),
            self.config.dashboard.clone(),
        );
        let mut server = tokio::spawn(run_server(
            state,
            self.config.dashboard.port,
            self.shutdown.clone().cancelled_owned(),
        ));

        if let Some(feed) = &self.feed {
            feed.connect();
        }

        let mut poll_interval = tokio::time::interval(self.config.poll_interval());
        poll_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            poll_interval_secs = self.config.poll_interval_secs,
            "Entering main loop"
        );

        let result = loop {
            tokio::select! {
                _ = poll_interval.tick() => {
                    if let Err(e) = self.poll_once().await {
                        warn!(error = %e, "Market poll failed");
                    }
                }

                result = &mut server => {
                    warn!("Dashboard server exited");
                    break result
                        .map_err(AppError::from)
                        .and_then(|r| r.map_err(AppError::from));
                }

                _ = self.shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break Ok(());
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break Ok(());
                }
            }
        };

        info!("Shutting down");
        self.shutdown.cancel();
        if let Some(feed) = &self.feed {
            feed.shutdown().await;
        }
        if !server.is_finished() {
            server.await??;
        }

        result
    }
}

/// Add every identifier from `source` to the feed's subscription set.
fn subscribe_from(feed: &FeedClient, source: &dyn MarketIdSource) -> usize {
    let added = feed.add_markets(source.market_ids());
    Metrics::feed_subscribed_markets(feed.markets().len());
    added
}

/// Forward feed updates to dashboard clients and record feed metrics.
fn wire_feed(feed: &FeedClient, broadcaster: &Broadcaster) {
    let updates = broadcaster.clone();
    feed.on_update(move |event| {
        Metrics::feed_update();
        updates.publish(&DashboardMessage::feed_update(event.payload().clone()));
    });

    let previous = Mutex::new(None::<ConnectionState>);
    feed.on_state_change(move |state| {
        Metrics::feed_connected(state == ConnectionState::Connected);

        let mut previous = previous.lock();
        if state == ConnectionState::Connecting && *previous == Some(ConnectionState::Disconnected)
        {
            Metrics::feed_reconnect();
        }
        *previous = Some(state);
    });
}
