//! Market polling and aggregate statistics.
//!
//! Fetches active markets from the REST API, keeps the sports related ones,
//! and computes count / 24h volume / open interest. `StatsCache` puts a
//! single-slot, time-based cache in front of the aggregator.

pub mod aggregator;
pub mod cache;
pub mod client;
pub mod error;

pub use aggregator::{compute_stats, is_sports_market, Aggregator, MarketIdSource, MarketSource};
pub use cache::StatsCache;
pub use client::{MarketsClient, DEFAULT_API_URL, DEFAULT_MARKETS_PATH};
pub use error::{AggregatorError, AggregatorResult};
