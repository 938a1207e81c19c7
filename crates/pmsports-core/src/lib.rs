//! Core domain types for the sports prediction-market stats service.
//!
//! This crate provides the types shared by the aggregator, the stats server
//! and the dashboard:
//! - `RawMarket`: lenient decoding of REST market records
//! - `MarketSummary`: normalized market as served to the dashboard
//! - `MarketStats`: aggregate snapshot (count, 24h volume, open interest)
//! - `Sport`: keyword based sport classification
//! - `MarketFilter`: status / end-date window filter

pub mod error;
pub mod filter;
pub mod market;
pub mod sport;
pub mod stats;

pub use error::{CoreError, Result};
pub use filter::{MarketFilter, StatusFilter};
pub use market::{decode_markets, parse_timestamp, MarketSummary, RawMarket};
pub use sport::{is_sports_title, Sport, SPORT_KEYWORDS};
pub use stats::MarketStats;
