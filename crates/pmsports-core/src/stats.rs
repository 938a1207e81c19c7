//! Aggregate sports market statistics.

use crate::market::MarketSummary;
use crate::sport::Sport;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Snapshot served by `/stats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketStats {
    pub sports_market_count: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub volume24h: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub open_interest: Decimal,
    pub last_updated: DateTime<Utc>,
    pub markets: Vec<MarketSummary>,
}

impl MarketStats {
    /// Build the aggregate from already filtered sports markets.
    pub fn from_markets(markets: Vec<MarketSummary>, last_updated: DateTime<Utc>) -> Self {
        let volume24h = saturating_sum("volume24h", markets.iter().map(|m| m.volume24h));
        let open_interest =
            saturating_sum("open_interest", markets.iter().map(|m| m.open_interest));

        Self {
            sports_market_count: markets.len(),
            volume24h,
            open_interest,
            last_updated,
            markets,
        }
    }

    pub fn empty(last_updated: DateTime<Utc>) -> Self {
        Self::from_markets(Vec::new(), last_updated)
    }

    /// Markets belonging to one league.
    pub fn by_sport(&self, sport: Sport) -> Vec<MarketSummary> {
        self.markets
            .iter()
            .filter(|m| sport.matches(&m.title))
            .cloned()
            .collect()
    }

    /// Highest 24h volume first, at most `limit` entries.
    pub fn top_by_volume(&self, limit: usize) -> Vec<MarketSummary> {
        let mut markets = self.markets.clone();
        markets.sort_by(|a, b| b.volume24h.cmp(&a.volume24h));
        markets.truncate(limit);
        markets
    }

    /// Non-empty market identifiers, in market order.
    pub fn market_ids(&self) -> Vec<String> {
        self.markets
            .iter()
            .filter(|m| !m.id.is_empty())
            .map(|m| m.id.clone())
            .collect()
    }
}

/// Sum that clamps at `Decimal::MAX`/`MIN` instead of panicking on overflow.
fn saturating_sum(field: &'static str, values: impl Iterator<Item = Decimal>) -> Decimal {
    let mut total = Decimal::ZERO;
    let mut overflowed = false;
    for value in values {
        match total.checked_add(value) {
            Some(sum) => total = sum,
            None => {
                overflowed = true;
                total = total.saturating_add(value);
            }
        }
    }
    if overflowed {
        warn!(field, total = %total, "Aggregate overflowed, clamped");
    }
    total
}
