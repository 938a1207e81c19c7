//! Dashboard market filter.
//!
//! Same semantics as the browser-side filter: a status selector and an
//! end-date window measured in days from now. A market with an end time
//! outside `[now, now + end_days]` is dropped; markets without an end time
//! only pass when no window is set.

use crate::error::{CoreError, Result};
use crate::market::MarketSummary;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer};
use std::str::FromStr;

/// Status selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
}

/// Filter applied by `/markets` and by the dashboard UI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MarketFilter {
    #[serde(default)]
    pub status: StatusFilter,
    /// `None` means "all" (no end-date window).
    #[serde(default, deserialize_with = "deserialize_end_days")]
    pub end_days: Option<u32>,
}

impl MarketFilter {
    pub fn matches(&self, market: &MarketSummary, now: DateTime<Utc>) -> bool {
        if self.status == StatusFilter::Active && !market.active {
            return false;
        }

        if let Some(days) = self.end_days {
            let cutoff = now + Duration::days(i64::from(days));
            match market.end_time {
                Some(end) if end >= now && end <= cutoff => {}
                _ => return false,
            }
        }

        true
    }

    pub fn apply(&self, markets: &[MarketSummary], now: DateTime<Utc>) -> Vec<MarketSummary> {
        markets
            .iter()
            .filter(|m| self.matches(m, now))
            .cloned()
            .collect()
    }
}

/// Parse the `end_days` selector: `"all"` or a day count.
fn parse_end_days(raw: &str) -> Result<Option<u32>> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("all") {
        return Ok(None);
    }
    u32::from_str(raw).map(Some).map_err(|_| {
        CoreError::InvalidFilter(format!("end_days must be 'all' or a number, got {raw:?}"))
    })
}

fn deserialize_end_days<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        Some(raw) => parse_end_days(&raw).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::RawMarket;

    fn market(active: bool, end_in_days: Option<i64>, now: DateTime<Utc>) -> MarketSummary {
        let mut summary = MarketSummary::from(RawMarket {
            id: Some("m".into()),
            title: Some("NBA".into()),
            active: Some(active),
            ..Default::default()
        });
        summary.end_time = end_in_days.map(|d| now + Duration::days(d));
        summary
    }

    #[test]
    fn test_default_passes_everything() {
        let now = Utc::now();
        let filter = MarketFilter::default();
        assert!(filter.matches(&market(false, None, now), now));
        assert!(filter.matches(&market(true, Some(-3), now), now));
    }

    #[test]
    fn test_status_active() {
        let now = Utc::now();
        let filter = MarketFilter {
            status: StatusFilter::Active,
            end_days: None,
        };
        assert!(filter.matches(&market(true, None, now), now));
        assert!(!filter.matches(&market(false, None, now), now));
    }

    #[test]
    fn test_end_window() {
        let now = Utc::now();
        let filter = MarketFilter {
            status: StatusFilter::All,
            end_days: Some(7),
        };
        assert!(filter.matches(&market(true, Some(3), now), now));
        assert!(!filter.matches(&market(true, Some(10), now), now));
        assert!(!filter.matches(&market(true, Some(-1), now), now));
        assert!(!filter.matches(&market(true, None, now), now));
    }

    #[test]
    fn test_apply() {
        let now = Utc::now();
        let markets = vec![market(true, Some(1), now), market(false, Some(1), now)];
        let filter = MarketFilter {
            status: StatusFilter::Active,
            end_days: Some(2),
        };
        assert_eq!(filter.apply(&markets, now).len(), 1);
    }

    #[test]
    fn test_parse_end_days() {
        assert_eq!(parse_end_days("all").unwrap(), None);
        assert_eq!(parse_end_days("").unwrap(), None);
        assert_eq!(parse_end_days("30").unwrap(), Some(30));
        assert!(parse_end_days("soon").is_err());
    }

    #[test]
    fn test_deserialize_from_json() {
        let filter: MarketFilter =
            serde_json::from_str(r#"{"status":"active","end_days":"7"}"#).unwrap();
        assert_eq!(filter.status, StatusFilter::Active);
        assert_eq!(filter.end_days, Some(7));

        let filter: MarketFilter = serde_json::from_str(r#"{"end_days":"all"}"#).unwrap();
        assert_eq!(filter, MarketFilter::default());
    }
}
