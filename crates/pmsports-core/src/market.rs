//! Market records as returned by the REST API and as served to the dashboard.
//!
//! The upstream API has shipped several response shapes over time, so
//! decoding is deliberately lenient: unknown envelopes give an empty list,
//! records that fail to decode are skipped, and numeric fields accept both
//! numbers and numeric strings.

use crate::error::{CoreError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Market record as decoded from the REST API.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMarket {
    #[serde(default)]
    pub id: Option<String>,
    /// CLOB listings key markets by condition id; some listings carry both.
    #[serde(default, alias = "condition_id")]
    pub condition_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default, alias = "volume_24hr", alias = "volume24hr")]
    pub volume24h: Option<Decimal>,
    #[serde(default, alias = "open_interest")]
    pub open_interest: Option<Decimal>,
    #[serde(default, alias = "end_date_iso", alias = "endDate")]
    pub end_time: Option<String>,
    #[serde(default, alias = "game_start_time", alias = "startDate")]
    pub start_time: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub closed: Option<bool>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<Value>>,
    #[serde(default, alias = "market_slug")]
    pub url: Option<String>,
}

impl RawMarket {
    /// `id`, falling back to the condition id.
    pub fn id(&self) -> &str {
        self.id
            .as_deref()
            .or(self.condition_id.as_deref())
            .unwrap_or_default()
    }

    /// `title`, falling back to the market question.
    pub fn title(&self) -> &str {
        self.title
            .as_deref()
            .or(self.question.as_deref())
            .unwrap_or_default()
    }

    pub fn volume24h(&self) -> Decimal {
        self.volume24h.unwrap_or_default()
    }

    pub fn open_interest(&self) -> Decimal {
        self.open_interest.unwrap_or_default()
    }

    /// Records without an explicit `active` flag are active unless closed.
    pub fn is_active(&self) -> bool {
        self.active.unwrap_or(!self.closed.unwrap_or(false))
    }
}

/// Decode the market list out of any known response envelope.
///
/// Accepted shapes: `{"markets": [...]}`, `{"data": [...]}`, or a bare array.
pub fn decode_markets(body: &Value) -> Vec<RawMarket> {
    let entries = match body {
        Value::Array(entries) => entries,
        Value::Object(map) => match map
            .get("markets")
            .or_else(|| map.get("data"))
            .and_then(Value::as_array)
        {
            Some(entries) => entries,
            None => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    entries
        .iter()
        .enumerate()
        .filter_map(
            |(idx, entry)| match serde_json::from_value::<RawMarket>(entry.clone()) {
                Ok(market) => Some(market),
                Err(e) => {
                    debug!(idx, error = %e, "Skipping undecodable market record");
                    None
                }
            },
        )
        .collect()
}

/// Parse an upstream timestamp (RFC 3339 or a bare `YYYY-MM-DD` date).
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| CoreError::InvalidTimestamp(raw.to_string()))
}

/// Normalized market served by `/stats` and rendered as a dashboard card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSummary {
    pub id: String,
    pub title: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub volume24h: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub open_interest: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl From<RawMarket> for MarketSummary {
    fn from(raw: RawMarket) -> Self {
        let end_time = raw.end_time.as_deref().and_then(|s| parse_timestamp(s).ok());
        let start_time = raw
            .start_time
            .as_deref()
            .and_then(|s| parse_timestamp(s).ok());
        let id = raw.id().to_string();
        let title = raw.title().to_string();
        let active = raw.is_active();
        let volume24h = raw.volume24h();
        let open_interest = raw.open_interest();

        // Tags are plain strings on the CLOB API and {label: ..} objects elsewhere
        let tags = raw
            .tags
            .unwrap_or_default()
            .into_iter()
            .filter_map(|tag| match tag {
                Value::String(s) => Some(s),
                Value::Object(map) => map.get("label").and_then(Value::as_str).map(String::from),
                _ => None,
            })
            .collect();

        Self {
            id,
            title,
            volume24h,
            open_interest,
            end_time,
            start_time,
            active,
            description: raw.description.filter(|d| !d.is_empty()),
            category: raw.category.filter(|c| !c.is_empty()),
            tags,
            url: raw.url,
        }
    }
}
