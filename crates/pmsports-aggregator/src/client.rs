//! HTTP client for the markets REST API.

use crate::aggregator::MarketSource;
use crate::error::{AggregatorError, AggregatorResult};
use futures_util::future::BoxFuture;
use pmsports_core::{decode_markets, RawMarket};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Public CLOB REST API.
pub const DEFAULT_API_URL: &str = "https://clob.polymarket.com";

/// Endpoint listing currently active markets.
pub const DEFAULT_MARKETS_PATH: &str = "/active-markets";

/// Client for fetching active markets.
pub struct MarketsClient {
    /// HTTP client.
    client: Client,
    /// Full markets endpoint URL.
    markets_url: String,
}

impl MarketsClient {
    /// Create a new markets client.
    ///
    /// # Arguments
    /// * `api_url` - API base URL (e.g., "https://clob.polymarket.com")
    /// * `markets_path` - Path of the markets listing (e.g., "/active-markets")
    pub fn new(api_url: &str, markets_path: &str) -> AggregatorResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| AggregatorError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            markets_url: join_url(api_url, markets_path),
        })
    }

    pub fn markets_url(&self) -> &str {
        &self.markets_url
    }

    /// Fetch active markets.
    ///
    /// Unknown envelopes decode to an empty list; transport errors and
    /// non-success statuses are returned to the caller.
    pub async fn fetch_active_markets(&self) -> AggregatorResult<Vec<RawMarket>> {
        debug!(url = %self.markets_url, "Fetching active markets");

        let response = self
            .client
            .get(&self.markets_url)
            .send()
            .await
            .map_err(|e| AggregatorError::HttpClient(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AggregatorError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| AggregatorError::HttpClient(format!("Failed to read response: {e}")))?;
        let value: serde_json::Value = serde_json::from_str(&body)?;

        let markets = decode_markets(&value);
        info!(count = markets.len(), status = status.as_u16(), "Fetched markets");

        Ok(markets)
    }
}

impl MarketSource for MarketsClient {
    fn fetch_active_markets(&self) -> BoxFuture<'_, AggregatorResult<Vec<RawMarket>>> {
        Box::pin(MarketsClient::fetch_active_markets(self))
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
