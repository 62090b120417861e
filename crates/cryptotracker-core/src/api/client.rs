//! Price feed client for the CoinGecko market-data API.
//!
//! Covers the four calls the app makes: the markets listing for the home
//! feed, coin details, chart history and remote search.

use std::time::Duration;

use reqwest::{header, Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::models::{CoinDetails, CoinMarket, PriceHistory, SearchResults};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Base URL for the public market-data API
pub const API_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Header carrying the optional API key
const API_KEY_HEADER: &str = "x-cg-pro-api-key";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Default currency for listings and history.
pub const DEFAULT_CURRENCY: &str = "usd";

/// Price feed client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct PriceFeedClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    initial_backoff: Duration,
}

impl PriceFeedClient {
    pub fn new(api_key: Option<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: API_BASE_URL.to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        })
    }

    /// Point the client at another deployment of the same API.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, url: &str) -> RequestBuilder {
        let mut request = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/json");
        if let Some(ref key) = self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }
        request
    }

    /// GET with exponential backoff on 429. Gives up with `RateLimited`
    /// after `MAX_RATE_LIMIT_RETRIES`.
    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, ApiError> {
        let url = self.url(path);
        let mut retries = 0;
        let mut backoff = self.initial_backoff;

        loop {
            let response = self.request(&url).query(query).send().await?;
            let status = response.status();

            if status.is_success() {
                debug!(url = %url, "Price feed response received");
                return response
                    .json()
                    .await
                    .map_err(|e| ApiError::InvalidResponse(format!("{}: {}", url, e)));
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                retries += 1;
                if retries > MAX_RATE_LIMIT_RETRIES {
                    return Err(ApiError::RateLimited);
                }
                warn!(url = %url, retry = retries, backoff_ms = backoff.as_millis() as u64, "Rate limited, backing off");
                tokio::time::sleep(backoff).await;
                backoff *= 2;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body));
        }
    }

    // ===== Data Fetching Methods =====

    /// Markets listing for the home feed, priced in `currency`.
    pub async fn fetch_coins(&self, currency: &str) -> Result<Vec<CoinMarket>, ApiError> {
        self.get("/coins/markets", &[("vs_currency", currency)]).await
    }

    pub async fn fetch_coin_details(&self, id: &str) -> Result<CoinDetails, ApiError> {
        validate_coin_id(id)?;
        self.get(
            &format!("/coins/{}", id),
            &[
                ("localization", "false"),
                ("tickers", "false"),
                ("community_data", "false"),
                ("developer_data", "false"),
            ],
        )
        .await
    }

    /// Price history over the last `days` days.
    pub async fn fetch_coin_history(
        &self,
        id: &str,
        currency: &str,
        days: u32,
    ) -> Result<PriceHistory, ApiError> {
        validate_coin_id(id)?;
        let days = days.max(1).to_string();
        self.get(
            &format!("/coins/{}/market_chart", id),
            &[("vs_currency", currency), ("days", days.as_str())],
        )
        .await
    }

    pub async fn search_coins(&self, query: &str) -> Result<SearchResults, ApiError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(SearchResults::default());
        }
        self.get("/search", &[("query", query)]).await
    }
}

/// Coin ids are lowercase slugs; reject anything that would change the path.
fn validate_coin_id(id: &str) -> Result<(), ApiError> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        && id != "."
        && id != "..";
    if valid {
        Ok(())
    } else {
        Err(ApiError::NotFound(format!("invalid coin id: {:?}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_coin_id() {
        assert!(validate_coin_id("bitcoin").is_ok());
        assert!(validate_coin_id("usd-coin").is_ok());
        assert!(validate_coin_id("wrapped_bitcoin").is_ok());

        assert!(validate_coin_id("").is_err());
        assert!(validate_coin_id("..").is_err());
        assert!(validate_coin_id("bitcoin/market_chart").is_err());
        assert!(validate_coin_id("bit coin").is_err());
    }

    #[test]
    fn test_base_url_override() {
        let client = PriceFeedClient::new(Some(String::new()))
            .unwrap()
            .with_base_url("http://localhost:8080/api/v3/");
        assert_eq!(client.url("/search"), "http://localhost:8080/api/v3/search");
        assert!(client.api_key.is_none());
    }

    #[tokio::test]
    async fn test_empty_search_skips_request() {
        // Unroutable base URL: any request would fail
        let client = PriceFeedClient::new(None)
            .unwrap()
            .with_base_url("http://127.0.0.1:9");
        let results = client.search_coins("   ").await.unwrap();
        assert!(results.coins.is_empty());
    }
}
