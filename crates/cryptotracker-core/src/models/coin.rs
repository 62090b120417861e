use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// One row of the markets listing (home feed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct CoinMarket {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub current_price: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
}

impl CoinMarket {
    pub fn symbol_display(&self) -> String {
        self.symbol.to_uppercase()
    }
}

/// Coin detail page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinDetails {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub description: HashMap<String, String>,
    #[serde(default)]
    pub market_data: Option<MarketData>,
}

impl CoinDetails {
    /// English description, if any.
    pub fn description_en(&self) -> Option<&str> {
        self.description
            .get("en")
            .map(String::as_str)
            .filter(|d| !d.is_empty())
    }

    pub fn price_in(&self, currency: &str) -> Option<f64> {
        self.market_data
            .as_ref()
            .and_then(|m| m.current_price.get(currency).copied())
    }
}

/// Per-currency figures keyed by lowercase currency code (`"usd"`, `"eur"`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    #[serde(default)]
    pub current_price: HashMap<String, f64>,
    #[serde(default)]
    pub market_cap: HashMap<String, f64>,
    #[serde(default)]
    pub high_24h: HashMap<String, f64>,
    #[serde(default)]
    pub low_24h: HashMap<String, f64>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
}

/// Price points from the market chart endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceHistory {
    /// `[timestamp_ms, price]` pairs
    #[serde(default)]
    pub prices: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub at: DateTime<Utc>,
    pub price: f64,
}

impl PriceHistory {
    pub fn points(&self) -> Vec<PricePoint> {
        self.prices
            .iter()
            .filter_map(|&(ms, price)| {
                Utc.timestamp_millis_opt(ms as i64)
                    .single()
                    .map(|at| PricePoint { at, price })
            })
            .collect()
    }

    /// Lowest and highest price in the window.
    pub fn range(&self) -> Option<(f64, f64)> {
        let mut prices = self.prices.iter().map(|&(_, p)| p);
        let first = prices.next()?;
        Some(prices.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p))))
    }

    /// Percent change from first to last point.
    pub fn change_percent(&self) -> Option<f64> {
        let (_, first) = *self.prices.first()?;
        let (_, last) = *self.prices.last()?;
        if first == 0.0 {
            return None;
        }
        Some((last - first) * 100.0 / first)
    }
}

/// `/search` response. Only coins are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub coins: Vec<SearchCoin>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCoin {
    pub id: String,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub thumb: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_markets_response() {
        let json = r#"[{"id":"bitcoin","symbol":"btc","name":"Bitcoin","image":"https://assets.coingecko.com/coins/images/1/large/bitcoin.png","current_price":67187.0,"market_cap":1322003061186,"market_cap_rank":1,"price_change_percentage_24h":-1.25,"roi":null},{"id":"newcoin","symbol":"new","name":"New Coin","current_price":null,"price_change_percentage_24h":null}]"#;
        let coins: Vec<CoinMarket> = serde_json::from_str(json).unwrap();
        assert_eq!(coins.len(), 2);
        assert_eq!(coins[0].symbol_display(), "BTC");
        assert_eq!(coins[0].market_cap_rank, Some(1));
        assert_eq!(coins[0].price_change_percentage_24h, Some(-1.25));
        assert_eq!(coins[1].current_price, None);
        assert_eq!(coins[1].image, None);
    }

    #[test]
    fn test_parse_coin_details() {
        let json = r#"{"id":"ethereum","symbol":"eth","name":"Ethereum","description":{"en":"Ethereum is a platform.","de":""},"market_data":{"current_price":{"usd":3500.5,"eur":3200.0},"market_cap":{"usd":420000000000},"high_24h":{"usd":3600},"low_24h":{"usd":3400},"price_change_percentage_24h":2.5}}"#;
        let details: CoinDetails = serde_json::from_str(json).unwrap();
        assert_eq!(details.description_en(), Some("Ethereum is a platform."));
        assert_eq!(details.price_in("usd"), Some(3500.5));
        assert_eq!(details.price_in("gbp"), None);
        let market = details.market_data.unwrap();
        assert_eq!(market.high_24h.get("usd"), Some(&3600.0));
    }

    #[test]
    fn test_price_history() {
        let json = r#"{"prices":[[1711843200000,100.0],[1711929600000,90.0],[1712016000000,120.0]],"market_caps":[],"total_volumes":[]}"#;
        let history: PriceHistory = serde_json::from_str(json).unwrap();
        assert_eq!(history.range(), Some((90.0, 120.0)));
        assert_eq!(history.change_percent(), Some(20.0));

        let points = history.points();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].at.timestamp_millis(), 1711843200000);
    }

    #[test]
    fn test_empty_history() {
        let history = PriceHistory::default();
        assert_eq!(history.range(), None);
        assert_eq!(history.change_percent(), None);
    }

    #[test]
    fn test_parse_search_results() {
        let json = r#"{"coins":[{"id":"solana","name":"Solana","api_symbol":"solana","symbol":"SOL","market_cap_rank":5,"thumb":"https://example.com/sol.png"}],"exchanges":[],"categories":[]}"#;
        let results: SearchResults = serde_json::from_str(json).unwrap();
        assert_eq!(results.coins[0].id, "solana");
        assert_eq!(results.coins[0].market_cap_rank, Some(5));
    }
}
