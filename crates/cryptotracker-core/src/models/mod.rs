//! Market data models returned by the price feed.
//!
//! - `CoinMarket`: a row of the home feed listing
//! - `CoinDetails`, `MarketData`: the coin detail page
//! - `PriceHistory`, `PricePoint`: chart data
//! - `SearchResults`, `SearchCoin`: remote search

pub mod coin;

pub use coin::{CoinDetails, CoinMarket, MarketData, PriceHistory, PricePoint, SearchCoin, SearchResults};
