//! REST client module for the market-data price feed.
//!
//! This module provides the `PriceFeedClient` used by the home feed, coin
//! detail and search screens. Rate limiting (HTTP 429) is retried with
//! backoff and then reported as `ApiError::RateLimited`.

pub mod client;
pub mod error;

pub use client::{PriceFeedClient, API_BASE_URL, DEFAULT_CURRENCY};
pub use error::ApiError;
