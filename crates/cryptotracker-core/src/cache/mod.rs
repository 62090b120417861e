//! Local caching module for offline market data.
//!
//! This module provides the `CacheManager` for storing price feed responses
//! locally, so the home feed can still render when the API is rate-limited
//! or unreachable. Data is cached in JSON format and considered stale after
//! 5 minutes.

pub mod manager;

pub use manager::{CacheManager, CachedData, Sourced};
