use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{CoinDetails, CoinMarket};

/// Market prices move quickly; treat cached data as stale after 5 minutes.
const CACHE_STALE_MINUTES: i64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Includes clock skew (negative ages)
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }

    pub fn is_stale(&self) -> bool {
        self.age_minutes() >= CACHE_STALE_MINUTES
    }
}

/// JSON file cache for price feed responses, one file per listing.
pub struct CacheManager {
    cache_dir: PathBuf,
}

impl CacheManager {
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache directory: {}", cache_dir.display()))?;
        Ok(Self { cache_dir })
    }

    fn cache_path(&self, name: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", name))
    }

    fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<CachedData<T>>> {
        let path = self.cache_path(name);
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cache file: {}", name))?;

        let cached: CachedData<T> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache file: {}", name))?;

        Ok(Some(cached))
    }

    fn save<T: Serialize>(&self, name: &str, data: &T) -> Result<()> {
        let cached = CachedData::new(data);
        let path = self.cache_path(name);
        let contents = serde_json::to_string(&cached)?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write cache file: {}", name))?;
        debug!(cache = name, "Cache saved");
        Ok(())
    }

    // ===== Markets =====

    pub fn load_markets(&self, currency: &str) -> Result<Option<CachedData<Vec<CoinMarket>>>> {
        self.load(&format!("markets_{}", sanitize(currency)))
    }

    pub fn save_markets(&self, currency: &str, coins: &[CoinMarket]) -> Result<()> {
        self.save(&format!("markets_{}", sanitize(currency)), &coins)
    }

    // ===== Coin Details =====

    pub fn load_coin_details(&self, id: &str) -> Result<Option<CachedData<CoinDetails>>> {
        self.load(&format!("coin_{}", sanitize(id)))
    }

    pub fn save_coin_details(&self, details: &CoinDetails) -> Result<()> {
        self.save(&format!("coin_{}", sanitize(&details.id)), details)
    }

    /// Remove every cached listing.
    pub fn clear(&self) -> Result<()> {
        for entry in std::fs::read_dir(&self.cache_dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                std::fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}

/// A value from the API, or the cached copy served because the API failed.
#[derive(Debug)]
pub enum Sourced<T, E> {
    Live(T),
    Cached { cached: CachedData<T>, error: E },
}

impl<T, E> Sourced<T, E> {
    pub fn data(&self) -> &T {
        match self {
            Sourced::Live(data) => data,
            Sourced::Cached { cached, .. } => &cached.data,
        }
    }
}

impl CacheManager {
    /// Cache a successful fetch. On failure serve the copy on disk with its
    /// original timestamp; only fresh data is ever written.
    pub fn coin_details_or_cached<E>(
        &self,
        id: &str,
        fetched: std::result::Result<CoinDetails, E>,
    ) -> std::result::Result<Sourced<CoinDetails, E>, E> {
        match fetched {
            Ok(details) => {
                if let Err(e) = self.save_coin_details(&details) {
                    warn!(error = %e, "Failed to cache coin details");
                }
                Ok(Sourced::Live(details))
            }
            Err(error) => match self.load_coin_details(id) {
                Ok(Some(cached)) => Ok(Sourced::Cached { cached, error }),
                Ok(None) => Err(error),
                Err(e) => {
                    debug!(error = %e, "Failed to load cached coin details");
                    Err(error)
                }
            },
        }
    }
}

/// Keep cache file names to `[a-z0-9_-]`.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn coin(id: &str) -> CoinMarket {
        CoinMarket {
            id: id.to_string(),
            name: id.to_string(),
            symbol: id.to_string(),
            current_price: Some(1.0),
            price_change_percentage_24h: Some(0.5),
            image: None,
            market_cap: None,
            market_cap_rank: None,
        }
    }

    fn details(id: &str, price: f64) -> CoinDetails {
        CoinDetails {
            id: id.to_string(),
            symbol: id.to_string(),
            name: id.to_string(),
            description: Default::default(),
            market_data: Some(crate::models::MarketData {
                current_price: [("usd".to_string(), price)].into_iter().collect(),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_fallback_keeps_original_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheManager::new(dir.path().to_path_buf()).unwrap();

        let old = CachedData {
            data: details("bitcoin", 100.0),
            cached_at: Utc::now() - Duration::hours(2),
        };
        std::fs::write(
            dir.path().join("coin_bitcoin.json"),
            serde_json::to_string(&old).unwrap(),
        )
        .unwrap();

        let served = cache
            .coin_details_or_cached("bitcoin", Err::<CoinDetails, _>("offline"))
            .unwrap();
        match served {
            Sourced::Cached { ref cached, error } => {
                assert_eq!(error, "offline");
                assert_eq!(cached.age_display(), "2h ago");
            }
            Sourced::Live(_) => panic!("expected cached details"),
        }
        assert_eq!(served.data().price_in("usd"), Some(100.0));

        // Serving the fallback must not re-stamp the file
        let reloaded = cache.load_coin_details("bitcoin").unwrap().unwrap();
        assert_eq!(reloaded.age_display(), "2h ago");

        let live = cache
            .coin_details_or_cached::<&str>("bitcoin", Ok(details("bitcoin", 120.0)))
            .unwrap();
        assert!(matches!(live, Sourced::Live(_)));
        let reloaded = cache.load_coin_details("bitcoin").unwrap().unwrap();
        assert_eq!(reloaded.age_display(), "just now");
        assert_eq!(reloaded.data.price_in("usd"), Some(120.0));
    }

    #[test]
    fn test_fallback_without_cache_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheManager::new(dir.path().to_path_buf()).unwrap();
        let result = cache.coin_details_or_cached("dogecoin", Err::<CoinDetails, _>("offline"));
        assert!(matches!(result, Err("offline")));
    }

    #[test]
    fn test_cached_data_age_display() {
        let mut cached = CachedData::new(vec![1]);
        assert_eq!(cached.age_display(), "just now");

        cached.cached_at = Utc::now() - Duration::minutes(3);
        assert_eq!(cached.age_display(), "3m ago");

        cached.cached_at = Utc::now() - Duration::minutes(150);
        assert_eq!(cached.age_display(), "2h ago");

        cached.cached_at = Utc::now() - Duration::days(3);
        assert_eq!(cached.age_display(), "3d ago");

        cached.cached_at = Utc::now() + Duration::minutes(10);
        assert_eq!(cached.age_display(), "just now");
    }

    #[test]
    fn test_cached_data_is_stale() {
        let fresh = CachedData::new(vec![1]);
        assert!(!fresh.is_stale());

        let mut old = CachedData::new(vec![1]);
        old.cached_at = Utc::now() - Duration::minutes(6);
        assert!(old.is_stale());
    }

    #[test]
    fn test_markets_round_trip_per_currency() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheManager::new(dir.path().to_path_buf()).unwrap();
        assert!(cache.load_markets("usd").unwrap().is_none());

        cache.save_markets("usd", &[coin("bitcoin"), coin("ethereum")]).unwrap();
        let cached = cache.load_markets("usd").unwrap().unwrap();
        assert_eq!(cached.data.len(), 2);
        assert!(cache.load_markets("eur").unwrap().is_none());

        cache.clear().unwrap();
        assert!(cache.load_markets("usd").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_cache_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheManager::new(dir.path().to_path_buf()).unwrap();
        std::fs::write(dir.path().join("markets_usd.json"), "garbage").unwrap();
        assert!(cache.load_markets("usd").is_err());
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("USD"), "usd");
        assert_eq!(sanitize("../x"), "___x");
        assert_eq!(sanitize("usd-coin"), "usd-coin");
    }
}
