//! Cache configuration.

use std::time::Duration;

use crate::store::StoreConfig;

/// Configuration for the response cache.
///
/// TTLs stay below the staleness tolerance of each data kind: overviews
/// change rarely, per-category summaries are more volatile.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Prefix for store keys (e.g., "tollgate:cache")
    pub key_prefix: String,
    /// TTL for budget overview entries
    pub overview_ttl: Duration,
    /// TTL for per-category summary entries
    pub summary_ttl: Duration,
    /// Timeout and retry policy for cache store operations
    pub store: StoreConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            key_prefix: "tollgate:cache".to_string(),
            overview_ttl: Duration::from_secs(900),
            summary_ttl: Duration::from_secs(300),
            store: StoreConfig::default(),
        }
    }
}

impl CacheConfig {
    /// Creates configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CACHE_PREFIX`: Store key prefix (default: "tollgate:cache")
    /// - `CACHE_OVERVIEW_TTL_SECS`: Overview entry TTL (default: 900)
    /// - `CACHE_SUMMARY_TTL_SECS`: Summary entry TTL (default: 300)
    ///
    /// Store timeout/retry knobs come from [`StoreConfig::from_env`].
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            key_prefix: std::env::var("CACHE_PREFIX").unwrap_or(defaults.key_prefix),
            overview_ttl: std::env::var("CACHE_OVERVIEW_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map_or(defaults.overview_ttl, Duration::from_secs),
            summary_ttl: std::env::var("CACHE_SUMMARY_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map_or(defaults.summary_ttl, Duration::from_secs),
            store: StoreConfig::from_env(),
        }
    }
}
