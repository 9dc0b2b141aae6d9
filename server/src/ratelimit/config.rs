//! Rate limiting configuration.
//!
//! Per-class quotas come from the shared `tg-limits` document; this module
//! only configures how the server enforces them.

use std::collections::HashSet;

use crate::store::StoreConfig;

/// Configuration for the admission layer.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Whether rate limiting is enabled
    pub enabled: bool,
    /// Prefix for store keys (e.g., "tollgate:rl")
    pub key_prefix: String,
    /// Whether to trust X-Forwarded-For headers
    pub trust_proxy: bool,
    /// Network addresses that bypass rate limiting
    pub allowlist: HashSet<String>,
    /// Timeout and retry policy for quota store operations
    pub store: StoreConfig,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            key_prefix: "tollgate:rl".to_string(),
            trust_proxy: false,
            allowlist: HashSet::new(),
            store: StoreConfig::default(),
        }
    }
}

impl RateLimitConfig {
    /// Creates configuration from environment variables.
    ///
    /// Environment variables:
    /// - `RATE_LIMIT_ENABLED`: Enable/disable rate limiting (default: true)
    /// - `RATE_LIMIT_PREFIX`: Store key prefix (default: "tollgate:rl")
    /// - `RATE_LIMIT_TRUST_PROXY`: Trust X-Forwarded-For headers (default: false)
    /// - `RATE_LIMIT_ALLOWLIST`: Comma-separated address allowlist
    ///
    /// Store timeout/retry knobs come from [`StoreConfig::from_env`].
    pub fn from_env() -> Self {
        let mut config = Self {
            store: StoreConfig::from_env(),
            ..Self::default()
        };

        if let Ok(val) = std::env::var("RATE_LIMIT_ENABLED") {
            config.enabled = val.parse().unwrap_or(true);
        }
        if let Ok(val) = std::env::var("RATE_LIMIT_PREFIX") {
            config.key_prefix = val;
        }
        if let Ok(val) = std::env::var("RATE_LIMIT_TRUST_PROXY") {
            config.trust_proxy = val.parse().unwrap_or(false);
        }
        if let Ok(val) = std::env::var("RATE_LIMIT_ALLOWLIST") {
            config.allowlist = val
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        config
    }
}
