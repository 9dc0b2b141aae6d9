//! Server Configuration
//!
//! Loads configuration from environment variables.

use anyhow::Result;
use std::env;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:8080")
    pub bind_address: String,

    /// Redis connection URL
    pub redis_url: String,

    /// Optional path to a rate-limits document. When unset, the copy
    /// embedded in `tg-limits` is used.
    pub rate_limits_path: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            redis_url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".into()),
            rate_limits_path: env::var("RATE_LIMITS_PATH").ok(),
        })
    }

    /// Create a default configuration for testing.
    ///
    /// Uses a local Redis test container:
    /// `docker run -d --name tollgate-test-redis -e ALLOW_EMPTY_PASSWORD=yes -p 6379:6379 bitnami/redis:latest`
    #[must_use]
    pub fn default_for_test() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".into(),
            redis_url: "redis://localhost:6379".into(),
            rate_limits_path: None,
        }
    }
}
