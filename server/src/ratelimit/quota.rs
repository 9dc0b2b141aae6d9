//! Quota store adapter.
//!
//! Atomic fixed-window counters on Redis. The increment, window arming, and
//! TTL read happen in one Lua script invocation, so concurrent requests for
//! the same key can never split a window or read a half-updated counter.

use std::sync::Arc;

use fred::prelude::*;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::store::{run_detached, with_retry, StoreConfig, StoreError};

/// Embedded Lua script for the atomic increment-with-window.
const QUOTA_SCRIPT: &str = include_str!("quota.lua");

/// Post-increment view of one quota counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaCount {
    /// Counter value after this request's increment
    pub count: u32,
    /// Seconds until the window expires
    pub resets_in: u64,
}

/// Redis-backed quota counters.
///
/// The Lua script is loaded once at init; if the store loses it (restart,
/// eviction) the NOSCRIPT error triggers a reload and a single replay.
#[derive(Clone)]
pub struct QuotaStore {
    redis: Client,
    config: StoreConfig,
    script_sha: Arc<RwLock<String>>,
}

impl QuotaStore {
    /// Creates a new quota store.
    ///
    /// Call `init()` after creation to load the Lua script into Redis.
    pub fn new(redis: Client, config: StoreConfig) -> Self {
        Self {
            redis,
            config,
            script_sha: Arc::new(RwLock::new(String::new())),
        }
    }

    /// Loads the quota script into Redis.
    pub async fn init(&self) -> Result<(), StoreError> {
        self.load_script().await
    }

    /// Loads or reloads the Lua script into Redis.
    async fn load_script(&self) -> Result<(), StoreError> {
        let sha: String = self
            .redis
            .script_load(QUOTA_SCRIPT)
            .await
            .map_err(StoreError::from)?;

        info!(sha = %sha, "quota script loaded into Redis");
        *self.script_sha.write().await = sha;
        Ok(())
    }

    /// Checks if an error is a NOSCRIPT error (script not found in Redis).
    fn is_noscript_error(error: &Error) -> bool {
        error.to_string().contains("NOSCRIPT")
    }

    /// Atomically increments the counter for `key` and returns the new count.
    ///
    /// The window TTL is set only when the key is created, so the window is
    /// fixed from first use rather than sliding on every request. Runs on a
    /// detached task: a caller cancelled mid-request cannot abort an
    /// increment that may already have been applied.
    pub async fn increment_and_get(
        &self,
        key: &str,
        window_seconds: u32,
    ) -> Result<QuotaCount, StoreError> {
        let this = self.clone();
        let config = self.config.clone();
        let key = key.to_string();

        run_detached(async move {
            with_retry(&config, || this.eval_quota(&key, window_seconds)).await
        })
        .await
    }

    /// Executes the quota script once, reloading it on NOSCRIPT.
    async fn eval_quota(&self, key: &str, window_seconds: u32) -> Result<QuotaCount, StoreError> {
        let result = self.try_eval(key, window_seconds).await;

        match result {
            Err(e) if Self::is_noscript_error(&e) => {
                warn!("NOSCRIPT error, reloading quota script");
                self.load_script().await?;
                self.try_eval(key, window_seconds)
                    .await
                    .map_err(StoreError::from)
                    .and_then(|values| Self::parse_reply(&values))
            }
            other => other.map_err(StoreError::from).and_then(|values| Self::parse_reply(&values)),
        }
    }

    /// One EVALSHA round-trip with the current script SHA.
    async fn try_eval(&self, key: &str, window_seconds: u32) -> Result<Vec<i64>, Error> {
        let sha = self.script_sha.read().await.clone();
        self.redis
            .evalsha(
                &sha,
                vec![key.to_string()],
                vec![window_seconds.to_string()],
            )
            .await
    }

    /// Validates the `{count, ttl}` script reply.
    fn parse_reply(values: &[i64]) -> Result<QuotaCount, StoreError> {
        match values {
            [count, ttl] if *count > 0 => Ok(QuotaCount {
                count: *count as u32,
                // TTL floor of one second: a key expiring this instant still
                // denies with a usable retry hint.
                resets_in: (*ttl).max(1) as u64,
            }),
            _ => Err(StoreError::Protocol(format!(
                "unexpected quota script reply: {values:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reply_valid() {
        let count = QuotaStore::parse_reply(&[3, 42]).expect("valid reply parses");
        assert_eq!(count.count, 3);
        assert_eq!(count.resets_in, 42);
    }

    #[test]
    fn test_parse_reply_clamps_ttl() {
        let count = QuotaStore::parse_reply(&[1, 0]).expect("zero ttl parses");
        assert_eq!(count.resets_in, 1);
        let count = QuotaStore::parse_reply(&[1, -1]).expect("negative ttl parses");
        assert_eq!(count.resets_in, 1);
    }

    #[test]
    fn test_parse_reply_rejects_malformed() {
        assert!(matches!(
            QuotaStore::parse_reply(&[]),
            Err(StoreError::Protocol(_))
        ));
        assert!(matches!(
            QuotaStore::parse_reply(&[1, 2, 3]),
            Err(StoreError::Protocol(_))
        ));
        // INCR can never return zero
        assert!(matches!(
            QuotaStore::parse_reply(&[0, 60]),
            Err(StoreError::Protocol(_))
        ));
    }
}
