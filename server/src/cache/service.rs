//! Generic cache-aside service.
//!
//! Domain-agnostic get-or-compute and invalidation against Redis. Domains
//! (budget, and later transactions or goals) layer their own key schemas and
//! TTL policy on top.

use std::future::Future;
use std::time::Duration;

use fred::prelude::*;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::store::{run_detached, with_retry, StoreConfig, StoreError};

/// Redis-backed cache-aside service.
#[derive(Clone)]
pub struct CacheService {
    redis: Client,
    store: StoreConfig,
}

impl CacheService {
    /// Creates a new cache service on an existing Redis client.
    pub fn new(redis: Client, store: StoreConfig) -> Self {
        Self { redis, store }
    }

    /// Cache-aside read: return the cached value for `key`, or run `compute`
    /// and populate the cache with `ttl`.
    ///
    /// Store trouble on the read side falls through to `compute`; store
    /// trouble on the write side only costs the next caller a recompute. The
    /// caller sees exactly one error type: `compute`'s own, propagated
    /// verbatim and never cached.
    ///
    /// Concurrent misses for the same key may each invoke `compute` and
    /// repopulate the entry; entries are replaced wholesale, so last write
    /// wins.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.read::<T>(key).await {
            Ok(Some(value)) => {
                debug!(key, "cache hit");
                return Ok(value);
            }
            Ok(None) => debug!(key, "cache miss"),
            Err(e) => warn!(key, error = %e, "cache read failed, computing directly"),
        }

        let value = compute().await?;

        if let Err(e) = self.write(key, &value, ttl).await {
            warn!(key, error = %e, "failed to populate cache");
        }

        Ok(value)
    }

    /// Delete `key`.
    ///
    /// Write paths call this after their write commits and before
    /// acknowledging their own caller, so a read that starts after the
    /// acknowledgement can never observe the pre-write value.
    pub async fn invalidate(&self, key: &str) -> Result<(), StoreError> {
        self.invalidate_many(&[key.to_string()]).await
    }

    /// Delete several keys in one round-trip.
    pub async fn invalidate_many(&self, keys: &[String]) -> Result<(), StoreError> {
        let redis = self.redis.clone();
        let store = self.store.clone();
        let keys = keys.to_vec();

        run_detached(async move {
            with_retry(&store, || {
                let redis = redis.clone();
                let keys = keys.clone();
                async move {
                    redis
                        .del::<i64, _>(keys)
                        .await
                        .map(|_| ())
                        .map_err(StoreError::from)
                }
            })
            .await
        })
        .await
    }

    /// Fetch and deserialize one entry.
    async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let redis = self.redis.clone();
        let owned_key = key.to_string();

        let raw: Option<String> = with_retry(&self.store, || {
            let redis = redis.clone();
            let key = owned_key.clone();
            async move {
                redis
                    .get::<Option<String>, _>(&key)
                    .await
                    .map_err(StoreError::from)
            }
        })
        .await?;

        let Some(json) = raw else {
            return Ok(None);
        };

        match serde_json::from_str(&json) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key, error = %e, "corrupt cache entry, purging");
                // Self-heal: drop the corrupt entry and treat it as a miss.
                if let Err(e) = self.invalidate(key).await {
                    warn!(key, error = %e, "failed to purge corrupt cache entry");
                }
                Ok(None)
            }
        }
    }

    /// Serialize and store one entry with a TTL.
    ///
    /// Runs detached so a caller cancelled after `compute` finished cannot
    /// abort the population halfway.
    async fn write<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let json = serde_json::to_string(value)
            .map_err(|e| StoreError::Protocol(format!("cache serialization failed: {e}")))?;

        let redis = self.redis.clone();
        let store = self.store.clone();
        let key = key.to_string();
        let ttl_secs = ttl.as_secs().max(1) as i64;

        run_detached(async move {
            with_retry(&store, || {
                let redis = redis.clone();
                let key = key.clone();
                let json = json.clone();
                async move {
                    redis
                        .set::<(), _, _>(&key, json, Some(Expiration::EX(ttl_secs)), None, false)
                        .await
                        .map_err(StoreError::from)
                }
            })
            .await
        })
        .await
    }
}
