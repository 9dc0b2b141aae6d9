//! Budget domain cache.
//!
//! Key schema and TTL policy for derived budget data. Entries are scoped by
//! `(owner, month, year)` so one owner's writes never evict another's
//! entries. Payload types belong to the budget handlers; this layer only
//! owns keys, TTLs, and invalidation breadth.

use std::future::Future;
use std::sync::Arc;

use fred::prelude::*;
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::cache::config::CacheConfig;
use crate::cache::service::CacheService;
use crate::store::StoreError;

/// Budget-specific cache wrapping the generic service.
#[derive(Clone)]
pub struct BudgetCache {
    service: CacheService,
    config: Arc<CacheConfig>,
}

impl BudgetCache {
    /// Creates a new budget cache on an existing Redis client.
    pub fn new(redis: Client, config: CacheConfig) -> Self {
        let service = CacheService::new(redis, config.store.clone());
        Self {
            service,
            config: Arc::new(config),
        }
    }

    /// Cached budget overview for one owner period, computing on miss.
    pub async fn overview_or_compute<T, E, F, Fut>(
        &self,
        owner: &str,
        month: &str,
        year: &str,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = self.overview_key(owner, month, year);
        self.service
            .get_or_compute(&key, self.config.overview_ttl, compute)
            .await
    }

    /// Cached per-category summary for one owner period, computing on miss.
    pub async fn summary_or_compute<T, E, F, Fut>(
        &self,
        owner: &str,
        month: &str,
        year: &str,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = self.summary_key(owner, month, year);
        self.service
            .get_or_compute(&key, self.config.summary_ttl, compute)
            .await
    }

    /// Drop every derived entry for one owner period.
    ///
    /// Write paths must call this after the write commits and before
    /// returning success, so an acknowledged write can never be followed by
    /// a stale read.
    pub async fn invalidate_period(
        &self,
        owner: &str,
        month: &str,
        year: &str,
    ) -> Result<(), StoreError> {
        let keys = vec![
            self.overview_key(owner, month, year),
            self.summary_key(owner, month, year),
        ];
        debug!(owner, month, year, "invalidating budget period");
        self.service.invalidate_many(&keys).await
    }

    /// Key format: "{prefix}:budget:overview:{owner}:{month}:{year}"
    fn overview_key(&self, owner: &str, month: &str, year: &str) -> String {
        format!(
            "{}:budget:overview:{owner}:{month}:{year}",
            self.config.key_prefix
        )
    }

    /// Key format: "{prefix}:budget:summary:{owner}:{month}:{year}"
    fn summary_key(&self, owner: &str, month: &str, year: &str) -> String {
        format!(
            "{}:budget:summary:{owner}:{month}:{year}",
            self.config.key_prefix
        )
    }
}
