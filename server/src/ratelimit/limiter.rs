//! Core rate limiter service.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use fred::prelude::*;
use tracing::{debug, warn};

use tg_limits::{classify, LimitsTable, OperationClass};

use crate::ratelimit::config::RateLimitConfig;
use crate::ratelimit::quota::{QuotaCount, QuotaStore};
use crate::ratelimit::types::{ClientIdentity, Decision, QuotaSnapshot};

/// Admission service: classifies a request, charges the matching quota, and
/// produces an allow/deny decision.
///
/// All counter state lives in the external store, so any number of stateless
/// replicas can run this service against the same quotas. Store trouble
/// always admits: a throttling outage must never become a service outage.
#[derive(Clone)]
pub struct RateLimiter {
    quota: QuotaStore,
    config: Arc<RateLimitConfig>,
    limits: Arc<LimitsTable>,
}

impl RateLimiter {
    /// Creates a new rate limiter.
    ///
    /// Call `init()` after creation to load the quota script into Redis.
    pub fn new(redis: Client, config: RateLimitConfig, limits: Arc<LimitsTable>) -> Self {
        let quota = QuotaStore::new(redis, config.store.clone());
        Self {
            quota,
            config: Arc::new(config),
            limits,
        }
    }

    /// Loads the quota script into Redis.
    pub async fn init(&self) -> Result<(), crate::store::StoreError> {
        self.quota.init().await
    }

    /// Admits or rejects one request.
    ///
    /// Classifies `(path, method)`, charges the `(identity, class)` counter,
    /// and compares against the class quota. Store unavailability degrades to
    /// an unmetered admission; only an exhausted quota rejects.
    #[tracing::instrument(skip(self, identity), fields(address = %identity.network_address))]
    pub async fn check(&self, identity: &ClientIdentity, path: &str, method: &str) -> Decision {
        if !self.config.enabled {
            return Decision::AllowUnmetered { degraded: false };
        }

        if self.config.allowlist.contains(&identity.network_address) {
            debug!(address = %identity.network_address, "address in allowlist, bypassing rate limit");
            return Decision::AllowUnmetered { degraded: false };
        }

        let class = classify(path, method);
        let limit = self.limits.class_config(class);
        let key = self.build_key(class, identity);

        match self
            .quota
            .increment_and_get(&key, limit.window_seconds)
            .await
        {
            Ok(counted) => Self::decide(class, limit.max_requests, counted),
            Err(e) => {
                warn!(
                    class = %class,
                    error = %e,
                    "quota store degraded, admitting request unmetered"
                );
                Decision::AllowUnmetered { degraded: true }
            }
        }
    }

    /// Turns a post-increment count into a decision.
    ///
    /// `count <= max` admits, so the Nth request of an N-request quota is
    /// still served. The count comes from a single atomic increment, so two
    /// racing requests can never both observe the same value.
    fn decide(class: OperationClass, max_requests: u32, counted: QuotaCount) -> Decision {
        let reset_at = unix_now() + counted.resets_in;

        if counted.count <= max_requests {
            Decision::Allow(QuotaSnapshot {
                class,
                limit: max_requests,
                remaining: max_requests - counted.count,
                reset_at,
            })
        } else {
            Decision::Deny {
                retry_after: counted.resets_in,
                quota: QuotaSnapshot {
                    class,
                    limit: max_requests,
                    remaining: 0,
                    reset_at,
                },
            }
        }
    }

    /// Builds the store key for one `(identity, class)` counter.
    ///
    /// Client-controlled segments are length-prefixed: plain concatenation
    /// would let address `"1.2.3.4"` + device `"x:y"` collide with address
    /// `"1.2.3.4:x"` + device `"y"` and share a quota.
    fn build_key(&self, class: OperationClass, identity: &ClientIdentity) -> String {
        let device = identity.device_id.as_deref().unwrap_or("");
        format!(
            "{}:{}:{}:{}:{}:{}",
            self.config.key_prefix,
            class,
            identity.network_address.len(),
            identity.network_address,
            device.len(),
            device
        )
    }

    /// Returns the configuration for this rate limiter.
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }
}

/// Seconds since the Unix epoch.
fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
