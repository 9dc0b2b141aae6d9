//! Key-Value Store Layer
//!
//! Redis connection setup plus the plumbing shared by the two store
//! adapters (quota counters and the response cache): error classification,
//! bounded per-operation timeouts, bounded retries with backoff, and
//! detached execution for mutations that must survive request cancellation.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use rand::Rng;
use tracing::{info, warn};

/// Errors surfaced by store adapters.
///
/// Everything the driver can report collapses into two categories because
/// callers only distinguish "degrade and continue" from "data or
/// configuration problem", and both fail open for the wrapped request.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached in time (network error, timeout).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store answered with something unusable (wrong type at a key,
    /// malformed reply). Signals data corruption or misconfiguration, not an
    /// outage; retrying will not help.
    #[error("store protocol error: {0}")]
    Protocol(String),
}

impl StoreError {
    /// Whether retrying the operation could succeed.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<fred::error::Error> for StoreError {
    fn from(e: fred::error::Error) -> Self {
        use fred::error::ErrorKind;

        let detail = e.to_string();
        if detail.contains("WRONGTYPE") {
            return Self::Protocol(detail);
        }
        match e.kind() {
            ErrorKind::Parse | ErrorKind::Protocol | ErrorKind::InvalidArgument => {
                Self::Protocol(detail)
            }
            // IO, Timeout, Canceled and anything else unrecognized degrade
            // rather than fail the request.
            _ => Self::Unavailable(detail),
        }
    }
}

/// Timeout and retry policy for individual store operations.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Upper bound for a single store round-trip. Must be shorter than the
    /// overall request timeout so a slow store cannot stall request handling.
    pub op_timeout: Duration,
    /// Retries after the first attempt, applied only to transient errors.
    pub retry_attempts: u32,
    /// Base delay for exponential backoff between attempts.
    pub retry_base_delay: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            op_timeout: Duration::from_secs(2),
            retry_attempts: 2,
            retry_base_delay: Duration::from_millis(100),
        }
    }
}

impl StoreConfig {
    /// Creates configuration from environment variables.
    ///
    /// Environment variables:
    /// - `STORE_OP_TIMEOUT_MS`: per-operation timeout in milliseconds (default: 2000)
    /// - `STORE_RETRY_ATTEMPTS`: retries on transient errors (default: 2)
    /// - `STORE_RETRY_BASE_DELAY_MS`: backoff base delay in milliseconds (default: 100)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            op_timeout: std::env::var("STORE_OP_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map_or(defaults.op_timeout, Duration::from_millis),
            retry_attempts: std::env::var("STORE_RETRY_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.retry_attempts),
            retry_base_delay: std::env::var("STORE_RETRY_BASE_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map_or(defaults.retry_base_delay, Duration::from_millis),
        }
    }
}

/// Create Redis client.
pub async fn create_redis_client(redis_url: &str) -> Result<fred::clients::Client> {
    use fred::prelude::*;

    let config = Config::from_url(redis_url)?;
    let client = Client::new(config, None, None, None);
    client.connect();
    client.wait_for_connect().await?;

    info!("Connected to Redis");
    Ok(client)
}

/// Runs a store operation with a per-attempt timeout and bounded retries.
///
/// Only transient errors are retried; a [`StoreError::Protocol`] surfaces
/// immediately since repeating the operation cannot fix bad data. Backoff is
/// exponential with full jitter.
pub async fn with_retry<T, F, Fut>(config: &StoreConfig, mut operation: F) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut attempt: u32 = 0;
    loop {
        let result = match tokio::time::timeout(config.op_timeout, operation()).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Unavailable(format!(
                "operation timed out after {}ms",
                config.op_timeout.as_millis()
            ))),
        };

        match result {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < config.retry_attempts => {
                let delay = backoff_delay(config.retry_base_delay, attempt);
                warn!(attempt, error = %e, "transient store error, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Exponential backoff with full jitter, capped at one second.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exp = base.saturating_mul(2u32.saturating_pow(attempt));
    let cap_ms = exp.min(Duration::from_secs(1)).as_millis() as u64;
    Duration::from_millis(rand::thread_rng().gen_range(0..=cap_ms))
}

/// Runs a store mutation on its own task and awaits it.
///
/// A cancelled request drops its future mid-poll; mutations that were
/// already counted or admitted must still reach the store, otherwise the
/// store ends up inconsistent with what was served. Spawning detaches the
/// operation from the caller's lifetime while keeping it awaitable on the
/// happy path.
pub async fn run_detached<T, F>(operation: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(operation)
        .await
        .unwrap_or_else(|e| Err(StoreError::Unavailable(format!("store task aborted: {e}"))))
}
