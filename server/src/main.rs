//! Tollgate Server - Main Entry Point
//!
//! Admission and caching middleware for the budget-data API.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use tg_limits::{LimitsDocument, LimitsTable};
use tg_server::{api, cache, config, ratelimit, store};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tg_server=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Tollgate Server"
    );

    // Load and validate the rate-limit document. A missing or unusable class
    // entry aborts startup; quotas are never silently defaulted.
    let document = match &config.rate_limits_path {
        Some(path) => LimitsDocument::from_path(path)
            .with_context(|| format!("loading rate limits from {path}"))?,
        None => LimitsDocument::builtin().context("loading embedded rate limits")?,
    };
    let limits =
        Arc::new(LimitsTable::from_document(document).context("validating rate limits")?);
    info!(version = %limits.version(), "Rate limit configuration loaded");

    // Initialize Redis
    let redis = store::create_redis_client(&config.redis_url).await?;

    // Initialize rate limiter (optional)
    let rate_limiter = {
        let rl_config = ratelimit::RateLimitConfig::from_env();
        if rl_config.enabled {
            let limiter = ratelimit::RateLimiter::new(redis.clone(), rl_config, limits.clone());
            if let Err(e) = limiter.init().await {
                // The limiter reloads the script on first use; a failed
                // preload only delays that.
                tracing::warn!("Quota script preload failed: {e}. Will retry on first check.");
            } else {
                info!("Rate limiter initialized");
            }
            Some(limiter)
        } else {
            info!("Rate limiting disabled by configuration");
            None
        }
    };

    // Initialize budget response cache
    let budget_cache = cache::BudgetCache::new(redis.clone(), cache::CacheConfig::from_env());

    // Build application state and router
    let state = api::AppState::new(redis, config.clone(), limits, rate_limiter, budget_cache);
    let app = api::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(address = %config.bind_address, "Server listening");

    // Graceful shutdown handler
    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
        info!("Received shutdown signal, cleaning up...");
    };

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal)
    .await?;

    info!("Server shutdown complete");

    Ok(())
}
