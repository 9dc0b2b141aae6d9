//! API Router and Application State
//!
//! Central routing configuration and shared state. Business routers (budget
//! CRUD and friends) live in the embedding application; they nest under the
//! admission layer built here and reach the cache through [`AppState`].

pub mod config;

use axum::{middleware::from_fn_with_state, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use tg_limits::LimitsTable;

use crate::{
    cache::BudgetCache,
    config::Config,
    ratelimit::{admit_request, RateLimiter},
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Redis client
    pub redis: fred::clients::Client,
    /// Server configuration
    pub config: Arc<Config>,
    /// Validated rate-limit table, also served to client mirrors
    pub limits: Arc<LimitsTable>,
    /// Rate limiter (optional, uses Redis)
    pub rate_limiter: Option<RateLimiter>,
    /// Budget response cache
    pub budget_cache: BudgetCache,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        redis: fred::clients::Client,
        config: Config,
        limits: Arc<LimitsTable>,
        rate_limiter: Option<RateLimiter>,
        budget_cache: BudgetCache,
    ) -> Self {
        Self {
            redis,
            config: Arc::new(config),
            limits,
            rate_limiter,
            budget_cache,
        }
    }
}

/// Create the main application router.
///
/// Every `/api` route sits behind the admission middleware; business routers
/// merged into `api_routes` by the embedding application inherit it.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .nest("/api/config", config::router())
        .layer(from_fn_with_state(state.clone(), admit_request));

    Router::new()
        .route("/health", get(health_check))
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Liveness probe. Deliberately outside the admission layer so monitoring
/// never gets throttled.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
