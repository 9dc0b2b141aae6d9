//! Configuration endpoints.
//!
//! Serves the active rate-limit document so client-side pre-checks throttle
//! from the exact limits the server enforces. A client that caches this
//! document and classifies with the shared tables stays in lock-step with
//! the server; the server-side decision remains the only enforcement point.

use axum::{extract::State, routing::get, Json, Router};

use tg_limits::LimitsDocument;

use super::AppState;

/// Create configuration API routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/rate-limits", get(get_rate_limits))
}

/// Current rate-limit document, verbatim as loaded at startup.
async fn get_rate_limits(State(state): State<AppState>) -> Json<LimitsDocument> {
    Json(state.limits.document().clone())
}
