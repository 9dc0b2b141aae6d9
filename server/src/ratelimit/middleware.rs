//! Axum middleware for request admission.
//!
//! Applies the rate limiter in front of business handlers. Denied requests
//! short-circuit with 429 before any business logic or cache work runs;
//! admitted requests carry quota headers so clients can pace themselves.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use tracing::debug;

use crate::api::AppState;
use crate::ratelimit::headers::{apply_degraded_marker, apply_quota_headers, throttled_response};
use crate::ratelimit::identity::extract_identity;
use crate::ratelimit::types::Decision;

/// Admission middleware.
///
/// Derives the client identity (normalized address + optional device id),
/// lets the limiter classify and charge the request, and enforces the
/// decision:
///
/// - If the limiter is not configured, requests pass through untouched.
/// - Admitted requests run and get `X-RateLimit-*` headers attached.
/// - Admissions made while the store was unreachable are marked
///   `X-RateLimit-Status: degraded`; the end user sees no failure.
/// - Exhausted quotas return `429 Too Many Requests` with retry information.
#[tracing::instrument(skip(state, request, next))]
pub async fn admit_request(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(ref limiter) = state.rate_limiter else {
        return next.run(request).await;
    };

    let connect_info = request.extensions().get::<ConnectInfo<SocketAddr>>().copied();
    let trust_proxy = limiter.config().trust_proxy;
    let identity = extract_identity(request.headers(), connect_info.as_ref(), trust_proxy);
    let path = request.uri().path().to_string();
    let method = request.method().as_str().to_string();

    debug!(
        address = %identity.network_address,
        path = %path,
        method = %method,
        "checking admission"
    );

    match limiter.check(&identity, &path, &method).await {
        Decision::Allow(quota) => {
            let mut response = next.run(request).await;
            apply_quota_headers(response.headers_mut(), &quota);
            response
        }
        Decision::AllowUnmetered { degraded } => {
            let mut response = next.run(request).await;
            if degraded {
                apply_degraded_marker(response.headers_mut());
            }
            response
        }
        Decision::Deny { retry_after, quota } => {
            debug!(
                address = %identity.network_address,
                class = %quota.class,
                retry_after,
                "request throttled"
            );
            throttled_response(&quota, retry_after)
        }
    }
}
