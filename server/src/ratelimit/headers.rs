//! Decision surface: quota headers and the throttling response.
//!
//! Formats a [`Decision`](crate::ratelimit::Decision) into the observable
//! signals the API layer attaches to responses: limit, remaining, reset
//! time, and (on deny) a retry-after hint.

use axum::http::header::HeaderValue;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::ratelimit::types::QuotaSnapshot;

pub const HEADER_LIMIT: &str = "X-RateLimit-Limit";
pub const HEADER_REMAINING: &str = "X-RateLimit-Remaining";
pub const HEADER_RESET: &str = "X-RateLimit-Reset";
pub const HEADER_STATUS: &str = "X-RateLimit-Status";
pub const HEADER_RETRY_AFTER: &str = "Retry-After";

/// Attach quota headers for an admitted request.
pub fn apply_quota_headers(headers: &mut HeaderMap, quota: &QuotaSnapshot) {
    insert_numeric(headers, HEADER_LIMIT, u64::from(quota.limit));
    insert_numeric(headers, HEADER_REMAINING, u64::from(quota.remaining));
    insert_numeric(headers, HEADER_RESET, quota.reset_at);
}

/// Mark a response that was admitted without consulting the quota store.
pub fn apply_degraded_marker(headers: &mut HeaderMap) {
    headers.insert(HEADER_STATUS, HeaderValue::from_static("degraded"));
}

fn insert_numeric(headers: &mut HeaderMap, name: &'static str, value: u64) {
    if let Ok(v) = HeaderValue::from_str(&value.to_string()) {
        headers.insert(name, v);
    }
}

/// JSON body for throttled requests.
#[derive(Debug, Serialize)]
pub struct ThrottledResponse {
    /// Error code identifier.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
    /// Seconds to wait before retrying.
    pub retry_after: u64,
    /// Maximum requests allowed in the window.
    pub limit: u32,
    /// Remaining requests (always 0 when throttled).
    pub remaining: u32,
}

/// Build the 429 response for an exhausted quota.
pub fn throttled_response(quota: &QuotaSnapshot, retry_after: u64) -> Response {
    let body = ThrottledResponse {
        error: "rate_limited",
        message: format!(
            "Too many {} requests. Wait {retry_after} seconds.",
            quota.class
        ),
        retry_after,
        limit: quota.limit,
        remaining: 0,
    };

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    let headers = response.headers_mut();
    apply_quota_headers(headers, quota);
    if let Ok(v) = HeaderValue::from_str(&retry_after.to_string()) {
        headers.insert(HEADER_RETRY_AFTER, v);
    }
    response
}
