//! Client identity extraction for rate limiting.

use axum::extract::ConnectInfo;
use axum::http::HeaderMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::ratelimit::types::ClientIdentity;

/// IPv6 prefix segments used for identity (collapses to /64)
const IPV6_PREFIX_SEGMENTS: usize = 4;

/// Accepted device id length bounds
const DEVICE_ID_MIN_LEN: usize = 8;
const DEVICE_ID_MAX_LEN: usize = 64;

/// Header carrying the client-supplied device token
const DEVICE_ID_HEADER: &str = "X-Device-Id";

/// Extract the full client identity from a request.
pub fn extract_identity(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
    trust_proxy: bool,
) -> ClientIdentity {
    let ip = extract_client_ip(headers, connect_info, trust_proxy);
    ClientIdentity {
        network_address: normalize_ip(ip),
        device_id: device_id_from_headers(headers),
    }
}

/// Extract client IP from request headers or connection info.
///
/// When `trust_proxy` is true, checks X-Forwarded-For and X-Real-IP headers.
/// Falls back to direct connection IP, or 127.0.0.1 if unavailable.
pub fn extract_client_ip(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
    trust_proxy: bool,
) -> IpAddr {
    if trust_proxy {
        if let Some(forwarded) = headers.get("X-Forwarded-For") {
            if let Ok(s) = forwarded.to_str() {
                if let Some(first_ip) = s.split(',').next() {
                    if let Ok(ip) = first_ip.trim().parse() {
                        return ip;
                    }
                }
            }
        }
        if let Some(real_ip) = headers.get("X-Real-IP") {
            if let Ok(s) = real_ip.to_str() {
                if let Ok(ip) = s.trim().parse() {
                    return ip;
                }
            }
        }
    }
    connect_info
        .map(|c| c.0.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

/// Normalize IP address for quota scoping.
///
/// IPv4 addresses are kept as-is.
/// IPv6 addresses are normalized to /64 prefix to prevent circumvention
/// by using multiple addresses within the same allocation.
pub fn normalize_ip(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => v4.to_string(),
        IpAddr::V6(v6) => {
            let seg = v6.segments();
            let prefix: Vec<String> = (0..IPV6_PREFIX_SEGMENTS)
                .map(|i| format!("{:x}", seg[i]))
                .collect();
            format!("{}::/64", prefix.join(":"))
        }
    }
}

/// Read and validate the device id header. Invalid ids are treated as
/// absent rather than rejected, since the id is only a bucketing hint.
fn device_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(DEVICE_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| is_valid_device_id(s).then(|| s.to_string()))
}

/// Device ids must be 8-64 characters, alphanumeric with hyphens and
/// underscores. Anything else is discarded before it can reach a store key.
fn is_valid_device_id(device_id: &str) -> bool {
    let len = device_id.len();
    (DEVICE_ID_MIN_LEN..=DEVICE_ID_MAX_LEN).contains(&len)
        && device_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
