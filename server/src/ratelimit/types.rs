//! Rate limiting types.

use tg_limits::OperationClass;

/// The identity a quota is scoped to.
///
/// The device id is client-supplied and unauthenticated: it narrows the
/// bucket so households behind one address don't starve each other, but it
/// is never a trust boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    /// Normalized network address (IPv4 as-is, IPv6 collapsed to /64)
    pub network_address: String,
    /// Validated device token from the `X-Device-Id` header, if any
    pub device_id: Option<String>,
}

/// Quota state observed while admitting a request.
///
/// Carries the four pieces of information the API layer surfaces as
/// response headers: limit, remaining, reset time, and (on deny) how long to
/// wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaSnapshot {
    /// Operation class the request was charged against
    pub class: OperationClass,
    /// Maximum requests allowed in the window
    pub limit: u32,
    /// Remaining requests in the current window
    pub remaining: u32,
    /// Unix timestamp when the window resets
    pub reset_at: u64,
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Admitted, with quota accounting.
    Allow(QuotaSnapshot),
    /// Admitted without accounting: limiter disabled, allowlisted caller,
    /// or the store was unreachable and the limiter failed open.
    AllowUnmetered {
        /// True when this admission was caused by store degradation rather
        /// than configuration.
        degraded: bool,
    },
    /// Rejected until the window resets.
    Deny {
        /// Seconds to wait before retrying
        retry_after: u64,
        /// Quota state at the time of rejection (remaining is always 0)
        quota: QuotaSnapshot,
    },
}

impl Decision {
    /// Whether the request may proceed.
    pub const fn is_allowed(&self) -> bool {
        !matches!(self, Self::Deny { .. })
    }
}
