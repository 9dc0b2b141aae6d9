//! Request admission module.
//!
//! Redis-backed fixed-window quotas keyed by client identity and operation
//! class. Decisions fail open: the store going away degrades throttling,
//! never availability.

pub mod config;
pub mod headers;
pub mod identity;
pub mod limiter;
pub mod middleware;
pub mod quota;
pub mod types;

pub use config::RateLimitConfig;
pub use limiter::RateLimiter;
pub use middleware::admit_request;
pub use quota::{QuotaCount, QuotaStore};
pub use types::{ClientIdentity, Decision, QuotaSnapshot};
