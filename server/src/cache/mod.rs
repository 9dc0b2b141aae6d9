//! Response cache layer.
//!
//! Cache-aside storage for derived budget data: read-heavy endpoints wrap
//! their computation in `get_or_compute`, write paths invalidate the
//! affected keys before acknowledging. The store is an optimization only;
//! losing it costs performance, never correctness.

pub mod budget;
pub mod config;
pub mod service;

pub use budget::BudgetCache;
pub use config::CacheConfig;
pub use service::CacheService;
