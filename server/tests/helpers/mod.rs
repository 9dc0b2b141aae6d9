//! Reusable test helpers for integration tests.
//!
//! ## Shared Resources
//!
//! Use [`shared_redis()`] to avoid creating a new connection per test.
//!
//! ## Test Servers
//!
//! Use [`spawn_test_server()`] for stateful middleware testing (admission
//! counters persist across requests) instead of `tower::ServiceExt::oneshot`.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;

use tg_limits::{LimitsDocument, LimitsTable};
use tg_server::config::Config;
use tg_server::store::{self, StoreConfig};

/// Shared Redis client across all tests in the same binary.
static SHARED_REDIS: OnceCell<fred::clients::Client> = OnceCell::const_new();

/// Get or create a shared Redis client.
pub async fn shared_redis() -> &'static fred::clients::Client {
    SHARED_REDIS
        .get_or_init(|| async {
            let config = Config::default_for_test();
            store::create_redis_client(&config.redis_url)
                .await
                .expect("Failed to connect to test Redis")
        })
        .await
}

/// A fred client that is never connected.
///
/// Commands stall until the store timeout trips, which is exactly how the
/// fail-open tests simulate an unreachable store without needing Redis.
pub fn unconnected_client() -> fred::clients::Client {
    let config = fred::types::config::Config::from_url("redis://127.0.0.1:1")
        .expect("static test url parses");
    fred::clients::Client::new(config, None, None, None)
}

/// Store policy with a short timeout and no retries so unavailable-store
/// tests finish quickly.
pub fn fast_store_config() -> StoreConfig {
    StoreConfig {
        op_timeout: Duration::from_millis(100),
        retry_attempts: 0,
        retry_base_delay: Duration::from_millis(1),
    }
}

/// Build a validated limits table with one window for all three classes.
pub fn test_limits(overview: u32, read: u32, modification: u32, window: u32) -> Arc<LimitsTable> {
    let json = format!(
        r#"{{
            "version": "test",
            "rate_limits": {{
                "overview": {{ "max_requests": {overview}, "window_seconds": {window}, "description": "overview" }},
                "read": {{ "max_requests": {read}, "window_seconds": {window}, "description": "read" }},
                "modification": {{ "max_requests": {modification}, "window_seconds": {window}, "description": "modification" }}
            }}
        }}"#
    );
    let document = LimitsDocument::from_json(&json).expect("test document parses");
    Arc::new(LimitsTable::from_document(document).expect("test document validates"))
}

/// A running HTTP server backed by a real listener.
pub struct TestServer {
    pub url: String,
    handle: JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Spawn a router on an ephemeral port.
///
/// Served with connect-info so the admission middleware sees real socket
/// addresses, exactly as in production.
pub async fn spawn_test_server(router: Router) -> TestServer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().expect("Failed to get local addr");
    let url = format!("http://{addr}");

    let handle = tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("Test server failed");
    });

    TestServer { url, handle }
}
