//! Integration tests for the admission service.
//!
//! These tests require a running Redis instance at `redis://localhost:6379`.
//! Run with: `cargo test --test limiter_test --ignored -- --nocapture`

mod helpers;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use helpers::{shared_redis, test_limits};
use tg_limits::LimitsTable;
use tg_server::ratelimit::{ClientIdentity, Decision, RateLimitConfig, RateLimiter};
use tg_server::store::StoreConfig;

/// Helper to create a limiter with a unique key prefix per test run.
async fn create_test_limiter(limits: Arc<LimitsTable>) -> RateLimiter {
    let redis = shared_redis().await.clone();
    let config = RateLimitConfig {
        enabled: true,
        key_prefix: format!("test:rl:{}", uuid::Uuid::new_v4()),
        trust_proxy: false,
        allowlist: HashSet::new(),
        store: StoreConfig::default(),
    };
    let limiter = RateLimiter::new(redis, config, limits);
    limiter.init().await.expect("Failed to initialize limiter");
    limiter
}

fn identity(address: &str, device: Option<&str>) -> ClientIdentity {
    ClientIdentity {
        network_address: address.to_string(),
        device_id: device.map(String::from),
    }
}

/// Requests under the limit are allowed with decreasing remaining counts.
#[tokio::test]
#[ignore] // Requires Redis
async fn test_under_limit_allows_with_remaining() {
    let limiter = create_test_limiter(test_limits(5, 3, 5, 60)).await;
    let caller = identity("10.1.0.1", None);

    for expected_remaining in [2u32, 1, 0] {
        match limiter.check(&caller, "/api/budgets/item-1", "GET").await {
            Decision::Allow(quota) => {
                assert_eq!(quota.limit, 3);
                assert_eq!(quota.remaining, expected_remaining);
            }
            other => panic!("expected Allow under the limit, got {other:?}"),
        }
    }
}

/// The request after the limit is denied with usable retry information.
#[tokio::test]
#[ignore] // Requires Redis
async fn test_over_limit_denies_with_retry_info() {
    let limiter = create_test_limiter(test_limits(5, 3, 5, 60)).await;
    let caller = identity("10.1.0.2", None);

    for _ in 0..3 {
        assert!(limiter
            .check(&caller, "/api/budgets/item-1", "GET")
            .await
            .is_allowed());
    }

    match limiter.check(&caller, "/api/budgets/item-1", "GET").await {
        Decision::Deny { retry_after, quota } => {
            assert!(retry_after > 0, "retry_after must be positive");
            assert!(retry_after <= 60, "retry_after must fit in the window");
            assert_eq!(quota.remaining, 0);
        }
        other => panic!("expected Deny past the limit, got {other:?}"),
    }
}

/// Scenario from the throttling contract: 30 modifications admitted inside
/// the window, the 31st rejected.
#[tokio::test]
#[ignore] // Requires Redis
async fn test_modification_scenario_thirty_then_deny() {
    let limiter = create_test_limiter(test_limits(200, 100, 30, 60)).await;
    let caller = identity("10.1.0.3", Some("device-aaaa"));

    for i in 0..30 {
        let decision = limiter.check(&caller, "/api/budgets", "POST").await;
        assert!(
            decision.is_allowed(),
            "modification {} should be admitted",
            i + 1
        );
    }

    match limiter.check(&caller, "/api/budgets", "POST").await {
        Decision::Deny { retry_after, .. } => {
            assert!(retry_after > 0 && retry_after <= 60);
        }
        other => panic!("expected the 31st modification to be denied, got {other:?}"),
    }
}

/// One identity exhausting a class leaves other identities untouched.
#[tokio::test]
#[ignore] // Requires Redis
async fn test_identities_are_isolated() {
    let limiter = create_test_limiter(test_limits(5, 2, 5, 60)).await;
    let alice = identity("10.1.0.4", None);
    let bob = identity("10.1.0.5", None);

    for _ in 0..2 {
        assert!(limiter
            .check(&alice, "/api/budgets/item-1", "GET")
            .await
            .is_allowed());
    }
    assert!(!limiter
        .check(&alice, "/api/budgets/item-1", "GET")
        .await
        .is_allowed());

    // Bob's quota for the same class is unaffected.
    assert!(limiter
        .check(&bob, "/api/budgets/item-1", "GET")
        .await
        .is_allowed());
}

/// Distinct device ids behind the same address get separate buckets.
#[tokio::test]
#[ignore] // Requires Redis
async fn test_device_ids_separate_buckets() {
    let limiter = create_test_limiter(test_limits(5, 1, 5, 60)).await;
    let phone = identity("10.1.0.6", Some("device-phone1"));
    let tablet = identity("10.1.0.6", Some("device-tablet"));

    assert!(limiter
        .check(&phone, "/api/budgets/item-1", "GET")
        .await
        .is_allowed());
    assert!(!limiter
        .check(&phone, "/api/budgets/item-1", "GET")
        .await
        .is_allowed());

    assert!(limiter
        .check(&tablet, "/api/budgets/item-1", "GET")
        .await
        .is_allowed());
}

/// Each class has its own counter: exhausting reads leaves overview intact.
#[tokio::test]
#[ignore] // Requires Redis
async fn test_classes_have_separate_quotas() {
    let limiter = create_test_limiter(test_limits(5, 1, 5, 60)).await;
    let caller = identity("10.1.0.7", None);

    assert!(limiter
        .check(&caller, "/api/budgets/item-1", "GET")
        .await
        .is_allowed());
    assert!(!limiter
        .check(&caller, "/api/budgets/item-1", "GET")
        .await
        .is_allowed());

    // Overview classifies differently and is charged separately.
    assert!(limiter.check(&caller, "/api/budgets", "GET").await.is_allowed());
}

/// A fresh window starts once the previous one expires.
#[tokio::test]
#[ignore] // Requires Redis
async fn test_window_resets_after_expiry() {
    let limiter = create_test_limiter(test_limits(5, 1, 5, 2)).await;
    let caller = identity("10.1.0.8", None);

    assert!(limiter
        .check(&caller, "/api/budgets/item-1", "GET")
        .await
        .is_allowed());
    assert!(!limiter
        .check(&caller, "/api/budgets/item-1", "GET")
        .await
        .is_allowed());

    tokio::time::sleep(Duration::from_secs(3)).await;

    assert!(
        limiter
            .check(&caller, "/api/budgets/item-1", "GET")
            .await
            .is_allowed(),
        "counter should reset after the window elapses"
    );
}
