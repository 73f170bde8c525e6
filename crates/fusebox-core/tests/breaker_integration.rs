//! Integration tests for the Fusebox failure isolation core
//!
//! Drives the registry and breakers through the public API the way the
//! gateway's provider clients do: mixed providers, concurrent traffic, and
//! the full open / half-open / closed recovery cycle.

use std::sync::Arc;
use std::time::Duration;

use fusebox_core::{
    CircuitBreakerConfig, CircuitBreakerError, CircuitBreakerRegistry, CircuitState,
};

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter("fusebox_core=debug")
        .try_init()
        .ok();
}

/// One provider failing must not affect its siblings, and the failed
/// provider must recover through a trial call after the dwell.
#[tokio::test]
async fn test_provider_isolation_and_recovery() {
    init_logging();

    let registry = CircuitBreakerRegistry::with_config(CircuitBreakerConfig {
        failure_threshold: 2,
        success_threshold: 1,
        recovery_timeout: Duration::from_millis(100),
        monitoring_period: Duration::from_millis(20),
    });

    let flaky = registry.get("anthropic");
    let healthy = registry.get("openai");

    for _ in 0..2 {
        let result: Result<(), CircuitBreakerError<&str>> = flaky
            .execute(|| async { Err("503 service unavailable") })
            .await;
        assert!(result.is_err());
    }
    assert_eq!(flaky.state(), CircuitState::Open);
    assert_eq!(healthy.state(), CircuitState::Closed);

    // Rejected without touching the provider, and the rejection is
    // classified as worth retrying later
    let rejected: Result<(), CircuitBreakerError<&str>> =
        flaky.execute(|| async { Ok(()) }).await;
    match rejected {
        Err(e) => {
            assert!(e.is_open());
            assert!(e.class().is_retryable());
        }
        Ok(()) => panic!("open circuit must reject"),
    }

    // The healthy sibling keeps serving
    let ok: Result<&str, CircuitBreakerError<&str>> =
        healthy.execute(|| async { Ok("completion") }).await;
    assert_eq!(ok.unwrap(), "completion");

    // After the dwell a trial call closes the circuit again
    tokio::time::sleep(Duration::from_millis(150)).await;
    let trial: Result<(), CircuitBreakerError<&str>> = flaky.execute(|| async { Ok(()) }).await;
    assert!(trial.is_ok());
    assert_eq!(flaky.state(), CircuitState::Closed);

    let stats = registry.all_stats();
    let flaky_stats = &stats["anthropic"];
    assert_eq!(flaky_stats.total_failures, 2);
    assert_eq!(flaky_stats.total_rejections, 1);
    assert_eq!(
        flaky_stats.total_requests,
        flaky_stats.total_successes + flaky_stats.total_failures + flaky_stats.total_rejections
    );

    registry.destroy();
    assert!(registry.names().is_empty());
}

/// Concurrent first access for the same provider must yield one instance.
#[tokio::test]
async fn test_concurrent_first_access_creates_one_breaker() {
    let registry = Arc::new(CircuitBreakerRegistry::new());

    let mut handles = Vec::new();
    for _ in 0..16 {
        let registry = Arc::clone(&registry);
        handles.push(tokio::spawn(async move { registry.get("anthropic") }));
    }

    let mut breakers = Vec::new();
    for handle in handles {
        breakers.push(handle.await.unwrap());
    }

    let first = &breakers[0];
    for other in &breakers[1..] {
        assert!(Arc::ptr_eq(first, other));
    }
    assert_eq!(registry.names().len(), 1);
}

/// In-flight operations of arbitrary duration must not block each other's
/// gate decisions, and every outcome must be recorded exactly once.
#[tokio::test]
async fn test_concurrent_execution_records_all_outcomes() {
    let registry = Arc::new(CircuitBreakerRegistry::new());
    let breaker = registry.get("anthropic");

    let mut handles = Vec::new();
    for i in 0..8u32 {
        let breaker = Arc::clone(&breaker);
        handles.push(tokio::spawn(async move {
            breaker
                .execute(|| async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    if i % 4 == 0 {
                        Err("timeout")
                    } else {
                        Ok(i)
                    }
                })
                .await
        }));
    }

    for handle in handles {
        let _ = handle.await.unwrap();
    }

    let stats = breaker.stats();
    assert_eq!(stats.total_requests, 8);
    assert_eq!(stats.total_successes, 6);
    assert_eq!(stats.total_failures, 2);
    assert_eq!(stats.state, CircuitState::Closed);

    registry.destroy();
}

/// Manual overrides: force-open for a drill, reset to clear it, and the
/// cumulative record survives both.
#[tokio::test]
async fn test_manual_overrides_keep_history() {
    init_logging();

    let registry = CircuitBreakerRegistry::new();
    let breaker = registry.get_with_config(
        "anthropic",
        CircuitBreakerConfig {
            recovery_timeout: Duration::from_secs(60),
            ..Default::default()
        },
    );

    let ok: Result<(), CircuitBreakerError<&str>> = breaker.execute(|| async { Ok(()) }).await;
    assert!(ok.is_ok());

    breaker.force_open();
    let rejected: Result<(), CircuitBreakerError<&str>> =
        breaker.execute(|| async { Ok(()) }).await;
    assert!(rejected.is_err());

    registry.reset_all();
    assert_eq!(breaker.state(), CircuitState::Closed);

    let ok: Result<(), CircuitBreakerError<&str>> = breaker.execute(|| async { Ok(()) }).await;
    assert!(ok.is_ok());

    let stats = breaker.stats();
    assert_eq!(stats.total_requests, 3);
    assert_eq!(stats.total_successes, 2);
    assert_eq!(stats.total_rejections, 1);

    registry.destroy();
}
