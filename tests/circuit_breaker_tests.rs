//! Circuit breaker integration tests - per-operation configuration

use std::time::Duration;

use token_courier::Error;
use token_courier::config::CircuitBreakerConfig;
use token_courier::failsafe::{BreakerRegistry, CircuitBreaker, CircuitState};

async fn fail_once(cb: &CircuitBreaker) {
    let _ = cb
        .call(|| async { Err::<(), _>(Error::Server { status: 500 }) })
        .await;
}

async fn succeed_once(cb: &CircuitBreaker) {
    cb.call(|| async { Ok(()) }).await.unwrap();
}

#[tokio::test]
async fn custom_config_opens_at_lower_volume() {
    // Stricter configuration: trips after 3 calls at any failure rate
    let custom_config = CircuitBreakerConfig {
        enabled: true,
        request_volume_threshold: 3,
        error_threshold_percentage: 50,
        sleep_window: Duration::from_secs(60),
        execution_timeout: Duration::from_millis(500),
        rolling_window: Duration::from_secs(10),
    };

    let cb = CircuitBreaker::new("strict-operation", &custom_config);

    fail_once(&cb).await;
    fail_once(&cb).await;
    assert_eq!(cb.state(), CircuitState::Closed);

    fail_once(&cb).await; // Third call meets the volume threshold
    assert_eq!(cb.state(), CircuitState::Open);
}

#[tokio::test]
async fn lenient_error_rate_tolerates_mixed_outcomes() {
    // 50% threshold: 4 failures among 10 calls stays closed
    let lenient_config = CircuitBreakerConfig {
        enabled: true,
        request_volume_threshold: 10,
        error_threshold_percentage: 50,
        sleep_window: Duration::from_secs(60),
        execution_timeout: Duration::from_millis(500),
        rolling_window: Duration::from_secs(10),
    };

    let cb = CircuitBreaker::new("lenient-operation", &lenient_config);

    for _ in 0..6 {
        succeed_once(&cb).await;
    }
    for _ in 0..4 {
        fail_once(&cb).await;
    }
    assert_eq!(cb.state(), CircuitState::Closed);

    // Two more failures push the window to 6/12 = 50%
    fail_once(&cb).await;
    fail_once(&cb).await;
    assert_eq!(cb.state(), CircuitState::Open);
}

#[tokio::test]
async fn disabled_breaker_never_opens() {
    let disabled_config = CircuitBreakerConfig {
        enabled: false,
        request_volume_threshold: 3,
        error_threshold_percentage: 10,
        sleep_window: Duration::from_secs(30),
        execution_timeout: Duration::from_millis(500),
        rolling_window: Duration::from_secs(10),
    };

    let cb = CircuitBreaker::new("disabled-operation", &disabled_config);

    for _ in 0..100 {
        fail_once(&cb).await;
    }
    assert_eq!(cb.state(), CircuitState::Closed);
    succeed_once(&cb).await;
}

#[tokio::test]
async fn half_open_recovery_cycle() {
    let config = CircuitBreakerConfig {
        enabled: true,
        request_volume_threshold: 2,
        error_threshold_percentage: 100,
        sleep_window: Duration::from_millis(20),
        execution_timeout: Duration::from_millis(500),
        rolling_window: Duration::from_secs(10),
    };

    let cb = CircuitBreaker::new("recovery-operation", &config);

    // Open the circuit
    fail_once(&cb).await;
    fail_once(&cb).await;
    assert_eq!(cb.state(), CircuitState::Open);

    // Wait out the sleep window, then probe successfully
    tokio::time::sleep(Duration::from_millis(30)).await;
    succeed_once(&cb).await;
    assert_eq!(cb.state(), CircuitState::Closed);

    // The reset window needs a fresh volume threshold to trip again
    fail_once(&cb).await;
    assert_eq!(cb.state(), CircuitState::Closed);
    fail_once(&cb).await;
    assert_eq!(cb.state(), CircuitState::Open);
}

#[tokio::test]
async fn metrics_expose_rejections() {
    let config = CircuitBreakerConfig {
        enabled: true,
        request_volume_threshold: 2,
        error_threshold_percentage: 100,
        sleep_window: Duration::from_secs(60),
        execution_timeout: Duration::from_millis(500),
        rolling_window: Duration::from_secs(10),
    };

    let cb = CircuitBreaker::new("metrics-operation", &config);
    fail_once(&cb).await;
    fail_once(&cb).await;

    for _ in 0..3 {
        let result = cb.call(|| async { Ok(()) }).await;
        assert!(matches!(result, Err(Error::CircuitOpen(_))));
    }

    let metrics = cb.metrics();
    assert_eq!(metrics.state, CircuitState::Open);
    assert_eq!(metrics.rejected, 3);
}

#[tokio::test]
async fn registry_isolates_operations() {
    let registry = BreakerRegistry::new(CircuitBreakerConfig {
        enabled: true,
        request_volume_threshold: 2,
        error_threshold_percentage: 100,
        sleep_window: Duration::from_secs(60),
        execution_timeout: Duration::from_millis(500),
        rolling_window: Duration::from_secs(10),
    });

    let token_breaker = registry.get("request-token");
    let other_breaker = registry.get("revoke-token");

    fail_once(&token_breaker).await;
    fail_once(&token_breaker).await;

    assert_eq!(token_breaker.state(), CircuitState::Open);
    assert_eq!(other_breaker.state(), CircuitState::Closed);

    // Same key resolves to the already-open breaker
    assert_eq!(registry.get("request-token").state(), CircuitState::Open);
}
