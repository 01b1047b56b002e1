use std::time::Duration;

use super::*;

fn breaker(failure_threshold: u32, success_threshold: u32, recovery_ms: u64) -> CircuitBreaker {
    CircuitBreaker::with_config(
        "test",
        CircuitBreakerConfig {
            failure_threshold,
            success_threshold,
            recovery_timeout: Duration::from_millis(recovery_ms),
        },
    )
}

#[test]
fn closed_allows_and_counts_failures() {
    let cb = breaker(3, 1, 1000);
    assert_eq!(cb.state(), CircuitState::Closed);
    assert!(cb.allow());

    cb.record_failure();
    cb.record_failure();
    assert_eq!(cb.state(), CircuitState::Closed);
    assert!(cb.allow());
}

#[test]
fn exactly_threshold_failures_open_the_circuit() {
    let cb = breaker(3, 1, 60_000);
    for _ in 0..3 {
        cb.record_failure();
    }
    assert_eq!(cb.state(), CircuitState::Open);
    assert!(!cb.allow());
}

#[test]
fn success_resets_consecutive_failure_count() {
    let cb = breaker(3, 1, 60_000);
    cb.record_failure();
    cb.record_failure();
    cb.record_success();
    cb.record_failure();
    cb.record_failure();
    // Never three consecutive failures
    assert_eq!(cb.state(), CircuitState::Closed);
}

#[test]
fn open_rejects_until_recovery_timeout_then_half_opens() {
    let cb = breaker(1, 1, 50);
    cb.record_failure();
    assert_eq!(cb.state(), CircuitState::Open);
    assert!(!cb.allow());

    std::thread::sleep(Duration::from_millis(60));

    // The next allow() transitions to half-open and lets the probe through
    assert!(cb.allow());
    assert_eq!(cb.state(), CircuitState::HalfOpen);
}

#[test]
fn half_open_allows_every_request() {
    let cb = breaker(1, 5, 10);
    cb.record_failure();
    std::thread::sleep(Duration::from_millis(20));
    assert!(cb.allow());
    assert!(cb.allow());
    assert!(cb.allow());
}

#[test]
fn success_threshold_closes_from_half_open() {
    let cb = breaker(1, 2, 10);
    cb.record_failure();
    std::thread::sleep(Duration::from_millis(20));
    assert!(cb.allow());

    cb.record_success();
    assert_eq!(cb.state(), CircuitState::HalfOpen);
    cb.record_success();
    assert_eq!(cb.state(), CircuitState::Closed);

    let stats = cb.stats();
    assert_eq!(stats.failure_count, 0);
}

#[test]
fn failure_in_half_open_reopens() {
    let cb = breaker(1, 3, 10);
    cb.record_failure();
    std::thread::sleep(Duration::from_millis(20));
    assert!(cb.allow());

    cb.record_failure();
    assert_eq!(cb.state(), CircuitState::Open);
    assert!(!cb.allow());
}

#[test]
fn stats_track_totals() {
    let cb = breaker(10, 1, 1000);
    cb.record_success();
    cb.record_failure();
    cb.record_failure();
    cb.record_success();

    let stats = cb.stats();
    assert_eq!(stats.total_calls, 4);
    assert_eq!(stats.total_failures, 2);
    assert!((stats.failure_rate() - 50.0).abs() < f64::EPSILON);
}

#[test]
fn reset_closes_manually() {
    let cb = breaker(1, 1, 60_000);
    cb.record_failure();
    assert_eq!(cb.state(), CircuitState::Open);
    cb.reset();
    assert_eq!(cb.state(), CircuitState::Closed);
    assert!(cb.allow());
}
