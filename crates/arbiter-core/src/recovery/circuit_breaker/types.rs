//! Circuit breaker types and configuration

use std::time::{Duration, Instant};

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Operations proceed normally
    Closed,
    /// Operations are rejected until the recovery timeout elapses
    Open,
    /// Probing recovery; every request is allowed
    HalfOpen,
}

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening the circuit
    pub failure_threshold: u32,
    /// Consecutive successes in half-open before closing
    pub success_threshold: u32,
    /// Time since the last failure before half-open probing starts
    pub recovery_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 3,
            recovery_timeout: Duration::from_secs(30),
        }
    }
}

impl CircuitBreakerConfig {
    /// Config for aggressive circuit breaking
    pub fn aggressive() -> Self {
        Self {
            failure_threshold: 3,
            success_threshold: 2,
            recovery_timeout: Duration::from_secs(15),
        }
    }

    /// Config for lenient circuit breaking
    pub fn lenient() -> Self {
        Self {
            failure_threshold: 10,
            success_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
        }
    }
}

/// Statistics snapshot for a circuit breaker
#[derive(Debug, Clone)]
pub struct CircuitBreakerStats {
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    pub total_calls: u64,
    pub total_failures: u64,
    pub last_failure: Option<Instant>,
    pub opened_at: Option<Instant>,
}

impl CircuitBreakerStats {
    /// Failure rate as a percentage of all calls
    pub fn failure_rate(&self) -> f64 {
        if self.total_calls == 0 {
            0.0
        } else {
            (self.total_failures as f64 / self.total_calls as f64) * 100.0
        }
    }
}
