//! Circuit breaker implementation

use parking_lot::Mutex;
use std::time::Instant;

use super::types::{CircuitBreakerConfig, CircuitBreakerStats, CircuitState};

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    total_calls: u64,
    total_failures: u64,
    last_failure: Option<Instant>,
    opened_at: Option<Instant>,
}

/// Circuit breaker protecting one logical connection
///
/// Writes are serialized by the internal lock, so an instance behind an
/// `Arc` may be shared across concurrent callers.
pub struct CircuitBreaker {
    /// Component name (for logging and error reporting)
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a breaker with the default config
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, CircuitBreakerConfig::default())
    }

    /// Create a breaker with a custom config
    pub fn with_config(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                total_calls: 0,
                total_failures: 0,
                last_failure: None,
                opened_at: None,
            }),
        }
    }

    /// Get the component name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state, without side effects
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Whether an attempt may proceed
    ///
    /// In the open state, once `recovery_timeout` has elapsed since the last
    /// failure the breaker transitions to half-open and the attempt is
    /// allowed. Half-open allows every request; bounding probe cadence is the
    /// caller's concern.
    pub fn allow(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let recovered = inner
                    .last_failure
                    .map(|at| at.elapsed() >= self.config.recovery_timeout)
                    .unwrap_or(true);
                if recovered {
                    inner.state = CircuitState::HalfOpen;
                    inner.success_count = 0;
                    tracing::info!(
                        circuit = %self.name,
                        "Circuit breaker transitioning to half-open"
                    );
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful operation
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        inner.total_calls += 1;
        match inner.state {
            CircuitState::Closed => {
                inner.failure_count = 0;
            }
            CircuitState::HalfOpen => {
                inner.success_count += 1;
                if inner.success_count >= self.config.success_threshold {
                    self.transition_to_closed(&mut inner);
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Record a failed operation
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.total_calls += 1;
        inner.total_failures += 1;
        inner.last_failure = Some(Instant::now());
        match inner.state {
            CircuitState::Closed => {
                inner.failure_count += 1;
                if inner.failure_count >= self.config.failure_threshold {
                    self.transition_to_open(&mut inner);
                }
            }
            // Any failure while probing reopens the circuit
            CircuitState::HalfOpen => self.transition_to_open(&mut inner),
            CircuitState::Open => {}
        }
    }

    /// Statistics snapshot
    pub fn stats(&self) -> CircuitBreakerStats {
        let inner = self.inner.lock();
        CircuitBreakerStats {
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            total_calls: inner.total_calls,
            total_failures: inner.total_failures,
            last_failure: inner.last_failure,
            opened_at: inner.opened_at,
        }
    }

    /// Manually reset to the closed state
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        self.transition_to_closed(&mut inner);
    }

    fn transition_to_open(&self, inner: &mut BreakerInner) {
        inner.state = CircuitState::Open;
        inner.opened_at = Some(Instant::now());
        inner.success_count = 0;
        tracing::warn!(
            circuit = %self.name,
            failures = inner.failure_count,
            "Circuit breaker opened"
        );
    }

    fn transition_to_closed(&self, inner: &mut BreakerInner) {
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.success_count = 0;
        inner.opened_at = None;
        tracing::info!(circuit = %self.name, "Circuit breaker closed");
    }
}
