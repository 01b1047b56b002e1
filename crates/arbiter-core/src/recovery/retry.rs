//! Retry execution with backoff and circuit-breaker consultation

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::backoff::{BackoffConfig, BackoffStrategy, ExponentialBackoff};
use super::circuit_breaker::CircuitBreaker;
use super::{classify_error, ErrorClass};
use crate::error::{ArbiterError, ArbiterResult};

/// Immutable retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the initial attempt (`0` means try once)
    pub max_retries: u32,
    /// Delay before the first retry
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
    /// Upper bound on any single delay
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
    /// Multiplier for exponential growth
    pub exponential_base: f64,
    /// Add random jitter to spread synchronized retries
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

fn default_jitter() -> bool {
    true
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            exponential_base: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy that never retries
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
            exponential_base: 1.0,
            jitter: false,
        }
    }

    /// Set the retry budget
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the base delay
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the maximum delay
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the exponential base
    pub fn with_exponential_base(mut self, base: f64) -> Self {
        self.exponential_base = base;
        self
    }

    /// Enable or disable jitter
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Backoff configuration matching this policy
    pub fn to_backoff_config(&self) -> BackoffConfig {
        BackoffConfig {
            base_delay: self.base_delay,
            max_delay: self.max_delay,
            exponential_base: self.exponential_base,
            jitter: self.jitter,
            jitter_ratio: 0.25,
        }
    }
}

/// Wraps operations with bounded retries and a circuit breaker gate
pub struct RetryManager {
    policy: RetryPolicy,
    backoff: ExponentialBackoff,
    breaker: Arc<CircuitBreaker>,
}

impl RetryManager {
    /// Create a manager from a policy and a breaker
    ///
    /// The breaker persists across attempts of this manager; share the same
    /// `Arc` across managers to share failure state between sessions.
    pub fn new(policy: RetryPolicy, breaker: Arc<CircuitBreaker>) -> Self {
        let backoff = ExponentialBackoff::with_config(policy.to_backoff_config());
        Self {
            policy,
            backoff,
            breaker,
        }
    }

    /// The breaker consulted before each attempt
    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// The policy this manager runs with
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute an operation with retries
    ///
    /// Transient errors are retried up to `max_retries` times with
    /// exponential backoff; everything else propagates immediately after the
    /// breaker records the failure. When the breaker rejects an attempt the
    /// call fails fast with [`ArbiterError::CircuitOpen`].
    pub async fn execute_with_retry<T, F, Fut>(
        &self,
        mut operation: F,
        cancel: Option<&CancellationToken>,
    ) -> ArbiterResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ArbiterResult<T>>,
    {
        for attempt in 0..=self.policy.max_retries {
            if let Some(token) = cancel {
                if token.is_cancelled() {
                    return Err(ArbiterError::Cancelled);
                }
            }

            if !self.breaker.allow() {
                return Err(ArbiterError::circuit_open(self.breaker.name()));
            }

            match operation().await {
                Ok(value) => {
                    self.breaker.record_success();
                    return Ok(value);
                }
                Err(error) => match classify_error(&error) {
                    ErrorClass::Transient if attempt < self.policy.max_retries => {
                        let delay = self.backoff.delay_for_attempt(attempt);
                        warn!(
                            attempt = attempt + 1,
                            max_retries = self.policy.max_retries,
                            delay_ms = delay.as_millis() as u64,
                            error = %error,
                            "Transient runtime error; retrying after backoff"
                        );
                        match cancel {
                            Some(token) => {
                                tokio::select! {
                                    _ = token.cancelled() => return Err(ArbiterError::Cancelled),
                                    _ = sleep(delay) => {}
                                }
                            }
                            None => sleep(delay).await,
                        }
                    }
                    ErrorClass::Transient => {
                        debug!(error = %error, "Retry budget exhausted");
                        self.breaker.record_failure();
                        return Err(error);
                    }
                    _ => {
                        self.breaker.record_failure();
                        return Err(error);
                    }
                },
            }
        }

        unreachable!("retry loop returns on every path")
    }
}
