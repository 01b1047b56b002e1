//! Resilience primitives for runtime calls
//!
//! - Error classification (transient vs permanent)
//! - Backoff strategies
//! - Retry execution with circuit-breaker consultation
//! - Circuit breaker for the runtime connection

pub mod backoff;
pub mod circuit_breaker;
pub mod retry;

pub use backoff::{BackoffConfig, BackoffStrategy, ConstantBackoff, ExponentialBackoff};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, CircuitState};
pub use retry::{RetryManager, RetryPolicy};

use crate::error::ArbiterError;

/// Error classification for retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// May succeed on retry
    Transient,
    /// Will not succeed on retry
    Permanent,
    /// Unclassified; retried only when the policy opts in
    Unknown,
}

/// Classify an engine error for recovery decisions
pub fn classify_error(error: &ArbiterError) -> ErrorClass {
    match error {
        ArbiterError::Connection(_) | ArbiterError::Timeout { .. } => ErrorClass::Transient,
        ArbiterError::Protocol(_)
        | ArbiterError::Config(_)
        | ArbiterError::CircuitOpen { .. }
        | ArbiterError::Cancelled
        | ArbiterError::UnknownMode(_)
        | ArbiterError::Json(_)
        | ArbiterError::Policy(_)
        | ArbiterError::Hook(_)
        | ArbiterError::Session(_) => ErrorClass::Permanent,
        ArbiterError::Storage(message) => {
            if message.contains("permission denied") {
                ErrorClass::Permanent
            } else {
                ErrorClass::Transient
            }
        }
        ArbiterError::Other(_) => ErrorClass::Unknown,
    }
}
