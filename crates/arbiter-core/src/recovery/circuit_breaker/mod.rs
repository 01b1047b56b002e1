//! Circuit breaker for the runtime connection
//!
//! Tracks consecutive-failure state for one logical connection and gates
//! whether an attempt may proceed. One breaker per execution by default; an
//! instance may be shared across sessions by injecting the same `Arc`.

mod breaker;
mod types;

#[cfg(test)]
mod tests;

pub use breaker::CircuitBreaker;
pub use types::{CircuitBreakerConfig, CircuitBreakerStats, CircuitState};
