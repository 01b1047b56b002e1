//! Backoff strategies for retry operations

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for backoff behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Delay before the first retry
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
    /// Upper bound on any single delay
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
    /// Multiplier for exponential growth
    pub exponential_base: f64,
    /// Add random jitter to prevent thundering herd
    pub jitter: bool,
    /// Maximum jitter ratio (0.0 - 1.0) relative to the computed delay
    pub jitter_ratio: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            exponential_base: 2.0,
            jitter: true,
            jitter_ratio: 0.25,
        }
    }
}

/// Backoff strategy trait
pub trait BackoffStrategy: Send + Sync {
    /// Delay for the given attempt number (0-indexed)
    fn delay_for_attempt(&self, attempt: u32) -> Duration;
}

/// Exponential backoff: `min(base * exponential_base^attempt, max)` plus
/// optional jitter of `delay * U(0, jitter_ratio)`
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    config: BackoffConfig,
}

impl ExponentialBackoff {
    pub fn new() -> Self {
        Self::with_config(BackoffConfig::default())
    }

    pub fn with_config(config: BackoffConfig) -> Self {
        Self { config }
    }

    fn add_jitter(&self, delay: Duration) -> Duration {
        if !self.config.jitter {
            return delay;
        }
        let jitter = delay.as_secs_f64() * self.config.jitter_ratio * rand_unit();
        Duration::from_secs_f64(delay.as_secs_f64() + jitter)
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new()
    }
}

impl BackoffStrategy for ExponentialBackoff {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let raw = self.config.base_delay.as_secs_f64()
            * self.config.exponential_base.powi(attempt as i32);
        let capped = Duration::from_secs_f64(raw.min(self.config.max_delay.as_secs_f64()));
        self.add_jitter(capped)
    }
}

/// Constant backoff - same delay for all attempts
#[derive(Debug, Clone)]
pub struct ConstantBackoff {
    delay: Duration,
}

impl ConstantBackoff {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl BackoffStrategy for ConstantBackoff {
    fn delay_for_attempt(&self, _attempt: u32) -> Duration {
        self.delay
    }
}

/// Uniform pseudo-random draw in `[0, 1)` seeded from the clock
fn rand_unit() -> f64 {
    use std::time::SystemTime;

    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);

    let hash = nanos.wrapping_mul(2654435761);
    (hash as f64) / (u32::MAX as f64 + 1.0)
}
