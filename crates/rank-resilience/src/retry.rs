//! Capped exponential backoff.

use std::time::Duration;

use rank_core::RetryConfig;

/// How many times to try and how long to wait in between.
///
/// The delay before attempt `n + 1` (for `n >= 1`) is
/// `min(base * 2^(n-1), max)`; jitter is applied on top by the guard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay:   Duration,
    pub max_delay:    Duration,
}

impl RetryPolicy {
    /// Un-jittered delay after failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << shift)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            base_delay:   Duration::from_millis(cfg.base_delay_ms),
            max_delay:    Duration::from_millis(cfg.max_delay_ms),
        }
    }
}
