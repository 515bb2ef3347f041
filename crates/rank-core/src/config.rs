//! Engine configuration.
//!
//! Typically loaded from a JSON file by the application crate (with the
//! `serde` feature) and handed to the dispatch engine builder, which calls
//! [`DispatchConfig::validate`] before anything else.  Every field has a
//! default, so a config file only needs the values it overrides.

use std::time::Duration;

use crate::{CapacityClasses, CoreError, CoreResult};

// ── RetryConfig ───────────────────────────────────────────────────────────────

/// Bounded exponential backoff for idempotent storage calls.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RetryConfig {
    /// Total attempts including the first.  1 disables retries.
    pub max_attempts:  u32,
    /// Backoff before the second attempt; doubles per attempt.
    pub base_delay_ms: u64,
    /// Cap on any single backoff (before jitter).
    pub max_delay_ms:  u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay_ms: 20, max_delay_ms: 500 }
    }
}

// ── BreakerConfig ─────────────────────────────────────────────────────────────

/// Circuit-breaker thresholds.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BreakerConfig {
    /// Consecutive storage failures that open the breaker.
    pub failure_threshold: u32,
    /// How long the breaker stays open before admitting a trial call.
    pub cooldown_ms:       u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self { failure_threshold: 5, cooldown_ms: 30_000 }
    }
}

// ── DispatchConfig ────────────────────────────────────────────────────────────

/// Top-level dispatch engine configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DispatchConfig {
    /// Seat counts of the capacity classes served.  Default: 4–8.
    pub classes: Vec<u8>,

    /// Escalate to larger classes when the exact-fit queue is empty.
    pub allow_upgrade: bool,

    /// Renumber a class right after a vehicle is dequeued from it, so
    /// positions keep starting at 1.  Failures are logged, never surfaced.
    pub repair_after_dequeue: bool,

    /// Deadline applied by `assign` when the caller gives none.
    pub assign_timeout_ms: u64,

    pub retry: RetryConfig,

    pub breaker: BreakerConfig,

    /// Seed for retry jitter.  The same seed gives the same backoff sequence.
    pub seed: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            classes:              vec![4, 5, 6, 7, 8],
            allow_upgrade:        true,
            repair_after_dequeue: true,
            assign_timeout_ms:    5_000,
            retry:                RetryConfig::default(),
            breaker:              BreakerConfig::default(),
            seed:                 0x5eed,
        }
    }
}

impl DispatchConfig {
    /// Check internal consistency and return the parsed class set.
    pub fn validate(&self) -> CoreResult<CapacityClasses> {
        let classes = CapacityClasses::new(self.classes.iter().copied())?;
        if self.retry.max_attempts == 0 {
            return Err(CoreError::Config("retry.max_attempts must be at least 1".into()));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(CoreError::Config(format!(
                "retry.base_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                self.retry.base_delay_ms, self.retry.max_delay_ms
            )));
        }
        if self.breaker.failure_threshold == 0 {
            return Err(CoreError::Config("breaker.failure_threshold must be at least 1".into()));
        }
        if self.assign_timeout_ms == 0 {
            return Err(CoreError::Config("assign_timeout_ms must be positive".into()));
        }
        Ok(classes)
    }

    #[inline]
    pub fn assign_timeout(&self) -> Duration {
        Duration::from_millis(self.assign_timeout_ms)
    }
}
