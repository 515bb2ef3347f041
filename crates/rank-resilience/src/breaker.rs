//! Consecutive-failure circuit breaker.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rank_core::{BreakerConfig, Clock, Timestamp};

/// Externally visible breaker state.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
enum Inner {
    Closed { failures: u32 },
    Open { until: Timestamp },
    /// Cooldown elapsed; exactly one trial call is let through.
    HalfOpen { trial_in_flight: bool },
}

/// Tracks consecutive infrastructure failures across all callers.
///
/// The mutex guards a few words of state and is never held across the
/// guarded call itself.
pub struct CircuitBreaker {
    threshold: u32,
    cooldown:  Duration,
    clock:     Arc<dyn Clock>,
    inner:     Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(cfg: &BreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            threshold: cfg.failure_threshold.max(1),
            cooldown:  Duration::from_millis(cfg.cooldown_ms),
            clock,
            inner:     Mutex::new(Inner::Closed { failures: 0 }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // The state is a plain enum; a panic mid-update cannot leave it torn.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state, promoting `Open → HalfOpen` if the cooldown is over.
    pub fn state(&self) -> BreakerState {
        let now = self.clock.now();
        let mut inner = self.lock();
        if let Inner::Open { until } = *inner {
            if now >= until {
                *inner = Inner::HalfOpen { trial_in_flight: false };
            }
        }
        match *inner {
            Inner::Closed { .. } => BreakerState::Closed,
            Inner::Open { .. } => BreakerState::Open,
            Inner::HalfOpen { .. } => BreakerState::HalfOpen,
        }
    }

    /// Ask to make a call.  `Err(retry_after)` means fail fast.
    pub fn acquire(&self) -> Result<(), Duration> {
        let now = self.clock.now();
        let mut inner = self.lock();
        match *inner {
            Inner::Closed { .. } => Ok(()),
            Inner::Open { until } if now < until => Err(until.since(now)),
            Inner::Open { .. } | Inner::HalfOpen { trial_in_flight: false } => {
                *inner = Inner::HalfOpen { trial_in_flight: true };
                tracing::info!("storage circuit half-open, admitting trial call");
                Ok(())
            }
            Inner::HalfOpen { trial_in_flight: true } => Err(Duration::ZERO),
        }
    }

    /// Record a call that reached a healthy backend.
    pub fn on_success(&self) {
        let mut inner = self.lock();
        match *inner {
            Inner::Closed { .. } => *inner = Inner::Closed { failures: 0 },
            Inner::HalfOpen { .. } => {
                *inner = Inner::Closed { failures: 0 };
                tracing::info!("storage circuit closed");
            }
            // A call admitted before the breaker opened; the cooldown stands.
            Inner::Open { .. } => {}
        }
    }

    /// Record an infrastructure failure.
    pub fn on_failure(&self) {
        let now = self.clock.now();
        let mut inner = self.lock();
        match *inner {
            Inner::Closed { failures } => {
                let failures = failures + 1;
                if failures >= self.threshold {
                    *inner = Inner::Open { until: now.plus(self.cooldown) };
                    tracing::warn!(
                        failures,
                        cooldown_ms = self.cooldown.as_millis() as u64,
                        "storage circuit opened"
                    );
                } else {
                    *inner = Inner::Closed { failures };
                }
            }
            Inner::HalfOpen { .. } => {
                *inner = Inner::Open { until: now.plus(self.cooldown) };
                tracing::warn!("storage circuit trial failed, re-opened");
            }
            Inner::Open { .. } => {}
        }
    }
}
