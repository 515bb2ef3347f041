//! The `Resilience` guard.

use std::fmt::Display;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rank_core::{BreakerConfig, Clock, Deadline, JitterRng, RetryConfig};

use crate::{CircuitBreaker, Classify, FaultKind, GuardError, RetryPolicy};

/// Retry-with-backoff plus circuit breaker, shared by every storage caller.
pub struct Resilience {
    policy:  RetryPolicy,
    breaker: CircuitBreaker,
    jitter:  Mutex<JitterRng>,
}

impl Resilience {
    pub fn new(
        retry:   &RetryConfig,
        breaker: &BreakerConfig,
        seed:    u64,
        clock:   Arc<dyn Clock>,
    ) -> Self {
        Self::with_policy(RetryPolicy::from(retry), CircuitBreaker::new(breaker, clock), seed)
    }

    pub fn with_policy(policy: RetryPolicy, breaker: CircuitBreaker, seed: u64) -> Self {
        Self { policy, breaker, jitter: Mutex::new(JitterRng::new(seed)) }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Run an idempotent or atomic-conditional call, retrying transient
    /// faults up to the policy's attempt cap.
    pub fn retrying<T, E, F>(
        &self,
        op:       &'static str,
        deadline: Option<Deadline>,
        call:     F,
    ) -> Result<T, GuardError<E>>
    where
        E: Classify + Display,
        F: FnMut() -> Result<T, E>,
    {
        self.run(op, deadline, self.policy.max_attempts, call)
    }

    /// Run a call that must not be repeated (it creates a row).  The breaker
    /// still gates and observes it.
    pub fn once<T, E, F>(
        &self,
        op:       &'static str,
        deadline: Option<Deadline>,
        call:     F,
    ) -> Result<T, GuardError<E>>
    where
        E: Classify + Display,
        F: FnMut() -> Result<T, E>,
    {
        self.run(op, deadline, 1, call)
    }

    fn run<T, E, F>(
        &self,
        op:           &'static str,
        deadline:     Option<Deadline>,
        max_attempts: u32,
        mut call:     F,
    ) -> Result<T, GuardError<E>>
    where
        E: Classify + Display,
        F: FnMut() -> Result<T, E>,
    {
        let mut attempt = 1;
        loop {
            if deadline.is_some_and(|d| d.is_expired()) {
                return Err(GuardError::DeadlineExceeded { attempts: attempt - 1 });
            }
            if let Err(retry_after) = self.breaker.acquire() {
                tracing::debug!(op, ?retry_after, "circuit open, failing fast");
                return Err(GuardError::CircuitOpen { retry_after });
            }

            let err = match call() {
                Ok(value) => {
                    self.breaker.on_success();
                    return Ok(value);
                }
                Err(err) => err,
            };

            match err.fault_kind() {
                FaultKind::Domain => {
                    self.breaker.on_success();
                    return Err(GuardError::Failed { attempts: attempt, source: err });
                }
                FaultKind::Permanent => {
                    self.breaker.on_failure();
                    tracing::warn!(op, attempt, error = %err, "storage call failed permanently");
                    return Err(GuardError::Failed { attempts: attempt, source: err });
                }
                kind @ (FaultKind::Transient | FaultKind::Contended) => {
                    if kind == FaultKind::Transient {
                        self.breaker.on_failure();
                    } else {
                        self.breaker.on_success();
                    }
                    if attempt >= max_attempts {
                        tracing::warn!(op, attempt, error = %err, "storage call failed, giving up");
                        return Err(GuardError::Failed { attempts: attempt, source: err });
                    }
                    let delay = self.jittered(attempt);
                    if let Some(deadline) = deadline {
                        if deadline.remaining().is_none_or(|left| left <= delay) {
                            return Err(GuardError::DeadlineExceeded { attempts: attempt });
                        }
                    }
                    tracing::debug!(op, attempt, ?delay, error = %err, "transient storage fault, retrying");
                    std::thread::sleep(delay);
                    attempt += 1;
                }
            }
        }
    }

    fn jittered(&self, attempt: u32) -> Duration {
        let base = self.policy.backoff(attempt);
        self.jitter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .equal_jitter(base)
    }
}
