//! Guard error type.

use std::time::Duration;

use thiserror::Error;

/// Outcome of a guarded call that did not succeed.
#[derive(Debug, Error)]
pub enum GuardError<E> {
    /// The breaker is open; the call was not attempted.
    #[error("storage circuit open, retry in {retry_after:?}")]
    CircuitOpen { retry_after: Duration },

    /// The caller's deadline passed before the call (or its next retry)
    /// could start.
    #[error("deadline exceeded after {attempts} attempt(s)")]
    DeadlineExceeded { attempts: u32 },

    /// The call itself failed; `attempts` counts every try made.
    #[error("{source} (after {attempts} attempt(s))")]
    Failed { attempts: u32, source: E },
}

impl<E> GuardError<E> {
    /// Map the wrapped call error, keeping guard outcomes as they are.
    pub fn map_inner<F>(self, f: impl FnOnce(E) -> F) -> GuardError<F> {
        match self {
            GuardError::CircuitOpen { retry_after } => GuardError::CircuitOpen { retry_after },
            GuardError::DeadlineExceeded { attempts } => GuardError::DeadlineExceeded { attempts },
            GuardError::Failed { attempts, source } => GuardError::Failed { attempts, source: f(source) },
        }
    }
}
