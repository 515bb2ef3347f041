//! Error classification consulted by the guard.

/// How a failed call should be treated.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum FaultKind {
    /// Infrastructure fault that may clear on its own (busy database, lost
    /// connection).  Counted by the breaker and retried when the call is
    /// retry-safe.
    Transient,
    /// Lost a compare-and-set race against another writer.  The backend is
    /// healthy, so the breaker treats it as a success; retried like
    /// `Transient`.
    Contended,
    /// Infrastructure fault that will not clear by retrying (corrupt row,
    /// schema mismatch).  Counted by the breaker, never retried.
    Permanent,
    /// A business outcome; the backend answered correctly.  Resets the
    /// breaker's failure streak and is returned as-is.
    Domain,
}

/// Implemented by every error type that flows through [`Resilience`][crate::Resilience].
pub trait Classify {
    fn fault_kind(&self) -> FaultKind;
}
