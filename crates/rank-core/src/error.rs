//! Core error type.
//!
//! Raised only for invalid configuration or malformed values; the storage,
//! queue, trip and dispatch crates define their own enums and wrap this one
//! where they need to.

use thiserror::Error;

/// Errors produced by `rank-core`.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("capacity class must be at least 1 seat")]
    ZeroCapacity,

    #[error("unknown trip status {0:?}")]
    UnknownStatus(String),

    #[error("unknown audit action {0:?}")]
    UnknownAction(String),

    #[error("unknown audit subject {0:?}")]
    UnknownSubject(String),
}

/// Shorthand result type for `rank-core`.
pub type CoreResult<T> = Result<T, CoreError>;
