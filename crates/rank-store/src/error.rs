//! Error types for rank-store.

use rank_core::VehicleId;
use rank_resilience::{Classify, FaultKind};
use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors raised by a [`Storage`][crate::Storage] implementation.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The backend could not be reached at all.
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),

    /// A compare-and-set write found the row changed underneath it.
    #[error("concurrent modification: {0}")]
    Conflict(&'static str),

    /// The vehicle already holds a queue entry.
    #[error("{0} is already queued")]
    AlreadyQueued(VehicleId),
}

impl Classify for StorageError {
    fn fault_kind(&self) -> FaultKind {
        match self {
            StorageError::Sqlite(e) => match e.sqlite_error_code() {
                Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::CannotOpen) => {
                    FaultKind::Transient
                }
                Some(ErrorCode::ConstraintViolation) => FaultKind::Domain,
                _ => FaultKind::Permanent,
            },
            StorageError::Json(_) => FaultKind::Permanent,
            StorageError::Unavailable(_) => FaultKind::Transient,
            StorageError::Conflict(_) => FaultKind::Contended,
            StorageError::AlreadyQueued(_) => FaultKind::Domain,
        }
    }
}

/// Alias for `Result<T, StorageError>`.
pub type StorageResult<T> = Result<T, StorageError>;
