//! The engine's error boundary.
//!
//! `DispatchError` is the closed set of failures a caller can see.  Errors
//! from the layers below are translated here; infrastructure errors keep
//! only the name of the failing operation and are logged in full at the
//! point of translation.

use std::time::Duration;

use rank_core::{TripId, TripStatus, VehicleId};
use rank_queue::QueueError;
use rank_resilience::GuardError;
use rank_store::StorageError;
use rank_trip::TripError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("passenger count {requested} is outside 1..={max}")]
    InvalidPassengerCount { requested: i32, max: u8 },

    /// Every searched queue was empty.  Expected; the message is user-facing.
    #[error("{message}")]
    NoAvailableVehicle { message: String },

    #[error("{trip} cannot move from {from} to {to}")]
    IllegalTransition {
        trip: TripId,
        from: TripStatus,
        to:   TripStatus,
    },

    #[error("{trip} is already {status}")]
    AlreadyTerminal { trip: TripId, status: TripStatus },

    #[error("{0} not found")]
    TripNotFound(TripId),

    #[error("{vehicle} rejected: {reason}")]
    VehicleRejected { vehicle: VehicleId, reason: String },

    #[error("queue storage failed during {operation}")]
    QueueStorageError { operation: &'static str },

    #[error("dispatch service unavailable, retry in {}s", .retry_after.as_secs().max(1))]
    ServiceUnavailable { retry_after: Duration },

    #[error("{operation} timed out")]
    Timeout { operation: &'static str },

    /// The assignment failed after a vehicle was dequeued, and putting the
    /// vehicle back failed too.  The vehicle is out of every queue.
    #[error("{original}; restoring the vehicle also failed: {compensation}")]
    CompensationFailed {
        original:     Box<DispatchError>,
        compensation: Box<DispatchError>,
    },

    #[error("invalid history filter: {0}")]
    InvalidFilter(&'static str),

    /// Raised by [`DispatchEngineBuilder::build`][crate::DispatchEngineBuilder::build] only.
    #[error("invalid dispatch configuration: {0}")]
    Config(String),
}

pub type DispatchResult<T> = Result<T, DispatchError>;

// ── Translation ───────────────────────────────────────────────────────────────

/// Converts a lower-layer error into its boundary form.
pub(crate) trait Boundary {
    fn at_boundary(self, operation: &'static str, max_capacity: u8) -> DispatchError;
}

fn storage_failure(operation: &'static str, err: &StorageError) -> DispatchError {
    tracing::error!(operation, error = %err, "storage failure");
    DispatchError::QueueStorageError { operation }
}

impl Boundary for StorageError {
    fn at_boundary(self, operation: &'static str, _max_capacity: u8) -> DispatchError {
        storage_failure(operation, &self)
    }
}

impl Boundary for QueueError {
    fn at_boundary(self, operation: &'static str, _max_capacity: u8) -> DispatchError {
        match &self {
            QueueError::Storage(e) => storage_failure(operation, e),
            QueueError::UnknownVehicle(vehicle)
            | QueueError::InactiveVehicle(vehicle)
            | QueueError::AlreadyQueued(vehicle)
            | QueueError::ClassMismatch { vehicle, .. } => {
                DispatchError::VehicleRejected { vehicle: *vehicle, reason: self.to_string() }
            }
        }
    }
}

impl Boundary for TripError {
    fn at_boundary(self, operation: &'static str, max_capacity: u8) -> DispatchError {
        match self {
            TripError::NotFound(trip) => DispatchError::TripNotFound(trip),
            TripError::IllegalTransition { trip, from, to } => {
                DispatchError::IllegalTransition { trip, from, to }
            }
            TripError::AlreadyTerminal { trip, status } => DispatchError::AlreadyTerminal { trip, status },
            TripError::NoPassengers => {
                DispatchError::InvalidPassengerCount { requested: 0, max: max_capacity }
            }
            TripError::InvalidFilter(reason) => DispatchError::InvalidFilter(reason),
            TripError::Storage(e) => storage_failure(operation, &e),
        }
    }
}

impl<E: Boundary> Boundary for GuardError<E> {
    fn at_boundary(self, operation: &'static str, max_capacity: u8) -> DispatchError {
        match self {
            GuardError::CircuitOpen { retry_after } => DispatchError::ServiceUnavailable { retry_after },
            GuardError::DeadlineExceeded { attempts } => {
                tracing::warn!(operation, attempts, "deadline exceeded");
                DispatchError::Timeout { operation }
            }
            GuardError::Failed { source, .. } => source.at_boundary(operation, max_capacity),
        }
    }
}
