//! Error types for rank-queue.

use rank_core::{CapacityClass, VehicleId};
use rank_resilience::{Classify, FaultKind};
use rank_store::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("{0} is not in the fleet registry")]
    UnknownVehicle(VehicleId),

    #[error("{0} is suspended")]
    InactiveVehicle(VehicleId),

    #[error("{vehicle} is registered as {registered}, not {requested}")]
    ClassMismatch {
        vehicle:    VehicleId,
        registered: CapacityClass,
        requested:  CapacityClass,
    },

    #[error("{0} is already queued")]
    AlreadyQueued(VehicleId),

    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for QueueError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::AlreadyQueued(vehicle) => QueueError::AlreadyQueued(vehicle),
            other => QueueError::Storage(other),
        }
    }
}

impl Classify for QueueError {
    fn fault_kind(&self) -> FaultKind {
        match self {
            QueueError::Storage(e) => e.fault_kind(),
            _ => FaultKind::Domain,
        }
    }
}

pub type QueueResult<T> = Result<T, QueueError>;
