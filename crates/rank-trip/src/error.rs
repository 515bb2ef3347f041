//! Error types for rank-trip.

use rank_core::{TripId, TripStatus};
use rank_resilience::{Classify, FaultKind};
use rank_store::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TripError {
    #[error("{0} not found")]
    NotFound(TripId),

    #[error("{trip} cannot move from {from} to {to}")]
    IllegalTransition {
        trip: TripId,
        from: TripStatus,
        to:   TripStatus,
    },

    #[error("{trip} is already {status}")]
    AlreadyTerminal { trip: TripId, status: TripStatus },

    #[error("a trip needs at least one passenger")]
    NoPassengers,

    #[error("invalid history filter: {0}")]
    InvalidFilter(&'static str),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl Classify for TripError {
    fn fault_kind(&self) -> FaultKind {
        match self {
            TripError::Storage(e) => e.fault_kind(),
            _ => FaultKind::Domain,
        }
    }
}

pub type TripResult<T> = Result<T, TripError>;
