//! Trip record and its status enum.
//!
//! The status graph is:
//!
//! ```text
//! Pending ─▶ Assigned ─▶ DriverEnRoute ─▶ InProgress ─▶ Completed
//!    │          │              │               │
//!    └──────────┴──────────────┴───────────────┴──────▶ Cancelled
//! ```
//!
//! `Completed` and `Cancelled` are terminal.  Only the next forward step or
//! `Cancelled` is legal from a non-terminal state.

use std::fmt;
use std::str::FromStr;

use crate::{CoreError, Timestamp, TripId, VehicleId};

/// Lifecycle status of a trip.  Closed set; stored by [`as_str`][Self::as_str].
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TripStatus {
    /// Booked, no vehicle yet.
    Pending,
    /// A vehicle has been dequeued for the trip.
    Assigned,
    DriverEnRoute,
    InProgress,
    Completed,
    Cancelled,
}

impl TripStatus {
    pub const ALL: [TripStatus; 6] = [
        TripStatus::Pending,
        TripStatus::Assigned,
        TripStatus::DriverEnRoute,
        TripStatus::InProgress,
        TripStatus::Completed,
        TripStatus::Cancelled,
    ];

    /// `true` for `Completed` and `Cancelled`.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, TripStatus::Completed | TripStatus::Cancelled)
    }

    /// The single forward successor, or `None` for terminal states.
    pub fn next(self) -> Option<TripStatus> {
        match self {
            TripStatus::Pending       => Some(TripStatus::Assigned),
            TripStatus::Assigned      => Some(TripStatus::DriverEnRoute),
            TripStatus::DriverEnRoute => Some(TripStatus::InProgress),
            TripStatus::InProgress    => Some(TripStatus::Completed),
            TripStatus::Completed | TripStatus::Cancelled => None,
        }
    }

    /// Whether `self → to` is an edge of the status graph.
    pub fn can_transition_to(self, to: TripStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == TripStatus::Cancelled || self.next() == Some(to)
    }

    /// Stable storage / wire label.
    pub fn as_str(self) -> &'static str {
        match self {
            TripStatus::Pending       => "pending",
            TripStatus::Assigned      => "assigned",
            TripStatus::DriverEnRoute => "driver_en_route",
            TripStatus::InProgress    => "in_progress",
            TripStatus::Completed     => "completed",
            TripStatus::Cancelled     => "cancelled",
        }
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TripStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TripStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| CoreError::UnknownStatus(s.to_owned()))
    }
}

/// A passenger-to-vehicle assignment, from booking to a terminal state.
///
/// Trips are never deleted; terminal trips are retained for history.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Trip {
    pub id:           TripId,
    /// `None` while `Pending`.
    pub vehicle:      Option<VehicleId>,
    pub passengers:   u8,
    pub destination:  String,
    pub status:       TripStatus,
    pub created_at:   Timestamp,
    /// Set exactly once, when the trip reaches `Completed`.
    pub completed_at: Option<Timestamp>,
}
