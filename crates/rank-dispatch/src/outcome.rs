//! Successful results returned by the engine.

use rank_core::{CapacityClass, TripId, VehicleId};

/// A vehicle matched to a passenger request.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Assignment {
    pub vehicle:         VehicleId,
    pub trip:            TripId,
    pub assigned_class:  CapacityClass,
    /// The exact-fit class for the passenger count.
    pub requested_class: CapacityClass,
    /// Where the vehicle stood in its queue when it was dequeued.
    pub queue_position:  u32,
    pub upgraded:        bool,
    /// Set for upgrades: `"No 4-seater available, upgraded to 6-seater"`.
    pub reason:          Option<String>,
}

impl Assignment {
    pub(crate) fn upgrade_reason(requested: CapacityClass, assigned: CapacityClass) -> Option<String> {
        (assigned != requested).then(|| format!("No {requested} available, upgraded to {assigned}"))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RepairReport {
    pub class:   CapacityClass,
    /// Entries whose position changed.
    pub updated: usize,
}
