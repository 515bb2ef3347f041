//! Capacity classes and the fleet-registry vehicle record.
//!
//! A capacity class is a vehicle-size bucket (4-seater, 5-seater, …).  Each
//! class has its own FIFO queue at the rank.  The set of classes configured
//! for a rank is small, fixed at startup, and always kept sorted ascending.

use std::fmt;

use crate::{CoreError, CoreResult, VehicleId};

// ── CapacityClass ─────────────────────────────────────────────────────────────

/// A vehicle-size bucket, measured in passenger seats.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct CapacityClass(pub u8);

impl CapacityClass {
    /// Number of passenger seats in this class.
    #[inline]
    pub fn seats(self) -> u8 {
        self.0
    }

    /// `true` if a vehicle of this class can carry `passengers`.
    #[inline]
    pub fn fits(self, passengers: u8) -> bool {
        self.0 >= passengers
    }
}

impl fmt::Display for CapacityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-seater", self.0)
    }
}

// ── CapacityClasses ───────────────────────────────────────────────────────────

/// The ascending, de-duplicated set of classes served by a rank.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapacityClasses(Vec<CapacityClass>);

impl CapacityClasses {
    /// Build a class set from raw seat counts.
    ///
    /// Input order does not matter; duplicates are collapsed.  Fails if the
    /// set is empty or contains a zero-seat class.
    pub fn new(seats: impl IntoIterator<Item = u8>) -> CoreResult<Self> {
        let mut classes: Vec<CapacityClass> = seats.into_iter().map(CapacityClass).collect();
        if classes.iter().any(|c| c.0 == 0) {
            return Err(CoreError::ZeroCapacity);
        }
        classes.sort_unstable();
        classes.dedup();
        if classes.is_empty() {
            return Err(CoreError::Config("at least one capacity class is required".into()));
        }
        Ok(Self(classes))
    }

    /// The largest class, which bounds a single booking's passengers.
    #[inline]
    pub fn max(&self) -> CapacityClass {
        // Non-empty by construction.
        self.0[self.0.len() - 1]
    }

    /// Smallest class.
    #[inline]
    pub fn min(&self) -> CapacityClass {
        self.0[0]
    }

    pub fn contains(&self, class: CapacityClass) -> bool {
        self.0.binary_search(&class).is_ok()
    }

    /// Classes in ascending order.
    pub fn as_slice(&self) -> &[CapacityClass] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = CapacityClass> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ── Vehicle ───────────────────────────────────────────────────────────────────

/// A fleet-registry vehicle.
///
/// Owned by fleet management; the dispatch engine only reads it.  `active`
/// gates eligibility: an inactive (suspended) vehicle is treated as absent
/// from every queue even if an entry for it still exists.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vehicle {
    pub id:     VehicleId,
    pub class:  CapacityClass,
    pub active: bool,
}

impl Vehicle {
    /// An active vehicle of the given class.
    pub fn new(id: VehicleId, class: CapacityClass) -> Self {
        Self { id, class, active: true }
    }
}
