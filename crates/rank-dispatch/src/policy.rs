//! Capacity allocation policy.

use rank_core::{CapacityClass, CapacityClasses};

use crate::{DispatchError, DispatchResult};

/// Maps a passenger count to the ordered list of classes to search.
///
/// Pure: no I/O and no state beyond the configured classes.
#[derive(Clone, Debug)]
pub struct AllocationPolicy {
    classes:       CapacityClasses,
    allow_upgrade: bool,
}

impl AllocationPolicy {
    pub fn new(classes: CapacityClasses, allow_upgrade: bool) -> Self {
        Self { classes, allow_upgrade }
    }

    /// Largest bookable party.
    pub fn max_capacity(&self) -> u8 {
        self.classes.max().seats()
    }

    pub fn classes(&self) -> &CapacityClasses {
        &self.classes
    }

    /// Check `1 <= passenger_count <= max_capacity`.
    pub fn validate(&self, passenger_count: i32) -> DispatchResult<u8> {
        u8::try_from(passenger_count)
            .ok()
            .filter(|&n| n >= 1 && n <= self.max_capacity())
            .ok_or(DispatchError::InvalidPassengerCount {
                requested: passenger_count,
                max:       self.max_capacity(),
            })
    }

    /// Smallest class that fits, then every larger class ascending.  With
    /// upgrades disabled, only the smallest fitting class.
    ///
    /// With classes 4–8: `3 → [4,5,6,7,8]`, `5 → [5,6,7,8]`, `8 → [8]`.
    pub fn classes_for(&self, passenger_count: i32) -> DispatchResult<Vec<CapacityClass>> {
        let passengers = self.validate(passenger_count)?;
        let fitting = self.classes.iter().filter(|class| class.fits(passengers));
        Ok(if self.allow_upgrade { fitting.collect() } else { fitting.take(1).collect() })
    }
}
