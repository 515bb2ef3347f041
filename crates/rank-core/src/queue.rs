//! The queue entry record.

use std::cmp::Ordering;

use crate::{CapacityClass, EntryId, Timestamp, VehicleId};

/// One vehicle waiting in its class's FIFO queue.
///
/// Within a class, positions form the contiguous sequence `1..=n` once a
/// repair has run.  Between repairs positions may have gaps (after a
/// withdrawal) or duplicates (after a compensating re-insert raced another
/// writer); [`QueueEntry::fifo_cmp`] is the canonical ordering in every case.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QueueEntry {
    pub id:          EntryId,
    pub vehicle:     VehicleId,
    pub class:       CapacityClass,
    /// 1-based rank within `class`.
    pub position:    u32,
    pub enqueued_at: Timestamp,
}

impl QueueEntry {
    /// FIFO order: position, then enqueue time, then entry id.
    pub fn fifo_cmp(&self, other: &Self) -> Ordering {
        self.position
            .cmp(&other.position)
            .then(self.enqueued_at.cmp(&other.enqueued_at))
            .then(self.id.cmp(&other.id))
    }
}
