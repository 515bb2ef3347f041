//! Position renumbering.
//!
//! ```text
//! scan (position, enqueued_at, id) → expected 1..n → CAS-update the entries that differ
//! ```
//!
//! The batch is conditional on the positions read by the scan.  If another
//! writer moves an entry in between, the storage layer rolls the batch back
//! with a conflict, which classifies as contended so a guarded caller simply
//! runs the repair again.

use std::sync::Arc;

use rank_core::{AuditAction, AuditSubject, CapacityClass, Clock, NewAuditEntry};
use rank_store::{PositionUpdate, Storage};
use serde_json::json;

use crate::QueueResult;

/// Restores contiguous `1..n` positions within a class.
pub struct PositionIntegrityRepairer<S: Storage + ?Sized> {
    storage: Arc<S>,
    clock:   Arc<dyn Clock>,
}

impl<S: Storage + ?Sized> PositionIntegrityRepairer<S> {
    pub fn new(storage: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Renumber `class` and return how many entries moved.
    ///
    /// Suspended vehicles keep a slot so they rejoin in order when
    /// reactivated.  Returns 0 for an empty or already contiguous queue, and
    /// writes nothing in that case.
    pub fn repair(&self, class: CapacityClass) -> QueueResult<usize> {
        let entries = self.storage.scan_class(class, false)?;
        let updates: Vec<PositionUpdate> = entries
            .iter()
            .zip(1u32..)
            .filter(|(entry, expected)| entry.position != *expected)
            .map(|(entry, expected)| PositionUpdate { entry: entry.id, from: entry.position, to: expected })
            .collect();

        if updates.is_empty() {
            return Ok(0);
        }

        let audit = NewAuditEntry {
            action:  AuditAction::QueueRepaired,
            subject: AuditSubject::Queue(class),
            at:      self.clock.now(),
            detail:  json!({
                "class":   class.seats(),
                "entries": entries.len(),
                "updated": updates.len(),
            }),
        };
        let updated = self.storage.update_positions(class, &updates, Some(&audit))?;
        tracing::info!(%class, updated, "queue positions repaired");
        Ok(updated)
    }
}
