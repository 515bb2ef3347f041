//! The `Storage` trait implemented by every backend.

use rank_core::{
    AuditLogEntry, AuditSubject, CapacityClass, EntryId, NewAuditEntry, QueueEntry, Timestamp, Trip, TripId,
    TripStatus, Vehicle, VehicleId,
};

use crate::StorageResult;

// ── Request / response rows ───────────────────────────────────────────────────

/// A trip row not yet written; the store assigns the id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewTrip {
    pub vehicle:     Option<VehicleId>,
    pub passengers:  u8,
    pub destination: String,
    pub status:      TripStatus,
    pub created_at:  Timestamp,
}

/// A compare-and-set status change: applied only if the stored status still
/// equals `from`.
#[derive(Clone, Debug, PartialEq)]
pub struct TripTransition {
    pub trip:         TripId,
    pub from:         TripStatus,
    pub to:           TripStatus,
    /// Attach a vehicle in the same write (`Pending → Assigned`).
    pub vehicle:      Option<VehicleId>,
    pub completed_at: Option<Timestamp>,
    /// Appended in the same transaction when the transition applies.
    pub audit:        Option<NewAuditEntry>,
}

/// One renumbering step: applied only if the entry is still at `from`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PositionUpdate {
    pub entry: EntryId,
    pub from:  u32,
    pub to:    u32,
}

/// Trip history query.  `created_to` is exclusive.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TripQuery {
    pub status:       Option<TripStatus>,
    pub created_from: Option<Timestamp>,
    pub created_to:   Option<Timestamp>,
    pub limit:        u32,
    pub offset:       u64,
}

/// One page of trips plus the total number matching the query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TripSlice {
    pub trips: Vec<Trip>,
    pub total: u64,
}

// ── Storage trait ─────────────────────────────────────────────────────────────

/// Transactional store behind the dispatch engine.
///
/// Every method is a single round-trip and either commits fully or not at
/// all; callers never observe partial writes.  Implementations are shared
/// across request threads and possibly across processes.  Every
/// read-modify-write is atomic at the storage level, not behind an
/// in-process lock.
pub trait Storage: Send + Sync {
    // ── Fleet registry ────────────────────────────────────────────────────

    /// Insert or replace a vehicle record.
    fn put_vehicle(&self, vehicle: &Vehicle) -> StorageResult<()>;

    fn vehicle(&self, id: VehicleId) -> StorageResult<Option<Vehicle>>;

    /// Flip the active flag.  Returns `false` if the vehicle is unknown.
    fn set_vehicle_active(&self, id: VehicleId, active: bool) -> StorageResult<bool>;

    // ── Queue ─────────────────────────────────────────────────────────────

    /// Append at the tail of `class`: position = current max + 1 (1 if empty).
    ///
    /// Fails with `AlreadyQueued` if the vehicle holds an entry anywhere.
    fn append_entry(
        &self,
        class:   CapacityClass,
        vehicle: VehicleId,
        at:      Timestamp,
    ) -> StorageResult<QueueEntry>;

    /// Put a just-dequeued `entry` back at the head of its class.
    ///
    /// The entry returns to its old position when that is still ahead of the
    /// class (no other row moves), or to the class's current first position
    /// after a concurrent renumbering, shifting the rest down by one.  An
    /// empty class gets it at position 1.  Keeps `entry.enqueued_at`; the id
    /// is reassigned.
    fn insert_head(&self, entry: &QueueEntry) -> StorageResult<QueueEntry>;

    /// Atomically remove and return the head of `class`: minimum position,
    /// then earliest `enqueued_at`, among entries whose vehicle is active.
    ///
    /// Two concurrent callers never receive the same entry.
    fn take_head(&self, class: CapacityClass) -> StorageResult<Option<QueueEntry>>;

    /// Remove the entry holding `vehicle` in `class`.  No renumbering.
    fn delete_entry(&self, class: CapacityClass, vehicle: VehicleId) -> StorageResult<bool>;

    /// Entries of `class` in FIFO order.  With `active_only`, entries whose
    /// vehicle is inactive are left out.
    fn scan_class(&self, class: CapacityClass, active_only: bool) -> StorageResult<Vec<QueueEntry>>;

    /// Apply every update or none: if any entry is no longer at its `from`
    /// position the batch is rolled back with `Conflict`.  `audit` is
    /// appended in the same transaction.  Returns the number of rows moved.
    fn update_positions(
        &self,
        class:   CapacityClass,
        updates: &[PositionUpdate],
        audit:   Option<&NewAuditEntry>,
    ) -> StorageResult<usize>;

    // ── Trips ─────────────────────────────────────────────────────────────

    fn insert_trip(&self, trip: &NewTrip) -> StorageResult<Trip>;

    fn trip(&self, id: TripId) -> StorageResult<Option<Trip>>;

    /// Apply `transition` if the trip is still in `transition.from`.
    /// Returns `false` (and writes nothing) otherwise.
    fn transition_trip(&self, transition: &TripTransition) -> StorageResult<bool>;

    /// Trips matching `query`, newest first, with the total match count
    /// taken from the same snapshot.
    fn trip_page(&self, query: &TripQuery) -> StorageResult<TripSlice>;

    // ── Audit ─────────────────────────────────────────────────────────────

    /// Audit entries, oldest first; restricted to one subject if given.
    fn audit_log(&self, subject: Option<AuditSubject>) -> StorageResult<Vec<AuditLogEntry>>;
}
