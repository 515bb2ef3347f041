//! `TripLifecycle` — creation, status transitions, history.

use std::sync::Arc;

use rank_core::{
    AuditAction, AuditLogEntry, AuditSubject, Clock, NewAuditEntry, Trip, TripId, TripStatus,
    VehicleId,
};
use rank_store::{NewTrip, Storage, StorageError, TripTransition};
use serde_json::json;

use crate::{Page, TripError, TripFilter, TripResult};

/// Outcome of [`complete`][TripLifecycle::complete] or
/// [`cancel`][TripLifecycle::cancel].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    pub trip:     Trip,
    /// The vehicle freed by the trip, if one was attached.  The caller
    /// decides whether it goes back into a queue.
    pub released: Option<VehicleId>,
}

/// The trip state machine over a shared [`Storage`] handle.
pub struct TripLifecycle<S: Storage + ?Sized> {
    storage: Arc<S>,
    clock:   Arc<dyn Clock>,
}

impl<S: Storage + ?Sized> Clone for TripLifecycle<S> {
    fn clone(&self) -> Self {
        Self { storage: Arc::clone(&self.storage), clock: Arc::clone(&self.clock) }
    }
}

impl<S: Storage + ?Sized> TripLifecycle<S> {
    pub fn new(storage: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Record a new trip: `Assigned` when `vehicle` is given, else `Pending`.
    ///
    /// Not idempotent; every call writes a new row.
    pub fn create(
        &self,
        passengers:  u8,
        destination: &str,
        vehicle:     Option<VehicleId>,
    ) -> TripResult<Trip> {
        if passengers == 0 {
            return Err(TripError::NoPassengers);
        }
        let status = if vehicle.is_some() { TripStatus::Assigned } else { TripStatus::Pending };
        let trip = self.storage.insert_trip(&NewTrip {
            vehicle,
            passengers,
            destination: destination.to_owned(),
            status,
            created_at: self.clock.now(),
        })?;
        tracing::debug!(trip = %trip.id, %status, passengers, "trip created");
        Ok(trip)
    }

    pub fn get(&self, id: TripId) -> TripResult<Trip> {
        self.storage.trip(id)?.ok_or(TripError::NotFound(id))
    }

    /// Move a trip one step along the status graph (or to `Cancelled`).
    ///
    /// `Pending → Assigned` needs a vehicle and goes through
    /// [`attach_vehicle`][Self::attach_vehicle] instead.
    pub fn advance(&self, id: TripId, next: TripStatus) -> TripResult<Trip> {
        self.transition(id, next, None, false)
    }

    /// `Pending → Assigned`, attaching `vehicle` in the same write.
    pub fn attach_vehicle(&self, id: TripId, vehicle: VehicleId) -> TripResult<Trip> {
        self.transition(id, TripStatus::Assigned, Some(vehicle), false)
    }

    /// Finish a trip.  `AlreadyTerminal` if it already is; `IllegalTransition`
    /// unless it is `InProgress`.
    pub fn complete(&self, id: TripId) -> TripResult<Completion> {
        let trip = self.transition(id, TripStatus::Completed, None, true)?;
        Ok(Completion { released: trip.vehicle, trip })
    }

    /// Cancel a non-terminal trip.  `AlreadyTerminal` otherwise.
    pub fn cancel(&self, id: TripId) -> TripResult<Completion> {
        let trip = self.transition(id, TripStatus::Cancelled, None, true)?;
        Ok(Completion { released: trip.vehicle, trip })
    }

    /// Trips newest first, one page at a time.
    pub fn history(&self, filter: &TripFilter) -> TripResult<Page<Trip>> {
        let query = filter.to_query()?;
        let slice = self.storage.trip_page(&query)?;
        Ok(Page::new(slice.trips, slice.total, filter.page, filter.page_size))
    }

    /// Audit entries recorded for a trip, oldest first.
    pub fn audit_trail(&self, id: TripId) -> TripResult<Vec<AuditLogEntry>> {
        self.get(id)?;
        Ok(self.storage.audit_log(Some(AuditSubject::Trip(id)))?)
    }

    // ── Internal ──────────────────────────────────────────────────────────

    /// Validate and apply `current → to` as a compare-and-set.  A lost race
    /// re-reads the trip and validates again against the new status.
    fn transition(
        &self,
        id:            TripId,
        to:            TripStatus,
        vehicle:       Option<VehicleId>,
        terminal_call: bool,
    ) -> TripResult<Trip> {
        for _ in 0..TripStatus::ALL.len() {
            let current = self.get(id)?;
            let from = current.status;

            if terminal_call && from.is_terminal() {
                return Err(TripError::AlreadyTerminal { trip: id, status: from });
            }
            let needs_vehicle = from == TripStatus::Pending && to == TripStatus::Assigned;
            if !from.can_transition_to(to) || needs_vehicle != vehicle.is_some() {
                return Err(TripError::IllegalTransition { trip: id, from, to });
            }

            let now = self.clock.now();
            let completed_at = (to == TripStatus::Completed).then_some(now);
            let audit = audit_action(to).map(|action| NewAuditEntry {
                action,
                subject: AuditSubject::Trip(id),
                at:      now,
                detail:  json!({
                    "from":       from.as_str(),
                    "vehicle":    current.vehicle.map(VehicleId::get),
                    "passengers": current.passengers,
                }),
            });

            let applied = self.storage.transition_trip(&TripTransition {
                trip: id,
                from,
                to,
                vehicle,
                completed_at,
                audit,
            })?;
            if applied {
                tracing::info!(trip = %id, %from, %to, "trip status changed");
                return Ok(Trip {
                    status:       to,
                    vehicle:      vehicle.or(current.vehicle),
                    completed_at: completed_at.or(current.completed_at),
                    ..current
                });
            }
            tracing::debug!(trip = %id, %from, %to, "trip status changed underneath, re-reading");
        }
        Err(StorageError::Conflict("trip status kept changing").into())
    }
}

fn audit_action(to: TripStatus) -> Option<AuditAction> {
    match to {
        TripStatus::Completed => Some(AuditAction::TripCompleted),
        TripStatus::Cancelled => Some(AuditAction::TripCancelled),
        _ => None,
    }
}
