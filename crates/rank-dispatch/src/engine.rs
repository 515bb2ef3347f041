//! `DispatchEngine` — the single entry point for dispatch operations.

use std::sync::Arc;
use std::time::Duration;

use rank_core::{
    AuditLogEntry, CapacityClass, Deadline, DispatchConfig, QueueEntry, Trip, TripId, TripStatus,
    VehicleId,
};
use rank_queue::{PositionIntegrityRepairer, QueueStore};
use rank_resilience::{BreakerState, GuardError, Resilience};
use rank_store::Storage;
use rank_trip::{Page, TripFilter, TripLifecycle};

use crate::error::Boundary;
use crate::{
    AllocationPolicy, Assignment, DispatchError, DispatchObserver, DispatchResult, NoopObserver,
    RepairReport,
};

/// Matches passenger requests to queued vehicles and drives trips to a
/// terminal state.
///
/// `Send + Sync`; share it behind an `Arc`.  No in-process lock is held
/// across a storage call, so concurrent callers only contend inside the
/// store.  Build one with [`DispatchEngineBuilder`][crate::DispatchEngineBuilder].
pub struct DispatchEngine<S: Storage + ?Sized, O: DispatchObserver = NoopObserver> {
    pub(crate) config:   DispatchConfig,
    pub(crate) policy:   AllocationPolicy,
    pub(crate) storage:  Arc<S>,
    pub(crate) queues:   QueueStore<S>,
    pub(crate) repairer: PositionIntegrityRepairer<S>,
    pub(crate) trips:    TripLifecycle<S>,
    pub(crate) guard:    Resilience,
    pub(crate) observer: O,
}

impl<S: Storage + ?Sized, O: DispatchObserver> DispatchEngine<S, O> {
    // ── Assignment ────────────────────────────────────────────────────────

    /// Assign the first queued vehicle that fits `passenger_count`, bounded
    /// by the configured default timeout.
    pub fn assign(&self, passenger_count: i32, destination: &str) -> DispatchResult<Assignment> {
        self.assign_within(passenger_count, destination, self.config.assign_timeout())
    }

    /// [`assign`][Self::assign] with an explicit deadline.
    ///
    /// Expiry before a vehicle is dequeued changes nothing.  Expiry after
    /// the dequeue puts the vehicle back at the head of its queue before
    /// `Timeout` is returned.
    pub fn assign_within(
        &self,
        passenger_count: i32,
        destination:     &str,
        timeout:         Duration,
    ) -> DispatchResult<Assignment> {
        let classes = self.policy.classes_for(passenger_count)?;
        let passengers = self.policy.validate(passenger_count)?;
        let deadline = Deadline::after(timeout);

        let Some(entry) = self.first_waiting(&classes, deadline)? else {
            return Err(self.unavailable(passengers, &classes));
        };

        let created = self
            .guard
            .once("create_trip", Some(deadline), || {
                rank_store::within(deadline, || self.trips.create(passengers, destination, Some(entry.vehicle)))
            })
            .map_err(|e| self.boundary("create_trip", e));
        let trip = match created {
            Ok(trip) => trip,
            Err(original) => return Err(self.compensate(&entry, original)),
        };

        Ok(self.assigned(&entry, classes[0], trip.id, deadline))
    }

    /// Pre-create a `Pending` trip to be dispatched later with
    /// [`dispatch_pending`][Self::dispatch_pending].
    pub fn book_pending(&self, passenger_count: i32, destination: &str) -> DispatchResult<Trip> {
        let passengers = self.policy.validate(passenger_count)?;
        self.guard
            .once("book_trip", None, || self.trips.create(passengers, destination, None))
            .map_err(|e| self.boundary("book_trip", e))
    }

    /// Find a vehicle for a `Pending` trip and attach it.
    pub fn dispatch_pending(&self, trip: TripId) -> DispatchResult<Assignment> {
        let pending = self.trip(trip)?;
        match pending.status {
            TripStatus::Pending => {}
            status if status.is_terminal() => {
                return Err(DispatchError::AlreadyTerminal { trip, status });
            }
            from => {
                return Err(DispatchError::IllegalTransition { trip, from, to: TripStatus::Assigned });
            }
        }

        let passenger_count = i32::from(pending.passengers);
        let classes = self.policy.classes_for(passenger_count)?;
        let deadline = Deadline::after(self.config.assign_timeout());

        let Some(entry) = self.first_waiting(&classes, deadline)? else {
            return Err(self.unavailable(pending.passengers, &classes));
        };

        let attached = self
            .guard
            .retrying("attach_vehicle", Some(deadline), || {
                rank_store::within(deadline, || self.trips.attach_vehicle(trip, entry.vehicle))
            })
            .map_err(|e| self.boundary("attach_vehicle", e));
        if let Err(original) = attached {
            return Err(self.compensate(&entry, original));
        }

        Ok(self.assigned(&entry, classes[0], trip, deadline))
    }

    // ── Trips ─────────────────────────────────────────────────────────────

    pub fn trip(&self, trip: TripId) -> DispatchResult<Trip> {
        self.guard
            .retrying("get_trip", None, || self.trips.get(trip))
            .map_err(|e| self.boundary("get_trip", e))
    }

    /// Move a trip one step forward, or to `Cancelled`.  Reaching a terminal
    /// state reports the freed vehicle to the observer, as
    /// [`complete_trip`][Self::complete_trip] does.
    pub fn advance_trip(&self, trip: TripId, next: TripStatus) -> DispatchResult<Trip> {
        let moved = self
            .guard
            .retrying("advance_trip", None, || self.trips.advance(trip, next))
            .map_err(|e| self.boundary("advance_trip", e))?;
        if moved.status.is_terminal() {
            if let Some(vehicle) = moved.vehicle {
                self.observer.on_vehicle_released(vehicle, trip);
            }
        }
        Ok(moved)
    }

    /// Complete an `InProgress` trip.  The freed vehicle is reported to the
    /// observer; it is not re-queued automatically.
    pub fn complete_trip(&self, trip: TripId) -> DispatchResult<Trip> {
        let done = self
            .guard
            .retrying("complete_trip", None, || self.trips.complete(trip))
            .map_err(|e| self.boundary("complete_trip", e))?;
        if let Some(vehicle) = done.released {
            self.observer.on_vehicle_released(vehicle, trip);
        }
        Ok(done.trip)
    }

    pub fn cancel_trip(&self, trip: TripId) -> DispatchResult<Trip> {
        let done = self
            .guard
            .retrying("cancel_trip", None, || self.trips.cancel(trip))
            .map_err(|e| self.boundary("cancel_trip", e))?;
        if let Some(vehicle) = done.released {
            self.observer.on_vehicle_released(vehicle, trip);
        }
        Ok(done.trip)
    }

    pub fn trip_history(&self, filter: &TripFilter) -> DispatchResult<Page<Trip>> {
        self.guard
            .retrying("trip_history", None, || self.trips.history(filter))
            .map_err(|e| self.boundary("trip_history", e))
    }

    pub fn audit_trail(&self, trip: TripId) -> DispatchResult<Vec<AuditLogEntry>> {
        self.guard
            .retrying("audit_trail", None, || self.trips.audit_trail(trip))
            .map_err(|e| self.boundary("audit_trail", e))
    }

    // ── Queues ────────────────────────────────────────────────────────────

    /// Renumber `class` to `1..n`.
    pub fn repair_queue(&self, class: CapacityClass) -> DispatchResult<RepairReport> {
        let updated = self
            .guard
            .retrying("repair_queue", None, || self.repairer.repair(class))
            .map_err(|e| self.boundary("repair_queue", e))?;
        let report = RepairReport { class, updated };
        if updated > 0 {
            self.observer.on_repaired(&report);
        }
        Ok(report)
    }

    /// Put a registered vehicle at the tail of its class's queue and return
    /// its position.
    pub fn enqueue_vehicle(&self, vehicle: VehicleId) -> DispatchResult<u32> {
        let class = self.registered_class(vehicle)?;
        self.guard
            .once("enqueue_vehicle", None, || self.queues.enqueue(class, vehicle))
            .map_err(|e| self.boundary("enqueue_vehicle", e))
    }

    /// Take a vehicle out of its queue (operator action) and close the gap.
    /// Returns `false` if it was not queued.
    pub fn withdraw_vehicle(&self, vehicle: VehicleId) -> DispatchResult<bool> {
        let class = self.registered_class(vehicle)?;
        let removed = self
            .guard
            .retrying("withdraw_vehicle", None, || self.queues.remove_by_id(class, vehicle))
            .map_err(|e| self.boundary("withdraw_vehicle", e))?;
        if removed {
            tracing::info!(%vehicle, %class, "vehicle withdrawn");
            self.repair_quietly(class, None);
        }
        Ok(removed)
    }

    /// Waiting vehicles of `class` in dispatch order.
    pub fn queue(&self, class: CapacityClass) -> DispatchResult<Vec<QueueEntry>> {
        self.guard
            .retrying("list_queue", None, || self.queues.list_by_class(class))
            .map_err(|e| self.boundary("list_queue", e))
    }

    pub fn breaker_state(&self) -> BreakerState {
        self.guard.breaker().state()
    }

    pub fn policy(&self) -> &AllocationPolicy {
        &self.policy
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    // ── Internal ──────────────────────────────────────────────────────────

    fn boundary<E: Boundary>(&self, operation: &'static str, err: GuardError<E>) -> DispatchError {
        err.at_boundary(operation, self.policy.max_capacity())
    }

    /// Dequeue from each class in order; first hit wins.
    fn first_waiting(&self, classes: &[CapacityClass], deadline: Deadline) -> DispatchResult<Option<QueueEntry>> {
        for &class in classes {
            let head = self
                .guard
                .retrying("dequeue_head", Some(deadline), || {
                    rank_store::within(deadline, || self.queues.dequeue_head(class))
                })
                .map_err(|e| self.boundary("dequeue_head", e))?;
            if head.is_some() {
                return Ok(head);
            }
        }
        Ok(None)
    }

    fn assigned(
        &self,
        entry:     &QueueEntry,
        requested: CapacityClass,
        trip:      TripId,
        deadline:  Deadline,
    ) -> Assignment {
        let reason = Assignment::upgrade_reason(requested, entry.class);
        let assignment = Assignment {
            vehicle:         entry.vehicle,
            trip,
            assigned_class:  entry.class,
            requested_class: requested,
            queue_position:  entry.position,
            upgraded:        reason.is_some(),
            reason,
        };
        tracing::info!(
            trip = %trip,
            vehicle = %entry.vehicle,
            class = %entry.class,
            upgraded = assignment.upgraded,
            "vehicle assigned",
        );
        self.observer.on_assigned(&assignment);
        if self.config.repair_after_dequeue {
            self.repair_quietly(entry.class, Some(deadline));
        }
        assignment
    }

    fn unavailable(&self, passengers: u8, searched: &[CapacityClass]) -> DispatchError {
        tracing::info!(passengers, classes = searched.len(), "no vehicle available");
        self.observer.on_unavailable(passengers);
        let message = match searched {
            [only] => format!(
                "No {only} is waiting for a party of {passengers}. Please try again in a few minutes."
            ),
            [first, .., last] => format!(
                "No vehicle from {first} to {last} is waiting for a party of {passengers}. \
                 Please try again in a few minutes."
            ),
            [] => format!("No vehicle is waiting for a party of {passengers}."),
        };
        DispatchError::NoAvailableVehicle { message }
    }

    /// Put a dequeued vehicle back at the head of its class.  Runs once,
    /// outside the breaker.
    fn compensate(&self, entry: &QueueEntry, original: DispatchError) -> DispatchError {
        match self.queues.restore_head(entry) {
            Ok(restored) => {
                tracing::warn!(vehicle = %entry.vehicle, class = %entry.class, error = %original, "assignment rolled back");
                self.observer.on_compensated(&restored);
                original
            }
            Err(err) => {
                tracing::error!(vehicle = %entry.vehicle, class = %entry.class, error = %err, "vehicle could not be restored to its queue");
                let compensation = err.at_boundary("restore_head", self.policy.max_capacity());
                DispatchError::CompensationFailed {
                    original:     Box::new(original),
                    compensation: Box::new(compensation),
                }
            }
        }
    }

    /// Repair whose failure is logged and dropped.  With a deadline the
    /// repair gives up when it passes, leaving the gap for the next repair.
    fn repair_quietly(&self, class: CapacityClass, deadline: Option<Deadline>) {
        let repaired = self.guard.retrying("repair_queue", deadline, || match deadline {
            Some(deadline) => rank_store::within(deadline, || self.repairer.repair(class)),
            None => self.repairer.repair(class),
        });
        match repaired {
            Ok(0) => {}
            Ok(updated) => self.observer.on_repaired(&RepairReport { class, updated }),
            Err(err) => tracing::warn!(%class, error = %err, "queue repair failed; positions left as they are"),
        }
    }

    fn registered_class(&self, vehicle: VehicleId) -> DispatchResult<CapacityClass> {
        let record = self
            .guard
            .retrying("get_vehicle", None, || self.storage.vehicle(vehicle))
            .map_err(|e| self.boundary("get_vehicle", e))?
            .ok_or_else(|| DispatchError::VehicleRejected {
                vehicle,
                reason: format!("{vehicle} is not in the fleet registry"),
            })?;
        if !self.policy.classes().contains(record.class) {
            return Err(DispatchError::VehicleRejected {
                vehicle,
                reason: format!("{} is not served at this rank", record.class),
            });
        }
        Ok(record.class)
    }
}
