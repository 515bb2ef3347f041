//! Engine observer trait for metrics, notifications and logging sinks.

use rank_core::{QueueEntry, TripId, VehicleId};

use crate::{Assignment, RepairReport};

/// Callbacks invoked by [`DispatchEngine`][crate::DispatchEngine] after the
/// corresponding storage write has committed.
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about.  The engine is shared across threads,
/// so callbacks take `&self` and may run concurrently.
///
/// # Example: re-queue released vehicles
///
/// ```rust,ignore
/// struct Requeue(Sender<VehicleId>);
///
/// impl DispatchObserver for Requeue {
///     fn on_vehicle_released(&self, vehicle: VehicleId, _trip: TripId) {
///         let _ = self.0.send(vehicle);
///     }
/// }
/// ```
pub trait DispatchObserver: Send + Sync {
    fn on_assigned(&self, _assignment: &Assignment) {}

    /// Every searched class was empty.
    fn on_unavailable(&self, _passengers: u8) {}

    /// A completed or cancelled trip freed its vehicle.
    fn on_vehicle_released(&self, _vehicle: VehicleId, _trip: TripId) {}

    /// A dequeued vehicle was put back after the assignment failed.
    fn on_compensated(&self, _restored: &QueueEntry) {}

    /// A repair moved at least one entry.
    fn on_repaired(&self, _report: &RepairReport) {}
}

/// A [`DispatchObserver`] that does nothing.
pub struct NoopObserver;

impl DispatchObserver for NoopObserver {}

/// Lets the caller keep a handle on an observer the engine also owns.
impl<T: DispatchObserver + ?Sized> DispatchObserver for std::sync::Arc<T> {
    fn on_assigned(&self, assignment: &Assignment) {
        (**self).on_assigned(assignment);
    }

    fn on_unavailable(&self, passengers: u8) {
        (**self).on_unavailable(passengers);
    }

    fn on_vehicle_released(&self, vehicle: VehicleId, trip: TripId) {
        (**self).on_vehicle_released(vehicle, trip);
    }

    fn on_compensated(&self, restored: &QueueEntry) {
        (**self).on_compensated(restored);
    }

    fn on_repaired(&self, report: &RepairReport) {
        (**self).on_repaired(report);
    }
}
