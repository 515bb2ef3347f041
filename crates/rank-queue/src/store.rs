//! `QueueStore` — the only writer of queue entries.

use std::sync::Arc;

use rank_core::{CapacityClass, Clock, QueueEntry, VehicleId};
use rank_store::Storage;

use crate::{QueueError, QueueResult};

/// Per-class FIFO queues over a shared [`Storage`] handle.
///
/// Cheap to clone; clones share the same storage and clock.
pub struct QueueStore<S: Storage + ?Sized> {
    storage: Arc<S>,
    clock:   Arc<dyn Clock>,
}

impl<S: Storage + ?Sized> Clone for QueueStore<S> {
    fn clone(&self) -> Self {
        Self { storage: Arc::clone(&self.storage), clock: Arc::clone(&self.clock) }
    }
}

impl<S: Storage + ?Sized> QueueStore<S> {
    pub fn new(storage: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Append `vehicle` at the tail of `class` and return its position.
    ///
    /// The vehicle must be registered, active, of exactly `class`, and not
    /// queued anywhere already.
    pub fn enqueue(&self, class: CapacityClass, vehicle: VehicleId) -> QueueResult<u32> {
        let record = self
            .storage
            .vehicle(vehicle)?
            .ok_or(QueueError::UnknownVehicle(vehicle))?;
        if !record.active {
            return Err(QueueError::InactiveVehicle(vehicle));
        }
        if record.class != class {
            return Err(QueueError::ClassMismatch { vehicle, registered: record.class, requested: class });
        }

        let entry = self.storage.append_entry(class, vehicle, self.clock.now())?;
        tracing::debug!(%class, %vehicle, position = entry.position, "vehicle enqueued");
        Ok(entry.position)
    }

    /// Remove and return the head of `class`, or `None` if no active vehicle
    /// is waiting.  Concurrent callers never receive the same entry.
    pub fn dequeue_head(&self, class: CapacityClass) -> QueueResult<Option<QueueEntry>> {
        Ok(self.storage.take_head(class)?)
    }

    /// Waiting entries of `class` in FIFO order, suspended vehicles left out.
    pub fn list_by_class(&self, class: CapacityClass) -> QueueResult<Vec<QueueEntry>> {
        Ok(self.storage.scan_class(class, true)?)
    }

    /// Every entry of `class` in FIFO order, suspended vehicles included.
    pub fn scan(&self, class: CapacityClass) -> QueueResult<Vec<QueueEntry>> {
        Ok(self.storage.scan_class(class, false)?)
    }

    /// Remove `vehicle` from `class`.  Later entries keep their positions.
    pub fn remove_by_id(&self, class: CapacityClass, vehicle: VehicleId) -> QueueResult<bool> {
        let removed = self.storage.delete_entry(class, vehicle)?;
        if removed {
            tracing::debug!(%class, %vehicle, "vehicle removed from queue");
        }
        Ok(removed)
    }

    /// Put a dequeued entry back at the head of its class, keeping its
    /// original enqueue time.  Returns the re-inserted entry.
    pub fn restore_head(&self, entry: &QueueEntry) -> QueueResult<QueueEntry> {
        let restored = self.storage.insert_head(entry)?;
        tracing::info!(class = %entry.class, vehicle = %entry.vehicle, "vehicle restored to queue head");
        Ok(restored)
    }
}
