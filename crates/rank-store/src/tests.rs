//! Tests for rank-store against on-disk and in-memory SQLite.

use rank_core::{
    AuditAction, AuditSubject, CapacityClass, NewAuditEntry, Timestamp, TripStatus, Vehicle,
    VehicleId,
};
use tempfile::TempDir;

use crate::{NewTrip, SqliteStorage, Storage};

// ── Fixtures ──────────────────────────────────────────────────────────────────

const FOUR: CapacityClass = CapacityClass(4);
const SIX: CapacityClass = CapacityClass(6);

fn on_disk() -> (TempDir, SqliteStorage) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = SqliteStorage::open(&dir.path().join("rank.db")).expect("open store");
    (dir, store)
}

fn memory() -> SqliteStorage {
    SqliteStorage::open_in_memory().expect("open in-memory store")
}

/// Register `ids` as active vehicles of `class` and queue them in order.
fn queue_vehicles(store: &SqliteStorage, class: CapacityClass, ids: &[i64]) {
    for (i, &id) in ids.iter().enumerate() {
        store.put_vehicle(&Vehicle::new(VehicleId(id), class)).unwrap();
        store.append_entry(class, VehicleId(id), Timestamp(1_000 + i as i64)).unwrap();
    }
}

fn new_trip(passengers: u8, status: TripStatus, created_at: i64) -> NewTrip {
    NewTrip {
        vehicle: None,
        passengers,
        destination: "Terminal 2".into(),
        status,
        created_at: Timestamp(created_at),
    }
}

// ── Schema / fleet ────────────────────────────────────────────────────────────

#[cfg(test)]
mod schema {
    use super::*;

    #[test]
    fn database_file_created() {
        let (dir, store) = on_disk();
        assert!(dir.path().join("rank.db").exists());
        assert_eq!(store.path(), Some(dir.path().join("rank.db").as_path()));
    }

    #[test]
    fn reopen_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rank.db");
        {
            let store = SqliteStorage::open(&path).unwrap();
            queue_vehicles(&store, FOUR, &[1, 2]);
        }
        let store = SqliteStorage::open(&path).unwrap();
        assert_eq!(store.scan_class(FOUR, false).unwrap().len(), 2);
    }

    #[test]
    fn vehicle_upsert_and_active_flag() {
        let store = memory();
        store.put_vehicle(&Vehicle::new(VehicleId(7), FOUR)).unwrap();
        store.put_vehicle(&Vehicle::new(VehicleId(7), SIX)).unwrap();
        assert_eq!(store.vehicle(VehicleId(7)).unwrap().unwrap().class, SIX);

        assert!(store.set_vehicle_active(VehicleId(7), false).unwrap());
        assert!(!store.vehicle(VehicleId(7)).unwrap().unwrap().active);
        assert!(!store.set_vehicle_active(VehicleId(99), false).unwrap());
        assert!(store.vehicle(VehicleId(99)).unwrap().is_none());
    }
}

// ── Queue ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod queue {
    use super::*;
    use crate::{PositionUpdate, StorageError};

    #[test]
    fn append_assigns_tail_positions() {
        let store = memory();
        queue_vehicles(&store, FOUR, &[1, 2, 3]);
        let positions: Vec<u32> = store.scan_class(FOUR, false).unwrap().iter().map(|e| e.position).collect();
        assert_eq!(positions, [1, 2, 3]);
    }

    #[test]
    fn classes_number_independently() {
        let store = memory();
        queue_vehicles(&store, FOUR, &[1, 2]);
        queue_vehicles(&store, SIX, &[3]);
        assert_eq!(store.scan_class(SIX, false).unwrap()[0].position, 1);
    }

    #[test]
    fn append_rejects_second_entry_for_vehicle() {
        let store = memory();
        queue_vehicles(&store, FOUR, &[1]);
        let err = store.append_entry(SIX, VehicleId(1), Timestamp(5_000)).unwrap_err();
        assert!(matches!(err, StorageError::AlreadyQueued(VehicleId(1))));
    }

    #[test]
    fn take_head_is_fifo() {
        let store = memory();
        queue_vehicles(&store, FOUR, &[10, 11, 12]);
        let taken: Vec<i64> = std::iter::from_fn(|| store.take_head(FOUR).unwrap())
            .map(|e| e.vehicle.0)
            .collect();
        assert_eq!(taken, [10, 11, 12]);
        assert!(store.take_head(FOUR).unwrap().is_none());
    }

    #[test]
    fn take_head_breaks_position_ties_by_enqueue_time() {
        let store = memory();
        queue_vehicles(&store, FOUR, &[1, 2]);
        let first = store.take_head(FOUR).unwrap().unwrap();
        // Vehicle 2 ends up level with the re-inserted head; the earlier enqueue wins.
        store.insert_head(&rank_core::QueueEntry { enqueued_at: Timestamp(9_999), ..first }).unwrap();
        let second = store.scan_class(FOUR, false).unwrap()[1].clone();
        store
            .update_positions(FOUR, &[PositionUpdate { entry: second.id, from: second.position, to: 1 }], None)
            .unwrap();
        assert_eq!(store.take_head(FOUR).unwrap().unwrap().vehicle, VehicleId(2));
    }

    #[test]
    fn take_head_skips_inactive_vehicles() {
        let store = memory();
        queue_vehicles(&store, FOUR, &[1, 2]);
        store.set_vehicle_active(VehicleId(1), false).unwrap();

        assert_eq!(store.take_head(FOUR).unwrap().unwrap().vehicle, VehicleId(2));
        assert!(store.take_head(FOUR).unwrap().is_none());
        // The inactive entry is still stored.
        assert_eq!(store.scan_class(FOUR, false).unwrap().len(), 1);
        assert!(store.scan_class(FOUR, true).unwrap().is_empty());
    }

    fn order(store: &SqliteStorage, class: CapacityClass) -> Vec<(i64, u32)> {
        store.scan_class(class, false).unwrap().iter().map(|e| (e.vehicle.0, e.position)).collect()
    }

    #[test]
    fn insert_head_returns_entry_to_its_slot() {
        let store = memory();
        queue_vehicles(&store, FOUR, &[1, 2, 3]);
        let head = store.take_head(FOUR).unwrap().unwrap();
        let restored = store.insert_head(&head).unwrap();

        assert_eq!(restored.position, 1);
        assert_eq!(restored.enqueued_at, head.enqueued_at);
        assert_eq!(order(&store, FOUR), [(1, 1), (2, 2), (3, 3)]);
    }

    #[test]
    fn insert_head_after_renumbering_shifts_class() {
        let store = memory();
        queue_vehicles(&store, FOUR, &[1, 2, 3]);
        let head = store.take_head(FOUR).unwrap().unwrap();
        let rest = store.scan_class(FOUR, false).unwrap();
        let updates: Vec<PositionUpdate> = rest
            .iter()
            .zip(1u32..)
            .map(|(e, to)| PositionUpdate { entry: e.id, from: e.position, to })
            .collect();
        store.update_positions(FOUR, &updates, None).unwrap();

        assert_eq!(store.insert_head(&head).unwrap().position, 1);
        assert_eq!(order(&store, FOUR), [(1, 1), (2, 2), (3, 3)]);
    }

    #[test]
    fn insert_head_into_empty_class_starts_at_one() {
        let store = memory();
        queue_vehicles(&store, FOUR, &[1]);
        let mut head = store.take_head(FOUR).unwrap().unwrap();
        head.position = 3;
        assert_eq!(store.insert_head(&head).unwrap().position, 1);
        assert_eq!(order(&store, FOUR), [(1, 1)]);
    }

    #[test]
    fn delete_entry_leaves_gap() {
        let store = memory();
        queue_vehicles(&store, FOUR, &[1, 2, 3]);
        assert!(store.delete_entry(FOUR, VehicleId(2)).unwrap());
        assert!(!store.delete_entry(FOUR, VehicleId(2)).unwrap());
        let positions: Vec<u32> = store.scan_class(FOUR, false).unwrap().iter().map(|e| e.position).collect();
        assert_eq!(positions, [1, 3]);
    }

    #[test]
    fn update_positions_applies_batch_with_audit() {
        let store = memory();
        queue_vehicles(&store, FOUR, &[1, 2, 3]);
        store.delete_entry(FOUR, VehicleId(1)).unwrap();
        let scan = store.scan_class(FOUR, false).unwrap();
        let updates: Vec<PositionUpdate> = scan
            .iter()
            .enumerate()
            .map(|(i, e)| PositionUpdate { entry: e.id, from: e.position, to: i as u32 + 1 })
            .collect();
        let audit = NewAuditEntry {
            action:  AuditAction::QueueRepaired,
            subject: AuditSubject::Queue(FOUR),
            at:      Timestamp(2_000),
            detail:  serde_json::json!({ "updated": 2 }),
        };

        assert_eq!(store.update_positions(FOUR, &updates, Some(&audit)).unwrap(), 2);
        let positions: Vec<u32> = store.scan_class(FOUR, false).unwrap().iter().map(|e| e.position).collect();
        assert_eq!(positions, [1, 2]);
        let log = store.audit_log(Some(AuditSubject::Queue(FOUR))).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].detail["updated"], 2);
    }

    #[test]
    fn update_positions_conflict_rolls_back() {
        let store = memory();
        queue_vehicles(&store, FOUR, &[1, 2, 3]);
        let scan = store.scan_class(FOUR, false).unwrap();
        let updates = [
            PositionUpdate { entry: scan[1].id, from: 2, to: 5 },
            // Stale: entry 3 is at position 3, not 7.
            PositionUpdate { entry: scan[2].id, from: 7, to: 6 },
        ];
        let audit = NewAuditEntry {
            action:  AuditAction::QueueRepaired,
            subject: AuditSubject::Queue(FOUR),
            at:      Timestamp(2_000),
            detail:  serde_json::Value::Null,
        };

        let err = store.update_positions(FOUR, &updates, Some(&audit)).unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
        let positions: Vec<u32> = store.scan_class(FOUR, false).unwrap().iter().map(|e| e.position).collect();
        assert_eq!(positions, [1, 2, 3]);
        assert!(store.audit_log(None).unwrap().is_empty());
    }

    #[test]
    fn concurrent_take_head_hands_out_each_entry_once() {
        let (_dir, store) = on_disk();
        let ids: Vec<i64> = (1..=8).collect();
        queue_vehicles(&store, FOUR, &ids);

        let mut taken: Vec<i64> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..16)
                .map(|_| s.spawn(|| store.take_head(FOUR).unwrap().map(|e| e.vehicle.0)))
                .collect();
            handles.into_iter().filter_map(|h| h.join().unwrap()).collect()
        });
        taken.sort_unstable();
        assert_eq!(taken, ids);
    }
}

// ── Trips / audit ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod trips {
    use super::*;
    use crate::{TripQuery, TripTransition};

    #[test]
    fn insert_and_read_back() {
        let store = memory();
        let trip = store.insert_trip(&new_trip(3, TripStatus::Pending, 100)).unwrap();
        assert_eq!(store.trip(trip.id).unwrap(), Some(trip.clone()));
        assert_eq!(trip.completed_at, None);
        assert!(store.trip(rank_core::TripId(trip.id.0 + 1)).unwrap().is_none());
    }

    #[test]
    fn transition_is_compare_and_set() {
        let store = memory();
        let trip = store.insert_trip(&new_trip(2, TripStatus::Pending, 100)).unwrap();
        let attach = TripTransition {
            trip:         trip.id,
            from:         TripStatus::Pending,
            to:           TripStatus::Assigned,
            vehicle:      Some(VehicleId(5)),
            completed_at: None,
            audit:        None,
        };
        assert!(store.transition_trip(&attach).unwrap());
        // Second attempt sees `Assigned`, not `Pending`.
        assert!(!store.transition_trip(&attach).unwrap());

        let stored = store.trip(trip.id).unwrap().unwrap();
        assert_eq!(stored.status, TripStatus::Assigned);
        assert_eq!(stored.vehicle, Some(VehicleId(5)));
    }

    #[test]
    fn failed_transition_writes_no_audit() {
        let store = memory();
        let trip = store.insert_trip(&new_trip(2, TripStatus::Assigned, 100)).unwrap();
        let complete = TripTransition {
            trip:         trip.id,
            from:         TripStatus::InProgress,
            to:           TripStatus::Completed,
            vehicle:      None,
            completed_at: Some(Timestamp(500)),
            audit:        Some(NewAuditEntry {
                action:  AuditAction::TripCompleted,
                subject: AuditSubject::Trip(trip.id),
                at:      Timestamp(500),
                detail:  serde_json::Value::Null,
            }),
        };
        assert!(!store.transition_trip(&complete).unwrap());
        assert!(store.audit_log(Some(AuditSubject::Trip(trip.id))).unwrap().is_empty());
        assert_eq!(store.trip(trip.id).unwrap().unwrap().completed_at, None);
    }

    #[test]
    fn completion_sets_timestamp_and_audit() {
        let store = memory();
        let trip = store.insert_trip(&new_trip(2, TripStatus::InProgress, 100)).unwrap();
        let complete = TripTransition {
            trip:         trip.id,
            from:         TripStatus::InProgress,
            to:           TripStatus::Completed,
            vehicle:      None,
            completed_at: Some(Timestamp(500)),
            audit:        Some(NewAuditEntry {
                action:  AuditAction::TripCompleted,
                subject: AuditSubject::Trip(trip.id),
                at:      Timestamp(500),
                detail:  serde_json::json!({ "from": "in_progress" }),
            }),
        };
        assert!(store.transition_trip(&complete).unwrap());

        let stored = store.trip(trip.id).unwrap().unwrap();
        assert_eq!(stored.completed_at, Some(Timestamp(500)));
        let log = store.audit_log(Some(AuditSubject::Trip(trip.id))).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].action, AuditAction::TripCompleted);
        assert_eq!(log[0].detail["from"], "in_progress");
    }

    #[test]
    fn audit_subjects_do_not_collide() {
        let store = memory();
        // Trip 4 and the 4-seater queue share the numeric key 4.
        for _ in 0..4 {
            store.insert_trip(&new_trip(1, TripStatus::InProgress, 100)).unwrap();
        }
        let trip = rank_core::TripId(4);
        store
            .transition_trip(&TripTransition {
                trip,
                from:         TripStatus::InProgress,
                to:           TripStatus::Cancelled,
                vehicle:      None,
                completed_at: None,
                audit:        Some(NewAuditEntry {
                    action:  AuditAction::TripCancelled,
                    subject: AuditSubject::Trip(trip),
                    at:      Timestamp(200),
                    detail:  serde_json::Value::Null,
                }),
            })
            .unwrap();
        assert!(store.audit_log(Some(AuditSubject::Queue(FOUR))).unwrap().is_empty());
        assert_eq!(store.audit_log(Some(AuditSubject::Trip(trip))).unwrap().len(), 1);
    }

    #[test]
    fn page_filters_orders_and_counts() {
        let store = memory();
        for t in 0..10 {
            let status = if t % 2 == 0 { TripStatus::Completed } else { TripStatus::Cancelled };
            store.insert_trip(&new_trip(1, status, 1_000 + t)).unwrap();
        }

        let all = store.trip_page(&TripQuery { limit: 3, ..TripQuery::default() }).unwrap();
        assert_eq!(all.total, 10);
        let created: Vec<i64> = all.trips.iter().map(|t| t.created_at.0).collect();
        assert_eq!(created, [1_009, 1_008, 1_007]);

        let completed = store
            .trip_page(&TripQuery {
                status: Some(TripStatus::Completed),
                limit: 10,
                offset: 1,
                ..TripQuery::default()
            })
            .unwrap();
        assert_eq!(completed.total, 5);
        assert_eq!(completed.trips.len(), 4);
        assert!(completed.trips.iter().all(|t| t.status == TripStatus::Completed));

        let window = store
            .trip_page(&TripQuery {
                created_from: Some(Timestamp(1_002)),
                created_to: Some(Timestamp(1_005)),
                limit: 10,
                ..TripQuery::default()
            })
            .unwrap();
        assert_eq!(window.total, 3);
        let created: Vec<i64> = window.trips.iter().map(|t| t.created_at.0).collect();
        assert_eq!(created, [1_004, 1_003, 1_002]);
    }

    #[test]
    fn page_past_the_end_is_empty_with_total() {
        let store = memory();
        store.insert_trip(&new_trip(1, TripStatus::Pending, 1)).unwrap();
        let page = store.trip_page(&TripQuery { limit: 5, offset: 5, ..TripQuery::default() }).unwrap();
        assert!(page.trips.is_empty());
        assert_eq!(page.total, 1);
    }
}

// ── Classification ────────────────────────────────────────────────────────────

#[cfg(test)]
mod classify {
    use rank_resilience::{Classify, FaultKind};

    use super::*;
    use crate::StorageError;

    #[test]
    fn error_kinds() {
        assert_eq!(StorageError::Unavailable("down".into()).fault_kind(), FaultKind::Transient);
        assert_eq!(StorageError::Conflict("moved").fault_kind(), FaultKind::Contended);
        assert_eq!(StorageError::AlreadyQueued(VehicleId(1)).fault_kind(), FaultKind::Domain);
        let busy = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert_eq!(StorageError::Sqlite(busy).fault_kind(), FaultKind::Transient);
        assert_eq!(
            StorageError::Sqlite(rusqlite::Error::InvalidQuery).fault_kind(),
            FaultKind::Permanent,
        );
    }
}

// ── Deadlines ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod budget {
    use std::time::{Duration, Instant};

    use rank_core::Deadline;
    use rank_resilience::{Classify, FaultKind};

    use super::*;
    use crate::within;

    /// A second connection holding the write lock.
    fn lock_database(store: &SqliteStorage) -> rusqlite::Connection {
        let blocker = rusqlite::Connection::open(store.path().unwrap()).unwrap();
        blocker.execute_batch("BEGIN IMMEDIATE").unwrap();
        blocker
    }

    #[test]
    fn deadline_caps_busy_wait() {
        let (_dir, store) = on_disk();
        queue_vehicles(&store, FOUR, &[1]);
        let _blocker = lock_database(&store);

        let started = Instant::now();
        let err = within(Deadline::after(Duration::from_millis(100)), || store.take_head(FOUR)).unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(2), "waited {:?}", started.elapsed());
        assert_eq!(err.fault_kind(), FaultKind::Transient);
    }

    #[test]
    fn deadline_ends_with_its_scope() {
        let (_dir, store) = on_disk();
        queue_vehicles(&store, FOUR, &[1]);
        within(Deadline::after(Duration::ZERO), || ());

        let blocker = lock_database(&store);
        let head = std::thread::scope(|s| {
            s.spawn(move || {
                std::thread::sleep(Duration::from_millis(200));
                blocker.execute_batch("COMMIT").unwrap();
            });
            store.take_head(FOUR).unwrap()
        });
        assert_eq!(head.map(|e| e.vehicle), Some(VehicleId(1)));
    }

    #[test]
    fn nested_scope_keeps_earlier_deadline() {
        let (_dir, store) = on_disk();
        queue_vehicles(&store, FOUR, &[1]);
        let _blocker = lock_database(&store);

        let started = Instant::now();
        let out = within(Deadline::after(Duration::from_millis(100)), || {
            within(Deadline::after(Duration::from_secs(30)), || store.take_head(FOUR))
        });
        assert!(out.is_err());
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
