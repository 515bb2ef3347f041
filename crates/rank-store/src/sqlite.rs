//! Embedded SQLite adapter.
//!
//! One database file holds the four tables listed in the crate docs.  The
//! adapter keeps a fixed set of connections; the pool mutex is held only to
//! check a connection out or back in, never across a statement.  Every
//! read-modify-write runs in a `BEGIN IMMEDIATE` transaction so the write
//! lock is taken up front and concurrent writers queue on SQLite's busy
//! handler instead of failing mid-transaction.

use std::path::{Path, PathBuf};
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

use rank_core::{
    AuditAction, AuditId, AuditLogEntry, AuditSubject, CapacityClass, EntryId, NewAuditEntry,
    QueueEntry, Timestamp, Trip, TripId, TripStatus, Vehicle, VehicleId,
};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

use crate::budget;
use crate::storage::{NewTrip, PositionUpdate, Storage, TripQuery, TripSlice, TripTransition};
use crate::{StorageError, StorageResult};

/// Connections opened by [`SqliteStorage::open`].
pub const DEFAULT_POOL_SIZE: usize = 4;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS vehicles (
        id     INTEGER PRIMARY KEY,
        class  INTEGER NOT NULL CHECK (class > 0),
        active INTEGER NOT NULL DEFAULT 1
    );
    CREATE TABLE IF NOT EXISTS queue_entries (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        vehicle_id  INTEGER NOT NULL UNIQUE REFERENCES vehicles (id),
        class       INTEGER NOT NULL,
        position    INTEGER NOT NULL CHECK (position >= 1),
        enqueued_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS queue_entries_fifo
        ON queue_entries (class, position, enqueued_at);
    CREATE TABLE IF NOT EXISTS trips (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        vehicle_id   INTEGER,
        passengers   INTEGER NOT NULL CHECK (passengers >= 1),
        destination  TEXT    NOT NULL,
        status       TEXT    NOT NULL,
        created_at   INTEGER NOT NULL,
        completed_at INTEGER
    );
    CREATE INDEX IF NOT EXISTS trips_status  ON trips (status);
    CREATE INDEX IF NOT EXISTS trips_created ON trips (created_at);
    CREATE TABLE IF NOT EXISTS audit_log (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        action      TEXT    NOT NULL,
        entity_kind TEXT    NOT NULL,
        entity_id   INTEGER NOT NULL,
        at          INTEGER NOT NULL,
        detail      TEXT    NOT NULL
    );
    CREATE INDEX IF NOT EXISTS audit_log_at     ON audit_log (at);
    CREATE INDEX IF NOT EXISTS audit_log_entity ON audit_log (entity_kind, entity_id);
";

const ENTRY_COLUMNS: &str = "id, vehicle_id, class, position, enqueued_at";
const TRIP_COLUMNS: &str =
    "id, vehicle_id, passengers, destination, status, created_at, completed_at";

// ── Connection pool ───────────────────────────────────────────────────────────

struct Pool {
    idle:      Mutex<Vec<Connection>>,
    available: Condvar,
}

/// A checked-out connection; returned to the pool on drop.
struct Lease<'a> {
    pool: &'a Pool,
    conn: Option<Connection>,
}

impl Pool {
    fn new(conns: Vec<Connection>) -> Self {
        Self { idle: Mutex::new(conns), available: Condvar::new() }
    }

    fn lease(&self, wait: Duration) -> StorageResult<Lease<'_>> {
        let idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut idle, _) = self
            .available
            .wait_timeout_while(idle, wait, |idle| idle.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        match idle.pop() {
            Some(conn) => Ok(Lease { pool: self, conn: Some(conn) }),
            None => Err(StorageError::Unavailable("connection pool exhausted".into())),
        }
    }
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool
                .idle
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(conn);
            self.pool.available.notify_one();
        }
    }
}

// ── SqliteStorage ─────────────────────────────────────────────────────────────

/// [`Storage`] over an SQLite database file (or a private in-memory database).
pub struct SqliteStorage {
    pool: Pool,
    path: Option<PathBuf>,
}

impl SqliteStorage {
    /// Open (or create) the database at `path` with [`DEFAULT_POOL_SIZE`]
    /// connections and initialise the schema.
    pub fn open(path: &Path) -> StorageResult<Self> {
        Self::open_with(path, DEFAULT_POOL_SIZE)
    }

    /// Like [`open`][Self::open] with an explicit pool size (minimum 1).
    pub fn open_with(path: &Path, pool_size: usize) -> StorageResult<Self> {
        let first = Connection::open(path)?;
        first.pragma_update(None, "journal_mode", "WAL")?;
        configure(&first)?;
        first.execute_batch(SCHEMA)?;

        let mut conns = Vec::with_capacity(pool_size.max(1));
        conns.push(first);
        for _ in 1..pool_size {
            let conn = Connection::open(path)?;
            configure(&conn)?;
            conns.push(conn);
        }

        tracing::info!(path = %path.display(), connections = conns.len(), "opened rank store");
        Ok(Self { pool: Pool::new(conns), path: Some(path.to_path_buf()) })
    }

    /// A private in-memory database.  Holds a single connection, so every
    /// call is serialised.
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        configure(&conn)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { pool: Pool::new(vec![conn]), path: None })
    }

    /// Database file, or `None` for an in-memory store.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run `f` on a pooled connection.  Both the pool wait and SQLite's
    /// busy handler are capped by the deadline installed with
    /// [`within`][crate::within], if any.
    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> StorageResult<T>) -> StorageResult<T> {
        let mut lease = self.pool.lease(budget::wait_budget(BUSY_TIMEOUT))?;
        let Some(conn) = lease.conn.as_mut() else {
            return Err(StorageError::Unavailable("empty connection lease".into()));
        };
        conn.busy_timeout(budget::wait_budget(BUSY_TIMEOUT))?;
        f(conn)
    }
}

fn configure(conn: &Connection) -> StorageResult<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA synchronous  = NORMAL;",
    )?;
    Ok(())
}

// ── Row decoding ──────────────────────────────────────────────────────────────

fn bad_column<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<QueueEntry> {
    Ok(QueueEntry {
        id:          EntryId(row.get(0)?),
        vehicle:     VehicleId(row.get(1)?),
        class:       CapacityClass(row.get(2)?),
        position:    row.get(3)?,
        enqueued_at: Timestamp(row.get(4)?),
    })
}

fn trip_from_row(row: &Row<'_>) -> rusqlite::Result<Trip> {
    let status: String = row.get(4)?;
    Ok(Trip {
        id:           TripId(row.get(0)?),
        vehicle:      row.get::<_, Option<i64>>(1)?.map(VehicleId),
        passengers:   row.get(2)?,
        destination:  row.get(3)?,
        status:       status.parse::<TripStatus>().map_err(|e| bad_column(4, e))?,
        created_at:   Timestamp(row.get(5)?),
        completed_at: row.get::<_, Option<i64>>(6)?.map(Timestamp),
    })
}

fn audit_from_row(row: &Row<'_>) -> rusqlite::Result<AuditLogEntry> {
    let action: String = row.get(1)?;
    let kind: String = row.get(2)?;
    let detail: String = row.get(5)?;
    Ok(AuditLogEntry {
        id:      AuditId(row.get(0)?),
        action:  action.parse::<AuditAction>().map_err(|e| bad_column(1, e))?,
        subject: AuditSubject::from_parts(&kind, row.get(3)?).map_err(|e| bad_column(2, e))?,
        at:      Timestamp(row.get(4)?),
        detail:  serde_json::from_str(&detail).map_err(|e| bad_column(5, e))?,
    })
}

fn append_audit(conn: &Connection, entry: &NewAuditEntry) -> StorageResult<()> {
    let detail = serde_json::to_string(&entry.detail)?;
    conn.prepare_cached(
        "INSERT INTO audit_log (action, entity_kind, entity_id, at, detail) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?
    .execute(params![
        entry.action.as_str(),
        entry.subject.kind(),
        entry.subject.key(),
        entry.at.0,
        detail,
    ])?;
    Ok(())
}

fn is_queued(conn: &Connection, vehicle: VehicleId) -> StorageResult<bool> {
    let found = conn
        .prepare_cached("SELECT 1 FROM queue_entries WHERE vehicle_id = ?1")?
        .query_row(params![vehicle.0], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

// ── Storage impl ──────────────────────────────────────────────────────────────

impl Storage for SqliteStorage {
    fn put_vehicle(&self, vehicle: &Vehicle) -> StorageResult<()> {
        self.with_conn(|conn| {
            conn.prepare_cached(
                "INSERT INTO vehicles (id, class, active) VALUES (?1, ?2, ?3) \
                 ON CONFLICT (id) DO UPDATE SET class = excluded.class, active = excluded.active",
            )?
            .execute(params![vehicle.id.0, vehicle.class.0, vehicle.active])?;
            Ok(())
        })
    }

    fn vehicle(&self, id: VehicleId) -> StorageResult<Option<Vehicle>> {
        self.with_conn(|conn| {
            let vehicle = conn
                .prepare_cached("SELECT id, class, active FROM vehicles WHERE id = ?1")?
                .query_row(params![id.0], |row| {
                    Ok(Vehicle {
                        id:     VehicleId(row.get(0)?),
                        class:  CapacityClass(row.get(1)?),
                        active: row.get(2)?,
                    })
                })
                .optional()?;
            Ok(vehicle)
        })
    }

    fn set_vehicle_active(&self, id: VehicleId, active: bool) -> StorageResult<bool> {
        self.with_conn(|conn| {
            let changed = conn
                .prepare_cached("UPDATE vehicles SET active = ?2 WHERE id = ?1")?
                .execute(params![id.0, active])?;
            Ok(changed > 0)
        })
    }

    fn append_entry(
        &self,
        class:   CapacityClass,
        vehicle: VehicleId,
        at:      Timestamp,
    ) -> StorageResult<QueueEntry> {
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            if is_queued(&tx, vehicle)? {
                return Err(StorageError::AlreadyQueued(vehicle));
            }
            let (id, position): (i64, u32) = tx
                .prepare_cached(
                    "INSERT INTO queue_entries (vehicle_id, class, position, enqueued_at) \
                     SELECT ?1, ?2, COALESCE(MAX(position), 0) + 1, ?3 \
                     FROM queue_entries WHERE class = ?2 \
                     RETURNING id, position",
                )?
                .query_row(params![vehicle.0, class.0, at.0], |row| Ok((row.get(0)?, row.get(1)?)))?;
            tx.commit()?;
            Ok(QueueEntry { id: EntryId(id), vehicle, class, position, enqueued_at: at })
        })
    }

    fn insert_head(&self, entry: &QueueEntry) -> StorageResult<QueueEntry> {
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            if is_queued(&tx, entry.vehicle)? {
                return Err(StorageError::AlreadyQueued(entry.vehicle));
            }
            let first: Option<u32> = tx
                .prepare_cached("SELECT MIN(position) FROM queue_entries WHERE class = ?1")?
                .query_row(params![entry.class.0], |row| row.get(0))?;
            let position = entry.position.min(first.unwrap_or(1));
            if first == Some(position) {
                tx.prepare_cached(
                    "UPDATE queue_entries SET position = position + 1 WHERE class = ?1 AND position >= ?2",
                )?
                .execute(params![entry.class.0, position])?;
            }
            let id: i64 = tx
                .prepare_cached(
                    "INSERT INTO queue_entries (vehicle_id, class, position, enqueued_at) \
                     VALUES (?1, ?2, ?3, ?4) RETURNING id",
                )?
                .query_row(
                    params![entry.vehicle.0, entry.class.0, position, entry.enqueued_at.0],
                    |row| row.get(0),
                )?;
            tx.commit()?;
            Ok(QueueEntry { id: EntryId(id), position, ..entry.clone() })
        })
    }

    fn take_head(&self, class: CapacityClass) -> StorageResult<Option<QueueEntry>> {
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let head = tx
                .prepare_cached(&format!(
                    "DELETE FROM queue_entries WHERE id = ( \
                         SELECT q.id FROM queue_entries q \
                         JOIN vehicles v ON v.id = q.vehicle_id \
                         WHERE q.class = ?1 AND v.active = 1 \
                         ORDER BY q.position, q.enqueued_at, q.id LIMIT 1 \
                     ) RETURNING {ENTRY_COLUMNS}"
                ))?
                .query_row(params![class.0], entry_from_row)
                .optional()?;
            tx.commit()?;
            if let Some(entry) = &head {
                tracing::debug!(%class, vehicle = %entry.vehicle, position = entry.position, "took queue head");
            }
            Ok(head)
        })
    }

    fn delete_entry(&self, class: CapacityClass, vehicle: VehicleId) -> StorageResult<bool> {
        self.with_conn(|conn| {
            let changed = conn
                .prepare_cached("DELETE FROM queue_entries WHERE class = ?1 AND vehicle_id = ?2")?
                .execute(params![class.0, vehicle.0])?;
            Ok(changed > 0)
        })
    }

    fn scan_class(&self, class: CapacityClass, active_only: bool) -> StorageResult<Vec<QueueEntry>> {
        let sql = if active_only {
            "SELECT q.id, q.vehicle_id, q.class, q.position, q.enqueued_at \
             FROM queue_entries q JOIN vehicles v ON v.id = q.vehicle_id \
             WHERE q.class = ?1 AND v.active = 1 \
             ORDER BY q.position, q.enqueued_at, q.id"
        } else {
            "SELECT id, vehicle_id, class, position, enqueued_at \
             FROM queue_entries WHERE class = ?1 \
             ORDER BY position, enqueued_at, id"
        };
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(sql)?;
            let entries = stmt
                .query_map(params![class.0], entry_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(entries)
        })
    }

    fn update_positions(
        &self,
        class:   CapacityClass,
        updates: &[PositionUpdate],
        audit:   Option<&NewAuditEntry>,
    ) -> StorageResult<usize> {
        if updates.is_empty() && audit.is_none() {
            return Ok(0);
        }
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            {
                let mut stmt = tx.prepare_cached(
                    "UPDATE queue_entries SET position = ?4 \
                     WHERE id = ?1 AND class = ?2 AND position = ?3",
                )?;
                for update in updates {
                    let changed = stmt.execute(params![update.entry.0, class.0, update.from, update.to])?;
                    if changed == 0 {
                        // Dropping `tx` rolls back the whole batch.
                        return Err(StorageError::Conflict("queue position changed during repair"));
                    }
                }
            }
            if let Some(entry) = audit {
                append_audit(&tx, entry)?;
            }
            tx.commit()?;
            Ok(updates.len())
        })
    }

    fn insert_trip(&self, trip: &NewTrip) -> StorageResult<Trip> {
        self.with_conn(|conn| {
            let id: i64 = conn
                .prepare_cached(
                    "INSERT INTO trips (vehicle_id, passengers, destination, status, created_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5) RETURNING id",
                )?
                .query_row(
                    params![
                        trip.vehicle.map(VehicleId::get),
                        trip.passengers,
                        trip.destination,
                        trip.status.as_str(),
                        trip.created_at.0,
                    ],
                    |row| row.get(0),
                )?;
            Ok(Trip {
                id:           TripId(id),
                vehicle:      trip.vehicle,
                passengers:   trip.passengers,
                destination:  trip.destination.clone(),
                status:       trip.status,
                created_at:   trip.created_at,
                completed_at: None,
            })
        })
    }

    fn trip(&self, id: TripId) -> StorageResult<Option<Trip>> {
        self.with_conn(|conn| {
            let trip = conn
                .prepare_cached(&format!("SELECT {TRIP_COLUMNS} FROM trips WHERE id = ?1"))?
                .query_row(params![id.0], trip_from_row)
                .optional()?;
            Ok(trip)
        })
    }

    fn transition_trip(&self, transition: &TripTransition) -> StorageResult<bool> {
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let changed = tx
                .prepare_cached(
                    "UPDATE trips SET status = ?3, \
                         vehicle_id   = COALESCE(?4, vehicle_id), \
                         completed_at = COALESCE(?5, completed_at) \
                     WHERE id = ?1 AND status = ?2",
                )?
                .execute(params![
                    transition.trip.0,
                    transition.from.as_str(),
                    transition.to.as_str(),
                    transition.vehicle.map(VehicleId::get),
                    transition.completed_at.map(Timestamp::millis),
                ])?;
            if changed == 0 {
                return Ok(false);
            }
            if let Some(entry) = &transition.audit {
                append_audit(&tx, entry)?;
            }
            tx.commit()?;
            Ok(true)
        })
    }

    fn trip_page(&self, query: &TripQuery) -> StorageResult<TripSlice> {
        const FILTER: &str = "(?1 IS NULL OR status = ?1) \
                              AND (?2 IS NULL OR created_at >= ?2) \
                              AND (?3 IS NULL OR created_at < ?3)";
        let status = query.status.map(TripStatus::as_str);
        let from = query.created_from.map(Timestamp::millis);
        let to = query.created_to.map(Timestamp::millis);
        let offset = i64::try_from(query.offset).unwrap_or(i64::MAX);

        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let total: i64 = tx
                .prepare_cached(&format!("SELECT COUNT(*) FROM trips WHERE {FILTER}"))?
                .query_row(params![status, from, to], |row| row.get(0))?;
            let trips = {
                let mut stmt = tx.prepare_cached(&format!(
                    "SELECT {TRIP_COLUMNS} FROM trips WHERE {FILTER} \
                     ORDER BY created_at DESC, id DESC LIMIT ?4 OFFSET ?5"
                ))?;
                let rows = stmt.query_map(params![status, from, to, query.limit, offset], trip_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            };
            tx.commit()?;
            Ok(TripSlice { trips, total: u64::try_from(total).unwrap_or(0) })
        })
    }

    fn audit_log(&self, subject: Option<AuditSubject>) -> StorageResult<Vec<AuditLogEntry>> {
        let kind = subject.map(AuditSubject::kind);
        let key = subject.map(AuditSubject::key);
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT id, action, entity_kind, entity_id, at, detail FROM audit_log \
                 WHERE ?1 IS NULL OR (entity_kind = ?1 AND entity_id = ?2) \
                 ORDER BY id",
            )?;
            let entries = stmt
                .query_map(params![kind, key], audit_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(entries)
        })
    }
}
