//! `rank-store` — the storage boundary of the dispatch engine.
//!
//! The engine does not implement a storage engine.  It talks to a
//! transactional relational store through the [`Storage`] trait, which is
//! deliberately narrow: conditional atomic dequeue by minimum position,
//! inserts, compare-and-set updates, ordered scans, and paged counts.
//!
//! | Module      | Contents                                                    |
//! |-------------|-------------------------------------------------------------|
//! | [`storage`] | `Storage` trait and its request/response rows               |
//! | [`sqlite`]  | `SqliteStorage` — embedded SQLite adapter with a small pool |
//! | [`budget`]  | `within` — bound storage calls by a caller deadline         |
//! | [`error`]   | `StorageError`, `StorageResult<T>`                          |
//!
//! # Persisted layout
//!
//! | Table           | Keyed by      | Indexes                                  |
//! |-----------------|---------------|------------------------------------------|
//! | `vehicles`      | `id`          | —                                        |
//! | `queue_entries` | `id`          | `(class, position, enqueued_at)`, unique `vehicle_id` |
//! | `trips`         | `id`          | `status`, `created_at`                   |
//! | `audit_log`     | `id`          | `at`, `(entity_kind, entity_id)`         |

pub mod budget;
pub mod error;
pub mod sqlite;
pub mod storage;

#[cfg(test)]
mod tests;

pub use budget::within;
pub use error::{StorageError, StorageResult};
pub use sqlite::{SqliteStorage, DEFAULT_POOL_SIZE};
pub use storage::{NewTrip, PositionUpdate, Storage, TripQuery, TripSlice, TripTransition};
