//! `rank-core` — foundational types for the taxi-rank dispatch engine.
//!
//! This crate is a dependency of every other `rank-*` crate.  It has no
//! `rank-*` dependencies and no I/O: only plain records, the time model, and
//! configuration.
//!
//! # What lives here
//!
//! | Module        | Contents                                                   |
//! |---------------|------------------------------------------------------------|
//! | [`ids`]       | `VehicleId`, `TripId`, `EntryId`, `AuditId`                |
//! | [`fleet`]     | `CapacityClass`, `CapacityClasses`, `Vehicle`              |
//! | [`queue`]     | `QueueEntry`                                               |
//! | [`trip`]      | `Trip`, `TripStatus`                                       |
//! | [`audit`]     | `AuditAction`, `AuditSubject`, `AuditLogEntry`, `NewAuditEntry` |
//! | [`time`]      | `Timestamp`, `Clock`, `SystemClock`, `ManualClock`, `Deadline` |
//! | [`rng`]       | `JitterRng` for retry backoff                              |
//! | [`config`]    | `DispatchConfig`, `RetryConfig`, `BreakerConfig`           |
//! | [`error`]     | `CoreError`, `CoreResult`                                  |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to ids, records and config. |

pub mod audit;
pub mod config;
pub mod error;
pub mod fleet;
pub mod ids;
pub mod queue;
pub mod rng;
pub mod time;
pub mod trip;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use audit::{AuditAction, AuditLogEntry, AuditSubject, NewAuditEntry};
pub use config::{BreakerConfig, DispatchConfig, RetryConfig};
pub use error::{CoreError, CoreResult};
pub use fleet::{CapacityClass, CapacityClasses, Vehicle};
pub use ids::{AuditId, EntryId, TripId, VehicleId};
pub use queue::QueueEntry;
pub use rng::JitterRng;
pub use time::{Clock, Deadline, ManualClock, SystemClock, Timestamp};
pub use trip::{Trip, TripStatus};
