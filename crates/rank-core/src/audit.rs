//! Append-only audit records.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::{AuditId, CapacityClass, CoreError, Timestamp, TripId};

/// What happened.  Stored by its upper-snake tag.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AuditAction {
    TripCompleted,
    TripCancelled,
    QueueRepaired,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::TripCompleted => "TRIP_COMPLETED",
            AuditAction::TripCancelled => "TRIP_CANCELLED",
            AuditAction::QueueRepaired => "QUEUE_REPAIRED",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TRIP_COMPLETED" => Ok(AuditAction::TripCompleted),
            "TRIP_CANCELLED" => Ok(AuditAction::TripCancelled),
            "QUEUE_REPAIRED" => Ok(AuditAction::QueueRepaired),
            other => Err(CoreError::UnknownAction(other.to_owned())),
        }
    }
}

/// The entity an audit entry is about.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AuditSubject {
    Trip(TripId),
    Queue(CapacityClass),
}

impl AuditSubject {
    /// Storage discriminator.
    pub fn kind(self) -> &'static str {
        match self {
            AuditSubject::Trip(_) => "trip",
            AuditSubject::Queue(_) => "queue",
        }
    }

    /// Storage key within the kind.
    pub fn key(self) -> i64 {
        match self {
            AuditSubject::Trip(id) => id.0,
            AuditSubject::Queue(class) => i64::from(class.0),
        }
    }

    /// Rebuild from the stored `(kind, key)` pair.
    pub fn from_parts(kind: &str, key: i64) -> Result<Self, CoreError> {
        match kind {
            "trip" => Ok(AuditSubject::Trip(TripId(key))),
            "queue" => u8::try_from(key)
                .map(|seats| AuditSubject::Queue(CapacityClass(seats)))
                .map_err(|_| CoreError::UnknownSubject(format!("queue:{key}"))),
            other => Err(CoreError::UnknownSubject(format!("{other}:{key}"))),
        }
    }
}

/// An audit entry as persisted.  Never mutated or deleted.
#[derive(Clone, Debug, PartialEq)]
pub struct AuditLogEntry {
    pub id:      AuditId,
    pub action:  AuditAction,
    pub subject: AuditSubject,
    pub at:      Timestamp,
    pub detail:  Value,
}

/// An audit entry not yet written; the store assigns the id.
#[derive(Clone, Debug, PartialEq)]
pub struct NewAuditEntry {
    pub action:  AuditAction,
    pub subject: AuditSubject,
    pub at:      Timestamp,
    pub detail:  Value,
}
