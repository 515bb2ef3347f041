//! Strongly typed identifier wrappers.
//!
//! Every id is a row key in the backing store, so the inner integer is an
//! `i64` (SQLite's native integer).  All ids are `Copy + Ord + Hash` so they
//! can be used as map keys and sorted without ceremony.

use std::fmt;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        $vis struct $name(pub $inner);

        impl $name {
            /// The raw store key.
            #[inline(always)]
            pub fn get(self) -> $inner {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<$inner> for $name {
            #[inline(always)]
            fn from(raw: $inner) -> $name {
                $name(raw)
            }
        }
    };
}

typed_id! {
    /// Fleet-registry identity of a vehicle.
    pub struct VehicleId(i64);
}

typed_id! {
    /// Identity of a trip record.
    pub struct TripId(i64);
}

typed_id! {
    /// Identity of a queue entry row (distinct from the vehicle it holds).
    pub struct EntryId(i64);
}

typed_id! {
    /// Identity of an audit-log row.
    pub struct AuditId(i64);
}
