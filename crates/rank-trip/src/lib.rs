//! `rank-trip` — trip lifecycle.
//!
//! | Module        | Contents                                              |
//! |---------------|-------------------------------------------------------|
//! | [`lifecycle`] | `TripLifecycle`, `Completion`                         |
//! | [`history`]   | `TripFilter`, `Page<T>`                               |
//! | [`error`]     | `TripError`, `TripResult<T>`                          |
//!
//! Every status change is validated against
//! [`TripStatus::can_transition_to`][rank_core::TripStatus::can_transition_to]
//! before anything is written, then applied as a compare-and-set on the
//! status that was read.  Completion and cancellation append their audit
//! entry in the same storage transaction as the status change.

pub mod error;
pub mod history;
pub mod lifecycle;


pub use error::{TripError, TripResult};
pub use history::{Page, TripFilter, MAX_PAGE_SIZE};
pub use lifecycle::{Completion, TripLifecycle};
