//! `rank-queue` — per-class FIFO queues of waiting vehicles.
//!
//! | Module       | Contents                                               |
//! |--------------|--------------------------------------------------------|
//! | [`store`]    | `QueueStore`: enqueue, atomic head dequeue, listing    |
//! | [`repair`]   | `PositionIntegrityRepairer`: renumber a class to `1..n` |
//! | [`error`]    | `QueueError`, `QueueResult<T>`                         |
//!
//! # Ordering
//!
//! The head of a class is the entry with the smallest position, ties broken
//! by earliest `enqueued_at` and then entry id.  Positions may drift (gaps
//! after a withdrawal, a duplicate after a compensating re-insert); ordering
//! stays well defined regardless and the repairer restores `1..n`.
//!
//! Neither type retries or holds locks.  Atomicity comes from the storage
//! transaction; retries are the caller's business.

pub mod error;
pub mod repair;
pub mod store;


pub use error::{QueueError, QueueResult};
pub use repair::PositionIntegrityRepairer;
pub use store::QueueStore;
