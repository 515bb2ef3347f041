//! `rank-dispatch` — the dispatch and queue allocation engine.
//!
//! # Assignment flow
//!
//! ```text
//! assign(n, destination)
//!   ① AllocationPolicy   — validate n, search order [exact-fit, larger…]
//!   ② per class          — guarded dequeue_head; first hit wins
//!   ③ trip               — create `Assigned` trip (never retried)
//!        └ on failure    — restore the vehicle to its queue head, once
//!   ④ repair             — renumber the dequeued class (best effort)
//! ```
//!
//! Every storage call goes through one shared
//! [`Resilience`][rank_resilience::Resilience] guard: retries for
//! idempotent calls, a circuit breaker for all of them.
//!
//! # Crate layout
//!
//! | Module         | Contents                                             |
//! |----------------|------------------------------------------------------|
//! | [`policy`]     | `AllocationPolicy`                                   |
//! | [`engine`]     | `DispatchEngine`                                     |
//! | [`builder`]    | `DispatchEngineBuilder`                              |
//! | [`outcome`]    | `Assignment`, `RepairReport`                         |
//! | [`observer`]   | `DispatchObserver`, `NoopObserver`                   |
//! | [`error`]      | `DispatchError`, `DispatchResult<T>`                 |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! let storage = Arc::new(SqliteStorage::open(Path::new("rank.db"))?);
//! let engine = DispatchEngineBuilder::new(DispatchConfig::default(), storage).build()?;
//! let assignment = engine.assign(3, "Terminal 2")?;
//! ```

pub mod builder;
pub mod engine;
pub mod error;
pub mod observer;
pub mod outcome;
pub mod policy;


pub use builder::DispatchEngineBuilder;
pub use engine::DispatchEngine;
pub use error::{DispatchError, DispatchResult};
pub use observer::{DispatchObserver, NoopObserver};
pub use outcome::{Assignment, RepairReport};
pub use policy::AllocationPolicy;
pub use rank_trip::{Page, TripFilter};
