//! `rank-resilience` — the single retry / circuit-breaker guard placed around
//! every storage-touching call made by the queue and trip layers.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                       |
//! |--------------|----------------------------------------------------------------|
//! | [`classify`] | `FaultKind`, `Classify` — how an error affects retry / breaker |
//! | [`retry`]    | `RetryPolicy` — capped exponential backoff                     |
//! | [`breaker`]  | `CircuitBreaker`, `BreakerState`                               |
//! | [`guard`]    | `Resilience` — runs a closure under both                       |
//! | [`error`]    | `GuardError<E>`                                                |
//!
//! # Which calls may be retried
//!
//! [`Resilience::retrying`] is for idempotent or atomic-conditional calls
//! only: reads, the conditional dequeue, compare-and-set repairs and trip
//! transitions.  Calls that create new rows (a trip insert) go through
//! [`Resilience::once`], which still consults and feeds the breaker but never
//! repeats the call.
//!
//! # Breaker
//!
//! ```text
//! Closed ──(threshold consecutive faults)──▶ Open ──(cooldown elapsed)──▶ HalfOpen
//!   ▲                                         ▲                              │
//!   └──────────────(trial succeeds)───────────┼──────────────────────────────┤
//!                                             └───────(trial fails)──────────┘
//! ```

pub mod breaker;
pub mod classify;
pub mod error;
pub mod guard;
pub mod retry;


pub use breaker::{BreakerState, CircuitBreaker};
pub use classify::{Classify, FaultKind};
pub use error::GuardError;
pub use guard::Resilience;
pub use retry::RetryPolicy;
