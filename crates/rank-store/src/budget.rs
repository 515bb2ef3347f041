//! Caller deadlines for storage calls.
//!
//! [`within`] installs a [`Deadline`] for the current thread.  While it is
//! installed, the SQLite adapter caps both the wait for a pooled connection
//! and SQLite's busy handler at the time left, so a call blocked on another
//! writer's lock returns a busy error when the deadline passes instead of
//! after the full busy timeout.

use std::cell::Cell;
use std::time::Duration;

use rank_core::Deadline;

thread_local! {
    static DEADLINE: Cell<Option<Deadline>> = const { Cell::new(None) };
}

/// Run `f` with every storage call it makes on this thread bounded by
/// `deadline`.  Nested calls keep the earlier of the two deadlines.
pub fn within<T>(deadline: Deadline, f: impl FnOnce() -> T) -> T {
    struct Restore(Option<Deadline>);

    impl Drop for Restore {
        fn drop(&mut self) {
            DEADLINE.set(self.0);
        }
    }

    let previous = DEADLINE.get();
    let effective = match previous {
        Some(outer) if outer.instant() < deadline.instant() => outer,
        _ => deadline,
    };
    let _restore = Restore(previous);
    DEADLINE.set(Some(effective));
    f()
}

/// How long a call starting now may block, never more than `cap`.
pub(crate) fn wait_budget(cap: Duration) -> Duration {
    match DEADLINE.get() {
        Some(deadline) => deadline.remaining().map_or(Duration::ZERO, |left| left.min(cap)),
        None => cap,
    }
}
