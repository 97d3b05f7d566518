//! Deadline arithmetic helpers.

use std::time::{Duration, Instant};

/// Absolute deadline `wait` from now, or `None` when the wait is so large
/// that the addition overflows. `None` means "wait forever"; unbounded
/// configuration values flow through here without special-casing.
pub(crate) fn deadline_after(wait: Duration) -> Option<Instant> {
    Instant::now().checked_add(wait)
}
