//! Admission permits for bulkhead isolation.
//!
//! The gate models the bulkhead's concurrency ceiling independently from the
//! carrier pool: one permit per in-flight task, acquired before queueing and
//! released when the attempt settles. Acquisition is time-bounded and makes
//! no fairness promise.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::util::clock::deadline_after;

/// Counting admission permits with time-bounded acquisition.
pub struct AdmissionGate {
    permits: Mutex<usize>,
    released: Condvar,
    max_permits: usize,
}

impl AdmissionGate {
    /// Create a gate holding `max_concurrent` permits.
    #[must_use]
    pub fn new(max_concurrent: usize) -> Self {
        let max_permits = max_concurrent.max(1);
        Self {
            permits: Mutex::new(max_permits),
            released: Condvar::new(),
            max_permits,
        }
    }

    /// Acquire one permit, blocking up to `wait`.
    ///
    /// Returns a guard that releases the permit on drop, on every exit path
    /// including panics, or `None` when the wait budget runs out.
    pub fn try_acquire(&self, wait: Duration) -> Option<PermitGuard<'_>> {
        let deadline = deadline_after(wait);
        let mut permits = self.permits.lock();
        while *permits == 0 {
            match deadline {
                Some(at) => {
                    let now = Instant::now();
                    if now >= at {
                        debug!(waited = ?wait, "admission permit wait timed out");
                        return None;
                    }
                    let _ = self.released.wait_for(&mut permits, at - now);
                }
                None => self.released.wait(&mut permits),
            }
        }
        *permits -= 1;
        Some(PermitGuard { gate: self })
    }

    /// Permits currently available.
    #[must_use]
    pub fn available(&self) -> usize {
        *self.permits.lock()
    }

    /// The configured permit ceiling.
    #[must_use]
    pub fn max_permits(&self) -> usize {
        self.max_permits
    }

    fn release(&self) {
        let mut permits = self.permits.lock();
        *permits += 1;
        self.released.notify_one();
    }
}

/// An acquired admission permit. Dropping it releases the permit exactly once.
pub struct PermitGuard<'a> {
    gate: &'a AdmissionGate,
}

impl Drop for PermitGuard<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_acquire_and_release() {
        let gate = AdmissionGate::new(2);
        assert_eq!(gate.available(), 2);

        let first = gate.try_acquire(Duration::from_millis(10)).unwrap();
        let second = gate.try_acquire(Duration::from_millis(10)).unwrap();
        assert_eq!(gate.available(), 0);

        drop(first);
        assert_eq!(gate.available(), 1);
        drop(second);
        assert_eq!(gate.available(), 2);
    }

    #[test]
    fn test_acquire_times_out_when_exhausted() {
        let gate = AdmissionGate::new(1);
        let _held = gate.try_acquire(Duration::from_millis(10)).unwrap();

        let start = Instant::now();
        assert!(gate.try_acquire(Duration::from_millis(40)).is_none());
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn test_waiter_wakes_on_release() {
        let gate = Arc::new(AdmissionGate::new(1));
        let held = gate.try_acquire(Duration::from_millis(10)).unwrap();

        let remote = Arc::clone(&gate);
        let waiter = thread::spawn(move || {
            remote.try_acquire(Duration::from_secs(5)).is_some()
        });

        thread::sleep(Duration::from_millis(30));
        drop(held);
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_permit_released_on_panic() {
        let gate = AdmissionGate::new(1);
        let result = catch_unwind(AssertUnwindSafe(|| {
            let _permit = gate.try_acquire(Duration::from_millis(10)).unwrap();
            panic!("attempt blew up");
        }));
        assert!(result.is_err());
        assert_eq!(gate.available(), 1);
    }

    #[test]
    fn test_zero_permits_clamped_to_one() {
        let gate = AdmissionGate::new(0);
        assert_eq!(gate.max_permits(), 1);
        assert!(gate.try_acquire(Duration::from_millis(10)).is_some());
    }
}
