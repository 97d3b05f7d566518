//! Cooperative cancellation.
//!
//! Every job a [`crate::core::worker_pool::WorkerPool`] runs carries a
//! [`CancelToken`]. The time limiter flips the token when a deadline elapses;
//! the carrier is never killed. Task code that wants to honour deadlines
//! polls [`interrupted`] or sleeps through [`sleep`], both of which read the
//! ambient token of the current carrier. Tasks that ignore the token run to
//! natural completion after the caller has already observed the timeout.

use std::cell::RefCell;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::util::clock::deadline_after;

/// Shared cancellation flag with notification.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    cancelled: Mutex<bool>,
    signal: Condvar,
}

impl CancelToken {
    /// Create a fresh, un-cancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation and wake all sleepers on this token.
    pub fn cancel(&self) {
        let mut cancelled = self.inner.cancelled.lock();
        *cancelled = true;
        self.inner.signal.notify_all();
    }

    /// True once [`CancelToken::cancel`] has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancelled.lock()
    }

    /// Block until cancelled or until `timeout` elapses.
    ///
    /// Returns `true` if the token was cancelled before the timeout.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        let deadline = deadline_after(timeout);
        let mut cancelled = self.inner.cancelled.lock();
        while !*cancelled {
            match deadline {
                Some(at) => {
                    let now = Instant::now();
                    if now >= at {
                        return false;
                    }
                    let _ = self.inner.signal.wait_for(&mut cancelled, at - now);
                }
                None => self.inner.signal.wait(&mut cancelled),
            }
        }
        true
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

thread_local! {
    static CURRENT: RefCell<Option<CancelToken>> = const { RefCell::new(None) };
}

/// Install `token` as the carrier's ambient token for the guard's lifetime.
pub(crate) fn enter(token: CancelToken) -> ScopedToken {
    let previous = CURRENT.with(|current| current.borrow_mut().replace(token));
    ScopedToken { previous }
}

/// Restores the previously installed ambient token on drop.
pub(crate) struct ScopedToken {
    previous: Option<CancelToken>,
}

impl Drop for ScopedToken {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT.with(|current| *current.borrow_mut() = previous);
    }
}

/// The ambient token of the current carrier, if any.
#[must_use]
pub fn current() -> Option<CancelToken> {
    CURRENT.with(|current| current.borrow().clone())
}

/// True if the current carrier has been signalled for cancellation.
///
/// Returns `false` when called outside of a pool carrier.
#[must_use]
pub fn interrupted() -> bool {
    current().is_some_and(|token| token.is_cancelled())
}

/// Sleep for `duration`, waking early on cancellation.
///
/// Returns `true` if the full duration elapsed, `false` if cancellation cut
/// the sleep short. Outside of a pool carrier this is a plain sleep.
pub fn sleep(duration: Duration) -> bool {
    match current() {
        Some(token) => !token.wait_for(duration),
        None => {
            std::thread::sleep(duration);
            true
        }
    }
}
