//! Fixed-count, fixed-delay retry loop.

use std::time::Duration;

use tracing::debug;

use crate::core::cancel;
use crate::core::error::ExecutionError;

/// Retry policy: total attempt count and inter-attempt delay.
///
/// The count includes the first attempt, so a count of 3 means at most 3
/// invocations of the task, not 3 retries after an initial try. Counts below
/// 1 are clamped up to 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Create a policy of `max_attempts` total attempts separated by
    /// `delay_millis`, clamping the count to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, delay_millis: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay: Duration::from_millis(delay_millis),
        }
    }

    /// Total attempts allowed, including the first.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay between attempts.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(1, 0)
    }
}

/// Run `attempt_fn` under `policy`.
///
/// All failures are retryable, including bulkhead rejections and timeouts;
/// intermediate failures are suppressed and only the last one surfaces. The
/// inter-attempt sleep is interruptible: a cancellation signal on the calling
/// carrier cuts the sleep short and the next attempt proceeds with the flag
/// still set.
pub(crate) fn run_with_retry<T>(
    policy: RetryPolicy,
    mut attempt_fn: impl FnMut(u32) -> Result<T, ExecutionError>,
) -> Result<T, ExecutionError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match attempt_fn(attempt) {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.max_attempts => {
                debug!(attempt, error = %err, "attempt failed; retrying after delay");
                if !policy.delay.is_zero() {
                    cancel::sleep(policy.delay);
                }
            }
            Err(err) => return Err(err),
        }
    }
}
