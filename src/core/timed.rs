//! Deadline enforcement for a single task.
//!
//! The runner puts the user task on its own carrier and holds the timer on
//! the carrier that called it, so the deadline can fire while the task is
//! still busy. Expiry signals cancellation and returns immediately; the task
//! is never joined after a timeout and may run to natural completion if it
//! ignores the signal.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::core::error::ExecutionError;
use crate::core::execution::{invoke_task, settle, TaskFn};
use crate::core::worker_pool::WorkerPool;

/// Run `task` with a wall-clock deadline of `limit`.
///
/// On expiry, cancellation is signalled to the task's carrier and the call
/// fails with [`ExecutionError::TimedOut`]. On completion within the
/// deadline, the task's own result is returned.
pub(crate) fn run_with_deadline<T: Send + 'static>(
    pool: &WorkerPool,
    task: &TaskFn<T>,
    limit: Duration,
) -> Result<T, ExecutionError> {
    let task = Arc::clone(task);
    let handle = pool.submit_now(move || invoke_task(&task));
    match handle.join_for(limit) {
        Some(outcome) => settle(outcome),
        None => {
            handle.cancel();
            warn!(limit = ?limit, pool = %pool.name(), "deadline elapsed; cancellation signalled");
            Err(ExecutionError::TimedOut { limit })
        }
    }
}
