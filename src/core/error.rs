//! Error types for the execution pipeline.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Boxed user failure. Tasks may fail with any error type.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Why a bulkhead turned a call away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionCause {
    /// No admission permit became available within the wait budget.
    WaitTimeout,
    /// No queue slot became available within the wait budget.
    CapacityExceeded,
}

impl fmt::Display for RejectionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WaitTimeout => f.write_str("wait timeout"),
            Self::CapacityExceeded => f.write_str("capacity exceeded"),
        }
    }
}

/// Failures surfaced by [`crate::core::execution::Execution::run`].
///
/// `BulkheadRejected` and `TimedOut` are raised by the library and are
/// retryable; `Task` carries user failures through unchanged; `UnknownPool`
/// is a programmer error and aborts the run without retry or fallback.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The bulkhead rejected the attempt.
    #[error("bulkhead rejected the call: {cause}")]
    BulkheadRejected {
        /// Rejection cause, either `wait timeout` or `capacity exceeded`.
        cause: RejectionCause,
    },

    /// The deadline elapsed before the task settled. Cancellation has been
    /// signalled to the carrier; the task may still be running.
    #[error("execution timed out after {limit:?}")]
    TimedOut {
        /// The configured time limit.
        limit: Duration,
    },

    /// Attach requested for a pool id that was never created.
    #[error("unknown pool `{0}`: create it with bulkhead(id, ...) before attaching")]
    UnknownPool(String),

    /// A user failure thrown by the task, passed through unchanged.
    #[error("task failed: {0}")]
    Task(BoxError),
}

impl ExecutionError {
    /// True for the library-raised bulkhead rejection kind.
    #[must_use]
    pub fn is_bulkhead_rejected(&self) -> bool {
        matches!(self, Self::BulkheadRejected { .. })
    }

    /// True for the library-raised deadline kind.
    #[must_use]
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

/// A panic captured from a task carrier, surfaced as a user failure.
#[derive(Debug, Error)]
#[error("task panicked: {0}")]
pub struct TaskPanic(pub String);
