//! # Prometheus Ripcord
//!
//! A resilience execution library for the Prometheus AI Platform.
//!
//! Ripcord wraps an arbitrary, possibly-failing computation and executes it
//! under a composed policy of **retry**, **bulkhead isolation** (bounded
//! carrier pool, bounded queue, bounded admission wait), and **time limit**
//! (wall-clock deadline with cooperative cancellation). An optional
//! **fallback** converts a terminal failure into a value of the computation's
//! result type.
//!
//! ## Core Problem Solved
//!
//! Platform services call flaky collaborators: model backends that stall,
//! downstream services that saturate, I/O that fails transiently. Ripcord
//! gives each call site a small, predictable failure envelope:
//!
//! - **Bulkheads** cap how many calls run and wait per named pool, so one
//!   slow dependency cannot drain every carrier thread in the process
//! - **Time limits** bound the caller's wait even when the work ignores
//!   cancellation
//! - **Retries** absorb transient failures with a fixed inter-attempt delay
//! - **Fallbacks** degrade gracefully instead of propagating the last error
//!
//! The contract is deliberately synchronous: `run` blocks the caller until
//! the pipeline settles and returns a value or the fallback's value. Work
//! itself runs on pool-owned OS-thread carriers, never on an event loop.
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use prometheus_ripcord::{BoxError, Execution};
//!
//! let greeting = Execution::new(|| Ok::<_, BoxError>("hello".to_string()))
//!     .retry(3, 50)
//!     .bulkhead("downstream", 8, 32, 200)
//!     .time_limit(1_000)
//!     .on_failure(|_err| "fallback".to_string())
//!     .run()
//!     .expect("fallback makes this infallible");
//! assert_eq!(greeting, "hello");
//! ```
//!
//! Pools are process-wide: every call site naming the same pool id shares one
//! carrier pool and one admission gate. See [`core::registry`] for the
//! first-writer-wins semantics.

/// Builders to construct registry pools from configuration.
pub mod builders;
/// Configuration models for pools and defaults.
pub mod config;
/// Core execution pipeline: errors, admission, pools, deadlines, retry.
pub mod core;
/// Shared utilities.
pub mod util;

pub use crate::config::{PoolSettings, PoolsConfig, DEFAULT_POOL_ID};
pub use crate::core::{
    cancel, AdmissionGate, BoxError, CancelToken, Execution, ExecutionError, JobHandle,
    PermitGuard, PoolEntry, PoolError, PoolRegistry, PoolStats, RejectionCause, RetryPolicy,
    TaskPanic, WorkerPool,
};
