//! Core execution pipeline.
//!
//! The façade composes the pieces as
//! `retry( admission( enqueue( worker_pool, timed( task ) ) ) )`, with the
//! registry supplying the shared (pool, gate) pair per pool id.

pub mod admission;
pub mod cancel;
pub mod error;
pub mod execution;
pub mod registry;
pub mod retry;
pub mod timed;
pub mod worker_pool;

pub use admission::{AdmissionGate, PermitGuard};
pub use cancel::CancelToken;
pub use error::{BoxError, ExecutionError, RejectionCause, TaskPanic};
pub use execution::Execution;
pub use registry::{PoolEntry, PoolRegistry};
pub use retry::RetryPolicy;
pub use worker_pool::{JobHandle, PoolError, PoolStats, WorkerPool};
