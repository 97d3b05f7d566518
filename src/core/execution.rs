//! Fluent execution façade.
//!
//! [`Execution`] is an owned configuration value: chain policy setters, then
//! call the terminal [`Execution::run`], which consumes the configuration and
//! blocks the caller until the pipeline settles. Each attempt flows through
//! the pool's admission gate, its bounded queue, and optionally the time
//! limiter, in that order; the retry loop wraps the whole attempt.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::PoolSettings;
use crate::core::error::{BoxError, ExecutionError, RejectionCause, TaskPanic};
use crate::core::registry::{PoolEntry, PoolRegistry};
use crate::core::retry::{self, RetryPolicy};
use crate::core::timed;
use crate::core::worker_pool::PoolError;

/// A re-invocable user task.
pub(crate) type TaskFn<T> = Arc<dyn Fn() -> Result<T, BoxError> + Send + Sync>;

/// Which pool the run should execute on.
enum PoolChoice {
    /// No bulkhead configured; use the shared default pool.
    Default,
    /// Get-or-create a named pool with the given capacities.
    Configure(PoolSettings),
    /// Attach to a pool somebody else must already have created.
    Attach(String),
}

/// Fluent builder that runs a task under retry, bulkhead, time-limit and
/// fallback policies.
///
/// # Example
///
/// ```rust,no_run
/// use prometheus_ripcord::{BoxError, Execution};
///
/// let value = Execution::new(|| Ok::<_, BoxError>(2 + 2))
///     .retry(3, 10)
///     .bulkhead("math", 4, 16, 100)
///     .time_limit(1_000)
///     .run()
///     .unwrap();
/// assert_eq!(value, 4);
/// ```
pub struct Execution<T> {
    task: TaskFn<T>,
    policy: RetryPolicy,
    time_limit: Option<Duration>,
    pool: PoolChoice,
    fallback: Option<Box<dyn FnOnce(ExecutionError) -> T + Send>>,
}

impl<T: Send + 'static> Execution<T> {
    /// Start a fresh configuration around `task`.
    pub fn new<F>(task: F) -> Self
    where
        F: Fn() -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            task: Arc::new(task),
            policy: RetryPolicy::default(),
            time_limit: None,
            pool: PoolChoice::Default,
            fallback: None,
        }
    }

    /// Convert a terminal failure into a value instead of surfacing it.
    ///
    /// The handler sees the last attempt's failure and is invoked at most
    /// once per run.
    #[must_use]
    pub fn on_failure<H>(mut self, handler: H) -> Self
    where
        H: FnOnce(ExecutionError) -> T + Send + 'static,
    {
        self.fallback = Some(Box::new(handler));
        self
    }

    /// Allow up to `count` total attempts separated by `delay_millis`.
    ///
    /// Counts below 1 are clamped up to 1.
    #[must_use]
    pub fn retry(mut self, count: u32, delay_millis: u64) -> Self {
        self.policy = RetryPolicy::new(count, delay_millis);
        self
    }

    /// Isolate the run in the named pool, creating it on first use.
    ///
    /// `max_concurrent` caps in-flight tasks, `max_queue` caps waiting tasks,
    /// and `max_wait_millis` bounds each admission stage (permit and queue
    /// slot), so the worst-case admission latency of one attempt is twice
    /// that value. If the pool already exists its original capacities stay in
    /// force.
    #[must_use]
    pub fn bulkhead(
        mut self,
        pool_id: impl Into<String>,
        max_concurrent: usize,
        max_queue: usize,
        max_wait_millis: u64,
    ) -> Self {
        self.pool = PoolChoice::Configure(PoolSettings::new(
            pool_id,
            max_concurrent,
            max_queue,
            max_wait_millis,
        ));
        self
    }

    /// Isolate the run in a pool some other call site already created.
    ///
    /// Running fails with [`ExecutionError::UnknownPool`] when no such pool
    /// exists; that failure is fatal and skips both retry and fallback.
    #[must_use]
    pub fn attach_bulkhead(mut self, pool_id: impl Into<String>) -> Self {
        self.pool = PoolChoice::Attach(pool_id.into());
        self
    }

    /// Bound each attempt to `millis` of wall-clock time. Zero disables the
    /// deadline.
    #[must_use]
    pub fn time_limit(mut self, millis: u64) -> Self {
        self.time_limit = if millis == 0 {
            None
        } else {
            Some(Duration::from_millis(millis))
        };
        self
    }

    /// Execute the task under the configured policies.
    ///
    /// Blocks until the pipeline settles: a successful attempt's value, the
    /// fallback's value after the last attempt fails, or the last failure.
    ///
    /// # Errors
    ///
    /// The last attempt's [`ExecutionError`] when all attempts fail and no
    /// fallback is configured, or [`ExecutionError::UnknownPool`] immediately
    /// when attaching to a pool that was never created.
    pub fn run(self) -> Result<T, ExecutionError> {
        let Self {
            task,
            policy,
            time_limit,
            pool,
            fallback,
        } = self;

        let entry = match &pool {
            PoolChoice::Configure(settings) => PoolRegistry::global().get_or_create(settings),
            PoolChoice::Attach(pool_id) => PoolRegistry::global().get(pool_id)?,
            PoolChoice::Default => PoolRegistry::global().get_or_create(&PoolSettings::default()),
        };
        let wait = entry.settings().max_admission_wait();

        let outcome = retry::run_with_retry(policy, |attempt| {
            attempt_once(&entry, &task, time_limit, wait, attempt)
        });
        match outcome {
            Ok(value) => Ok(value),
            Err(err) => match fallback {
                Some(handler) => {
                    debug!(error = %err, "final attempt failed; invoking fallback");
                    Ok(handler(err))
                }
                None => Err(err),
            },
        }
    }
}

impl<T> std::fmt::Debug for Execution<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Execution")
            .field("policy", &self.policy)
            .field("time_limit", &self.time_limit)
            .field("has_fallback", &self.fallback.is_some())
            .finish_non_exhaustive()
    }
}

/// One admission-gated attempt: permit, queue slot, execute, settle.
fn attempt_once<T: Send + 'static>(
    entry: &Arc<PoolEntry>,
    task: &TaskFn<T>,
    time_limit: Option<Duration>,
    wait: Duration,
    attempt: u32,
) -> Result<T, ExecutionError> {
    let Some(_permit) = entry.gate().try_acquire(wait) else {
        warn!(pool = %entry.settings().pool_id, attempt, "no admission permit within wait budget");
        return Err(ExecutionError::BulkheadRejected {
            cause: RejectionCause::WaitTimeout,
        });
    };

    let submitted = match time_limit {
        Some(limit) => {
            let pool = entry.pool().clone();
            let task = Arc::clone(task);
            entry
                .pool()
                .try_submit(wait, move || timed::run_with_deadline(&pool, &task, limit))
        }
        None => {
            let task = Arc::clone(task);
            entry.pool().try_submit(wait, move || invoke_task(&task))
        }
    };
    let handle = submitted.map_err(|err| match err {
        PoolError::QueueFull => {
            warn!(pool = %entry.settings().pool_id, attempt, "no queue slot within wait budget");
            ExecutionError::BulkheadRejected {
                cause: RejectionCause::CapacityExceeded,
            }
        }
        other => ExecutionError::Task(Box::new(other)),
    })?;

    // No second deadline here: when a time limit is configured the submitted
    // wrapper already enforces it.
    settle(handle.join())
}

/// Invoke the user task, carrying its failure through unchanged.
pub(crate) fn invoke_task<T>(task: &TaskFn<T>) -> Result<T, ExecutionError> {
    task().map_err(ExecutionError::Task)
}

/// Flatten a joined job outcome into the attempt's result.
pub(crate) fn settle<T>(
    joined: Result<Result<T, ExecutionError>, PoolError>,
) -> Result<T, ExecutionError> {
    match joined {
        Ok(inner) => inner,
        Err(PoolError::Panicked(message)) => Err(ExecutionError::Task(Box::new(TaskPanic(message)))),
        Err(other) => Err(ExecutionError::Task(Box::new(other))),
    }
}
