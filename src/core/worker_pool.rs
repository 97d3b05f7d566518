//! Carrier pool with a bounded FIFO ingress queue.
//!
//! Each pool owns a set of OS-thread carriers, spawned lazily up to the
//! pool's concurrency ceiling and kept alive for the life of the process.
//! Submitted jobs wait in a bounded FIFO queue; the offer is time-bounded and
//! non-blocking past its wait budget, so a saturated pool turns callers away
//! instead of stacking them up.
//!
//! # Design
//!
//! - **No polling**: carriers sleep on a condvar until work arrives; callers
//!   sleep on a per-job channel until the result arrives
//! - **Panic isolation**: a panicking job is captured on the carrier and
//!   reported through its [`JobHandle`]; the carrier survives
//! - **Direct path**: [`WorkerPool::submit_now`] runs a job on a dedicated
//!   carrier, bypassing the queue; the time limiter uses this so the
//!   deadline never waits behind queued work

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use parking_lot::{Condvar, Mutex};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::core::cancel::{self, CancelToken};
use crate::util::clock::deadline_after;

/// A unit of work executed on a carrier.
type Job = Box<dyn FnOnce() + Send + 'static>;

/// Errors that can occur when using a [`WorkerPool`].
#[derive(Debug, Error)]
pub enum PoolError {
    /// The ingress queue stayed full for the whole wait budget.
    #[error("task queue is full")]
    QueueFull,

    /// The job panicked on its carrier.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The job's result channel disconnected without a result. This means
    /// the job was lost before running, e.g. its carrier failed to spawn.
    #[error("job result channel disconnected")]
    Disconnected,

    /// The pool could not spawn a carrier thread to serve the job.
    #[error("no carrier available: {0}")]
    CarrierUnavailable(String),
}

/// Statistics about pool utilization.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Carriers spawned so far (queue-serving only).
    pub carriers: usize,
    /// Carriers currently parked waiting for work.
    pub idle_carriers: usize,
    /// Jobs waiting in the ingress queue.
    pub queued: usize,
    /// Jobs currently executing, including direct-carrier jobs.
    pub active: u64,
    /// Jobs accepted for execution.
    pub submitted: u64,
    /// Jobs that ran to completion.
    pub completed: u64,
    /// Jobs that panicked on a carrier.
    pub failed: u64,
    /// Jobs turned away without being queued.
    pub rejected: u64,
}

/// Internal counters for pool statistics (lock-free atomics).
#[derive(Debug, Default)]
struct PoolCounters {
    active: AtomicU64,
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
}

struct QueueState {
    jobs: VecDeque<Job>,
    carriers: usize,
    idle: usize,
}

struct PoolInner {
    name: String,
    max_queue: usize,
    carrier_cap: usize,
    state: Mutex<QueueState>,
    work_ready: Condvar,
    space_ready: Condvar,
    counters: PoolCounters,
    carrier_seq: AtomicU64,
}

/// Fixed-capacity carrier pool with a bounded FIFO ingress queue.
///
/// Cloning is cheap and shares the same pool.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

impl WorkerPool {
    /// Create a pool named `name` with at most `max_concurrent` queue-serving
    /// carriers and an ingress queue of `max_queue` slots.
    ///
    /// Carriers are spawned lazily as work arrives and live for the rest of
    /// the process. Both bounds are clamped to at least 1.
    #[must_use]
    pub fn new(name: impl Into<String>, max_concurrent: usize, max_queue: usize) -> Self {
        let name = name.into();
        let carrier_cap = max_concurrent.max(1);
        let max_queue = max_queue.max(1);
        info!(pool = %name, carrier_cap, max_queue, "worker pool created");
        Self {
            inner: Arc::new(PoolInner {
                name,
                max_queue,
                carrier_cap,
                state: Mutex::new(QueueState {
                    jobs: VecDeque::new(),
                    carriers: 0,
                    idle: 0,
                }),
                work_ready: Condvar::new(),
                space_ready: Condvar::new(),
                counters: PoolCounters::default(),
                carrier_seq: AtomicU64::new(0),
            }),
        }
    }

    /// Offer `f` to the ingress queue, blocking up to `wait` for a slot.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::QueueFull`] when the queue stayed full for the
    /// whole wait budget, or [`PoolError::CarrierUnavailable`] when no
    /// carrier exists and none could be spawned to serve the job.
    pub fn try_submit<R, F>(&self, wait: Duration, f: F) -> Result<JobHandle<R>, PoolError>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        let (job, handle) = self.package(f);
        if let Err(err) = self.offer(job, wait) {
            self.inner.counters.rejected.fetch_add(1, Ordering::Relaxed);
            warn!(pool = %self.inner.name, waited = ?wait, error = %err, "job not accepted");
            return Err(err);
        }
        self.inner.counters.submitted.fetch_add(1, Ordering::Relaxed);
        debug!(pool = %self.inner.name, "job queued");
        Ok(handle)
    }

    /// Run `f` on a dedicated carrier immediately, bypassing the queue.
    ///
    /// The carrier is spawned for this job alone and exits with it. Queue
    /// capacity does not apply; concurrency accounting stays with the
    /// admission gate that let the enclosing attempt in.
    pub fn submit_now<R, F>(&self, f: F) -> JobHandle<R>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        let (job, handle) = self.package(f);
        self.inner.counters.submitted.fetch_add(1, Ordering::Relaxed);
        let carrier_id = self.inner.carrier_seq.fetch_add(1, Ordering::Relaxed);
        let thread_name = format!("{}-direct-{carrier_id}", self.inner.name);
        let spawned = thread::Builder::new().name(thread_name).spawn(job);
        if let Err(err) = spawned {
            // The job was consumed by the failed spawn; the handle will
            // observe a disconnect.
            error!(pool = %self.inner.name, error = %err, "failed to spawn direct carrier");
        }
        handle
    }

    /// Get current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let state = self.inner.state.lock();
        PoolStats {
            carriers: state.carriers,
            idle_carriers: state.idle,
            queued: state.jobs.len(),
            active: self.inner.counters.active.load(Ordering::Relaxed),
            submitted: self.inner.counters.submitted.load(Ordering::Relaxed),
            completed: self.inner.counters.completed.load(Ordering::Relaxed),
            failed: self.inner.counters.failed.load(Ordering::Relaxed),
            rejected: self.inner.counters.rejected.load(Ordering::Relaxed),
        }
    }

    /// The pool's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Wrap `f` into a queueable job and its result handle.
    fn package<R, F>(&self, f: F) -> (Job, JobHandle<R>)
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        let (result_tx, result_rx) = bounded(1);
        let token = CancelToken::new();
        let job_token = token.clone();
        let inner = Arc::clone(&self.inner);
        let job: Job = Box::new(move || {
            let _scope = cancel::enter(job_token);
            inner.counters.active.fetch_add(1, Ordering::Relaxed);
            let outcome = catch_unwind(AssertUnwindSafe(f));
            inner.counters.active.fetch_sub(1, Ordering::Relaxed);
            match outcome {
                Ok(value) => {
                    inner.counters.completed.fetch_add(1, Ordering::Relaxed);
                    let _ = result_tx.send(Ok(value));
                }
                Err(payload) => {
                    inner.counters.failed.fetch_add(1, Ordering::Relaxed);
                    let message = panic_message(payload.as_ref());
                    warn!(pool = %inner.name, %message, "job panicked on carrier");
                    let _ = result_tx.send(Err(message));
                }
            }
        });
        (
            job,
            JobHandle {
                outcome: result_rx,
                token,
            },
        )
    }

    /// Push `job` into the bounded queue, waiting up to `wait` for space.
    fn offer(&self, job: Job, wait: Duration) -> Result<(), PoolError> {
        let inner = &self.inner;
        let deadline = deadline_after(wait);
        let mut state = inner.state.lock();
        loop {
            if state.jobs.len() < inner.max_queue {
                break;
            }
            match deadline {
                Some(at) => {
                    let now = Instant::now();
                    if now >= at {
                        return Err(PoolError::QueueFull);
                    }
                    let _ = inner.space_ready.wait_for(&mut state, at - now);
                }
                None => inner.space_ready.wait(&mut state),
            }
        }
        if state.idle == 0 && state.carriers < inner.carrier_cap {
            // Spawn before queueing: a failed spawn with no live carrier
            // would otherwise strand the job and hang its handle forever.
            match Self::spawn_carrier(inner) {
                Ok(()) => state.carriers += 1,
                Err(err) if state.carriers == 0 => return Err(err),
                Err(_) => {}
            }
        }
        state.jobs.push_back(job);
        drop(state);
        inner.work_ready.notify_one();
        Ok(())
    }

    fn spawn_carrier(inner: &Arc<PoolInner>) -> Result<(), PoolError> {
        let carrier_id = inner.carrier_seq.fetch_add(1, Ordering::Relaxed);
        let thread_name = format!("{}-carrier-{carrier_id}", inner.name);
        let worker = Arc::clone(inner);
        thread::Builder::new()
            .name(thread_name)
            .spawn(move || carrier_loop(&worker, carrier_id))
            .map(|_| ())
            .map_err(|err| {
                error!(pool = %inner.name, error = %err, "failed to spawn carrier thread");
                PoolError::CarrierUnavailable(err.to_string())
            })
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.inner.name)
            .field("carrier_cap", &self.inner.carrier_cap)
            .field("max_queue", &self.inner.max_queue)
            .finish_non_exhaustive()
    }
}

/// Handle to an in-flight job's result.
///
/// The handle is the synchronous analogue of a future: [`JobHandle::join`]
/// blocks until the job settles, [`JobHandle::join_for`] gives up after a
/// deadline without disturbing the job, and [`JobHandle::cancel`] signals
/// cooperative cancellation to the job's carrier.
pub struct JobHandle<R> {
    outcome: Receiver<Result<R, String>>,
    token: CancelToken,
}

impl<R> JobHandle<R> {
    /// Signal cancellation to the job's carrier. Best-effort: the job
    /// observes it only if it polls the ambient token.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The job's cancellation token.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Block until the job settles.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Panicked`] if the job panicked, or
    /// [`PoolError::Disconnected`] if the job was lost before running.
    pub fn join(self) -> Result<R, PoolError> {
        match self.outcome.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(message)) => Err(PoolError::Panicked(message)),
            Err(_) => Err(PoolError::Disconnected),
        }
    }

    /// Wait up to `limit` for the job to settle.
    ///
    /// Returns `None` when the limit elapses first; the job keeps running.
    pub fn join_for(&self, limit: Duration) -> Option<Result<R, PoolError>> {
        let received = match deadline_after(limit) {
            Some(at) => self.outcome.recv_deadline(at),
            None => self
                .outcome
                .recv()
                .map_err(|_| RecvTimeoutError::Disconnected),
        };
        match received {
            Ok(Ok(value)) => Some(Ok(value)),
            Ok(Err(message)) => Some(Err(PoolError::Panicked(message))),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(PoolError::Disconnected)),
        }
    }
}

fn carrier_loop(inner: &Arc<PoolInner>, carrier_id: u64) {
    debug!(pool = %inner.name, carrier_id, "carrier started");
    loop {
        let job = {
            let mut state = inner.state.lock();
            loop {
                if let Some(job) = state.jobs.pop_front() {
                    break job;
                }
                state.idle += 1;
                inner.work_ready.wait(&mut state);
                state.idle -= 1;
            }
        };
        inner.space_ready.notify_one();
        job();
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "opaque panic payload".to_string()
    }
}
