//! Fixed-size worker pool with a bounded FIFO queue.
//!
//! `WorkerPool` owns `worker_count` dedicated OS threads created up front and
//! a queue of at most `queue_capacity` pending jobs.
//!
//! # Key Features
//!
//! - **Non-blocking submit**: one lock, O(1) check-and-mutate, then return
//! - **Rejection on overflow**: no hidden unbounded buffering
//! - **Job isolation**: errors and panics stay inside the job that raised them
//! - **Explicit join**: per-job [`JobHandle`], [`WorkerPool::wait_idle`] and
//!   drain shutdown instead of sleeping for a guessed duration
//!
//! # Example
//!
//! ```rust
//! use bounded_pool::config::WorkerPoolConfig;
//! use bounded_pool::core::{Placement, ShutdownMode, WorkerPool};
//! use std::time::Duration;
//!
//! let pool = WorkerPool::with_config(
//!     WorkerPoolConfig::new()
//!         .with_worker_count(2)
//!         .with_queue_capacity(100),
//! )
//! .unwrap();
//!
//! let handles: Vec<_> = (1..=3)
//!     .map(|_| pool.submit(|ctx| ctx.sleep(Duration::from_millis(50))).unwrap())
//!     .collect();
//! assert!(matches!(handles[2].placement(), Placement::Queued { .. }));
//!
//! let report = pool.shutdown(ShutdownMode::Drain);
//! assert!(!report.timed_out);
//! assert!(handles.iter().all(|h| h.outcome().is_some_and(|o| o.is_success())));
//! ```

mod handle;
mod state;
mod worker;

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::WorkerPoolConfig;
use crate::core::diagnostics::{DiagnosticsSink, EventKind, JobEvent, TracingSink};
use crate::core::error::{JobError, PoolError, PoolResult};
use crate::core::job::{Job, JobContext, JobOutcome};
use crate::util::clock::now_ms;

pub(crate) use handle::Completion;
pub use handle::{CancelResult, JobHandle};
use state::{Phase, PoolState};

/// How long shutdown waits for worker threads to exit once they have been
/// told to stop.
const JOIN_GRACE: Duration = Duration::from_secs(2);

/// Where an accepted job went.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Handed straight to an idle worker.
    Immediate {
        /// Index of the worker running the job.
        worker_id: usize,
    },
    /// Appended to the queue behind `position` other jobs.
    Queued {
        /// 0-based queue position at enqueue time.
        position: usize,
    },
}

/// Shutdown behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownMode {
    /// Finish running and queued jobs (bounded by the drain timeout).
    Drain,
    /// Cancel queued jobs; let running jobs finish (bounded by the drain
    /// timeout).
    Immediate,
}

/// Summary of a shutdown call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutdownReport {
    /// Requested mode.
    pub mode: ShutdownMode,
    /// Queued jobs that were cancelled without running.
    pub cancelled: usize,
    /// Running jobs that stopped with `Interrupted` after the drain deadline
    /// raised their interrupt. Jobs that ignore the interrupt are not counted.
    pub interrupted: usize,
    /// Whether the drain deadline elapsed before the pool went idle.
    pub timed_out: bool,
    /// `true` when an earlier call had already shut the pool down; such a
    /// call does nothing.
    pub already_shut_down: bool,
    /// Wall-clock time spent in this call.
    pub elapsed: Duration,
}

impl ShutdownReport {
    const fn noop(mode: ShutdownMode) -> Self {
        Self {
            mode,
            cancelled: 0,
            interrupted: 0,
            timed_out: false,
            already_shut_down: true,
            elapsed: Duration::ZERO,
        }
    }
}

/// Statistics about pool utilization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Number of worker threads.
    pub worker_count: usize,
    /// Queue capacity.
    pub queue_capacity: usize,
    /// Workers currently running a job.
    pub running: usize,
    /// Workers currently idle.
    pub idle: usize,
    /// Jobs waiting in the queue.
    pub queued: usize,
    /// Total jobs accepted.
    pub submitted: u64,
    /// Total jobs that completed successfully.
    pub completed: u64,
    /// Total jobs that returned an error or panicked.
    pub failed: u64,
    /// Total jobs stopped by an interrupt.
    pub interrupted: u64,
    /// Total submissions rejected because the pool was saturated.
    pub rejected: u64,
    /// Total queued jobs cancelled before they started.
    pub cancelled: u64,
}

/// Monotonic totals (lock-free atomics).
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub submitted: AtomicU64,
    pub completed: AtomicU64,
    pub failed: AtomicU64,
    pub interrupted: AtomicU64,
    pub rejected: AtomicU64,
    pub cancelled: AtomicU64,
}

impl PoolCounters {
    /// Fill the totals of jobs that have ended. `submitted` is read
    /// separately, under the pool lock, after these.
    fn fill(&self, stats: &mut PoolStats) {
        stats.completed = self.completed.load(Ordering::Acquire);
        stats.failed = self.failed.load(Ordering::Acquire);
        stats.interrupted = self.interrupted.load(Ordering::Acquire);
        stats.cancelled = self.cancelled.load(Ordering::Acquire);
        stats.rejected = self.rejected.load(Ordering::Relaxed);
    }
}

/// State shared by the pool, its workers and job handles.
pub(crate) struct Shared {
    config: WorkerPoolConfig,
    /// Queue, worker slots and phase under one mutex.
    state: Mutex<PoolState>,
    /// One condvar per worker, signalled when it receives an assignment or
    /// the pool terminates.
    signals: Vec<Condvar>,
    /// Signalled when the pool becomes quiescent.
    idle: Condvar,
    counters: PoolCounters,
    sink: Arc<dyn DiagnosticsSink>,
}

impl Shared {
    fn pool_name(&self) -> &str {
        &self.config.name_prefix
    }

    /// Deliver an event. A panicking sink is contained here.
    fn emit(&self, event: JobEvent) {
        let sink = &self.sink;
        if panic::catch_unwind(AssertUnwindSafe(|| sink.record(&event))).is_err() {
            warn!(job_id = event.job_id, kind = ?event.kind, "Diagnostics sink panicked");
        }
    }

    /// Finish a job that was taken off the queue without running.
    fn cancel_job(&self, job: Job) {
        self.counters.cancelled.fetch_add(1, Ordering::Release);
        job.completion.finish(JobOutcome::Cancelled);
        debug!(job_id = job.id, "Queued job cancelled");
        self.emit(JobEvent::new(self.pool_name(), job.id, EventKind::Cancelled).finished_now());
    }

    /// Block until no job is running or queued, or until `deadline`. A
    /// `None` deadline waits without limit. Returns whether the pool is
    /// quiescent.
    fn wait_quiescent_until(&self, deadline: Option<Instant>) -> bool {
        let mut state = self.state.lock();
        while !state.is_quiescent() {
            match deadline {
                Some(deadline) => {
                    if self.idle.wait_until(&mut state, deadline).timed_out() {
                        return state.is_quiescent();
                    }
                }
                None => self.idle.wait(&mut state),
            }
        }
        true
    }

    fn notify_all_workers(&self) {
        for signal in &self.signals {
            signal.notify_all();
        }
    }
}

/// Worker pool with dedicated OS threads and a bounded FIFO queue.
///
/// Share it between submitters with `Arc<WorkerPool>`; every method takes
/// `&self`.
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Create a pool that reports to `sink`.
    ///
    /// Spawns all `config.worker_count` threads before returning; they start
    /// idle.
    ///
    /// # Errors
    ///
    /// - `PoolError::InvalidConfig` if the configuration is invalid
    /// - `PoolError::Spawn` if a thread could not be created; threads spawned
    ///   so far are stopped and joined
    pub fn new(config: WorkerPoolConfig, sink: Arc<dyn DiagnosticsSink>) -> PoolResult<Self> {
        config.validate().map_err(PoolError::InvalidConfig)?;

        let shared = Arc::new(Shared {
            state: Mutex::new(PoolState::new(config.worker_count, config.queue_capacity)),
            signals: (0..config.worker_count).map(|_| Condvar::new()).collect(),
            idle: Condvar::new(),
            counters: PoolCounters::default(),
            sink,
            config,
        });

        let worker_count = shared.config.worker_count;
        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            match worker::spawn_worker(Arc::clone(&shared), worker_id) {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    shared.state.lock().phase = Phase::Terminated;
                    shared.notify_all_workers();
                    for handle in workers {
                        let _ = handle.join();
                    }
                    return Err(PoolError::Spawn(e.to_string()));
                }
            }
        }

        info!(
            pool = %shared.config.name_prefix,
            worker_count = worker_count,
            queue_capacity = shared.config.queue_capacity,
            "WorkerPool initialized"
        );

        Ok(Self {
            shared,
            workers: Mutex::new(workers),
        })
    }

    /// Create a pool that reports through `tracing`.
    ///
    /// # Errors
    ///
    /// See [`WorkerPool::new`].
    pub fn with_config(config: WorkerPoolConfig) -> PoolResult<Self> {
        Self::new(config, Arc::new(TracingSink))
    }

    /// Submit a job.
    ///
    /// Never waits for a worker: the job is handed to the lowest-index idle
    /// worker, else appended to the queue, else rejected.
    ///
    /// # Errors
    ///
    /// - `PoolError::Rejected` if all workers are busy and the queue is full
    /// - `PoolError::Shutdown` if shutdown has been initiated
    pub fn submit<F>(&self, body: F) -> PoolResult<JobHandle>
    where
        F: FnOnce(&JobContext) -> Result<(), JobError> + Send + 'static,
    {
        let completion = Arc::new(Completion::new());
        let capacity = self.shared.config.queue_capacity;

        let mut state = self.shared.state.lock();
        if state.phase != Phase::Accepting {
            return Err(PoolError::Shutdown);
        }

        let id = state.next_job_id;
        state.next_job_id += 1;
        let job = Job {
            id,
            submitted_at_ms: now_ms(),
            body: Box::new(body),
            completion: Arc::clone(&completion),
        };

        let placement = if let Some(worker_id) = state.idle_worker() {
            state.workers[worker_id].assign(job);
            self.shared.signals[worker_id].notify_one();
            Placement::Immediate { worker_id }
        } else if state.queue.len() < capacity {
            let position = state.queue.len();
            state.queue.push_back(job);
            Placement::Queued { position }
        } else {
            drop(state);
            drop(job);
            self.shared.counters.rejected.fetch_add(1, Ordering::Relaxed);
            self.shared
                .emit(JobEvent::new(self.shared.pool_name(), id, EventKind::Rejected).finished_now());
            return Err(PoolError::Rejected { capacity });
        };
        // Counted under the lock so no worker can finish the job first.
        self.shared.counters.submitted.fetch_add(1, Ordering::Relaxed);
        drop(state);

        debug!(job_id = id, placement = ?placement, "Job submitted");
        let mut event = JobEvent::new(self.shared.pool_name(), id, EventKind::Submitted);
        if let Placement::Immediate { worker_id } = placement {
            event = event.on_worker(worker_id);
        }
        self.shared.emit(event);

        Ok(JobHandle::new(
            id,
            placement,
            completion,
            Arc::downgrade(&self.shared),
        ))
    }

    /// Fire-and-forget submission of an infallible closure.
    ///
    /// # Errors
    ///
    /// Same as [`WorkerPool::submit`].
    pub fn execute<F>(&self, f: F) -> PoolResult<Placement>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(move |_| {
            f();
            Ok(())
        })
        .map(|handle| handle.placement())
    }

    /// Current utilization snapshot.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let mut stats = PoolStats::default();
        // Ended-job totals first: every job they count is already in
        // `submitted` by the time the lock is taken.
        self.shared.counters.fill(&mut stats);

        let state = self.shared.state.lock();
        let running = state.running_count();
        stats.worker_count = state.workers.len();
        stats.queue_capacity = self.shared.config.queue_capacity;
        stats.running = running;
        stats.idle = state.workers.len() - running;
        stats.queued = state.queue.len();
        stats.submitted = self.shared.counters.submitted.load(Ordering::Relaxed);
        stats
    }

    /// Configuration the pool was built with.
    #[must_use]
    pub fn config(&self) -> &WorkerPoolConfig {
        &self.shared.config
    }

    /// Whether shutdown has been initiated.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shared.state.lock().phase != Phase::Accepting
    }

    /// Block until no job is running or queued.
    ///
    /// The pool keeps accepting work; this is a join point, not a shutdown.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Timeout` if work is still pending after `timeout`.
    pub fn wait_idle(&self, timeout: Duration) -> PoolResult<()> {
        if self
            .shared
            .wait_quiescent_until(Instant::now().checked_add(timeout))
        {
            Ok(())
        } else {
            Err(PoolError::Timeout)
        }
    }

    /// Shut the pool down.
    ///
    /// Submissions fail with `PoolError::Shutdown` from the moment this is
    /// called. With [`ShutdownMode::Drain`] running and queued jobs finish;
    /// with [`ShutdownMode::Immediate`] queued jobs are cancelled and only
    /// running jobs finish. Either way the wait is bounded by the configured
    /// drain timeout, after which leftover queued jobs are cancelled and
    /// running jobs are interrupted. Worker threads are then joined.
    ///
    /// Idempotent: later calls return immediately with
    /// `already_shut_down = true`.
    pub fn shutdown(&self, mode: ShutdownMode) -> ShutdownReport {
        let start = Instant::now();

        let discarded = {
            let mut state = self.shared.state.lock();
            if state.phase != Phase::Accepting {
                return ShutdownReport::noop(mode);
            }
            match mode {
                ShutdownMode::Drain => {
                    state.phase = Phase::Draining;
                    Vec::new()
                }
                ShutdownMode::Immediate => {
                    state.phase = Phase::Stopping;
                    state.queue.drain(..).collect::<Vec<_>>()
                }
            }
        };

        info!(
            pool = %self.shared.config.name_prefix,
            mode = ?mode,
            discarded = discarded.len(),
            "Shutting down worker pool"
        );

        let mut cancelled = discarded.len();
        for job in discarded {
            self.shared.cancel_job(job);
        }

        let deadline = start.checked_add(self.shared.config.drain_timeout());
        let timed_out = !self.shared.wait_quiescent_until(deadline);
        let mut signalled = Vec::new();
        if timed_out {
            let leftovers = {
                let mut state = self.shared.state.lock();
                signalled = state.interrupt_running();
                state.queue.drain(..).collect::<Vec<_>>()
            };
            warn!(
                signalled = signalled.len(),
                cancelled = leftovers.len(),
                "Drain timeout elapsed; interrupting running jobs"
            );
            cancelled += leftovers.len();
            for job in leftovers {
                self.shared.cancel_job(job);
            }
        }

        self.shared.state.lock().phase = Phase::Terminated;
        self.shared.notify_all_workers();
        self.join_workers();

        let interrupted = signalled
            .iter()
            .filter(|c| c.peek() == Some(JobOutcome::Interrupted))
            .count();
        let report = ShutdownReport {
            mode,
            cancelled,
            interrupted,
            timed_out,
            already_shut_down: false,
            elapsed: start.elapsed(),
        };
        info!(
            cancelled = report.cancelled,
            interrupted = report.interrupted,
            timed_out = report.timed_out,
            elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
            "Worker pool shut down complete"
        );
        report
    }

    /// Shorthand for `shutdown(ShutdownMode::Drain)`.
    pub fn shutdown_drain(&self) -> ShutdownReport {
        self.shutdown(ShutdownMode::Drain)
    }

    /// Shorthand for `shutdown(ShutdownMode::Immediate)`.
    pub fn shutdown_now(&self) -> ShutdownReport {
        self.shutdown(ShutdownMode::Immediate)
    }

    /// Join every worker thread, giving them [`JOIN_GRACE`] in total.
    /// Workers still busy at the deadline are detached.
    fn join_workers(&self) {
        let workers: Vec<_> = self.workers.lock().drain(..).collect();
        let worker_count = workers.len();
        let (tx, rx) = crossbeam_channel::bounded(worker_count.max(1));
        let current = thread::current().id();

        let mut pending = 0;
        for (idx, worker) in workers.into_iter().enumerate() {
            if worker.thread().id() == current {
                // Shutdown called from inside a job; this thread cannot join
                // itself.
                continue;
            }
            let tx = tx.clone();
            pending += 1;
            thread::spawn(move || {
                let _ = tx.send((idx, worker.join().is_ok()));
            });
        }
        drop(tx);

        let deadline = Instant::now() + JOIN_GRACE;
        while pending > 0 {
            match rx.recv_deadline(deadline) {
                Ok((idx, true)) => debug!(worker_id = idx, "Worker joined successfully"),
                Ok((idx, false)) => warn!(worker_id = idx, "Worker panicked"),
                Err(_) => {
                    warn!(remaining = pending, "Workers did not exit within grace period - detaching");
                    break;
                }
            }
            pending -= 1;
        }

        debug!(worker_count = worker_count, "Worker threads released");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Signal termination but don't join: running jobs finish on detached
        // threads. Explicit shutdown() is required for a graceful stop.
        let discarded = {
            let mut state = self.shared.state.lock();
            if state.phase == Phase::Terminated {
                return;
            }
            state.phase = Phase::Terminated;
            state.queue.drain(..).collect::<Vec<_>>()
        };
        self.shared.notify_all_workers();
        for job in discarded {
            self.shared.cancel_job(job);
        }
        debug!("WorkerPool dropped without explicit shutdown - workers will be detached");
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("config", &self.shared.config)
            .field("stats", &self.stats())
            .finish()
    }
}
