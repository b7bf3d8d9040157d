//! Lock-protected pool state: lifecycle phase, FIFO queue and worker slots.
//!
//! Every transition (assign, enqueue, dequeue, idle) happens while holding the
//! single pool mutex, so "worker became idle" and "job was enqueued" can never
//! interleave into a lost wake-up.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::core::job::{Job, JobId};

use super::handle::Completion;

/// Lifecycle of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    /// Accepting submissions.
    Accepting,
    /// Drain shutdown: running and queued jobs finish, nothing new accepted.
    Draining,
    /// Immediate shutdown: queue discarded, running jobs finish.
    Stopping,
    /// Workers exit as soon as they are idle.
    Terminated,
}

/// Worker state as seen by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkerState {
    Idle,
    Running(JobId),
}

/// Per-worker bookkeeping.
#[derive(Debug)]
pub(crate) struct WorkerSlot {
    pub state: WorkerState,
    /// Job handed over by `submit` or the completion protocol, not yet picked
    /// up by the thread.
    pub assigned: Option<Job>,
    /// Completion of the job currently assigned or running, used to deliver
    /// interrupts.
    pub current: Option<Arc<Completion>>,
}

impl WorkerSlot {
    const fn idle() -> Self {
        Self {
            state: WorkerState::Idle,
            assigned: None,
            current: None,
        }
    }

    pub fn assign(&mut self, job: Job) {
        debug_assert!(self.assigned.is_none());
        self.state = WorkerState::Running(job.id);
        self.current = Some(Arc::clone(&job.completion));
        self.assigned = Some(job);
    }

    pub fn release(&mut self) {
        self.state = WorkerState::Idle;
        self.current = None;
    }

    pub const fn is_idle(&self) -> bool {
        matches!(self.state, WorkerState::Idle)
    }
}

/// Everything guarded by the pool mutex.
#[derive(Debug)]
pub(crate) struct PoolState {
    pub phase: Phase,
    pub queue: VecDeque<Job>,
    pub workers: Vec<WorkerSlot>,
    pub next_job_id: JobId,
}

impl PoolState {
    pub fn new(worker_count: usize, queue_capacity: usize) -> Self {
        Self {
            phase: Phase::Accepting,
            queue: VecDeque::with_capacity(queue_capacity.min(4096)),
            workers: (0..worker_count).map(|_| WorkerSlot::idle()).collect(),
            next_job_id: 0,
        }
    }

    /// Lowest-index idle worker.
    pub fn idle_worker(&self) -> Option<usize> {
        self.workers.iter().position(WorkerSlot::is_idle)
    }

    pub fn running_count(&self) -> usize {
        self.workers.iter().filter(|w| !w.is_idle()).count()
    }

    /// No job running and none queued.
    pub fn is_quiescent(&self) -> bool {
        self.queue.is_empty() && self.workers.iter().all(WorkerSlot::is_idle)
    }

    pub fn is_running(&self, job_id: JobId) -> bool {
        self.workers
            .iter()
            .any(|w| w.state == WorkerState::Running(job_id))
    }

    /// Remove a queued job by id, preserving the order of the others.
    pub fn remove_queued(&mut self, job_id: JobId) -> Option<Job> {
        let idx = self.queue.iter().position(|job| job.id == job_id)?;
        self.queue.remove(idx)
    }

    /// Raise the interrupt of every running job and return their completions.
    ///
    /// A body may already have returned while its worker waits for the lock,
    /// so a raised job can still end `Completed`. Callers count the outcomes,
    /// not the raises.
    pub fn interrupt_running(&self) -> Vec<Arc<Completion>> {
        let mut raised = Vec::new();
        for completion in self.workers.iter().filter_map(|w| w.current.as_ref()) {
            if !completion.is_finished() {
                completion.interrupt().raise();
                raised.push(Arc::clone(completion));
            }
        }
        raised
    }
}
