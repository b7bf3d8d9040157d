//! Per-job completion slot and the caller-facing [`JobHandle`].

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::core::error::{PoolError, PoolResult};
use crate::core::job::{InterruptSignal, JobId, JobOutcome};

use super::{Placement, Shared};

/// Outcome slot shared between the worker running a job and its handles.
///
/// Mutex + Condvar so blocking waiters sleep instead of polling.
#[derive(Debug, Default)]
pub(crate) struct Completion {
    outcome: Mutex<Option<JobOutcome>>,
    condvar: Condvar,
    interrupt: Arc<InterruptSignal>,
}

impl Completion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interrupt(&self) -> Arc<InterruptSignal> {
        Arc::clone(&self.interrupt)
    }

    /// Store the outcome and wake waiters. The first outcome wins.
    pub fn finish(&self, outcome: JobOutcome) {
        let mut slot = self.outcome.lock();
        if slot.is_none() {
            *slot = Some(outcome);
        }
        self.condvar.notify_all();
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.lock().is_some()
    }

    pub fn peek(&self) -> Option<JobOutcome> {
        self.outcome.lock().clone()
    }

    pub fn wait(&self) -> JobOutcome {
        let mut slot = self.outcome.lock();
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            self.condvar.wait(&mut slot);
        }
    }

    pub fn wait_timeout(&self, timeout: Duration) -> PoolResult<JobOutcome> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return Ok(self.wait());
        };
        let mut slot = self.outcome.lock();
        loop {
            if let Some(outcome) = slot.as_ref() {
                return Ok(outcome.clone());
            }
            if self.condvar.wait_until(&mut slot, deadline).timed_out() {
                return slot.clone().ok_or(PoolError::Timeout);
            }
        }
    }
}

/// Result of [`JobHandle::cancel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelResult {
    /// The job was still queued and has been removed; it will never run.
    Dequeued,
    /// The job is running; its interrupt has been raised.
    Interrupted,
    /// The job already finished (or the pool is gone); nothing changed.
    AlreadyFinished,
}

/// Handle to an accepted job.
///
/// Dropping the handle does not affect the job. Clones observe the same
/// outcome.
#[derive(Debug, Clone)]
pub struct JobHandle {
    id: JobId,
    placement: Placement,
    completion: Arc<Completion>,
    pool: Weak<Shared>,
}

impl JobHandle {
    pub(crate) const fn new(
        id: JobId,
        placement: Placement,
        completion: Arc<Completion>,
        pool: Weak<Shared>,
    ) -> Self {
        Self {
            id,
            placement,
            completion,
            pool,
        }
    }

    /// Job id assigned at submission.
    #[must_use]
    pub const fn id(&self) -> JobId {
        self.id
    }

    /// Where the job went when it was accepted.
    #[must_use]
    pub const fn placement(&self) -> Placement {
        self.placement
    }

    /// The outcome, if the job has finished. Never blocks.
    #[must_use]
    pub fn outcome(&self) -> Option<JobOutcome> {
        self.completion.peek()
    }

    /// Whether the job has reached a final outcome.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.completion.is_finished()
    }

    /// Block until the job finishes.
    pub fn wait(&self) -> JobOutcome {
        self.completion.wait()
    }

    /// Block until the job finishes or `timeout` elapses.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Timeout`] if the job is still pending at the
    /// deadline.
    pub fn wait_timeout(&self, timeout: Duration) -> PoolResult<JobOutcome> {
        self.completion.wait_timeout(timeout)
    }

    /// Await the outcome from async code.
    ///
    /// The condvar wait is moved to tokio's blocking pool so the calling
    /// runtime is never blocked.
    ///
    /// # Errors
    ///
    /// - [`PoolError::Timeout`] if the job is still pending at the deadline
    /// - [`PoolError::Internal`] if the blocking wait could not be joined
    #[cfg(feature = "tokio-runtime")]
    pub async fn wait_async(&self, timeout: Duration) -> PoolResult<JobOutcome> {
        if let Some(outcome) = self.completion.peek() {
            return Ok(outcome);
        }
        let completion = Arc::clone(&self.completion);
        tokio::task::spawn_blocking(move || completion.wait_timeout(timeout))
            .await
            .map_err(|e| PoolError::Internal(format!("wait task failed: {e}")))?
    }

    /// Cancel the job.
    ///
    /// A queued job is removed atomically with respect to workers dequeuing,
    /// so it is guaranteed never to start. A running job is interrupted; it
    /// stops at its next [`JobContext::sleep`](crate::core::JobContext::sleep)
    /// or checkpoint.
    pub fn cancel(&self) -> CancelResult {
        if self.completion.is_finished() {
            return CancelResult::AlreadyFinished;
        }
        let Some(shared) = self.pool.upgrade() else {
            return CancelResult::AlreadyFinished;
        };

        let mut state = shared.state.lock();
        if let Some(job) = state.remove_queued(self.id) {
            drop(state);
            shared.cancel_job(job);
            return CancelResult::Dequeued;
        }
        if state.is_running(self.id) {
            self.completion.interrupt().raise();
            return CancelResult::Interrupted;
        }
        CancelResult::AlreadyFinished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_completion_first_outcome_wins() {
        let completion = Completion::new();
        completion.finish(JobOutcome::Completed);
        completion.finish(JobOutcome::Cancelled);
        assert_eq!(completion.peek(), Some(JobOutcome::Completed));
    }

    #[test]
    fn test_completion_wait_timeout() {
        let completion = Completion::new();
        let result = completion.wait_timeout(Duration::from_millis(20));
        assert!(matches!(result, Err(PoolError::Timeout)));
    }

    #[test]
    fn test_completion_wait_timeout_without_limit() {
        let completion = Arc::new(Completion::new());
        let finisher = Arc::clone(&completion);
        let t = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            finisher.finish(JobOutcome::Completed);
        });
        assert_eq!(
            completion.wait_timeout(Duration::MAX).unwrap(),
            JobOutcome::Completed
        );
        t.join().unwrap();
    }

    #[test]
    fn test_completion_wakes_waiter() {
        let completion = Arc::new(Completion::new());
        let finisher = Arc::clone(&completion);
        let t = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            finisher.finish(JobOutcome::Failed("boom".into()));
        });
        assert_eq!(completion.wait(), JobOutcome::Failed("boom".into()));
        t.join().unwrap();
    }
}
