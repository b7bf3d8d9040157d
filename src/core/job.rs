//! Job representation and the context handed to running job bodies.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};

use super::JobError;

/// Identifier assigned by the pool at submission, starting from 0.
pub type JobId = u64;

/// Boxed job body.
pub type JobFn = Box<dyn FnOnce(&JobContext) -> Result<(), JobError> + Send + 'static>;

/// Final state of a job, as observed through its handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "reason")]
pub enum JobOutcome {
    /// The body returned `Ok(())`.
    Completed,
    /// The body returned an error.
    Failed(String),
    /// The body panicked.
    Panicked(String),
    /// The body observed an interrupt and stopped.
    Interrupted,
    /// The job was removed from the queue before it started.
    Cancelled,
}

impl JobOutcome {
    /// `true` only for [`JobOutcome::Completed`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Cooperative cancellation flag for one job.
///
/// Raised by [`JobHandle::cancel`](crate::core::JobHandle::cancel) or by a
/// shutdown whose drain deadline elapsed. Once raised it stays raised.
#[derive(Debug, Default)]
pub(crate) struct InterruptSignal {
    raised: Mutex<bool>,
    condvar: Condvar,
}

impl InterruptSignal {
    pub(crate) fn raise(&self) {
        let mut raised = self.raised.lock();
        *raised = true;
        self.condvar.notify_all();
    }

    pub(crate) fn is_raised(&self) -> bool {
        *self.raised.lock()
    }

    /// Block for up to `timeout`. Returns `true` if the signal was raised.
    /// A timeout too large to express as an `Instant` waits for the raise.
    fn wait_for(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut raised = self.raised.lock();
        while !*raised {
            match deadline {
                Some(deadline) => {
                    if self.condvar.wait_until(&mut raised, deadline).timed_out() {
                        break;
                    }
                }
                None => self.condvar.wait(&mut raised),
            }
        }
        *raised
    }
}

/// View of the running job passed to its body.
pub struct JobContext {
    job_id: JobId,
    worker_id: usize,
    interrupt: Arc<InterruptSignal>,
}

impl JobContext {
    pub(crate) const fn new(job_id: JobId, worker_id: usize, interrupt: Arc<InterruptSignal>) -> Self {
        Self {
            job_id,
            worker_id,
            interrupt,
        }
    }

    /// Id of the job being executed.
    #[must_use]
    pub const fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Index of the worker executing the job.
    #[must_use]
    pub const fn worker_id(&self) -> usize {
        self.worker_id
    }

    /// Whether an interrupt has been requested for this job.
    ///
    /// CPU-bound bodies should poll this between units of work.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.interrupt.is_raised()
    }

    /// Sleep for `duration`, waking early if the job is interrupted.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::Interrupted`] if an interrupt was raised before or
    /// during the wait. The flag stays set afterwards.
    pub fn sleep(&self, duration: Duration) -> Result<(), JobError> {
        if self.interrupt.wait_for(duration) {
            Err(JobError::Interrupted)
        } else {
            Ok(())
        }
    }

    /// Return [`JobError::Interrupted`] if an interrupt is pending.
    ///
    /// # Errors
    ///
    /// Fails when the job has been interrupted.
    pub fn checkpoint(&self) -> Result<(), JobError> {
        if self.is_interrupted() {
            Err(JobError::Interrupted)
        } else {
            Ok(())
        }
    }
}

impl fmt::Debug for JobContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobContext")
            .field("job_id", &self.job_id)
            .field("worker_id", &self.worker_id)
            .field("interrupted", &self.is_interrupted())
            .finish()
    }
}

/// A job owned by the pool between submission and start.
pub(crate) struct Job {
    pub id: JobId,
    pub submitted_at_ms: u128,
    pub body: JobFn,
    pub completion: Arc<super::worker_pool::Completion>,
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("submitted_at_ms", &self.submitted_at_ms)
            .finish_non_exhaustive()
    }
}
