//! Worker threads: wait for an assignment, run it, apply the completion
//! protocol.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::MutexGuard;
use tracing::debug;

use crate::core::diagnostics::{EventKind, JobEvent};
use crate::core::error::JobError;
use crate::core::job::{Job, JobContext, JobOutcome};
use crate::util::clock::now_ms;

use super::state::{Phase, PoolState};
use super::Shared;

/// Spawn the OS thread for worker `worker_id`.
pub(super) fn spawn_worker(shared: Arc<Shared>, worker_id: usize) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("{}{worker_id}", shared.config.name_prefix))
        .stack_size(shared.config.thread_stack_size)
        .spawn(move || run_worker(&shared, worker_id))
}

fn run_worker(shared: &Shared, worker_id: usize) {
    debug!(worker_id = worker_id, "Worker thread started");

    let mut state = shared.state.lock();
    loop {
        let Some(job) = state.workers[worker_id].assigned.take() else {
            if state.phase == Phase::Terminated {
                break;
            }
            // Idle: sleep until submit or the completion protocol hands us a job.
            shared.signals[worker_id].wait(&mut state);
            continue;
        };

        let completion = Arc::clone(&job.completion);
        let outcome = MutexGuard::unlocked(&mut state, || execute_job(shared, worker_id, job));

        complete(shared, &mut state, worker_id);
        completion.finish(outcome);
    }
    drop(state);

    debug!(worker_id = worker_id, "Worker thread exiting");
}

/// Completion protocol, run under the pool lock: take the queue head if
/// there is one, otherwise go idle.
fn complete(shared: &Shared, state: &mut MutexGuard<'_, PoolState>, worker_id: usize) {
    state.workers[worker_id].release();
    if let Some(next) = state.queue.pop_front() {
        debug!(worker_id = worker_id, job_id = next.id, "Worker dequeued job");
        state.workers[worker_id].assign(next);
    } else if state.is_quiescent() {
        shared.idle.notify_all();
    }
}

/// Run one job body with panics and errors contained.
fn execute_job(shared: &Shared, worker_id: usize, job: Job) -> JobOutcome {
    let Job {
        id,
        submitted_at_ms,
        body,
        completion,
    } = job;
    let started_at_ms = now_ms();

    debug!(
        worker_id = worker_id,
        job_id = id,
        waited_ms = started_at_ms.saturating_sub(submitted_at_ms),
        "Worker executing job"
    );
    shared.emit(
        JobEvent::new(shared.pool_name(), id, EventKind::Started)
            .on_worker(worker_id)
            .started_at(started_at_ms),
    );

    let interrupt = completion.interrupt();
    let ctx = JobContext::new(id, worker_id, Arc::clone(&interrupt));
    let result = panic::catch_unwind(AssertUnwindSafe(|| body(&ctx)));

    let (outcome, kind, error) = match result {
        Ok(Ok(())) => (JobOutcome::Completed, EventKind::Completed, None),
        Ok(Err(JobError::Interrupted)) => {
            // Keep the flag set so later observers see the cancellation.
            interrupt.raise();
            (JobOutcome::Interrupted, EventKind::Interrupted, None)
        }
        Ok(Err(JobError::Failed(err))) => {
            let message = format!("{err:#}");
            (JobOutcome::Failed(message.clone()), EventKind::Failed, Some(message))
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            (JobOutcome::Panicked(message.clone()), EventKind::Failed, Some(message))
        }
    };

    let counter = match kind {
        EventKind::Completed => &shared.counters.completed,
        EventKind::Interrupted => &shared.counters.interrupted,
        _ => &shared.counters.failed,
    };
    counter.fetch_add(1, Ordering::Release);

    let mut event = JobEvent::new(shared.pool_name(), id, kind)
        .on_worker(worker_id)
        .started_at(started_at_ms)
        .finished_now();
    if let Some(error) = error {
        event = event.with_error(error);
    }
    shared.emit(event);

    outcome
}

/// Best-effort text of a panic payload.
pub(super) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "job panicked".to_string()
    }
}
