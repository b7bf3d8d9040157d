//! Diagnostics sinks.
//!
//! The pool reports job lifecycle as discrete [`JobEvent`] records and never
//! talks to a logging backend directly. Pick a sink: [`TracingSink`] for logs,
//! [`InMemorySink`] for tests and dev, [`ChannelSink`] to consume events on
//! another thread, or any `Fn(&JobEvent)` closure as an error callback.

use std::collections::VecDeque;

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use super::JobId;
use crate::util::clock::now_ms;

/// Kind of lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Job accepted (assigned or queued). Recorded by the submitting thread,
    /// so it can interleave with the worker's events for the same job.
    Submitted,
    /// Job started on a worker.
    Started,
    /// Job body returned `Ok`.
    Completed,
    /// Job body returned an error or panicked.
    Failed,
    /// Job stopped because of an interrupt.
    Interrupted,
    /// Submission refused because the pool was saturated.
    Rejected,
    /// Queued job removed before it started.
    Cancelled,
}

impl EventKind {
    /// `true` for kinds that end a job's lifecycle.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Interrupted | Self::Rejected | Self::Cancelled
        )
    }
}

/// A single lifecycle record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEvent {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Name prefix of the emitting pool.
    pub pool: String,
    /// Worker involved, if any.
    pub worker_id: Option<usize>,
    /// Job the event refers to. Rejected submissions carry the id they would
    /// have received.
    pub job_id: JobId,
    /// What happened.
    pub kind: EventKind,
    /// When the job started (ms since epoch), if it did.
    pub started_at_ms: Option<u128>,
    /// When the job ended (ms since epoch), for terminal events.
    pub finished_at_ms: Option<u128>,
    /// Error text for failures.
    pub error: Option<String>,
}

impl JobEvent {
    /// Build an event stamped with a fresh id.
    #[must_use]
    pub fn new(pool: impl Into<String>, job_id: JobId, kind: EventKind) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            pool: pool.into(),
            worker_id: None,
            job_id,
            kind,
            started_at_ms: None,
            finished_at_ms: None,
            error: None,
        }
    }

    /// Attach the worker index.
    #[must_use]
    pub const fn on_worker(mut self, worker_id: usize) -> Self {
        self.worker_id = Some(worker_id);
        self
    }

    /// Attach the start timestamp.
    #[must_use]
    pub const fn started_at(mut self, started_at_ms: u128) -> Self {
        self.started_at_ms = Some(started_at_ms);
        self
    }

    /// Stamp the end timestamp with the current time.
    #[must_use]
    pub fn finished_now(mut self) -> Self {
        self.finished_at_ms = Some(now_ms());
        self
    }

    /// Attach an error message.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Wall-clock run time, when both timestamps are present.
    #[must_use]
    pub fn duration_ms(&self) -> Option<u128> {
        match (self.started_at_ms, self.finished_at_ms) {
            (Some(start), Some(end)) => Some(end.saturating_sub(start)),
            _ => None,
        }
    }
}

/// Receiver of lifecycle events.
///
/// Called from worker threads and from submitting threads, never while the
/// pool lock is held. Implementations should return quickly.
pub trait DiagnosticsSink: Send + Sync {
    /// Record an event.
    fn record(&self, event: &JobEvent);
}

impl<F> DiagnosticsSink for F
where
    F: Fn(&JobEvent) + Send + Sync,
{
    fn record(&self, event: &JobEvent) {
        self(event);
    }
}

/// Sink that forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn record(&self, event: &JobEvent) {
        match event.kind {
            EventKind::Failed | EventKind::Interrupted => warn!(
                pool = %event.pool,
                worker_id = ?event.worker_id,
                job_id = event.job_id,
                kind = ?event.kind,
                error = event.error.as_deref().unwrap_or(""),
                "Job did not complete"
            ),
            EventKind::Rejected => warn!(
                pool = %event.pool,
                job_id = event.job_id,
                "Job rejected: pool saturated"
            ),
            kind => debug!(
                pool = %event.pool,
                worker_id = ?event.worker_id,
                job_id = event.job_id,
                kind = ?kind,
                duration_ms = ?event.duration_ms(),
                "Job event"
            ),
        }
    }
}

/// Bounded in-memory sink for testing and dev. Oldest events are dropped
/// once `max_events` is reached.
#[derive(Debug)]
pub struct InMemorySink {
    events: Mutex<VecDeque<JobEvent>>,
    max_events: usize,
}

impl InMemorySink {
    /// Create a sink holding at most `max_events` events.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(max_events.min(1024))),
            max_events,
        }
    }

    /// Snapshot of stored events, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<JobEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Stored events of one kind, oldest first.
    #[must_use]
    pub fn events_of(&self, kind: EventKind) -> Vec<JobEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    /// Number of stored events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether no events are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl DiagnosticsSink for InMemorySink {
    fn record(&self, event: &JobEvent) {
        if self.max_events == 0 {
            return;
        }
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event.clone());
    }
}

/// Sink that sends every event over a channel. Events are dropped silently
/// if the receiver is gone or a bounded channel is full.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<JobEvent>,
}

impl ChannelSink {
    /// Wrap an existing sender.
    #[must_use]
    pub const fn new(tx: Sender<JobEvent>) -> Self {
        Self { tx }
    }

    /// Create a sink and the unbounded receiver paired with it.
    #[must_use]
    pub fn unbounded() -> (Self, crossbeam_channel::Receiver<JobEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self::new(tx), rx)
    }
}

impl DiagnosticsSink for ChannelSink {
    fn record(&self, event: &JobEvent) {
        let _ = self.tx.try_send(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_in_memory_sink_overflow() {
        let sink = InMemorySink::new(2);
        sink.record(&JobEvent::new("p", 1, EventKind::Submitted));
        sink.record(&JobEvent::new("p", 2, EventKind::Submitted));
        sink.record(&JobEvent::new("p", 3, EventKind::Submitted));

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].job_id, 2);
        assert_eq!(events[1].job_id, 3);
    }

    #[test]
    fn test_closure_sink() {
        let failures = AtomicUsize::new(0);
        let sink = |event: &JobEvent| {
            if event.kind == EventKind::Failed {
                failures.fetch_add(1, Ordering::Relaxed);
            }
        };
        sink.record(&JobEvent::new("p", 1, EventKind::Failed).with_error("boom"));
        sink.record(&JobEvent::new("p", 2, EventKind::Completed));
        assert_eq!(failures.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_duration_requires_both_timestamps() {
        let event = JobEvent::new("p", 1, EventKind::Completed).started_at(100);
        assert_eq!(event.duration_ms(), None);
        let event = JobEvent {
            finished_at_ms: Some(350),
            ..event
        };
        assert_eq!(event.duration_ms(), Some(250));
    }
}
