//! Tests for diagnostics sinks and events

use bounded_pool::core::{ChannelSink, DiagnosticsSink, EventKind, InMemorySink, JobEvent};

#[test]
fn test_in_memory_sink() {
    let sink = InMemorySink::new(10);
    assert!(sink.is_empty());

    let event = JobEvent::new("pool-worker-", 1, EventKind::Started)
        .on_worker(0)
        .started_at(1_000);
    sink.record(&event);

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].job_id, 1);
    assert_eq!(events[0].worker_id, Some(0));
    assert_eq!(events[0].kind, EventKind::Started);
    assert_eq!(events[0].event_id, event.event_id);
}

#[test]
fn test_in_memory_sink_overflow() {
    let sink = InMemorySink::new(2);
    for job_id in 1..=3 {
        sink.record(&JobEvent::new("p", job_id, EventKind::Submitted));
    }

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].job_id, 2); // First one popped
    assert_eq!(events[1].job_id, 3);
}

#[test]
fn test_in_memory_sink_filter_by_kind() {
    let sink = InMemorySink::new(10);
    sink.record(&JobEvent::new("p", 1, EventKind::Completed));
    sink.record(&JobEvent::new("p", 2, EventKind::Failed).with_error("boom"));
    sink.record(&JobEvent::new("p", 3, EventKind::Completed));

    let completed = sink.events_of(EventKind::Completed);
    assert_eq!(completed.len(), 2);
    let failed = sink.events_of(EventKind::Failed);
    assert_eq!(failed[0].error.as_deref(), Some("boom"));
}

#[test]
fn test_channel_sink() {
    let (sink, rx) = ChannelSink::unbounded();
    sink.record(&JobEvent::new("p", 9, EventKind::Rejected));
    let received = rx.try_recv().expect("event delivered");
    assert_eq!(received.job_id, 9);
    assert_eq!(received.kind, EventKind::Rejected);
}

#[test]
fn test_channel_sink_survives_dropped_receiver() {
    let (sink, rx) = ChannelSink::unbounded();
    drop(rx);
    sink.record(&JobEvent::new("p", 1, EventKind::Completed));
}

#[test]
fn test_event_timestamps() {
    let event = JobEvent::new("p", 4, EventKind::Completed)
        .started_at(bounded_pool::util::now_ms())
        .finished_now();
    assert!(event.finished_at_ms.is_some());
    assert!(event.duration_ms().is_some());
    assert!(event.kind.is_terminal());
    assert!(!EventKind::Started.is_terminal());
}

#[test]
fn test_event_serializes_to_json() {
    let event = JobEvent::new("lab-", 5, EventKind::Interrupted).on_worker(1);
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["kind"], "interrupted");
    assert_eq!(json["worker_id"], 1);
    assert_eq!(json["pool"], "lab-");

    let back: JobEvent = serde_json::from_value(json).unwrap();
    assert_eq!(back, event);
}
