//! Tests for builder modules

use std::sync::Arc;
use std::time::Duration;

use bounded_pool::builders::WorkerPoolBuilder;
use bounded_pool::config::WorkerPoolConfig;
use bounded_pool::core::{EventKind, InMemorySink, PoolError};

#[test]
fn test_builder_accumulates_config() {
    let builder = WorkerPoolBuilder::new()
        .worker_count(2)
        .queue_capacity(100)
        .name_prefix("LabWorker-")
        .drain_timeout(Duration::from_secs(10))
        .thread_stack_size(256 * 1024);

    let cfg = builder.config();
    assert_eq!(cfg.worker_count, 2);
    assert_eq!(cfg.queue_capacity, 100);
    assert_eq!(cfg.name_prefix, "LabWorker-");
    assert_eq!(cfg.drain_timeout_ms, 10_000);
    assert_eq!(cfg.thread_stack_size, 256 * 1024);
}

#[test]
fn test_builder_from_config() {
    let cfg = WorkerPoolConfig::new().with_worker_count(3);
    let pool = WorkerPoolBuilder::from_config(cfg.clone()).build().unwrap();
    assert_eq!(pool.config(), &cfg);
    assert_eq!(pool.stats().worker_count, 3);
    pool.shutdown_drain();
}

#[test]
fn test_builder_rejects_invalid_config() {
    let result = WorkerPoolBuilder::new().worker_count(0).build();
    assert!(matches!(result, Err(PoolError::InvalidConfig(_))));
}

#[test]
fn test_builder_shared_sink_receives_events() {
    let sink = Arc::new(InMemorySink::new(16));
    let pool = WorkerPoolBuilder::new()
        .worker_count(1)
        .shared_sink(sink.clone())
        .build()
        .unwrap();

    pool.submit(|_| Ok(())).unwrap().wait();
    pool.shutdown_drain();

    assert_eq!(sink.events_of(EventKind::Completed).len(), 1);
}
