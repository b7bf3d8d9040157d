//! Tests for configuration validation and loading

use std::collections::HashMap;
use std::time::Duration;

use bounded_pool::config::{env_keys, WorkerPoolConfig, MIN_THREAD_STACK_SIZE};

fn valid() -> WorkerPoolConfig {
    WorkerPoolConfig::new()
        .with_worker_count(2)
        .with_queue_capacity(100)
        .with_name_prefix("LabWorker-")
        .with_drain_timeout(Duration::from_secs(10))
}

#[test]
fn test_config_validation() {
    let cfg = valid();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.max_in_flight(), 102);
    assert_eq!(cfg.drain_timeout(), Duration::from_secs(10));
}

#[test]
fn test_config_invalid_worker_count() {
    assert!(valid().with_worker_count(0).validate().is_err());
}

#[test]
fn test_config_zero_queue_capacity_is_valid() {
    assert!(valid().with_queue_capacity(0).validate().is_ok());
}

#[test]
fn test_config_invalid_name_prefix() {
    assert!(valid().with_name_prefix("").validate().is_err());
}

#[test]
fn test_config_invalid_drain_timeout() {
    assert!(valid().with_drain_timeout(Duration::ZERO).validate().is_err());
}

#[test]
fn test_config_invalid_stack_size() {
    let err = valid()
        .with_thread_stack_size(MIN_THREAD_STACK_SIZE - 1)
        .validate()
        .unwrap_err();
    assert!(err.contains("thread_stack_size"));
}

#[test]
fn test_config_from_json() {
    let json = r#"{
        "worker_count": 2,
        "queue_capacity": 100,
        "name_prefix": "LabWorker-",
        "drain_timeout_ms": 10000
    }"#;

    let cfg = WorkerPoolConfig::from_json_str(json).expect("valid config");
    assert_eq!(cfg.worker_count, 2);
    assert_eq!(cfg.queue_capacity, 100);
    assert_eq!(cfg.name_prefix, "LabWorker-");
    // Omitted fields fall back to defaults.
    assert_eq!(
        cfg.thread_stack_size,
        WorkerPoolConfig::default().thread_stack_size
    );
}

#[test]
fn test_config_from_json_rejects_invalid() {
    assert!(WorkerPoolConfig::from_json_str(r#"{"worker_count": 0}"#).is_err());
    assert!(WorkerPoolConfig::from_json_str("not json").is_err());
}

#[test]
fn test_config_json_roundtrip() {
    let cfg = valid();
    let json = serde_json::to_string(&cfg).unwrap();
    assert_eq!(WorkerPoolConfig::from_json_str(&json).unwrap(), cfg);
}

#[test]
fn test_config_from_lookup() {
    let vars: HashMap<&str, &str> = [
        (env_keys::WORKER_COUNT, "3"),
        (env_keys::QUEUE_CAPACITY, " 7 "),
        (env_keys::NAME_PREFIX, "env-worker-"),
        (env_keys::DRAIN_TIMEOUT_MS, "2500"),
    ]
    .into_iter()
    .collect();

    let cfg = WorkerPoolConfig::from_lookup(|key| vars.get(key).map(|v| (*v).to_string()))
        .expect("valid env config");
    assert_eq!(cfg.worker_count, 3);
    assert_eq!(cfg.queue_capacity, 7);
    assert_eq!(cfg.name_prefix, "env-worker-");
    assert_eq!(cfg.drain_timeout(), Duration::from_millis(2500));
}

#[test]
fn test_config_from_lookup_bad_value() {
    let err = WorkerPoolConfig::from_lookup(|key| {
        (key == env_keys::WORKER_COUNT).then(|| "many".to_string())
    })
    .unwrap_err();
    assert!(err.contains(env_keys::WORKER_COUNT));
}

#[test]
fn test_config_from_lookup_empty_uses_defaults() {
    let cfg = WorkerPoolConfig::from_lookup(|_| None).unwrap();
    assert_eq!(cfg, WorkerPoolConfig::default());
}
