//! Tests for error types

use bounded_pool::core::{JobError, PoolError};

#[test]
fn test_rejected_error() {
    let err = PoolError::Rejected { capacity: 100 };
    assert_eq!(
        format!("{err}"),
        "pool saturated: all workers busy and queue full (capacity 100)"
    );
}

#[test]
fn test_shutdown_error() {
    assert_eq!(format!("{}", PoolError::Shutdown), "pool has been shut down");
}

#[test]
fn test_invalid_config_error() {
    let err = PoolError::InvalidConfig("worker_count must be greater than 0".to_string());
    assert_eq!(
        format!("{err}"),
        "invalid configuration: worker_count must be greater than 0"
    );
}

#[test]
fn test_timeout_and_spawn_errors() {
    assert_eq!(format!("{}", PoolError::Timeout), "operation timed out");
    let err = PoolError::Spawn("resource temporarily unavailable".to_string());
    assert_eq!(
        format!("{err}"),
        "failed to spawn worker thread: resource temporarily unavailable"
    );
}

#[test]
fn test_job_error_from_anyhow() {
    let err: JobError = anyhow::anyhow!("disk full").into();
    assert!(matches!(err, JobError::Failed(_)));
    assert_eq!(format!("{err}"), "disk full");
    assert_eq!(format!("{}", JobError::Interrupted), "job interrupted");
}

#[test]
fn test_job_error_msg() {
    let err = JobError::msg("upstream returned 503");
    assert_eq!(err.to_string(), "upstream returned 503");
}
