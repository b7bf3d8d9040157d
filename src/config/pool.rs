//! Worker pool configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Smallest accepted worker thread stack.
pub const MIN_THREAD_STACK_SIZE: usize = 16 * 1024;

/// Environment variable names read by [`WorkerPoolConfig::from_env`].
pub mod env_keys {
    /// Number of worker threads.
    pub const WORKER_COUNT: &str = "POOL_WORKER_COUNT";
    /// Maximum number of queued jobs.
    pub const QUEUE_CAPACITY: &str = "POOL_QUEUE_CAPACITY";
    /// Worker thread name prefix.
    pub const NAME_PREFIX: &str = "POOL_NAME_PREFIX";
    /// Drain timeout in milliseconds.
    pub const DRAIN_TIMEOUT_MS: &str = "POOL_DRAIN_TIMEOUT_MS";
    /// Worker thread stack size in bytes.
    pub const THREAD_STACK_SIZE: &str = "POOL_THREAD_STACK_SIZE";
}

/// Configuration for a [`WorkerPool`](crate::core::WorkerPool).
///
/// Missing fields take their defaults when deserializing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerPoolConfig {
    /// Number of worker threads, all created up front.
    pub worker_count: usize,
    /// Maximum number of jobs waiting for a worker. 0 means direct hand-off
    /// only.
    pub queue_capacity: usize,
    /// Prefix for worker thread names; the worker index is appended.
    pub name_prefix: String,
    /// Upper bound on how long shutdown waits for jobs, in milliseconds.
    pub drain_timeout_ms: u64,
    /// Stack size for each worker thread in bytes.
    pub thread_stack_size: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            worker_count: num_cpus::get().max(1),
            queue_capacity: 100,
            name_prefix: "pool-worker-".into(),
            drain_timeout_ms: 10_000,
            thread_stack_size: 2 * 1024 * 1024,
        }
    }
}

impl WorkerPoolConfig {
    /// Default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of worker threads.
    #[must_use]
    pub const fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    /// Set the queue capacity.
    #[must_use]
    pub const fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the worker thread name prefix.
    #[must_use]
    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    /// Set the drain timeout.
    #[must_use]
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the worker thread stack size.
    #[must_use]
    pub const fn with_thread_stack_size(mut self, bytes: usize) -> Self {
        self.thread_stack_size = bytes;
        self
    }

    /// Drain timeout as a `Duration`.
    #[must_use]
    pub const fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }

    /// Upper bound on jobs held by the pool at once (running + queued).
    #[must_use]
    pub const fn max_in_flight(&self) -> usize {
        self.worker_count.saturating_add(self.queue_capacity)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_count == 0 {
            return Err("worker_count must be greater than 0".into());
        }
        if self.name_prefix.is_empty() {
            return Err("name_prefix must not be empty".into());
        }
        if self.drain_timeout_ms == 0 {
            return Err("drain_timeout_ms must be greater than 0".into());
        }
        if self.thread_stack_size < MIN_THREAD_STACK_SIZE {
            return Err(format!(
                "thread_stack_size must be at least {MIN_THREAD_STACK_SIZE} bytes"
            ));
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation error message.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from the process environment, reading a `.env`
    /// file first if one exists. Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed, or if the
    /// result fails validation.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup, using the names in
    /// [`env_keys`].
    ///
    /// # Errors
    ///
    /// Same as [`WorkerPoolConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(v) = lookup(env_keys::WORKER_COUNT) {
            cfg.worker_count = parse_var(env_keys::WORKER_COUNT, &v)?;
        }
        if let Some(v) = lookup(env_keys::QUEUE_CAPACITY) {
            cfg.queue_capacity = parse_var(env_keys::QUEUE_CAPACITY, &v)?;
        }
        if let Some(v) = lookup(env_keys::NAME_PREFIX) {
            cfg.name_prefix = v;
        }
        if let Some(v) = lookup(env_keys::DRAIN_TIMEOUT_MS) {
            cfg.drain_timeout_ms = parse_var(env_keys::DRAIN_TIMEOUT_MS, &v)?;
        }
        if let Some(v) = lookup(env_keys::THREAD_STACK_SIZE) {
            cfg.thread_stack_size = parse_var(env_keys::THREAD_STACK_SIZE, &v)?;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| format!("{key}={value:?} is invalid: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = WorkerPoolConfig::default();
        assert!(cfg.validate().is_ok());
        assert!(cfg.worker_count >= 1);
        assert_eq!(cfg.queue_capacity, 100);
        assert_eq!(cfg.drain_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_parse_var_reports_key() {
        let err = parse_var::<usize>("POOL_WORKER_COUNT", "lots").unwrap_err();
        assert!(err.contains("POOL_WORKER_COUNT"));
    }
}
