//! Builder to construct a worker pool from configuration and a sink.

use std::sync::Arc;
use std::time::Duration;

use crate::config::WorkerPoolConfig;
use crate::core::{DiagnosticsSink, PoolResult, TracingSink, WorkerPool};

/// Fluent builder for [`WorkerPool`].
///
/// ```rust
/// use bounded_pool::builders::WorkerPoolBuilder;
/// use bounded_pool::core::{EventKind, JobEvent};
///
/// let pool = WorkerPoolBuilder::new()
///     .worker_count(2)
///     .queue_capacity(100)
///     .name_prefix("lab-worker-")
///     .sink(|event: &JobEvent| {
///         if event.kind == EventKind::Failed {
///             eprintln!("job {} failed: {:?}", event.job_id, event.error);
///         }
///     })
///     .build()
///     .unwrap();
/// pool.shutdown_drain();
/// ```
pub struct WorkerPoolBuilder {
    config: WorkerPoolConfig,
    sink: Option<Arc<dyn DiagnosticsSink>>,
}

impl Default for WorkerPoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerPoolBuilder {
    /// Start from the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(WorkerPoolConfig::default())
    }

    /// Start from an existing configuration.
    #[must_use]
    pub const fn from_config(config: WorkerPoolConfig) -> Self {
        Self { config, sink: None }
    }

    /// Configuration accumulated so far.
    #[must_use]
    pub const fn config(&self) -> &WorkerPoolConfig {
        &self.config
    }

    /// Number of worker threads.
    #[must_use]
    pub fn worker_count(mut self, count: usize) -> Self {
        self.config = self.config.with_worker_count(count);
        self
    }

    /// Maximum number of queued jobs.
    #[must_use]
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config = self.config.with_queue_capacity(capacity);
        self
    }

    /// Worker thread name prefix.
    #[must_use]
    pub fn name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config = self.config.with_name_prefix(prefix);
        self
    }

    /// Upper bound on shutdown waits.
    #[must_use]
    pub fn drain_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_drain_timeout(timeout);
        self
    }

    /// Worker thread stack size in bytes.
    #[must_use]
    pub fn thread_stack_size(mut self, bytes: usize) -> Self {
        self.config = self.config.with_thread_stack_size(bytes);
        self
    }

    /// Report lifecycle events to `sink`.
    #[must_use]
    pub fn sink<S>(mut self, sink: S) -> Self
    where
        S: DiagnosticsSink + 'static,
    {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Report lifecycle events to a sink the caller keeps a handle to.
    #[must_use]
    pub fn shared_sink(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Spawn the pool. Falls back to [`TracingSink`] when no sink was set.
    ///
    /// # Errors
    ///
    /// See [`WorkerPool::new`].
    pub fn build(self) -> PoolResult<WorkerPool> {
        let sink = self.sink.unwrap_or_else(|| Arc::new(TracingSink));
        WorkerPool::new(self.config, sink)
    }
}
