//! Error types for pool and job operations.

use thiserror::Error;

/// Errors returned synchronously by pool operations.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Every worker is busy and the queue is at capacity.
    #[error("pool saturated: all workers busy and queue full (capacity {capacity})")]
    Rejected {
        /// Configured queue capacity that was exhausted.
        capacity: usize,
    },
    /// Shutdown has been initiated; no new work is accepted.
    #[error("pool has been shut down")]
    Shutdown,
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A worker thread could not be created.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(String),
    /// A bounded wait elapsed before the awaited condition held.
    #[error("operation timed out")]
    Timeout,
    /// The blocking wait behind an async join could not be joined.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Errors raised from inside a job body.
///
/// `anyhow::Error` converts into [`JobError::Failed`], so job bodies can use
/// `?` on `anyhow::Result` values and `.context(..)` chains.
#[derive(Debug, Error)]
pub enum JobError {
    /// The job's interruptible wait was cancelled.
    #[error("job interrupted")]
    Interrupted,
    /// The job body failed.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl JobError {
    /// Build a [`JobError::Failed`] from a message.
    pub fn msg(message: impl std::fmt::Display + std::fmt::Debug + Send + Sync + 'static) -> Self {
        Self::Failed(anyhow::Error::msg(message))
    }
}

/// Result of pool-level operations.
pub type PoolResult<T> = Result<T, PoolError>;

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
