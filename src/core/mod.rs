//! Core pool abstractions: jobs, workers, diagnostics and errors.

pub mod diagnostics;
pub mod error;
pub mod job;
pub mod worker_pool;

pub use diagnostics::{ChannelSink, DiagnosticsSink, EventKind, InMemorySink, JobEvent, TracingSink};
pub use error::{AppResult, JobError, PoolError, PoolResult};
pub use job::{JobContext, JobFn, JobId, JobOutcome};
pub use worker_pool::{
    CancelResult, JobHandle, Placement, PoolStats, ShutdownMode, ShutdownReport, WorkerPool,
};
