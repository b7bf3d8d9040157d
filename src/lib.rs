//! # Bounded Pool
//!
//! A fixed-size worker thread pool with a bounded FIFO queue.
//!
//! The pool owns a fixed set of worker threads, all created up front, and a
//! queue with a hard capacity. A submission is handed to an idle worker,
//! queued if every worker is busy, or rejected if the queue is full. Nothing
//! is buffered beyond `worker_count + queue_capacity` jobs.
//!
//! ## Key Features
//!
//! - **Explicit ownership**: no global executor; create a `WorkerPool` and
//!   pass it (or an `Arc` of it) to whoever submits work
//! - **Non-blocking submit**: O(1) under a single lock, never waits for a
//!   worker
//! - **FIFO queue**: queued jobs start in submission order
//! - **Job isolation**: errors and panics are caught per job and reported
//!   through a diagnostics sink; workers never die from a job
//! - **Cooperative interruption**: jobs sleep through `JobContext::sleep`,
//!   which wakes early on cancel or on a drain deadline
//! - **Graceful shutdown**: drain (finish everything) or immediate (cancel
//!   the queue), both bounded by a drain timeout
//!
//! ## Example
//!
//! ```rust
//! use bounded_pool::builders::WorkerPoolBuilder;
//! use bounded_pool::core::ShutdownMode;
//! use std::time::Duration;
//!
//! let pool = WorkerPoolBuilder::new()
//!     .worker_count(2)
//!     .queue_capacity(100)
//!     .name_prefix("lab-worker-")
//!     .build()
//!     .unwrap();
//!
//! // Three one-unit jobs on two workers: the third waits in the queue.
//! let handles: Vec<_> = (1..=3)
//!     .map(|task| {
//!         pool.submit(move |ctx| {
//!             ctx.sleep(Duration::from_millis(20))?;
//!             println!("task {task} done on worker {}", ctx.worker_id());
//!             Ok(())
//!         })
//!         .unwrap()
//!     })
//!     .collect();
//!
//! // Join instead of sleeping for a guessed duration.
//! pool.shutdown(ShutdownMode::Drain);
//! assert!(handles.iter().all(|h| h.outcome().is_some_and(|o| o.is_success())));
//! ```
//!
//! For complete scenarios, see `tests/worker_pool_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core pool abstractions: jobs, workers, diagnostics and errors.
pub mod core;
/// Configuration models for worker pools.
pub mod config;
/// Builders to construct pools from configuration.
pub mod builders;
/// Shared utilities.
pub mod util;
