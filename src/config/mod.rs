//! Configuration models for worker pools.

pub mod pool;

pub use pool::{env_keys, WorkerPoolConfig, MIN_THREAD_STACK_SIZE};
