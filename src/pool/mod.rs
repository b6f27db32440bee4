//! Worker pool and worker implementations

pub mod config;
pub mod lifecycle;
pub mod worker;
pub mod worker_pool;

pub use config::WorkerPoolConfig;
pub use lifecycle::PoolState;
pub use worker::{Worker, WorkerStatSnapshot, WorkerStats};
pub use worker_pool::{PoolStats, WorkerPool};
