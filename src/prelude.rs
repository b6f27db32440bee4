//! Convenient re-exports for common types and traits

pub use crate::collections::SnapshotList;
pub use crate::core::{
    BoxedTask, CancellationToken, ClosureTask, Result, Task, TaskHandle, WorkerError,
};
pub use crate::pool::{PoolState, WorkerPool, WorkerPoolConfig, WorkerStats};
pub use crate::sync::{GuardedCounter, StampedCell};
