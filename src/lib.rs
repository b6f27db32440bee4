//! # Rust Worker Kit
//!
//! Concurrency building blocks: a fixed-size worker pool with an explicit
//! shutdown lifecycle, a lock-guarded counter, a copy-on-write list with
//! snapshot iteration, and a stamped cell with optimistic reads.
//!
//! ## Features
//!
//! - **Worker Pool**: fixed number of named worker threads draining a FIFO queue
//! - **Lifecycle**: `Running` → `ShuttingDown` → `Terminated`, with graceful
//!   [`shutdown`](WorkerPool::shutdown), immediate
//!   [`shutdown_now`](WorkerPool::shutdown_now) and bounded
//!   [`await_termination`](WorkerPool::await_termination)
//! - **Fault Isolation**: task errors and panics are caught, logged and counted
//! - **Result Handles**: [`WorkerPool::submit_with_result`] returns a [`TaskHandle`]
//! - **Synchronization**: [`GuardedCounter`], [`StampedCell`], [`SnapshotList`]
//!
//! ## Quick Start
//!
//! ```rust
//! use rust_worker_kit::prelude::*;
//! use std::time::Duration;
//!
//! # fn main() -> Result<()> {
//! let pool = WorkerPool::new(4)?;
//!
//! for i in 0..10 {
//!     pool.execute(move || {
//!         println!("task {} executing", i);
//!         Ok(())
//!     })?;
//! }
//!
//! pool.shutdown();
//! assert!(pool.await_termination(Duration::from_secs(5)));
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use rust_worker_kit::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let config = WorkerPoolConfig::new(8)
//!     .with_max_queue_size(1000)
//!     .with_worker_name_prefix("ingest");
//!
//! let pool = WorkerPool::with_config(config)?;
//! # pool.join()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom Tasks
//!
//! ```rust
//! use rust_worker_kit::prelude::*;
//!
//! struct Resize {
//!     path: String,
//! }
//!
//! impl Task for Resize {
//!     fn execute(&mut self) -> Result<()> {
//!         println!("resizing {}", self.path);
//!         Ok(())
//!     }
//!
//!     fn task_name(&self) -> &str {
//!         "Resize"
//!     }
//! }
//!
//! # fn main() -> Result<()> {
//! # let pool = WorkerPool::new(2)?;
//! pool.submit(Resize {
//!     path: "cat.png".to_string(),
//! })?;
//! # pool.join()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Results
//!
//! ```rust
//! use rust_worker_kit::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let pool = WorkerPool::new(2)?;
//! let handle = pool.submit_with_result(|| Ok(6 * 7))?;
//! assert_eq!(handle.join()?, 42);
//! # pool.join()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collections;
pub mod core;
pub mod pool;
pub mod prelude;
pub mod queue;
pub mod sync;
pub mod tracing;

pub use collections::{SnapshotIter, SnapshotList};
pub use core::{
    BoxedTask, CancellationReason, CancellationToken, ClosureTask, Result, Task, TaskHandle,
    WorkerError,
};
pub use pool::{PoolState, PoolStats, WorkerPool, WorkerPoolConfig, WorkerStats};
pub use sync::{GuardedCounter, Stamp, StampedCell};
