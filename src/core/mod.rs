//! Core types and traits shared by the worker pool

pub mod cancellation;
pub mod error;
pub mod handle;
pub mod task;

pub use cancellation::{CancellationReason, CancellationToken};
pub use error::{Result, WorkerError};
pub use handle::TaskHandle;
pub use task::{BoxedTask, ClosureTask, Task};
