//! Tracing integration for observability.
//!
//! With the `tracing` feature enabled, workers run each task inside a span and
//! emit the metric events in [`metrics`]. Without it only the `log` facade is
//! used and [`TracedTask`] is a transparent wrapper.
//!
//! # Example
//!
//! ```rust,ignore
//! use rust_worker_kit::prelude::*;
//! use tracing_subscriber::{fmt, prelude::*, EnvFilter};
//!
//! tracing_subscriber::registry()
//!     .with(fmt::layer())
//!     .with(EnvFilter::from_default_env()
//!         .add_directive("rust_worker_kit=debug".parse().unwrap()))
//!     .init();
//!
//! let pool = WorkerPool::new(4)?;
//! let _request = tracing::info_span!("request", id = 7).entered();
//!
//! // Runs inside the "request" span on the worker thread
//! pool.submit_traced(ClosureTask::new(|| Ok(())))?;
//! ```

use crate::core::{Result, Task};

/// A task wrapper that carries the submitter's tracing span to the worker.
///
/// The span current at construction is entered around `execute`, so events
/// emitted by the task are attributed to the code that submitted it.
pub struct TracedTask<T: Task> {
    inner: T,
    #[cfg(feature = "tracing")]
    span: tracing::Span,
}

impl<T: Task> TracedTask<T> {
    /// Wrap `task`, capturing the current span
    pub fn new(task: T) -> Self {
        Self {
            inner: task,
            #[cfg(feature = "tracing")]
            span: tracing::Span::current(),
        }
    }

    /// Wrap `task` with an explicit span
    #[cfg(feature = "tracing")]
    pub fn with_span(task: T, span: tracing::Span) -> Self {
        Self { inner: task, span }
    }

    /// The wrapped task
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Task> Task for TracedTask<T> {
    fn execute(&mut self) -> Result<()> {
        #[cfg(feature = "tracing")]
        let _guard = self.span.enter();
        self.inner.execute()
    }

    fn task_name(&self) -> &str {
        self.inner.task_name()
    }
}

/// Metric events.
///
/// Emitted as `tracing` events with `counter.`/`gauge.`/`histogram.` field
/// prefixes, ready for a metrics layer to pick up.
#[cfg(feature = "tracing")]
pub mod metrics {
    use std::time::Duration;

    /// Task accepted by the pool
    #[inline]
    pub fn record_submission(queue_depth: usize) {
        tracing::trace!(
            counter.tasks_submitted = 1,
            gauge.queue_depth = queue_depth as i64,
            "task submitted"
        );
    }

    /// Task returned, successfully or with an error
    #[inline]
    pub fn record_completion(duration: Duration, success: bool) {
        let duration_ms = duration.as_millis() as u64;
        if success {
            tracing::trace!(
                counter.tasks_completed = 1,
                histogram.task_duration_ms = duration_ms,
                "task completed"
            );
        } else {
            tracing::trace!(
                counter.tasks_failed = 1,
                histogram.task_duration_ms = duration_ms,
                "task failed"
            );
        }
    }

    /// Task panicked
    #[inline]
    pub fn record_panic(duration: Duration) {
        tracing::trace!(
            counter.tasks_panicked = 1,
            histogram.task_duration_ms = duration.as_millis() as u64,
            "task panicked"
        );
    }

    /// Worker picked up a task
    #[inline]
    pub fn record_worker_busy(worker_id: usize) {
        tracing::trace!(gauge.workers_busy = 1, worker_id, "worker busy");
    }

    /// Worker finished a task
    #[inline]
    pub fn record_worker_idle(worker_id: usize) {
        tracing::trace!(gauge.workers_busy = -1i64, worker_id, "worker idle");
    }

    /// Pool constructed; `capacity` is `None` for an unbounded queue
    #[inline]
    pub fn record_pool_start(num_workers: usize, capacity: Option<usize>) {
        tracing::info!(
            workers = num_workers,
            queue_capacity = capacity.map(|c| c as i64).unwrap_or(-1),
            "worker pool started"
        );
    }

    /// Pool reached `Terminated`
    #[inline]
    pub fn record_pool_shutdown(tasks_completed: u64, tasks_failed: u64) {
        tracing::info!(tasks_completed, tasks_failed, "worker pool terminated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ClosureTask;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_traced_task_executes() {
        let executed = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&executed);

        let mut traced = TracedTask::new(ClosureTask::new(move || {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        }));
        traced.execute().expect("task should execute");

        assert!(executed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_traced_task_preserves_name() {
        let traced = TracedTask::new(ClosureTask::with_name(|| Ok(()), "flush"));
        assert_eq!(traced.task_name(), "flush");
    }
}
