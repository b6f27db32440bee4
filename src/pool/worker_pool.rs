//! Fixed-size worker pool

use crate::core::handle::ResultTask;
use crate::core::task::InterruptibleTask;
use crate::core::{
    BoxedTask, CancellationReason, CancellationToken, ClosureTask, Result, Task, TaskHandle,
    WorkerError,
};
use crate::pool::config::WorkerPoolConfig;
use crate::pool::lifecycle::{Lifecycle, PoolState};
use crate::pool::worker::{Worker, WorkerStatSnapshot, WorkerStats};
use crate::queue::{ChannelQueue, QueueError, TaskQueue};
use crate::tracing::TracedTask;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Point-in-time view of a pool's counters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PoolStats {
    /// Name of the pool
    pub pool_name: String,
    /// Lifecycle state when the snapshot was taken
    pub state: PoolState,
    /// Configured number of workers
    pub num_workers: usize,
    /// Workers whose threads have not exited yet
    pub live_workers: usize,
    /// Tasks accepted by `submit`
    pub tasks_submitted: u64,
    /// Tasks refused by `submit`
    pub tasks_rejected: u64,
    /// Tasks waiting in the queue
    pub queued_tasks: usize,
    /// Outcome counters summed over all workers
    pub workers: WorkerStatSnapshot,
    /// When the snapshot was taken
    pub captured_at: DateTime<Utc>,
}

impl PoolStats {
    /// Serialize the snapshot to JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| WorkerError::other(e.to_string()))
    }
}

/// A fixed number of worker threads executing tasks from a shared FIFO queue
///
/// # Lifecycle
///
/// A pool starts `Running` as soon as it is constructed. [`shutdown`](Self::shutdown)
/// and [`shutdown_now`](Self::shutdown_now) move it to `ShuttingDown`, after which
/// every submission is rejected. Once every worker has exited the pool is
/// `Terminated`; [`await_termination`](Self::await_termination) waits for that.
///
/// # Task failures
///
/// Errors and panics are caught per task, logged and counted in the worker's
/// [`WorkerStats`]. They never stop a worker or affect other tasks.
///
/// # Example
///
/// ```rust
/// use rust_worker_kit::prelude::*;
/// use std::time::Duration;
///
/// # fn main() -> Result<()> {
/// let pool = WorkerPool::new(4)?;
/// let counter = std::sync::Arc::new(GuardedCounter::new(0));
///
/// for _ in 0..100 {
///     let counter = std::sync::Arc::clone(&counter);
///     pool.execute(move || {
///         counter.increment();
///         Ok(())
///     })?;
/// }
///
/// pool.shutdown();
/// assert!(pool.await_termination(Duration::from_secs(5)));
/// assert_eq!(counter.get(), 100);
/// # Ok(())
/// # }
/// ```
pub struct WorkerPool {
    config: WorkerPoolConfig,
    queue: Arc<dyn TaskQueue>,
    workers: Mutex<Vec<Worker>>,
    stats: Vec<Arc<WorkerStats>>,
    lifecycle: Arc<Lifecycle>,
    interrupt: CancellationToken,
    tasks_submitted: AtomicU64,
    tasks_rejected: AtomicU64,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("config", &self.config)
            .field("state", &self.lifecycle.state())
            .field(
                "tasks_submitted",
                &self.tasks_submitted.load(Ordering::Relaxed),
            )
            .finish()
    }
}

impl WorkerPool {
    /// Create a pool with `num_workers` threads (0 = number of CPUs)
    pub fn new(num_workers: usize) -> Result<Self> {
        Self::with_config(WorkerPoolConfig::new(num_workers))
    }

    /// Create a pool from a configuration
    pub fn with_config(config: WorkerPoolConfig) -> Result<Self> {
        let queue: Arc<dyn TaskQueue> = if config.max_queue_size > 0 {
            Arc::new(ChannelQueue::bounded(config.max_queue_size))
        } else {
            Arc::new(ChannelQueue::unbounded())
        };
        Self::with_queue(config, queue)
    }

    /// Create a pool that pulls from a caller-provided queue
    ///
    /// `config.max_queue_size` is ignored; the queue decides its own capacity.
    /// The pool closes the queue on shutdown.
    pub fn with_queue(config: WorkerPoolConfig, queue: Arc<dyn TaskQueue>) -> Result<Self> {
        config.validate()?;

        let lifecycle = Arc::new(Lifecycle::new());
        let mut workers = Vec::with_capacity(config.num_workers);

        for id in 0..config.num_workers {
            lifecycle.worker_started();
            match Worker::spawn(
                id,
                &config.worker_name_prefix,
                Arc::clone(&queue),
                config.poll_interval,
                Arc::clone(&lifecycle),
            ) {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    lifecycle.worker_exited();
                    lifecycle.begin_shutdown();
                    queue.close();
                    for worker in workers {
                        let _ = worker.join();
                    }
                    log::error!("pool '{}' failed to start: {}", config.pool_name, e);
                    return Err(e);
                }
            }
        }

        log::debug!(
            "pool '{}' started with {} workers",
            config.pool_name,
            config.num_workers
        );
        #[cfg(feature = "tracing")]
        crate::tracing::metrics::record_pool_start(config.num_workers, queue.capacity());

        let stats = workers.iter().map(|w| w.stats()).collect();

        Ok(Self {
            config,
            queue,
            workers: Mutex::new(workers),
            stats,
            lifecycle,
            interrupt: CancellationToken::new(),
            tasks_submitted: AtomicU64::new(0),
            tasks_rejected: AtomicU64::new(0),
        })
    }

    /// Submit a task
    ///
    /// Returns as soon as the task is queued.
    ///
    /// # Errors
    ///
    /// `WorkerError::RejectedExecution` if the pool is shutting down or
    /// terminated, or if a bounded queue is full. A rejected task is dropped
    /// without running.
    pub fn submit<T: Task + 'static>(&self, task: T) -> Result<()> {
        self.enqueue(Box::new(task))
    }

    /// Submit a closure as a fire-and-forget task
    pub fn execute<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.submit(ClosureTask::new(f))
    }

    /// Submit a closure that receives the pool's interruption token
    ///
    /// The token is cancelled by [`shutdown_now`](Self::shutdown_now). A task
    /// that is dequeued after that point does not run at all and is counted as
    /// interrupted.
    ///
    /// # Example
    ///
    /// ```rust
    /// use rust_worker_kit::prelude::*;
    /// use std::time::Duration;
    ///
    /// # fn main() -> Result<()> {
    /// let pool = WorkerPool::new(1)?;
    /// pool.execute_interruptible(|token| {
    ///     // Returns Err(Interrupted) as soon as shutdown_now is called
    ///     token.sleep(Duration::from_secs(60))
    /// })?;
    ///
    /// std::thread::sleep(Duration::from_millis(50));
    /// pool.shutdown_now();
    /// assert!(pool.await_termination(Duration::from_secs(5)));
    /// # Ok(())
    /// # }
    /// ```
    pub fn execute_interruptible<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(CancellationToken) -> Result<()> + Send + 'static,
    {
        self.submit(InterruptibleTask::new(self.interrupt.clone(), f))
    }

    /// Submit a closure that produces a value
    ///
    /// The returned [`TaskHandle`] yields the closure's result, its error, a
    /// `TaskPanicked` error if it panicked, or `Interrupted` if the task was
    /// discarded by [`shutdown_now`](Self::shutdown_now).
    pub fn submit_with_result<T, F>(&self, f: F) -> Result<TaskHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let (task, handle) = ResultTask::new(f);
        self.submit(task)?;
        Ok(handle)
    }

    /// Submit a task that runs inside the span current at submission
    ///
    /// Without the `tracing` feature this is the same as [`submit`](Self::submit).
    pub fn submit_traced<T: Task + 'static>(&self, task: T) -> Result<()> {
        self.submit(TracedTask::new(task))
    }

    fn enqueue(&self, task: BoxedTask) -> Result<()> {
        let state = self.lifecycle.state();
        if state != PoolState::Running {
            return Err(self.reject(format!("pool is {}", state)));
        }

        match self.queue.send(task) {
            Ok(()) => {
                self.tasks_submitted.fetch_add(1, Ordering::Relaxed);
                #[cfg(feature = "tracing")]
                crate::tracing::metrics::record_submission(self.queue.len());
                Ok(())
            }
            Err(QueueError::Full(_)) => Err(self.reject(format!(
                "queue is full ({} tasks)",
                self.queue.capacity().unwrap_or_default()
            ))),
            Err(QueueError::Closed(_)) => Err(self.reject("pool is shutting down")),
            Err(e) => Err(self.reject(e.to_string())),
        }
    }

    fn reject(&self, reason: impl Into<String>) -> WorkerError {
        self.tasks_rejected.fetch_add(1, Ordering::Relaxed);
        let err = WorkerError::rejected(&self.config.pool_name, reason);
        log::debug!("{}", err);
        err
    }

    /// Stop accepting tasks and let queued tasks drain
    ///
    /// Does not wait and does not interrupt anything. Calling it again, or
    /// after [`shutdown_now`](Self::shutdown_now), has no effect.
    pub fn shutdown(&self) {
        if self.lifecycle.begin_shutdown() {
            log::info!(
                "pool '{}' shutting down with {} queued tasks",
                self.config.pool_name,
                self.queue.len()
            );
            self.queue.close();
        }
    }

    /// Stop accepting tasks, interrupt running tasks, and discard queued ones
    ///
    /// Interruption is cooperative: only tasks submitted with
    /// [`execute_interruptible`](Self::execute_interruptible) observe it, and a
    /// task that never checks its token runs to completion.
    ///
    /// Returns the tasks that were queued but never started. Every submitted
    /// task ends up either in this list or executed by a worker. Dropping a
    /// task returned here that came from
    /// [`submit_with_result`](Self::submit_with_result) resolves its handle
    /// with `Interrupted`.
    pub fn shutdown_now(&self) -> Vec<BoxedTask> {
        self.lifecycle.begin_shutdown();
        self.queue.close();
        // Drain before interrupting so woken workers cannot race for queued tasks
        let discarded = self.queue.drain();
        self.interrupt.cancel_with_reason(CancellationReason::ShutdownNow);

        log::info!(
            "pool '{}' shut down immediately, discarded {} queued tasks",
            self.config.pool_name,
            discarded.len()
        );
        discarded
    }

    /// Block until every worker has exited or `timeout` elapses
    ///
    /// Returns `true` if the pool terminated in time. A `false` result means
    /// workers may still be running tasks in the background.
    pub fn await_termination(&self, timeout: Duration) -> bool {
        let terminated = self.lifecycle.await_terminated(timeout);
        if terminated {
            #[cfg(feature = "tracing")]
            {
                let totals = self.totals();
                crate::tracing::metrics::record_pool_shutdown(
                    totals.tasks_completed,
                    totals.tasks_failed + totals.tasks_panicked,
                );
            }
        } else {
            log::warn!(
                "pool '{}' did not terminate within {:?} ({} workers still running)",
                self.config.pool_name,
                timeout,
                self.lifecycle.live_workers()
            );
        }
        terminated
    }

    /// Shut down gracefully and join every worker thread
    ///
    /// Unlike [`await_termination`](Self::await_termination) this waits
    /// without a timeout.
    pub fn join(&self) -> Result<()> {
        self.shutdown();
        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            worker.join()?;
        }
        Ok(())
    }

    /// Current lifecycle state
    pub fn state(&self) -> PoolState {
        self.lifecycle.state()
    }

    /// Whether `shutdown` or `shutdown_now` has been called
    pub fn is_shutdown(&self) -> bool {
        self.lifecycle.state() != PoolState::Running
    }

    /// Whether every worker has exited
    pub fn is_terminated(&self) -> bool {
        self.lifecycle.state() == PoolState::Terminated
    }

    /// Configured number of worker threads
    pub fn num_workers(&self) -> usize {
        self.config.num_workers
    }

    /// Pool name
    pub fn name(&self) -> &str {
        &self.config.pool_name
    }

    /// Number of tasks waiting to be picked up (approximate)
    pub fn queued_tasks(&self) -> usize {
        self.queue.len()
    }

    /// Get total number of tasks accepted
    pub fn tasks_submitted(&self) -> u64 {
        self.tasks_submitted.load(Ordering::Relaxed)
    }

    /// Statistics for every worker
    pub fn worker_stats(&self) -> Vec<Arc<WorkerStats>> {
        self.stats.clone()
    }

    fn totals(&self) -> WorkerStatSnapshot {
        self.stats
            .iter()
            .map(|s| s.snapshot())
            .fold(WorkerStatSnapshot::default(), |acc, s| acc.merge(&s))
    }

    /// Snapshot of the pool's counters
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            pool_name: self.config.pool_name.clone(),
            state: self.lifecycle.state(),
            num_workers: self.config.num_workers,
            live_workers: self.lifecycle.live_workers(),
            tasks_submitted: self.tasks_submitted.load(Ordering::Relaxed),
            tasks_rejected: self.tasks_rejected.load(Ordering::Relaxed),
            queued_tasks: self.queue.len(),
            workers: self.totals(),
            captured_at: Utc::now(),
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
        // Worker::drop joins each thread with a bounded wait
        self.workers.get_mut().clear();
    }
}
