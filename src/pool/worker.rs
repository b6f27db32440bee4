//! Worker thread implementation

use crate::core::error::{Result, WorkerError};
use crate::core::task::{panic_message, BoxedTask};
use crate::pool::lifecycle::Lifecycle;
use crate::queue::{QueueError, TaskQueue};
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[cfg(feature = "tracing")]
use tracing::{span, Level};

/// Statistics for a worker thread
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Tasks that completed successfully
    pub tasks_completed: AtomicU64,
    /// Tasks that returned an error
    pub tasks_failed: AtomicU64,
    /// Tasks that stopped because the pool was interrupted
    pub tasks_interrupted: AtomicU64,
    /// Tasks that panicked
    pub tasks_panicked: AtomicU64,
    /// Total time spent executing tasks (microseconds)
    pub total_busy_time_us: AtomicU64,
}

/// Point-in-time copy of [`WorkerStats`]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStatSnapshot {
    /// Tasks that completed successfully
    pub tasks_completed: u64,
    /// Tasks that returned an error
    pub tasks_failed: u64,
    /// Tasks that stopped because the pool was interrupted
    pub tasks_interrupted: u64,
    /// Tasks that panicked
    pub tasks_panicked: u64,
    /// Total time spent executing tasks (microseconds)
    pub total_busy_time_us: u64,
}

impl WorkerStats {
    /// Create new worker statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Total tasks this worker has run, whatever their outcome
    pub fn tasks_executed(&self) -> u64 {
        self.tasks_completed.load(Ordering::Relaxed)
            + self.tasks_failed.load(Ordering::Relaxed)
            + self.tasks_interrupted.load(Ordering::Relaxed)
            + self.tasks_panicked.load(Ordering::Relaxed)
    }

    /// Copy the current counters
    pub fn snapshot(&self) -> WorkerStatSnapshot {
        WorkerStatSnapshot {
            tasks_completed: self.tasks_completed.load(Ordering::Relaxed),
            tasks_failed: self.tasks_failed.load(Ordering::Relaxed),
            tasks_interrupted: self.tasks_interrupted.load(Ordering::Relaxed),
            tasks_panicked: self.tasks_panicked.load(Ordering::Relaxed),
            total_busy_time_us: self.total_busy_time_us.load(Ordering::Relaxed),
        }
    }

    /// Average execution time per task in microseconds
    pub fn average_busy_time_us(&self) -> f64 {
        let total = self.total_busy_time_us.load(Ordering::Relaxed);
        let count = self.tasks_executed();
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }
}

impl WorkerStatSnapshot {
    pub(crate) fn merge(mut self, other: &WorkerStatSnapshot) -> Self {
        self.tasks_completed += other.tasks_completed;
        self.tasks_failed += other.tasks_failed;
        self.tasks_interrupted += other.tasks_interrupted;
        self.tasks_panicked += other.tasks_panicked;
        self.total_busy_time_us += other.total_busy_time_us;
        self
    }
}

/// Decrements the live-worker count however the worker thread ends
struct ExitGuard(Arc<Lifecycle>);

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.0.worker_exited();
    }
}

/// A worker thread that pulls tasks from a shared queue
#[derive(Debug)]
pub struct Worker {
    id: usize,
    thread: Option<thread::JoinHandle<()>>,
    stats: Arc<WorkerStats>,
}

impl Worker {
    /// Spawn a worker thread named `"{name_prefix}-{id}"`
    ///
    /// The worker must already be registered with `lifecycle`; it
    /// deregisters itself when its thread ends.
    pub(crate) fn spawn(
        id: usize,
        name_prefix: &str,
        queue: Arc<dyn TaskQueue>,
        poll_interval: Duration,
        lifecycle: Arc<Lifecycle>,
    ) -> Result<Self> {
        let stats = Arc::new(WorkerStats::new());
        let stats_clone = Arc::clone(&stats);

        let thread = thread::Builder::new()
            .name(format!("{}-{}", name_prefix, id))
            .spawn(move || {
                let _exit = ExitGuard(lifecycle);
                Self::run(id, queue, stats_clone, poll_interval);
            })
            .map_err(|e| WorkerError::spawn_with_source(id, "Cannot create thread", e))?;

        Ok(Self {
            id,
            thread: Some(thread),
            stats,
        })
    }

    /// Get worker ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Get worker statistics
    pub fn stats(&self) -> Arc<WorkerStats> {
        Arc::clone(&self.stats)
    }

    /// Whether the worker thread has exited
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Block until the worker thread exits
    pub fn join(mut self) -> Result<()> {
        if let Some(thread) = self.thread.take() {
            thread
                .join()
                .map_err(|_| WorkerError::join(self.id, "Worker panicked"))?;
        }
        Ok(())
    }

    /// Main worker loop
    ///
    /// Runs until the queue is closed and empty, so a graceful shutdown
    /// drains every queued task.
    fn run(id: usize, queue: Arc<dyn TaskQueue>, stats: Arc<WorkerStats>, poll_interval: Duration) {
        #[cfg(feature = "tracing")]
        let worker_span = span!(Level::DEBUG, "worker", id = id);
        #[cfg(feature = "tracing")]
        let _guard = worker_span.enter();

        log::debug!("worker {} started", id);

        loop {
            match queue.recv_timeout(poll_interval) {
                Ok(mut task) => {
                    #[cfg(feature = "tracing")]
                    crate::tracing::metrics::record_worker_busy(id);

                    Self::execute_task(id, &mut task, &stats);

                    #[cfg(feature = "tracing")]
                    crate::tracing::metrics::record_worker_idle(id);
                }
                Err(QueueError::Empty) => continue,
                Err(QueueError::Disconnected) => break,
                Err(e) => {
                    log::error!("worker {} stopping on unexpected queue error: {}", id, e);
                    break;
                }
            }
        }

        log::debug!(
            "worker {} exiting after {} tasks ({} failed, {} panicked)",
            id,
            stats.tasks_executed(),
            stats.tasks_failed.load(Ordering::Relaxed),
            stats.tasks_panicked.load(Ordering::Relaxed)
        );
    }

    /// Execute a single task with panic protection
    fn execute_task(id: usize, task: &mut BoxedTask, stats: &WorkerStats) {
        #[cfg(feature = "tracing")]
        let task_span = span!(Level::DEBUG, "task_execution", task = task.task_name());
        #[cfg(feature = "tracing")]
        let _task_guard = task_span.enter();

        let start = Instant::now();
        let outcome = catch_unwind(AssertUnwindSafe(|| task.execute()));
        let elapsed = start.elapsed();

        match outcome {
            Ok(Ok(())) => {
                stats.tasks_completed.fetch_add(1, Ordering::Relaxed);
                #[cfg(feature = "tracing")]
                crate::tracing::metrics::record_completion(elapsed, true);
            }
            Ok(Err(WorkerError::Interrupted { reason })) => {
                log::debug!(
                    "worker {}: task '{}' interrupted: {}",
                    id,
                    task.task_name(),
                    reason
                );
                stats.tasks_interrupted.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Err(e)) => {
                log::warn!("worker {}: task '{}' failed: {}", id, task.task_name(), e);
                stats.tasks_failed.fetch_add(1, Ordering::Relaxed);
                #[cfg(feature = "tracing")]
                crate::tracing::metrics::record_completion(elapsed, false);
            }
            Err(payload) => {
                let err = WorkerError::panicked(task.task_name(), panic_message(payload.as_ref()));
                log::error!("worker {}: {}", id, err);
                stats.tasks_panicked.fetch_add(1, Ordering::Relaxed);
                #[cfg(feature = "tracing")]
                crate::tracing::metrics::record_panic(elapsed);
            }
        }

        stats
            .total_busy_time_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            // Bounded so dropping a pool cannot hang on a stuck task
            const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

            let start = Instant::now();
            while !thread.is_finished() {
                if start.elapsed() >= JOIN_TIMEOUT {
                    log::warn!(
                        "worker {} did not finish within {}s during drop; detaching thread",
                        self.id,
                        JOIN_TIMEOUT.as_secs()
                    );
                    return;
                }
                thread::sleep(Duration::from_millis(10));
            }

            if let Err(payload) = thread.join() {
                log::error!(
                    "worker {} panicked during shutdown: {}",
                    self.id,
                    panic_message(payload.as_ref())
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ClosureTask, WorkerError};
    use crate::queue::ChannelQueue;

    fn spawn_worker(queue: &Arc<dyn TaskQueue>) -> (Worker, Arc<Lifecycle>) {
        let lifecycle = Arc::new(Lifecycle::new());
        lifecycle.worker_started();
        let worker = Worker::spawn(
            0,
            "test-worker",
            Arc::clone(queue),
            Duration::from_millis(50),
            Arc::clone(&lifecycle),
        )
        .expect("Failed to spawn worker");
        (worker, lifecycle)
    }

    fn wait_for(stats: &WorkerStats, executed: u64) {
        let start = Instant::now();
        while stats.tasks_executed() < executed && start.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_worker_exits_on_close() {
        let queue: Arc<dyn TaskQueue> = Arc::new(ChannelQueue::unbounded());
        let (worker, lifecycle) = spawn_worker(&queue);
        assert_eq!(worker.id(), 0);
        assert_eq!(lifecycle.live_workers(), 1);

        lifecycle.begin_shutdown();
        queue.close();
        worker.join().expect("Failed to join worker");
        assert_eq!(lifecycle.live_workers(), 0);
        assert!(lifecycle.await_terminated(Duration::from_secs(1)));
    }

    #[test]
    fn test_worker_records_outcomes() {
        let queue: Arc<dyn TaskQueue> = Arc::new(ChannelQueue::unbounded());
        let (worker, _lifecycle) = spawn_worker(&queue);
        let stats = worker.stats();

        queue.send(Box::new(ClosureTask::new(|| Ok(())))).unwrap();
        queue
            .send(Box::new(ClosureTask::new(|| Err(WorkerError::other("nope")))))
            .unwrap();
        queue
            .send(Box::new(ClosureTask::new(|| {
                Err(WorkerError::interrupted("stop"))
            })))
            .unwrap();

        wait_for(&stats, 3);
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.tasks_completed, 1);
        assert_eq!(snapshot.tasks_failed, 1);
        assert_eq!(snapshot.tasks_interrupted, 1);

        queue.close();
        worker.join().expect("Failed to join worker");
    }

    #[test]
    fn test_worker_survives_panic() {
        let queue: Arc<dyn TaskQueue> = Arc::new(ChannelQueue::unbounded());
        let (worker, _lifecycle) = spawn_worker(&queue);
        let stats = worker.stats();

        queue
            .send(Box::new(ClosureTask::new(|| {
                panic!("Intentional panic for testing");
            })))
            .unwrap();
        queue.send(Box::new(ClosureTask::new(|| Ok(())))).unwrap();

        wait_for(&stats, 2);
        assert_eq!(stats.tasks_panicked.load(Ordering::Relaxed), 1);
        assert_eq!(stats.tasks_completed.load(Ordering::Relaxed), 1);

        queue.close();
        worker.join().expect("Failed to join worker");
    }

    #[test]
    fn test_snapshot_merge() {
        let a = WorkerStatSnapshot {
            tasks_completed: 2,
            tasks_failed: 1,
            ..Default::default()
        };
        let b = WorkerStatSnapshot {
            tasks_completed: 3,
            tasks_panicked: 1,
            ..Default::default()
        };
        let merged = a.merge(&b);
        assert_eq!(merged.tasks_completed, 5);
        assert_eq!(merged.tasks_failed, 1);
        assert_eq!(merged.tasks_panicked, 1);
    }
}
