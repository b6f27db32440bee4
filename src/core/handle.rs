//! Result-producing tasks and the handles used to wait for them

use crate::core::error::{Result, WorkerError};
use crate::core::task::{panic_message, Task};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::time::Duration;
use uuid::Uuid;

/// Handle to the outcome of a task submitted with
/// [`WorkerPool::submit_with_result`](crate::pool::WorkerPool::submit_with_result)
///
/// The outcome is delivered exactly once. A task that was discarded by
/// `shutdown_now` (or otherwise dropped before running) resolves to
/// [`WorkerError::Interrupted`].
///
/// # Example
///
/// ```rust
/// use rust_worker_kit::prelude::*;
///
/// # fn main() -> Result<()> {
/// let pool = WorkerPool::new(2)?;
/// let handle = pool.submit_with_result(|| Ok(6 * 7))?;
/// assert_eq!(handle.join()?, 42);
/// # pool.shutdown();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TaskHandle<T> {
    id: Uuid,
    receiver: Receiver<Result<T>>,
}

impl<T> TaskHandle<T> {
    /// Unique identifier of the underlying task
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether the outcome is ready to be collected
    pub fn is_finished(&self) -> bool {
        !self.receiver.is_empty()
    }

    /// Block until the task finishes and return its outcome
    pub fn join(self) -> Result<T> {
        self.receiver
            .recv()
            .unwrap_or_else(|_| Err(Self::lost_outcome()))
    }

    /// Wait at most `timeout` for the outcome
    ///
    /// Returns `None` if the task has not finished yet; the handle can be
    /// waited on again.
    pub fn join_timeout(&self, timeout: Duration) -> Option<Result<T>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(Self::lost_outcome())),
        }
    }

    /// Collect the outcome if it is ready, without blocking
    pub fn try_result(&self) -> Option<Result<T>> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(Self::lost_outcome())),
        }
    }

    fn lost_outcome() -> WorkerError {
        WorkerError::interrupted("task outcome already taken or task was dropped")
    }
}

/// A task that reports its outcome to a [`TaskHandle`]
pub(crate) struct ResultTask<T, F>
where
    T: Send,
    F: FnOnce() -> Result<T> + Send,
{
    closure: Option<F>,
    sender: Option<Sender<Result<T>>>,
}

impl<T, F> ResultTask<T, F>
where
    T: Send,
    F: FnOnce() -> Result<T> + Send,
{
    /// Create the task together with the handle that observes it
    pub(crate) fn new(closure: F) -> (Self, TaskHandle<T>) {
        let (sender, receiver) = channel::bounded(1);
        let task = Self {
            closure: Some(closure),
            sender: Some(sender),
        };
        let handle = TaskHandle {
            id: Uuid::new_v4(),
            receiver,
        };
        (task, handle)
    }

    fn deliver(&mut self, outcome: Result<T>) {
        if let Some(sender) = self.sender.take() {
            // The caller may have dropped its handle
            let _ = sender.send(outcome);
        }
    }
}

impl<T, F> Task for ResultTask<T, F>
where
    T: Send,
    F: FnOnce() -> Result<T> + Send,
{
    fn execute(&mut self) -> Result<()> {
        let closure = self.closure.take().ok_or_else(|| {
            WorkerError::other("ResultTask already executed - cannot execute twice")
        })?;

        match catch_unwind(AssertUnwindSafe(closure)) {
            Ok(Ok(value)) => {
                self.deliver(Ok(value));
                Ok(())
            }
            Ok(Err(e)) => {
                let message = e.to_string();
                self.deliver(Err(e));
                Err(WorkerError::execution(self.task_name(), message))
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                self.deliver(Err(WorkerError::panicked(self.task_name(), message)));
                // Let the worker account for the panic as well
                resume_unwind(payload)
            }
        }
    }

    fn task_name(&self) -> &str {
        "ResultTask"
    }
}

impl<T, F> Drop for ResultTask<T, F>
where
    T: Send,
    F: FnOnce() -> Result<T> + Send,
{
    fn drop(&mut self) {
        if self.closure.is_some() {
            self.deliver(Err(WorkerError::interrupted(
                "task discarded before it started",
            )));
        }
    }
}
