//! Task trait and related types

use crate::core::cancellation::CancellationToken;
use crate::core::error::{Result, WorkerError};
use std::any::Any;
use std::fmt;

/// A unit of work executed by a worker pool
pub trait Task: Send {
    /// Execute the task
    ///
    /// # Errors
    ///
    /// Returns an error if the task fails. The error is recorded by the
    /// worker and never reaches other tasks.
    fn execute(&mut self) -> Result<()>;

    /// Name used in logs and error messages
    fn task_name(&self) -> &str {
        "Task"
    }
}

impl fmt::Debug for dyn Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Task({})", self.task_name())
    }
}

/// A boxed task that can be sent across threads
pub type BoxedTask = Box<dyn Task>;

/// Extract a readable message from a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Fire-and-forget task built from a closure
pub struct ClosureTask<F>
where
    F: FnOnce() -> Result<()> + Send,
{
    closure: Option<F>,
    name: String,
}

impl<F> ClosureTask<F>
where
    F: FnOnce() -> Result<()> + Send,
{
    /// Create a new closure task
    pub fn new(closure: F) -> Self {
        Self {
            closure: Some(closure),
            name: "ClosureTask".to_string(),
        }
    }

    /// Create a new closure task with a custom name
    pub fn with_name<S: Into<String>>(closure: F, name: S) -> Self {
        Self {
            closure: Some(closure),
            name: name.into(),
        }
    }
}

impl<F> Task for ClosureTask<F>
where
    F: FnOnce() -> Result<()> + Send,
{
    fn execute(&mut self) -> Result<()> {
        match self.closure.take() {
            Some(closure) => closure(),
            None => Err(WorkerError::other(
                "ClosureTask already executed - cannot execute twice",
            )),
        }
    }

    fn task_name(&self) -> &str {
        &self.name
    }
}

/// Task whose closure receives the pool's interruption token
pub(crate) struct InterruptibleTask<F>
where
    F: FnOnce(CancellationToken) -> Result<()> + Send,
{
    token: CancellationToken,
    closure: Option<F>,
}

impl<F> InterruptibleTask<F>
where
    F: FnOnce(CancellationToken) -> Result<()> + Send,
{
    pub(crate) fn new(token: CancellationToken, closure: F) -> Self {
        Self {
            token,
            closure: Some(closure),
        }
    }
}

impl<F> Task for InterruptibleTask<F>
where
    F: FnOnce(CancellationToken) -> Result<()> + Send,
{
    fn execute(&mut self) -> Result<()> {
        // Dequeued after shutdown_now: report instead of running
        if self.token.is_cancelled() {
            self.closure = None;
            return Err(WorkerError::interrupted("pool interrupted before task started"));
        }

        match self.closure.take() {
            Some(closure) => closure(self.token.clone()),
            None => Err(WorkerError::other(
                "InterruptibleTask already executed - cannot execute twice",
            )),
        }
    }

    fn task_name(&self) -> &str {
        "InterruptibleTask"
    }
}
