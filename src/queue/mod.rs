//! Task queue abstraction shared by submitters and workers.
//!
//! The pool only talks to its queue through the [`TaskQueue`] trait, so a
//! different queue can be plugged in with
//! [`WorkerPool::with_queue`](crate::pool::WorkerPool::with_queue).
//!
//! # Built-in Implementations
//!
//! - [`ChannelQueue::unbounded`]: unbounded FIFO queue (default)
//! - [`ChannelQueue::bounded`]: FIFO queue that rejects tasks beyond a capacity
//!
//! # Closing
//!
//! Closing a queue is how the pool tells its workers to stop: a closed queue
//! rejects new tasks, still hands out the tasks it holds, and reports
//! [`QueueError::Disconnected`] to receivers once it is empty.

mod channel;

pub use channel::ChannelQueue;

use crate::core::BoxedTask;
use std::time::Duration;

/// Result type for queue operations
pub type QueueResult<T> = std::result::Result<T, QueueError>;

/// Errors that can occur during queue operations.
///
/// Send failures hand the task back so it is never lost silently.
#[derive(Debug)]
pub enum QueueError {
    /// Queue is at capacity (bounded queues only)
    Full(BoxedTask),
    /// Queue is closed and not accepting new tasks
    Closed(BoxedTask),
    /// No task arrived before the timeout
    Empty,
    /// Queue is closed and drained
    Disconnected,
}

impl QueueError {
    /// Take back the task of a failed send
    pub fn into_task(self) -> Option<BoxedTask> {
        match self {
            QueueError::Full(task) | QueueError::Closed(task) => Some(task),
            QueueError::Empty | QueueError::Disconnected => None,
        }
    }
}

impl std::fmt::Display for QueueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueError::Full(_) => write!(f, "queue is full"),
            QueueError::Closed(_) => write!(f, "queue is closed"),
            QueueError::Empty => write!(f, "queue is empty"),
            QueueError::Disconnected => write!(f, "queue is closed and drained"),
        }
    }
}

impl std::error::Error for QueueError {}

/// A multi-producer, multi-consumer FIFO of tasks.
///
/// Implementations must be internally synchronized: the pool shares one
/// instance between every submitter and every worker.
pub trait TaskQueue: Send + Sync {
    /// Enqueue a task without blocking.
    ///
    /// # Errors
    ///
    /// - [`QueueError::Closed`] once [`close`](Self::close) has been called
    /// - [`QueueError::Full`] if a bounded queue is at capacity
    fn send(&self, task: BoxedTask) -> QueueResult<()>;

    /// Dequeue a task, waiting at most `timeout`.
    ///
    /// # Errors
    ///
    /// - [`QueueError::Empty`] if nothing arrived in time
    /// - [`QueueError::Disconnected`] if the queue is closed and empty
    fn recv_timeout(&self, timeout: Duration) -> QueueResult<BoxedTask>;

    /// Dequeue a task if one is immediately available.
    fn try_recv(&self) -> QueueResult<BoxedTask>;

    /// Stop accepting tasks and wake every blocked receiver.
    fn close(&self);

    /// Whether [`close`](Self::close) has been called
    fn is_closed(&self) -> bool;

    /// Number of queued tasks (approximate under concurrency)
    fn len(&self) -> usize;

    /// Whether the queue currently holds no tasks
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of queued tasks, `None` if unbounded
    fn capacity(&self) -> Option<usize> {
        None
    }

    /// Remove and return every task that is immediately available
    fn drain(&self) -> Vec<BoxedTask> {
        let mut drained = Vec::with_capacity(self.len());
        while let Ok(task) = self.try_recv() {
            drained.push(task);
        }
        drained
    }
}
