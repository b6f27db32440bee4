//! FIFO task queue backed by crossbeam channels.

use super::{QueueError, QueueResult, TaskQueue};
use crate::core::BoxedTask;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use parking_lot::RwLock;
use std::time::Duration;

/// A FIFO queue built on a crossbeam channel.
///
/// The queue owns the only [`Sender`]. Closing drops it, which makes
/// receivers return [`QueueError::Disconnected`] as soon as the remaining
/// tasks are gone, so idle workers wake up immediately instead of waiting
/// out their poll interval.
///
/// # Example
///
/// ```rust
/// use rust_worker_kit::queue::{ChannelQueue, QueueError, TaskQueue};
/// use rust_worker_kit::core::ClosureTask;
/// use std::time::Duration;
///
/// let queue = ChannelQueue::unbounded();
/// queue.send(Box::new(ClosureTask::new(|| Ok(())))).unwrap();
/// queue.close();
///
/// assert!(queue.recv_timeout(Duration::from_millis(10)).is_ok());
/// assert!(matches!(
///     queue.recv_timeout(Duration::from_millis(10)),
///     Err(QueueError::Disconnected)
/// ));
/// ```
pub struct ChannelQueue {
    sender: RwLock<Option<Sender<BoxedTask>>>,
    receiver: Receiver<BoxedTask>,
    capacity: Option<usize>,
}

impl ChannelQueue {
    /// Creates a new unbounded queue.
    pub fn unbounded() -> Self {
        let (sender, receiver) = channel::unbounded();
        Self {
            sender: RwLock::new(Some(sender)),
            receiver,
            capacity: None,
        }
    }

    /// Creates a queue that holds at most `capacity` tasks.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn bounded(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be greater than 0");
        let (sender, receiver) = channel::bounded(capacity);
        Self {
            sender: RwLock::new(Some(sender)),
            receiver,
            capacity: Some(capacity),
        }
    }
}

impl std::fmt::Debug for ChannelQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelQueue")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl TaskQueue for ChannelQueue {
    fn send(&self, task: BoxedTask) -> QueueResult<()> {
        let sender = self.sender.read();
        match sender.as_ref() {
            Some(sender) => sender.try_send(task).map_err(|e| match e {
                TrySendError::Full(task) => QueueError::Full(task),
                TrySendError::Disconnected(task) => QueueError::Closed(task),
            }),
            None => Err(QueueError::Closed(task)),
        }
    }

    fn recv_timeout(&self, timeout: Duration) -> QueueResult<BoxedTask> {
        self.receiver.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => QueueError::Empty,
            RecvTimeoutError::Disconnected => QueueError::Disconnected,
        })
    }

    fn try_recv(&self) -> QueueResult<BoxedTask> {
        self.receiver.try_recv().map_err(|e| match e {
            TryRecvError::Empty => QueueError::Empty,
            TryRecvError::Disconnected => QueueError::Disconnected,
        })
    }

    fn close(&self) {
        self.sender.write().take();
    }

    fn is_closed(&self) -> bool {
        self.sender.read().is_none()
    }

    fn len(&self) -> usize {
        self.receiver.len()
    }

    fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}
