//! Pool lifecycle state machine

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Lifecycle state of a [`WorkerPool`](crate::pool::WorkerPool)
///
/// `Running` is initial and `Terminated` is terminal; there is no way back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolState {
    /// Accepting and executing tasks
    Running,
    /// Rejecting new tasks; workers are finishing up
    ShuttingDown,
    /// Every worker has exited
    Terminated,
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolState::Running => write!(f, "running"),
            PoolState::ShuttingDown => write!(f, "shutting down"),
            PoolState::Terminated => write!(f, "terminated"),
        }
    }
}

struct LifecycleInner {
    state: PoolState,
    live_workers: usize,
}

/// Shared between a pool and its workers.
///
/// The last worker to exit after shutdown moves the pool to `Terminated`
/// and wakes everyone blocked in [`Lifecycle::await_terminated`].
pub(crate) struct Lifecycle {
    inner: Mutex<LifecycleInner>,
    terminated: Condvar,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(LifecycleInner {
                state: PoolState::Running,
                live_workers: 0,
            }),
            terminated: Condvar::new(),
        }
    }

    pub(crate) fn state(&self) -> PoolState {
        self.inner.lock().state
    }

    pub(crate) fn live_workers(&self) -> usize {
        self.inner.lock().live_workers
    }

    /// Register a worker before its thread is spawned
    pub(crate) fn worker_started(&self) {
        self.inner.lock().live_workers += 1;
    }

    pub(crate) fn worker_exited(&self) {
        let mut inner = self.inner.lock();
        inner.live_workers = inner.live_workers.saturating_sub(1);
        if inner.live_workers == 0 && inner.state == PoolState::ShuttingDown {
            inner.state = PoolState::Terminated;
            self.terminated.notify_all();
        }
    }

    /// Leave `Running`. Returns `false` if shutdown had already begun.
    pub(crate) fn begin_shutdown(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.state != PoolState::Running {
            return false;
        }
        inner.state = if inner.live_workers == 0 {
            self.terminated.notify_all();
            PoolState::Terminated
        } else {
            PoolState::ShuttingDown
        };
        true
    }

    /// Wait until `Terminated` or until `timeout` elapses
    pub(crate) fn await_terminated(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();
        while inner.state != PoolState::Terminated {
            if self.terminated.wait_until(&mut inner, deadline).timed_out() {
                return inner.state == PoolState::Terminated;
            }
        }
        true
    }
}
