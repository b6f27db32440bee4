//! Cooperative interruption for running tasks
//!
//! Rust threads cannot be interrupted from the outside, so a pool hands its
//! tasks a [`CancellationToken`] instead. `shutdown_now` cancels the token;
//! tasks observe it either by polling [`CancellationToken::is_cancelled`] /
//! [`CancellationToken::check`] or by blocking in
//! [`CancellationToken::sleep`], which wakes up early on cancellation.
//!
//! # Example
//!
//! ```rust
//! use rust_worker_kit::CancellationToken;
//! use std::thread;
//! use std::time::Duration;
//!
//! let token = CancellationToken::new();
//! let token_clone = token.clone();
//!
//! let handle = thread::spawn(move || token_clone.sleep(Duration::from_secs(30)));
//!
//! token.cancel();
//! assert!(handle.join().unwrap().is_err());
//! ```

use crate::core::error::{Result, WorkerError};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Reason for cancellation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CancellationReason {
    /// Explicitly cancelled via `cancel()`
    Manual,
    /// Cancelled by a pool's `shutdown_now`
    ShutdownNow,
    /// Custom cancellation reason
    Custom(String),
}

impl std::fmt::Display for CancellationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CancellationReason::Manual => write!(f, "manually cancelled"),
            CancellationReason::ShutdownNow => write!(f, "pool was shut down immediately"),
            CancellationReason::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

struct TokenInner {
    cancelled: AtomicBool,
    reason: Mutex<Option<CancellationReason>>,
    // Sleepers park here; cancel() notifies under the same mutex
    sleep_lock: Mutex<()>,
    wakeup: Condvar,
}

/// A thread-safe cancellation token shared between a pool and its tasks
///
/// Clones share state: cancelling any clone cancels all of them.
/// Cancellation is one-way and idempotent; the first reason wins.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}

impl CancellationToken {
    /// Create a new token (not cancelled)
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                reason: Mutex::new(None),
                sleep_lock: Mutex::new(()),
                wakeup: Condvar::new(),
            }),
        }
    }

    /// Cancel the token
    pub fn cancel(&self) {
        self.cancel_with_reason(CancellationReason::Manual);
    }

    /// Cancel the token, recording why
    ///
    /// Only the first cancellation records its reason.
    pub fn cancel_with_reason(&self, reason: CancellationReason) {
        {
            let mut recorded = self.inner.reason.lock();
            if recorded.is_some() {
                return;
            }
            // Reason is visible before anyone can observe the flag
            *recorded = Some(reason);
            self.inner.cancelled.store(true, Ordering::Release);
        }

        let _guard = self.inner.sleep_lock.lock();
        self.inner.wakeup.notify_all();
    }

    /// Check if the token has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Why the token was cancelled, if it was
    pub fn reason(&self) -> Option<CancellationReason> {
        self.inner.reason.lock().clone()
    }

    /// Return `Err(Interrupted)` if the token has been cancelled
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(self.interrupted_error())
        } else {
            Ok(())
        }
    }

    /// Sleep for `duration`, waking early if the token is cancelled
    ///
    /// # Errors
    ///
    /// Returns `WorkerError::Interrupted` if the token is cancelled before
    /// or during the sleep.
    pub fn sleep(&self, duration: Duration) -> Result<()> {
        let deadline = Instant::now() + duration;
        let mut guard = self.inner.sleep_lock.lock();
        loop {
            if self.is_cancelled() {
                return Err(self.interrupted_error());
            }
            if self
                .inner
                .wakeup
                .wait_until(&mut guard, deadline)
                .timed_out()
            {
                return self.check();
            }
        }
    }

    fn interrupted_error(&self) -> WorkerError {
        let reason = self
            .reason()
            .map(|r| r.to_string())
            .unwrap_or_else(|| CancellationReason::Manual.to_string());
        WorkerError::interrupted(reason)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
