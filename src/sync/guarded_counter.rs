//! Integer counter guarded by a mutual-exclusion lock

use crate::core::{Result, WorkerError};
use parking_lot::{Mutex, MutexGuard};
use std::time::Duration;

/// A shared integer whose every read and write happens under one lock
///
/// All operations are linearizable: they are serialized by the lock, so
/// `N` threads each calling [`increment`](Self::increment) `M` times always
/// leave the counter at exactly `N * M`. The lock itself is never handed out.
///
/// Arithmetic wraps on overflow.
///
/// # Example
///
/// ```rust
/// use rust_worker_kit::GuardedCounter;
/// use std::sync::Arc;
/// use std::thread;
///
/// let counter = Arc::new(GuardedCounter::new(0));
/// let handles: Vec<_> = (0..4)
///     .map(|_| {
///         let counter = Arc::clone(&counter);
///         thread::spawn(move || {
///             for _ in 0..1000 {
///                 counter.increment();
///             }
///         })
///     })
///     .collect();
/// for h in handles {
///     h.join().unwrap();
/// }
/// assert_eq!(counter.get(), 4000);
/// ```
#[derive(Debug, Default)]
pub struct GuardedCounter {
    value: Mutex<i64>,
}

impl GuardedCounter {
    /// Create a counter starting at `initial`
    pub fn new(initial: i64) -> Self {
        Self {
            value: Mutex::new(initial),
        }
    }

    /// Add one and return the new value
    pub fn increment(&self) -> i64 {
        self.add(1)
    }

    /// Subtract one and return the new value
    pub fn decrement(&self) -> i64 {
        self.add(-1)
    }

    /// Add `delta` and return the new value
    pub fn add(&self, delta: i64) -> i64 {
        Self::apply_add(&mut self.value.lock(), delta)
    }

    /// Current value
    pub fn get(&self) -> i64 {
        *self.value.lock()
    }

    /// Replace the value, returning the previous one
    pub fn get_and_set(&self, value: i64) -> i64 {
        std::mem::replace(&mut *self.value.lock(), value)
    }

    /// Set the value to `new` if it currently equals `expected`
    ///
    /// Returns whether the swap happened. The value is unchanged otherwise.
    pub fn compare_and_set(&self, expected: i64, new: i64) -> bool {
        Self::apply_cas(&mut self.value.lock(), expected, new)
    }

    /// [`increment`](Self::increment), giving up if the lock is not
    /// acquired within `timeout`
    ///
    /// # Errors
    ///
    /// `WorkerError::LockTimeout`; the value is not modified.
    pub fn try_increment_for(&self, timeout: Duration) -> Result<i64> {
        self.try_add_for(1, timeout)
    }

    /// [`decrement`](Self::decrement) with a lock timeout
    pub fn try_decrement_for(&self, timeout: Duration) -> Result<i64> {
        self.try_add_for(-1, timeout)
    }

    /// [`add`](Self::add) with a lock timeout
    pub fn try_add_for(&self, delta: i64, timeout: Duration) -> Result<i64> {
        let mut guard = self.lock_for(timeout)?;
        Ok(Self::apply_add(&mut guard, delta))
    }

    /// [`get`](Self::get) with a lock timeout
    pub fn try_get_for(&self, timeout: Duration) -> Result<i64> {
        self.lock_for(timeout).map(|guard| *guard)
    }

    /// [`compare_and_set`](Self::compare_and_set) with a lock timeout
    pub fn try_compare_and_set_for(
        &self,
        expected: i64,
        new: i64,
        timeout: Duration,
    ) -> Result<bool> {
        let mut guard = self.lock_for(timeout)?;
        Ok(Self::apply_cas(&mut guard, expected, new))
    }

    fn lock_for(&self, timeout: Duration) -> Result<MutexGuard<'_, i64>> {
        self.value.try_lock_for(timeout).ok_or_else(|| {
            log::debug!("counter lock not acquired within {:?}", timeout);
            WorkerError::lock_timeout(timeout)
        })
    }

    fn apply_add(value: &mut i64, delta: i64) -> i64 {
        *value = value.wrapping_add(delta);
        *value
    }

    fn apply_cas(value: &mut i64, expected: i64, new: i64) -> bool {
        if *value == expected {
            *value = new;
            true
        } else {
            false
        }
    }
}

impl From<i64> for GuardedCounter {
    fn from(value: i64) -> Self {
        Self::new(value)
    }
}
