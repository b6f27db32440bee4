//! Stamped value with optimistic reads
//!
//! Every completed write advances the cell's stamp by two; the stamp is odd
//! while a write is in progress. An optimistic read captures an even stamp,
//! copies the value without waiting on writers, and is valid only if the
//! stamp is unchanged afterwards.
//!
//! [`StampedCell::read`] retries a failed optimistic read at most
//! [`MAX_OPTIMISTIC_ATTEMPTS`] times and then falls back to a blocking shared
//! lock, so readers always make progress even under a steady stream of writes.

use crossbeam_utils::Backoff;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Optimistic attempts made by [`StampedCell::read`] before blocking
pub const MAX_OPTIMISTIC_ATTEMPTS: usize = 8;

/// Version stamp returned by an optimistic read
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Stamp(u64);

impl Stamp {
    /// Raw stamp value
    pub fn value(self) -> u64 {
        self.0
    }
}

/// A `Copy` value supporting optimistic reads validated by a stamp
///
/// # Example
///
/// ```rust
/// use rust_worker_kit::StampedCell;
///
/// let position = StampedCell::new((0.0_f64, 0.0_f64));
///
/// let (snapshot, stamp) = position.try_optimistic_read().unwrap();
/// let distance = (snapshot.0 * snapshot.0 + snapshot.1 * snapshot.1).sqrt();
/// assert!(position.validate(stamp));
/// assert_eq!(distance, 0.0);
///
/// position.write((3.0, 4.0));
/// assert!(!position.validate(stamp));
/// ```
#[derive(Debug)]
pub struct StampedCell<T> {
    stamp: AtomicU64,
    value: RwLock<T>,
    fallback_reads: AtomicU64,
}

impl<T: Copy> StampedCell<T> {
    /// Create a cell holding `value`
    pub fn new(value: T) -> Self {
        Self {
            stamp: AtomicU64::new(0),
            value: RwLock::new(value),
            fallback_reads: AtomicU64::new(0),
        }
    }

    /// Replace the value
    pub fn write(&self, value: T) {
        self.update(|v| *v = value);
    }

    /// Modify the value in place under the write lock
    pub fn update<F: FnOnce(&mut T)>(&self, f: F) {
        let mut guard = self.value.write();
        self.stamp.fetch_add(1, Ordering::AcqRel);
        // Makes the stamp even again even if `f` panics
        let _stamp = StampGuard(&self.stamp);
        f(&mut guard);
    }

    /// Read the value, optimistically first
    ///
    /// Never returns a value whose stamp failed validation.
    pub fn read(&self) -> T {
        let backoff = Backoff::new();
        for _ in 0..MAX_OPTIMISTIC_ATTEMPTS {
            if let Some((value, _)) = self.try_optimistic_read() {
                return value;
            }
            backoff.snooze();
        }

        self.fallback_reads.fetch_add(1, Ordering::Relaxed);
        log::trace!(
            "optimistic read failed {} times, taking the read lock",
            MAX_OPTIMISTIC_ATTEMPTS
        );
        self.read_blocking()
    }

    /// Read the value under the shared lock
    pub fn read_blocking(&self) -> T {
        *self.value.read()
    }

    /// One optimistic read attempt
    ///
    /// Returns `None` if a write was in progress or completed during the
    /// attempt. The returned stamp can be passed to [`validate`](Self::validate)
    /// later to check that nothing was written since.
    pub fn try_optimistic_read(&self) -> Option<(T, Stamp)> {
        let before = self.stamp.load(Ordering::Acquire);
        if before % 2 == 1 {
            return None;
        }

        let value = *self.value.try_read()?;

        if self.stamp.load(Ordering::Acquire) == before {
            Some((value, Stamp(before)))
        } else {
            None
        }
    }

    /// Whether no write has started since `stamp` was issued
    pub fn validate(&self, stamp: Stamp) -> bool {
        self.stamp.load(Ordering::Acquire) == stamp.0
    }

    /// Current stamp
    pub fn stamp(&self) -> Stamp {
        Stamp(self.stamp.load(Ordering::Acquire))
    }

    /// How many reads gave up on optimism and blocked
    pub fn fallback_reads(&self) -> u64 {
        self.fallback_reads.load(Ordering::Relaxed)
    }

    /// Consume the cell, returning the value
    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

/// Ends a write by advancing the stamp back to even
struct StampGuard<'a>(&'a AtomicU64);

impl Drop for StampGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::Release);
    }
}

impl<T: Copy + Default> Default for StampedCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_stamp_advances_per_write() {
        let cell = StampedCell::new(1u32);
        assert_eq!(cell.stamp().value(), 0);

        cell.write(2);
        assert_eq!(cell.stamp().value(), 2);
        cell.update(|v| *v += 1);
        assert_eq!(cell.stamp().value(), 4);
        assert_eq!(cell.read(), 3);
        assert_eq!(cell.into_inner(), 3);
    }

    #[test]
    fn test_validate_detects_intervening_write() {
        let cell = StampedCell::new((1, 1));
        let (value, stamp) = cell.try_optimistic_read().unwrap();
        assert_eq!(value, (1, 1));
        assert!(cell.validate(stamp));

        cell.write((2, 2));
        assert!(!cell.validate(stamp));
    }

    #[test]
    fn test_optimistic_read_fails_while_write_locked() {
        let cell = StampedCell::new(5u8);
        let _guard = cell.value.write();
        assert!(cell.try_optimistic_read().is_none());
    }

    #[test]
    fn test_read_falls_back_to_lock() {
        let cell = Arc::new(StampedCell::new(1u64));
        let guard = cell.value.write();

        let reader = {
            let cell = Arc::clone(&cell);
            thread::spawn(move || cell.read())
        };

        thread::sleep(Duration::from_millis(50));
        drop(guard);

        assert_eq!(reader.join().unwrap(), 1);
        assert_eq!(cell.fallback_reads(), 1);
    }

    #[test]
    fn test_panicking_update_keeps_optimistic_reads() {
        let cell = StampedCell::new(1u32);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            cell.update(|_| panic!("update failed"));
        }));
        assert!(result.is_err());
        assert_eq!(cell.stamp().value() % 2, 0);

        cell.write(2);
        let (value, stamp) = cell.try_optimistic_read().expect("optimistic read");
        assert_eq!(value, 2);
        assert!(cell.validate(stamp));
        assert_eq!(cell.read(), 2);
        assert_eq!(cell.fallback_reads(), 0);
    }

    #[test]
    fn test_reads_never_torn_under_writes() {
        let cell = Arc::new(StampedCell::new((0u64, 0u64)));

        let writer = {
            let cell = Arc::clone(&cell);
            thread::spawn(move || {
                for i in 1..=10_000u64 {
                    cell.write((i, i * 2));
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cell = Arc::clone(&cell);
                thread::spawn(move || {
                    for _ in 0..10_000 {
                        let (a, b) = cell.read();
                        assert_eq!(b, a * 2);
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for r in readers {
            r.join().unwrap();
        }
        assert_eq!(cell.read(), (10_000, 20_000));
    }
}
