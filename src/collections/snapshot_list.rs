//! Copy-on-write list with snapshot iteration
//!
//! The list holds an immutable `Arc<Vec<T>>`. Every mutation copies the
//! current vector, changes the copy, and publishes it with an atomic swap.
//! Readers never lock: an iterator keeps the `Arc` it started with, so it
//! sees exactly the elements present when it was created, no matter what
//! writers do afterwards. Each write costs a full copy, which suits
//! read-heavy, write-light data such as listener registries.

use arc_swap::ArcSwap;
use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;

/// A list whose iterators observe a point-in-time snapshot
///
/// # Example
///
/// ```rust
/// use rust_worker_kit::SnapshotList;
///
/// let list: SnapshotList<&str> = vec!["a", "b"].into();
/// let iter = list.snapshot_iter();
///
/// list.append("c");
/// assert!(list.remove(&"a"));
///
/// // The iterator still sees the list as it was
/// assert_eq!(iter.collect::<Vec<_>>(), vec!["a", "b"]);
/// assert_eq!(list.snapshot_iter().collect::<Vec<_>>(), vec!["b", "c"]);
/// ```
pub struct SnapshotList<T> {
    current: ArcSwap<Vec<T>>,
}

impl<T> SnapshotList<T> {
    /// Create an empty list
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// The currently published sequence
    pub fn snapshot(&self) -> Arc<Vec<T>> {
        self.current.load_full()
    }

    /// Iterate over the sequence published at the time of this call
    pub fn snapshot_iter(&self) -> SnapshotIter<T> {
        SnapshotIter {
            snapshot: self.snapshot(),
            front: 0,
        }
    }

    /// Number of elements currently published
    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    /// Whether the list is currently empty
    pub fn is_empty(&self) -> bool {
        self.current.load().is_empty()
    }

    /// Remove every element
    pub fn clear(&self) {
        self.current.store(Arc::new(Vec::new()));
    }
}

impl<T: Clone> SnapshotList<T> {
    /// Append `item` to the end of the list
    ///
    /// Copies the current sequence: O(n).
    pub fn append(&self, item: T) {
        self.current.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(item.clone());
            next
        });
    }

    /// Element at `index` in the current sequence
    pub fn get(&self, index: usize) -> Option<T> {
        self.current.load().get(index).cloned()
    }
}

impl<T: Clone + PartialEq> SnapshotList<T> {
    /// Remove the first element equal to `item`
    ///
    /// Returns whether an element was removed.
    pub fn remove(&self, item: &T) -> bool {
        let mut removed = false;
        self.current
            .rcu(|current| match current.iter().position(|x| x == item) {
                Some(index) => {
                    removed = true;
                    let mut next = Vec::clone(current);
                    next.remove(index);
                    Arc::new(next)
                }
                None => {
                    removed = false;
                    Arc::clone(current)
                }
            });
        removed
    }

    /// Append `item` unless an equal element is already present
    ///
    /// Returns whether the item was added. The check and the append are one
    /// atomic publish.
    pub fn add_if_absent(&self, item: T) -> bool {
        let mut added = false;
        self.current.rcu(|current| {
            if current.contains(&item) {
                added = false;
                Arc::clone(current)
            } else {
                added = true;
                let mut next = Vec::with_capacity(current.len() + 1);
                next.extend(current.iter().cloned());
                next.push(item.clone());
                Arc::new(next)
            }
        });
        added
    }

    /// Whether an element equal to `item` is currently present
    pub fn contains(&self, item: &T) -> bool {
        self.current.load().contains(item)
    }
}

impl<T> Default for SnapshotList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for SnapshotList<T> {
    /// The clone starts from this list's current snapshot and then evolves
    /// independently
    fn clone(&self) -> Self {
        Self {
            current: ArcSwap::new(self.snapshot()),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for SnapshotList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.snapshot().iter()).finish()
    }
}

impl<T> From<Vec<T>> for SnapshotList<T> {
    fn from(items: Vec<T>) -> Self {
        Self {
            current: ArcSwap::from_pointee(items),
        }
    }
}

impl<T> FromIterator<T> for SnapshotList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        iter.into_iter().collect::<Vec<_>>().into()
    }
}

impl<T: Clone> IntoIterator for &SnapshotList<T> {
    type Item = T;
    type IntoIter = SnapshotIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.snapshot_iter()
    }
}

/// Iterator over one published snapshot of a [`SnapshotList`]
///
/// Unaffected by later mutations of the list and never fails.
#[derive(Clone, Debug)]
pub struct SnapshotIter<T> {
    snapshot: Arc<Vec<T>>,
    front: usize,
}

impl<T> SnapshotIter<T> {
    /// Elements not yet yielded
    pub fn as_slice(&self) -> &[T] {
        &self.snapshot[self.front..]
    }
}

impl<T: Clone> Iterator for SnapshotIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let item = self.snapshot.get(self.front).cloned()?;
        self.front += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.snapshot.len() - self.front;
        (remaining, Some(remaining))
    }
}

impl<T: Clone> ExactSizeIterator for SnapshotIter<T> {}

impl<T: Clone> FusedIterator for SnapshotIter<T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_append_and_get() {
        let list = SnapshotList::new();
        assert!(list.is_empty());

        list.append(1);
        list.append(2);
        assert_eq!(list.len(), 2);
        assert_eq!(list.get(1), Some(2));
        assert_eq!(list.get(2), None);
    }

    #[test]
    fn test_snapshot_isolation() {
        let list: SnapshotList<i32> = vec![1, 2, 3].into();
        let iter = list.snapshot_iter();

        list.append(4);
        list.append(5);
        list.append(6);

        assert_eq!(iter.len(), 3);
        assert_eq!(iter.collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(
            list.snapshot_iter().collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5, 6]
        );
    }

    #[test]
    fn test_iterator_survives_removal_mid_iteration() {
        let list: SnapshotList<i32> = (1..=4).collect();
        let mut iter = list.snapshot_iter();
        assert_eq!(iter.next(), Some(1));

        assert!(list.remove(&2));
        list.clear();

        assert_eq!(iter.as_slice(), &[2, 3, 4]);
        assert_eq!(iter.collect::<Vec<_>>(), vec![2, 3, 4]);
        assert!(list.is_empty());
    }

    #[test]
    fn test_remove_first_match_only() {
        let list: SnapshotList<&str> = vec!["x", "y", "x"].into();
        assert!(list.remove(&"x"));
        assert_eq!(*list.snapshot(), vec!["y", "x"]);
        assert!(!list.remove(&"z"));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_unchanged_remove_keeps_snapshot() {
        let list: SnapshotList<u8> = vec![1].into();
        let before = list.snapshot();
        assert!(!list.remove(&9));
        assert!(Arc::ptr_eq(&before, &list.snapshot()));
    }

    #[test]
    fn test_add_if_absent() {
        let list = SnapshotList::new();
        assert!(list.add_if_absent("a"));
        assert!(!list.add_if_absent("a"));
        assert!(list.contains(&"a"));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_clone_is_independent() {
        let list: SnapshotList<u8> = vec![1, 2].into();
        let copy = list.clone();
        list.append(3);
        assert_eq!(copy.len(), 2);
        assert_eq!(format!("{:?}", list), "[1, 2, 3]");
    }

    #[test]
    fn test_concurrent_appends_all_land() {
        let list = Arc::new(SnapshotList::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let list = Arc::clone(&list);
                thread::spawn(move || {
                    for i in 0..100 {
                        list.append(t * 1000 + i);
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        let snapshot = list.snapshot();
        assert_eq!(snapshot.len(), 800);
        for t in 0..8 {
            let own: Vec<_> = snapshot.iter().filter(|v| **v / 1000 == t).collect();
            assert!(own.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_readers_see_consistent_prefixes() {
        let list = Arc::new(SnapshotList::new());

        let writer = {
            let list = Arc::clone(&list);
            thread::spawn(move || {
                for i in 0..500usize {
                    list.append(i);
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let list = Arc::clone(&list);
                thread::spawn(move || {
                    for _ in 0..200 {
                        let seen: Vec<usize> = list.snapshot_iter().collect();
                        assert!(seen.iter().enumerate().all(|(i, v)| i == *v));
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for r in readers {
            r.join().unwrap();
        }
        assert_eq!(list.len(), 500);
    }
}
