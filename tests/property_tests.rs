//! Property-based tests for rust_worker_kit using proptest

use proptest::prelude::*;
use rust_worker_kit::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// WorkerPoolConfig Tests
// ============================================================================

proptest! {
    /// Any positive worker count is accepted as-is
    #[test]
    fn test_config_worker_count(workers in 1usize..64) {
        let config = WorkerPoolConfig::new(workers);
        prop_assert_eq!(config.num_workers, workers);
        prop_assert!(config.validate().is_ok());
    }

    /// Builder settings survive a JSON round trip
    #[test]
    fn test_config_json_round_trip(
        workers in 1usize..16,
        max_queue_size in 0usize..10_000,
        prefix in "[a-z]{3,10}",
        poll_ms in 1u64..5_000
    ) {
        let config = WorkerPoolConfig::new(workers)
            .with_max_queue_size(max_queue_size)
            .with_worker_name_prefix(prefix)
            .with_poll_interval(Duration::from_millis(poll_ms));

        let json = config.to_json().unwrap();
        prop_assert_eq!(WorkerPoolConfig::from_json(&json).unwrap(), config);
    }
}

// ============================================================================
// WorkerPool Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Every accepted task runs exactly once before termination
    #[test]
    fn test_all_tasks_execute(workers in 1usize..8, task_count in 1usize..100) {
        let pool = WorkerPool::new(workers).unwrap();
        let runs = Arc::new(AtomicUsize::new(0));

        for _ in 0..task_count {
            let runs = Arc::clone(&runs);
            pool.execute(move || {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }).unwrap();
        }

        pool.shutdown();
        prop_assert!(pool.await_termination(Duration::from_secs(10)));
        prop_assert_eq!(runs.load(Ordering::SeqCst), task_count);
        prop_assert_eq!(pool.stats().workers.tasks_completed, task_count as u64);
    }

    /// Completed, failed and panicked counts match the task mix
    #[test]
    fn test_outcome_counts(outcomes in prop::collection::vec(0u8..3, 1..60)) {
        let pool = WorkerPool::new(3).unwrap();

        for outcome in outcomes.iter().copied() {
            pool.execute(move || match outcome {
                0 => Ok(()),
                1 => Err(WorkerError::other("failed")),
                _ => panic!("panicked"),
            }).unwrap();
        }

        pool.join().unwrap();
        let stats = pool.stats().workers;
        let count = |k: u8| outcomes.iter().filter(|o| **o == k).count() as u64;
        prop_assert_eq!(stats.tasks_completed, count(0));
        prop_assert_eq!(stats.tasks_failed, count(1));
        prop_assert_eq!(stats.tasks_panicked, count(2));
    }

    /// Result handles carry each closure's value back
    #[test]
    fn test_result_handles(values in prop::collection::vec(any::<i32>(), 1..30)) {
        let pool = WorkerPool::new(2).unwrap();

        let handles: Vec<_> = values
            .iter()
            .map(|v| {
                let v = *v;
                pool.submit_with_result(move || Ok(v)).unwrap()
            })
            .collect();

        let results: Vec<i32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        prop_assert_eq!(results, values);
    }
}

// ============================================================================
// GuardedCounter Tests
// ============================================================================

proptest! {
    /// The counter equals the wrapping sum of all deltas
    #[test]
    fn test_counter_sum(start in any::<i64>(), deltas in prop::collection::vec(any::<i64>(), 0..50)) {
        let counter = GuardedCounter::new(start);
        for d in &deltas {
            counter.add(*d);
        }
        let expected = deltas.iter().fold(start, |acc, d| acc.wrapping_add(*d));
        prop_assert_eq!(counter.get(), expected);
    }

    /// compare_and_set succeeds exactly when the expectation matches
    #[test]
    fn test_counter_cas(value in any::<i64>(), expected in any::<i64>(), new in any::<i64>()) {
        let counter = GuardedCounter::new(value);
        let swapped = counter.compare_and_set(expected, new);
        prop_assert_eq!(swapped, value == expected);
        prop_assert_eq!(counter.get(), if swapped { new } else { value });
    }
}

// ============================================================================
// SnapshotList Tests
// ============================================================================

#[derive(Clone, Debug)]
enum ListOp {
    Append(u8),
    Remove(u8),
    AddIfAbsent(u8),
}

fn list_op() -> impl Strategy<Value = ListOp> {
    prop_oneof![
        any::<u8>().prop_map(ListOp::Append),
        any::<u8>().prop_map(ListOp::Remove),
        any::<u8>().prop_map(ListOp::AddIfAbsent),
    ]
}

proptest! {
    /// The list behaves like a Vec under the same operations
    #[test]
    fn test_list_matches_vec(ops in prop::collection::vec(list_op(), 0..80)) {
        let list = SnapshotList::new();
        let mut model: Vec<u8> = Vec::new();

        for op in ops {
            match op {
                ListOp::Append(v) => {
                    list.append(v);
                    model.push(v);
                }
                ListOp::Remove(v) => {
                    let expected = model.iter().position(|x| *x == v);
                    prop_assert_eq!(list.remove(&v), expected.is_some());
                    if let Some(i) = expected {
                        model.remove(i);
                    }
                }
                ListOp::AddIfAbsent(v) => {
                    let absent = !model.contains(&v);
                    prop_assert_eq!(list.add_if_absent(v), absent);
                    if absent {
                        model.push(v);
                    }
                }
            }
        }

        prop_assert_eq!(list.snapshot_iter().collect::<Vec<_>>(), model);
    }

    /// An iterator taken before mutations yields the earlier contents
    #[test]
    fn test_snapshot_frozen(
        initial in prop::collection::vec(any::<u8>(), 0..20),
        ops in prop::collection::vec(list_op(), 1..40)
    ) {
        let list = SnapshotList::from(initial.clone());
        let iter = list.snapshot_iter();

        for op in ops {
            match op {
                ListOp::Append(v) => list.append(v),
                ListOp::Remove(v) => {
                    list.remove(&v);
                }
                ListOp::AddIfAbsent(v) => {
                    list.add_if_absent(v);
                }
            }
        }

        prop_assert_eq!(iter.collect::<Vec<_>>(), initial);
    }
}

// ============================================================================
// StampedCell Tests
// ============================================================================

proptest! {
    /// Reads return the last write; each write invalidates earlier stamps
    #[test]
    fn test_stamped_last_write_wins(writes in prop::collection::vec(any::<u32>(), 1..30)) {
        let cell = StampedCell::new(0u32);
        for w in &writes {
            let (_, stamp) = cell.try_optimistic_read().unwrap();
            cell.write(*w);
            prop_assert!(!cell.validate(stamp));
        }
        prop_assert_eq!(cell.read(), *writes.last().unwrap());
        prop_assert_eq!(cell.stamp().value(), 2 * writes.len() as u64);
    }
}
