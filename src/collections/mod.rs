//! Concurrent collections

pub mod snapshot_list;

pub use snapshot_list::{SnapshotIter, SnapshotList};
