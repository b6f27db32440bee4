//! Lock-based shared state

pub mod guarded_counter;
pub mod stamped;

pub use guarded_counter::GuardedCounter;
pub use stamped::{Stamp, StampedCell, MAX_OPTIMISTIC_ATTEMPTS};
