//! Thread pool with per-worker deque inboxes
//!
//! The pool owns a fixed set of worker threads, each with a private
//! [`ConcurrentRingDeque`] inbox. Submission
//! places a task in a random inbox and runs one opportunistic rebalance
//! step; draining (`wait`) lets the calling thread assist. See the module
//! docs on [`core`] for the scheduling details.
//!
//! [`ConcurrentRingDeque`]: crate::deque::ConcurrentRingDeque

mod core;
mod task;
mod worker;

pub use self::core::{PoolConfig, PoolStats, ThreadPool};
pub use self::task::JoinHandle;
pub use self::worker::WorkerStats;
