//! # parasort
//!
//! A small concurrency toolkit built to parallelize a hybrid adaptive
//! sort.
//!
//! ## Features
//!
//! - **ConcurrentRingDeque**: a mutex-protected growable circular deque,
//!   used as each pool worker's private task inbox
//! - **ThreadPool**: a fixed-size pool with randomized task placement,
//!   opportunistic rebalancing, and a caller-assisted synchronous drain
//! - **HybridSort**: a stable adaptive sort that detects natural runs,
//!   dispatches short-run sorting to the pool, and merges runs with an
//!   in-place, minimal-auxiliary-memory merge
//!
//! ## Quick Start
//!
//! ```rust
//! use parasort::prelude::*;
//!
//! let mut data = vec![5u32, 1, 4, 2, 3];
//! parasort::sort(&mut data).unwrap();
//! assert_eq!(data, vec![1, 2, 3, 4, 5]);
//!
//! let pool = ThreadPool::new(2).unwrap();
//! let handle = pool.submit(|| 6 * 7);
//! assert_eq!(handle.join().unwrap(), 42);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod deque;
pub mod error;
pub mod pool;
pub mod sort;

/// Convenient re-exports for common functionality
pub mod prelude {
    pub use crate::deque::ConcurrentRingDeque;
    pub use crate::error::{Error, Result};
    pub use crate::pool::{JoinHandle, PoolConfig, ThreadPool};
    pub use crate::sort::{sort, sort_by, HybridSort};
}

pub use prelude::*;
