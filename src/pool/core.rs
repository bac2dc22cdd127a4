//! Fixed-size thread pool with randomized placement and opportunistic
//! rebalancing
//!
//! Tasks are placed into a uniformly random worker's inbox on submission;
//! each submission also runs one best-effort rebalance step that may move
//! one queued task between inboxes. `wait()` drains the pool by letting
//! the calling thread execute queued tasks itself.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::task::{self, JoinHandle};
use super::worker::{PendingCounter, WorkerStats, WorkerThread};
use crate::error::Result;

/// Thread pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of worker threads (0 = number of CPU cores)
    pub num_workers: usize,
    /// Thread name prefix
    pub thread_name_prefix: String,
    /// How long an idle worker parks before re-checking its inbox
    pub park_timeout: Duration,
    /// Fairness bound: a queued task is relocated between inboxes at most
    /// this many times, then pinned to whichever inbox holds it
    pub relocation_limit: u8,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            num_workers: num_cpus::get(),
            thread_name_prefix: "parasort-worker".to_string(),
            park_timeout: Duration::from_millis(1),
            relocation_limit: 4,
        }
    }
}

/// Pool-wide statistics
#[derive(Debug, Default)]
pub struct PoolStats {
    /// Tasks submitted over the pool's lifetime
    pub tasks_submitted: AtomicUsize,
    /// Tasks the rebalancer moved between inboxes
    pub tasks_relocated: AtomicUsize,
    /// Tasks executed by `wait()` callers rather than workers
    pub tasks_drained: AtomicUsize,
}

/// A fixed-size pool of worker threads.
///
/// Dropping the pool signals every worker to stop and joins them; any task
/// still queued at that point is abandoned, and its [`JoinHandle`] resolves
/// to [`crate::error::Error::TaskAbandoned`].
pub struct ThreadPool {
    workers: Vec<WorkerThread>,
    rng: Mutex<StdRng>,
    counter: Arc<PendingCounter>,
    stats: PoolStats,
    config: PoolConfig,
}

impl ThreadPool {
    /// Create a pool with `num_workers` threads (0 = number of CPU cores).
    pub fn new(num_workers: usize) -> Result<Self> {
        Self::with_config(PoolConfig {
            num_workers,
            ..Default::default()
        })
    }

    /// Create a pool from an explicit configuration.
    pub fn with_config(config: PoolConfig) -> Result<Self> {
        let num_workers = if config.num_workers == 0 {
            num_cpus::get()
        } else {
            config.num_workers
        };

        let counter = Arc::new(PendingCounter::new());
        let mut workers = Vec::with_capacity(num_workers);
        for i in 0..num_workers {
            workers.push(WorkerThread::spawn(
                format!("{}-{}", config.thread_name_prefix, i),
                config.park_timeout,
                Arc::clone(&counter),
            )?);
        }
        log::debug!("thread pool started with {} workers", num_workers);

        Ok(Self {
            workers,
            rng: Mutex::new(StdRng::from_entropy()),
            counter,
            stats: PoolStats::default(),
            config,
        })
    }

    /// Worker count.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Tasks submitted but not yet completed.
    pub fn pending_tasks(&self) -> usize {
        self.counter.pending()
    }

    /// Submit a callable for execution on some worker.
    ///
    /// The task lands in a uniformly random worker's inbox; a subsequent
    /// rebalance step may move it once to another inbox. The returned
    /// handle observes the eventual result, a captured panic, or
    /// abandonment at teardown.
    pub fn submit<F, T>(&self, f: F) -> JoinHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (task, handle) = task::package(f);
        self.counter.task_submitted();
        self.stats.tasks_submitted.fetch_add(1, Ordering::Relaxed);

        let index = self.random_index();
        self.workers[index].submit(task);
        self.rebalance();
        handle
    }

    /// One uniformly random worker index from the pool-owned generator.
    fn random_index(&self) -> usize {
        self.rng.lock().gen_range(0..self.workers.len())
    }

    /// Best-effort load balancing: move at most one queued task from a
    /// random victim to the front of a different random worker's inbox,
    /// so relocated work is serviced promptly.
    ///
    /// A task that has already been relocated `relocation_limit` times is
    /// put back where it was, bounding how long rebalancing can keep a
    /// task in flight.
    fn rebalance(&self) {
        if self.workers.len() < 2 {
            return;
        }
        let (victim, target) = {
            let mut rng = self.rng.lock();
            let victim = rng.gen_range(0..self.workers.len());
            let offset = rng.gen_range(1..self.workers.len());
            (victim, (victim + offset) % self.workers.len())
        };

        let Some(mut task) = self.workers[victim].inbox().pull_back() else {
            return;
        };
        if task.relocations() >= self.config.relocation_limit {
            self.workers[victim].inbox().push_back(task);
            self.workers[victim].unpark();
            return;
        }
        task.mark_relocated();
        self.workers[target].inbox().push_front(task);
        self.workers[target].unpark();
        self.stats.tasks_relocated.fetch_add(1, Ordering::Relaxed);
    }

    /// Synchronously drain the pool.
    ///
    /// While tasks remain pending, the calling thread pulls from randomly
    /// chosen inboxes and executes what it finds, yielding its timeslice
    /// when it finds nothing. Because the caller assists, `wait()` makes
    /// progress even when invoked from a thread that is itself executing
    /// pool work.
    pub fn wait(&self) {
        while self.counter.pending() != 0 {
            let index = self.random_index();
            match self.workers[index].inbox().pull_front() {
                Some(task) => {
                    task.run();
                    self.stats.tasks_drained.fetch_add(1, Ordering::Relaxed);
                    self.counter.task_finished();
                }
                None => thread::yield_now(),
            }
        }
    }

    /// Snapshot of pool-wide statistics.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            tasks_submitted: AtomicUsize::new(self.stats.tasks_submitted.load(Ordering::Relaxed)),
            tasks_relocated: AtomicUsize::new(self.stats.tasks_relocated.load(Ordering::Relaxed)),
            tasks_drained: AtomicUsize::new(self.stats.tasks_drained.load(Ordering::Relaxed)),
        }
    }

    /// Per-worker statistics snapshots.
    pub fn worker_stats(&self) -> Vec<WorkerStats> {
        self.workers.iter().map(|w| w.stats()).collect()
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        log::debug!(
            "thread pool shutting down, {} tasks pending",
            self.counter.pending()
        );
        for worker in &mut self.workers {
            worker.stop_and_join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_pool_creation() {
        let pool = ThreadPool::new(2).unwrap();
        assert_eq!(pool.size(), 2);
        assert_eq!(pool.pending_tasks(), 0);
    }

    #[test]
    fn test_zero_workers_defaults_to_cpus() {
        let pool = ThreadPool::new(0).unwrap();
        assert_eq!(pool.size(), num_cpus::get());
    }

    #[test]
    fn test_submit_and_wait_completes_all() {
        let pool = ThreadPool::new(3).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..100 {
            let counter = Arc::clone(&counter);
            let _ = pool.submit(move || {
                counter.fetch_add(1, Ordering::Relaxed);
            });
        }
        pool.wait();
        assert_eq!(counter.load(Ordering::Relaxed), 100);
        assert_eq!(pool.pending_tasks(), 0);
    }

    #[test]
    fn test_handle_delivers_result() {
        let pool = ThreadPool::new(1).unwrap();
        let handle = pool.submit(|| 6 * 7);
        assert_eq!(handle.join().unwrap(), 42);
    }

    #[test]
    fn test_wait_on_single_worker_pool() {
        // The caller must be able to assist even when every worker is busy
        let pool = ThreadPool::new(1).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..50 {
            let counter = Arc::clone(&counter);
            let _ = pool.submit(move || {
                counter.fetch_add(1, Ordering::Relaxed);
            });
        }
        pool.wait();
        assert_eq!(counter.load(Ordering::Relaxed), 50);
    }

    #[test]
    fn test_panicking_task_isolated() {
        let pool = ThreadPool::new(2).unwrap();
        let failing = pool.submit(|| -> u32 { panic!("task failure") });
        let ok = pool.submit(|| 7);
        pool.wait();
        assert!(matches!(
            failing.join(),
            Err(crate::error::Error::TaskPanicked { .. })
        ));
        assert_eq!(ok.join().unwrap(), 7);
    }
}
