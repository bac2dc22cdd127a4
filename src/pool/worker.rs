//! Worker thread implementation for the thread pool
//!
//! Each worker owns one deque inbox and one OS thread, pulling and
//! executing tasks until signaled to stop.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use super::task::Task;
use crate::deque::ConcurrentRingDeque;
use crate::error::{Error, Result};

/// Worker lifecycle states.
///
/// The only transitions are `NotStarted -> Active` (run-loop entry) and
/// `Active -> Stopped` (run-loop exit); both happen inside the worker
/// thread itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    /// The OS thread has not entered its run loop yet
    NotStarted,
    /// The run loop is pulling and executing tasks
    Active,
    /// The run loop has exited
    Stopped,
}

impl WorkerStatus {
    fn from_usize(raw: usize) -> Self {
        match raw {
            0 => WorkerStatus::NotStarted,
            1 => WorkerStatus::Active,
            _ => WorkerStatus::Stopped,
        }
    }
}

/// Statistics for a worker thread
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Number of tasks executed on this worker's thread
    pub tasks_executed: AtomicUsize,
    /// Number of times the worker parked waiting for work
    pub park_count: AtomicUsize,
}

/// The narrow capability a worker receives from its owning pool: report a
/// finished task. Workers never see the pool itself.
pub(crate) struct PendingCounter {
    pending: AtomicUsize,
}

impl PendingCounter {
    pub(crate) fn new() -> Self {
        Self {
            pending: AtomicUsize::new(0),
        }
    }

    pub(crate) fn task_submitted(&self) {
        self.pending.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn task_finished(&self) {
        self.pending.fetch_sub(1, Ordering::AcqRel);
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }
}

/// State shared between the worker handle and its OS thread.
struct WorkerShared {
    /// Stop request; checked at the run loop's single suspension point and
    /// again right after every pull.
    stop: Mutex<bool>,
    status: AtomicUsize,
    wakeup: Condvar,
    stats: WorkerStats,
}

impl WorkerShared {
    fn status(&self) -> WorkerStatus {
        WorkerStatus::from_usize(self.status.load(Ordering::Acquire))
    }

    fn set_status(&self, status: WorkerStatus) {
        self.status.store(status as usize, Ordering::Release);
    }

    fn stop_requested(&self) -> bool {
        *self.stop.lock()
    }
}

/// A pool worker: one inbox, one dedicated execution thread, one lifecycle.
pub(crate) struct WorkerThread {
    inbox: Arc<ConcurrentRingDeque<Task>>,
    shared: Arc<WorkerShared>,
    thread_handle: Option<JoinHandle<()>>,
}

impl WorkerThread {
    /// Spawn a worker thread. `counter` is the capability handle used to
    /// report finished tasks back to the pool.
    pub(crate) fn spawn(
        name: String,
        park_timeout: Duration,
        counter: Arc<PendingCounter>,
    ) -> Result<Self> {
        let inbox = Arc::new(ConcurrentRingDeque::new());
        let shared = Arc::new(WorkerShared {
            stop: Mutex::new(false),
            status: AtomicUsize::new(WorkerStatus::NotStarted as usize),
            wakeup: Condvar::new(),
            stats: WorkerStats::default(),
        });

        let thread_inbox = Arc::clone(&inbox);
        let thread_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(name)
            .spawn(move || {
                run_loop(thread_inbox, thread_shared, counter, park_timeout);
            })
            .map_err(|e| Error::Spawn {
                reason: e.to_string(),
            })?;

        Ok(Self {
            inbox,
            shared,
            thread_handle: Some(handle),
        })
    }

    /// The worker's inbox, shared with the pool for placement, rebalancing
    /// and drain assistance.
    pub(crate) fn inbox(&self) -> &ConcurrentRingDeque<Task> {
        &self.inbox
    }

    /// Append a task to this worker's inbox and wake its run loop.
    pub(crate) fn submit(&self, task: Task) {
        self.inbox.push_back(task);
        self.unpark();
    }

    /// Wake the run loop if it is parked.
    pub(crate) fn unpark(&self) {
        self.shared.wakeup.notify_one();
    }

    pub(crate) fn status(&self) -> WorkerStatus {
        self.shared.status()
    }

    pub(crate) fn stats(&self) -> WorkerStats {
        WorkerStats {
            tasks_executed: AtomicUsize::new(
                self.shared.stats.tasks_executed.load(Ordering::Relaxed),
            ),
            park_count: AtomicUsize::new(self.shared.stats.park_count.load(Ordering::Relaxed)),
        }
    }

    /// Signal the run loop to stop, wake it until the stop is observed,
    /// then join the thread. Tasks still queued in the inbox are dropped
    /// unexecuted, breaking their completion handles.
    pub(crate) fn stop_and_join(&mut self) {
        *self.shared.stop.lock() = true;
        while self.shared.status() == WorkerStatus::Active {
            self.shared.wakeup.notify_one();
            thread::yield_now();
        }
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                // The run loop itself never panics; a panic here would be an
                // internal bug, but teardown must not propagate it.
                log::error!("worker thread panicked during shutdown");
            }
        }
    }
}

impl Drop for WorkerThread {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            self.stop_and_join();
        }
    }
}

fn run_loop(
    inbox: Arc<ConcurrentRingDeque<Task>>,
    shared: Arc<WorkerShared>,
    counter: Arc<PendingCounter>,
    park_timeout: Duration,
) {
    shared.set_status(WorkerStatus::Active);
    loop {
        match inbox.pull_front() {
            Some(task) => {
                if shared.stop_requested() {
                    // Stop raced the pull: discard without executing.
                    drop(task);
                    break;
                }
                task.run();
                shared.stats.tasks_executed.fetch_add(1, Ordering::Relaxed);
                counter.task_finished();
            }
            None => {
                let mut stop = shared.stop.lock();
                if *stop {
                    break;
                }
                if inbox.is_empty() {
                    shared.stats.park_count.fetch_add(1, Ordering::Relaxed);
                    // Timed wait: a wakeup can slip in between the failed
                    // pull and this park, so never sleep unbounded.
                    let _ = shared.wakeup.wait_for(&mut stop, park_timeout);
                    if *stop {
                        break;
                    }
                }
            }
        }
    }
    shared.set_status(WorkerStatus::Stopped);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn test_worker(counter: &Arc<PendingCounter>) -> WorkerThread {
        WorkerThread::spawn(
            "parasort-test-worker".to_string(),
            Duration::from_millis(1),
            Arc::clone(counter),
        )
        .unwrap()
    }

    #[test]
    fn test_worker_executes_submitted_tasks() {
        let counter = Arc::new(PendingCounter::new());
        let worker = test_worker(&counter);
        let executed = Arc::new(AtomicUsize::new(0));

        for _ in 0..8 {
            counter.task_submitted();
            let executed = Arc::clone(&executed);
            worker.submit(Task::new(Box::new(move || {
                executed.fetch_add(1, Ordering::Relaxed);
            })));
        }

        while counter.pending() != 0 {
            thread::yield_now();
        }
        assert_eq!(executed.load(Ordering::Relaxed), 8);
    }

    #[test]
    fn test_worker_lifecycle() {
        let counter = Arc::new(PendingCounter::new());
        let mut worker = test_worker(&counter);
        // The run loop marks itself active on entry
        while worker.status() == WorkerStatus::NotStarted {
            thread::yield_now();
        }
        assert_eq!(worker.status(), WorkerStatus::Active);
        worker.stop_and_join();
        assert_eq!(worker.status(), WorkerStatus::Stopped);
    }

    #[test]
    fn test_queued_tasks_abandoned_on_stop() {
        let counter = Arc::new(PendingCounter::new());
        let mut worker = test_worker(&counter);
        worker.stop_and_join();

        // Push after stop: nothing will ever execute these
        counter.task_submitted();
        let (task, handle) = super::super::task::package(|| 5);
        worker.inbox().push_back(task);
        worker.inbox().clear();
        assert!(matches!(
            handle.join(),
            Err(crate::error::Error::TaskAbandoned)
        ));
    }
}
