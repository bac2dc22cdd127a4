//! Task and completion-handle types for the thread pool

use crate::error::{Error, Result};
use futures::channel::oneshot;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// A unit of work queued in a worker's inbox.
///
/// The closure owns the user callable and the sending half of the
/// completion channel; dropping an unexecuted task drops the sender, which
/// resolves the matching [`JoinHandle`] into the abandoned state.
pub(crate) struct Task {
    job: Box<dyn FnOnce() + Send + 'static>,
    relocations: u8,
}

impl Task {
    pub(crate) fn new(job: Box<dyn FnOnce() + Send + 'static>) -> Self {
        Self {
            job,
            relocations: 0,
        }
    }

    /// Execute the task, consuming it. Panics in the user callable are
    /// captured inside the closure and never escape here.
    pub(crate) fn run(self) {
        (self.job)();
    }

    /// How many times the rebalancer has moved this task between inboxes.
    pub(crate) fn relocations(&self) -> u8 {
        self.relocations
    }

    pub(crate) fn mark_relocated(&mut self) {
        self.relocations = self.relocations.saturating_add(1);
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("relocations", &self.relocations)
            .finish()
    }
}

/// Render a panic payload as a message for [`Error::TaskPanicked`].
fn panic_reason(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "opaque panic payload".to_string()
    }
}

/// Build a task for `f` together with the handle observing its outcome.
pub(crate) fn package<F, T>(f: F) -> (Task, JoinHandle<T>)
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let (tx, rx) = oneshot::channel::<Result<T>>();
    let job = Box::new(move || {
        let outcome = panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
            Error::TaskPanicked {
                reason: panic_reason(payload),
            }
        });
        // The receiver may already be gone; nobody is waiting, discard.
        let _ = tx.send(outcome);
    });
    (Task::new(job), JoinHandle { receiver: rx })
}

/// A handle to a task submitted to the pool.
///
/// The eventual result or fault of the task is observed here: a panicking
/// callable yields [`Error::TaskPanicked`], and a task destroyed unexecuted
/// at pool teardown yields [`Error::TaskAbandoned`].
pub struct JoinHandle<T> {
    receiver: oneshot::Receiver<Result<T>>,
}

impl<T> JoinHandle<T> {
    /// Block until the task completes and return its result.
    pub fn join(self) -> Result<T> {
        match futures::executor::block_on(self.receiver) {
            Ok(outcome) => outcome,
            Err(oneshot::Canceled) => Err(Error::TaskAbandoned),
        }
    }

    /// Poll for completion without blocking.
    ///
    /// Returns `None` while the task is still pending. After `Some` is
    /// returned once, the handle is exhausted.
    pub fn try_join(&mut self) -> Option<Result<T>> {
        match self.receiver.try_recv() {
            Ok(Some(outcome)) => Some(outcome),
            Ok(None) => None,
            Err(oneshot::Canceled) => Some(Err(Error::TaskAbandoned)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_executes_and_delivers() {
        let (task, handle) = package(|| 21 * 2);
        task.run();
        assert_eq!(handle.join().unwrap(), 42);
    }

    #[test]
    fn test_panic_is_captured() {
        let (task, handle) = package(|| -> i32 { panic!("boom") });
        task.run();
        match handle.join() {
            Err(Error::TaskPanicked { reason }) => assert_eq!(reason, "boom"),
            other => panic!("unexpected outcome: {:?}", other.err()),
        }
    }

    #[test]
    fn test_dropped_task_breaks_handle() {
        let (task, handle) = package(|| 1);
        drop(task);
        assert!(matches!(handle.join(), Err(Error::TaskAbandoned)));
    }

    #[test]
    fn test_try_join_pending_then_ready() {
        let (task, mut handle) = package(|| "done");
        assert!(handle.try_join().is_none());
        task.run();
        assert_eq!(handle.try_join().unwrap().unwrap(), "done");
    }

    #[test]
    fn test_relocation_counter() {
        let (mut task, _handle) = package(|| ());
        assert_eq!(task.relocations(), 0);
        task.mark_relocated();
        task.mark_relocated();
        assert_eq!(task.relocations(), 2);
    }
}
