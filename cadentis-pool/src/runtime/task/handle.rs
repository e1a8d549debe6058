use super::core::{Shared, Watcher};
use super::{TaskId, TaskState};
use crate::error::{Error, Result};

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

/// A handle to a submitted task.
///
/// A `Handle` is a write-once cell holding the eventual outcome of one
/// task. It can be cloned freely; every clone observes the same cell, and
/// reading the outcome never consumes it, so any number of threads may
/// call [`get`](Self::get) on the same task and all of them receive the
/// same value or failure.
///
/// Dropping a `Handle` does **not** cancel the task; it only discards the
/// ability to observe its result.
pub struct Handle<T> {
    /// Shared reference to the task's cell.
    pub(crate) shared: Arc<Shared<T>>,
}

impl<T> Handle<T> {
    pub(crate) fn from_shared(shared: Arc<Shared<T>>) -> Self {
        Self { shared }
    }

    /// Returns the id of the task.
    pub fn id(&self) -> TaskId {
        self.shared.id
    }

    /// Returns the current lifecycle state of the task.
    pub fn state(&self) -> TaskState {
        TaskState::from_raw(self.shared.state.load(Ordering::Acquire))
    }

    /// Returns `true` once the task is completed, failed or cancelled.
    ///
    /// Never blocks.
    pub fn done(&self) -> bool {
        self.state().is_terminal()
    }

    /// Returns `true` while a worker is executing the task.
    pub fn is_running(&self) -> bool {
        self.state() == TaskState::Running
    }

    /// Returns `true` if the task was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.state() == TaskState::Cancelled
    }

    /// Attempts to cancel the task.
    ///
    /// Succeeds only while the task is still waiting in the intake queue.
    /// A cancelled task is never executed and its waiters are woken with
    /// [`Error::Cancelled`]. Returns `false` if a worker has already
    /// claimed the task or it already finished; a running task is never
    /// interrupted.
    pub fn cancel(&self) -> bool {
        Shared::cancel(&self.shared)
    }

    /// Registers a callback run once the task reaches a terminal state.
    ///
    /// The callback runs on the thread that resolves the task (a worker,
    /// or the thread calling [`cancel`](Self::cancel)). If the task is
    /// already terminal, it runs immediately on the calling thread. A
    /// panicking callback is logged and otherwise ignored.
    pub fn on_done<F>(&self, callback: F)
    where
        F: FnOnce(&Handle<T>) + Send + 'static,
    {
        Shared::on_done(&self.shared, Box::new(callback));
    }

    /// Blocks until the task is terminal or `timeout` elapses.
    ///
    /// Returns `true` if the task is terminal. Unlike
    /// [`get_timeout`](Self::get_timeout) this does not need `T: Clone`.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.shared
            .wait(Instant::now().checked_add(timeout), |_| ())
            .is_some()
    }

    /// Registers a completion stream on this handle.
    pub(crate) fn watch(&self, key: usize, sender: crossbeam_channel::Sender<usize>) {
        self.shared.watch(Watcher { key, sender });
    }

    /// Drops the registration made by the stream owning `sender`.
    pub(crate) fn unwatch(&self, sender: &crossbeam_channel::Sender<usize>) {
        self.shared.unwatch(sender);
    }
}

impl<T: Clone> Handle<T> {
    /// Blocks until the task is terminal and returns its outcome.
    ///
    /// - `Ok(value)` if the task returned a value,
    /// - [`Error::Task`] if it returned an error or panicked,
    /// - [`Error::Cancelled`] if it was cancelled.
    pub fn get(&self) -> Result<T> {
        self.get_until(None, Duration::ZERO)
    }

    /// Like [`get`](Self::get), but gives up after `timeout`.
    ///
    /// On expiry returns [`Error::Timeout`]. The task itself is not
    /// affected: it keeps running and a later call can still observe
    /// its real outcome.
    ///
    /// A timeout too large to represent as a deadline, such as
    /// [`Duration::MAX`], waits without limit.
    pub fn get_timeout(&self, timeout: Duration) -> Result<T> {
        self.get_until(Instant::now().checked_add(timeout), timeout)
    }

    /// Waits until `deadline`, reporting `waited` on expiry.
    pub(crate) fn get_until(&self, deadline: Option<Instant>, waited: Duration) -> Result<T> {
        let id = self.id();

        self.shared
            .wait(deadline, |outcome| outcome.to_result(id))
            .unwrap_or(Err(Error::Timeout { waited }))
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}
