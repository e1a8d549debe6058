use super::Handle;
use super::state::{CANCELLED, COMPLETED, FAILED, PENDING, RUNNING};
use crate::error::{BoxError, Error, TaskFailure, discard_payload, panic_message};
use crate::runtime::context;

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Instant;

use crossbeam_channel::Sender;
use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, trace, warn};

/// Identifier of a submitted task.
///
/// Ids are handed out in submission order and are unique within one pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the submission index of the task.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The boxed payload of a task.
pub(crate) type Job<T> = Box<dyn FnOnce() -> Result<T, BoxError> + Send + 'static>;

/// Callback run once a handle reaches a terminal state.
pub(crate) type DoneCallback<T> = Box<dyn FnOnce(&Handle<T>) + Send + 'static>;

/// Final outcome stored in a handle.
pub(crate) enum Outcome<T> {
    Value(T),
    Failure(TaskFailure),
    Cancelled,
}

impl<T> Outcome<T> {
    fn state(&self) -> u8 {
        match self {
            Outcome::Value(_) => COMPLETED,
            Outcome::Failure(_) => FAILED,
            Outcome::Cancelled => CANCELLED,
        }
    }

    pub(crate) fn to_result(&self, task: TaskId) -> crate::Result<T>
    where
        T: Clone,
    {
        match self {
            Outcome::Value(value) => Ok(value.clone()),
            Outcome::Failure(failure) => Err(Error::Task(failure.clone())),
            Outcome::Cancelled => Err(Error::Cancelled { task }),
        }
    }
}

/// Registration of a completion stream on a handle.
///
/// When the handle becomes terminal, `key` is sent on `sender` exactly once.
pub(crate) struct Watcher {
    pub(crate) key: usize,
    pub(crate) sender: Sender<usize>,
}

/// Mutable part of a handle, guarded by a single lock.
pub(crate) struct Slot<T> {
    pub(crate) outcome: Option<Outcome<T>>,
    watchers: Vec<Watcher>,
    callbacks: Vec<DoneCallback<T>>,
}

/// The write-once cell shared between a task and all of its handles.
pub(crate) struct Shared<T> {
    pub(crate) id: TaskId,

    /// Current lifecycle state (PENDING, RUNNING, ...).
    ///
    /// Claiming and cancelling race through compare-exchange on this word.
    pub(crate) state: AtomicU8,

    /// Outcome plus everyone waiting to hear about it.
    pub(crate) slot: Mutex<Slot<T>>,

    /// Signalled once the outcome is written.
    pub(crate) ready: Condvar,
}

impl<T> Shared<T> {
    pub(crate) fn new(id: TaskId) -> Self {
        Self {
            id,
            state: AtomicU8::new(PENDING),
            slot: Mutex::new(Slot {
                outcome: None,
                watchers: Vec::new(),
                callbacks: Vec::new(),
            }),
            ready: Condvar::new(),
        }
    }

    /// Moves the task from PENDING to RUNNING.
    ///
    /// Returns `false` if the task was cancelled first.
    pub(crate) fn claim(&self) -> bool {
        self.state
            .compare_exchange(PENDING, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Moves the task from PENDING to CANCELLED and publishes the outcome.
    ///
    /// Returns `false` if a worker already claimed the task or it is
    /// already terminal.
    pub(crate) fn cancel(this: &Arc<Self>) -> bool {
        let slot = this.slot.lock();

        if this
            .state
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        Self::publish(this, slot, Outcome::Cancelled);
        true
    }

    /// Blocks until the outcome is available or `deadline` passes.
    ///
    /// On success `f` is applied to the stored outcome while the lock is
    /// held; `None` means the deadline passed first.
    pub(crate) fn wait<R>(
        &self,
        deadline: Option<Instant>,
        f: impl FnOnce(&Outcome<T>) -> R,
    ) -> Option<R> {
        let mut slot = self.slot.lock();

        loop {
            if let Some(outcome) = slot.outcome.as_ref() {
                return Some(f(outcome));
            }

            match deadline {
                None => self.ready.wait(&mut slot),
                Some(deadline) => {
                    if self.ready.wait_until(&mut slot, deadline).timed_out() {
                        return slot.outcome.as_ref().map(f);
                    }
                }
            }
        }
    }

    /// Registers a completion stream.
    ///
    /// If the outcome is already written the key is delivered right away.
    pub(crate) fn watch(&self, watcher: Watcher) {
        let mut slot = self.slot.lock();

        if slot.outcome.is_some() {
            drop(slot);
            let _ = watcher.sender.send(watcher.key);
        } else {
            slot.watchers.push(watcher);
        }
    }

    /// Removes the watchers registered through `sender`'s channel.
    pub(crate) fn unwatch(&self, sender: &Sender<usize>) {
        self.slot
            .lock()
            .watchers
            .retain(|watcher| !watcher.sender.same_channel(sender));
    }

    /// Registers a callback, or runs it now if the outcome is written.
    pub(crate) fn on_done(this: &Arc<Self>, callback: DoneCallback<T>) {
        let mut slot = this.slot.lock();

        if slot.outcome.is_some() {
            drop(slot);
            run_callback(&Handle::from_shared(Arc::clone(this)), callback);
        } else {
            slot.callbacks.push(callback);
        }
    }

    /// Writes the outcome and notifies waiters, watchers and callbacks.
    ///
    /// The first call wins; later calls return `false` and change nothing.
    pub(crate) fn resolve(this: &Arc<Self>, outcome: Outcome<T>) -> bool {
        let slot = this.slot.lock();

        if slot.outcome.is_some() {
            return false;
        }

        this.state.store(outcome.state(), Ordering::Release);
        Self::publish(this, slot, outcome);
        true
    }

    /// Stores `outcome` under the held lock, then wakes everyone waiting.
    ///
    /// The state word must already hold the terminal state.
    fn publish(this: &Arc<Self>, mut slot: MutexGuard<'_, Slot<T>>, outcome: Outcome<T>) {
        slot.outcome = Some(outcome);

        let watchers = std::mem::take(&mut slot.watchers);
        let callbacks = std::mem::take(&mut slot.callbacks);
        drop(slot);

        this.ready.notify_all();

        for watcher in watchers {
            // The stream may have been dropped already.
            let _ = watcher.sender.send(watcher.key);
        }

        if !callbacks.is_empty() {
            let handle = Handle::from_shared(Arc::clone(this));
            for callback in callbacks {
                run_callback(&handle, callback);
            }
        }
    }
}

fn run_callback<T>(handle: &Handle<T>, callback: DoneCallback<T>) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callback(handle))) {
        warn!(
            task = %handle.id(),
            message = %panic_message(payload.as_ref()),
            "done callback panicked"
        );
        discard_payload(payload);
    }
}

/// Fails the task if its execution unwinds before an outcome is written.
///
/// Covers panics raised while reporting a failure, such as an error whose
/// `Display` panics.
struct ResolveGuard<'a, T> {
    shared: &'a Arc<Shared<T>>,
}

impl<T> Drop for ResolveGuard<'_, T> {
    fn drop(&mut self) {
        if self.shared.state.load(Ordering::Acquire) != RUNNING {
            return;
        }

        let failure = TaskFailure::panic(
            self.shared.id,
            "task unwound while reporting its outcome".to_string(),
        );

        Shared::resolve(self.shared, Outcome::Failure(failure));
    }
}

/// A unit of work that can be executed by a worker.
///
/// The `Runnable` trait erases the result type of a task so the intake
/// queue can hold tasks of any type as `Box<dyn Runnable>`.
pub(crate) trait Runnable: Send {
    /// Id of the task.
    fn id(&self) -> TaskId;

    /// Claims and executes the task. Called by a worker thread.
    fn run(self: Box<Self>);

    /// Cancels the task if no worker claimed it yet.
    fn cancel(&self) -> bool;
}

/// A submitted task: its payload plus the cell its handles observe.
pub(crate) struct Task<T> {
    shared: Arc<Shared<T>>,
    job: Job<T>,
}

impl<T: Send + 'static> Task<T> {
    /// Creates a task and the handle observing it.
    ///
    /// The task starts in the PENDING state.
    pub(crate) fn new(id: TaskId, job: Job<T>) -> (Self, Handle<T>) {
        let shared = Arc::new(Shared::new(id));
        let handle = Handle::from_shared(Arc::clone(&shared));

        (Self { shared, job }, handle)
    }
}

impl<T: Send + 'static> Runnable for Task<T> {
    fn id(&self) -> TaskId {
        self.shared.id
    }

    fn run(self: Box<Self>) {
        let Task { shared, job } = *self;

        if !shared.claim() {
            debug!(task = %shared.id, "discarding cancelled task");
            return;
        }

        let worker = context::current_worker();
        trace!(task = %shared.id, worker = ?worker, "task started");

        let _guard = ResolveGuard { shared: &shared };

        let outcome = match panic::catch_unwind(AssertUnwindSafe(job)) {
            Ok(Ok(value)) => Outcome::Value(value),
            Ok(Err(error)) => {
                let failure = TaskFailure::error(shared.id, error);
                warn!(task = %shared.id, worker = ?worker, error = %failure.cause(), "task failed");
                Outcome::Failure(failure)
            }
            Err(payload) => {
                let failure = TaskFailure::panic(shared.id, panic_message(payload.as_ref()));
                discard_payload(payload);
                warn!(task = %shared.id, worker = ?worker, error = %failure.cause(), "task panicked");
                Outcome::Failure(failure)
            }
        };

        Shared::resolve(&shared, outcome);
        trace!(task = %shared.id, worker = ?worker, "task finished");
    }

    fn cancel(&self) -> bool {
        Shared::cancel(&self.shared)
    }
}
