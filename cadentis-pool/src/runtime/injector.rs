use crate::error::{Error, Result};
use crate::runtime::task::{Runnable, TaskId};

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};
use tracing::trace;

/// State of the intake queue, guarded by the injector lock.
struct Intake {
    /// Tasks waiting to be claimed, oldest first.
    queue: VecDeque<Box<dyn Runnable>>,

    /// Number of tasks currently being executed.
    active: usize,

    /// Number of worker threads still running their loop.
    live_workers: usize,

    /// Set once shutdown begins; no task is accepted afterwards.
    closed: bool,

    /// Id of the next accepted task.
    next_id: u64,
}

/// Shared FIFO intake queue of the pool.
///
/// Submitters push to the back, workers claim from the front. The
/// injector also coordinates parking: idle workers sleep on a condition
/// variable until a task arrives or shutdown begins, and submitters sleep
/// while a bounded queue is full.
pub(crate) struct Injector {
    inner: Mutex<Intake>,

    /// Wakes workers waiting for a task.
    available: Condvar,

    /// Wakes submitters waiting for room in a bounded queue.
    space: Condvar,

    /// Wakes threads waiting for every worker to exit.
    stopped: Condvar,

    /// Maximum number of queued tasks, if bounded.
    capacity: Option<usize>,
}

impl Injector {
    /// Creates an empty injector serving `workers` threads.
    pub(crate) fn new(workers: usize, capacity: Option<usize>) -> Self {
        Injector {
            inner: Mutex::new(Intake {
                queue: VecDeque::new(),
                active: 0,
                live_workers: workers,
                closed: false,
                next_id: 0,
            }),
            available: Condvar::new(),
            space: Condvar::new(),
            stopped: Condvar::new(),
            capacity,
        }
    }

    /// Builds a task with the next id and appends it to the back of the
    /// queue.
    ///
    /// The id is taken under the queue lock, so ids follow queue order
    /// across concurrent submitters. Blocks while a bounded queue is full.
    /// Fails with [`Error::ShutDown`] once the injector is closed, without
    /// calling `make`.
    pub(crate) fn push<R>(
        &self,
        make: impl FnOnce(TaskId) -> (Box<dyn Runnable>, R),
    ) -> Result<R> {
        let mut inner = self.inner.lock();

        if let Some(capacity) = self.capacity {
            while !inner.closed && inner.queue.len() >= capacity {
                self.space.wait(&mut inner);
            }
        }

        if inner.closed {
            return Err(Error::ShutDown);
        }

        let id = TaskId::new(inner.next_id);
        inner.next_id += 1;

        let (task, out) = make(id);
        trace!(task = %id, queued = inner.queue.len() + 1, "task enqueued");
        inner.queue.push_back(task);
        drop(inner);

        self.available.notify_one();
        Ok(out)
    }

    /// Claims the task at the head of the queue.
    ///
    /// Parks the calling worker until a task is available. Returns `None`
    /// once the injector is closed and the queue is drained, which tells
    /// the worker to exit.
    pub(crate) fn pop(&self) -> Option<Box<dyn Runnable>> {
        let mut inner = self.inner.lock();

        loop {
            if let Some(task) = inner.queue.pop_front() {
                inner.active += 1;
                drop(inner);

                self.space.notify_one();
                return Some(task);
            }

            if inner.closed {
                return None;
            }

            self.available.wait(&mut inner);
        }
    }

    /// Marks a task claimed through [`pop`](Self::pop) as finished.
    pub(crate) fn finish(&self) {
        self.inner.lock().active -= 1;
    }

    /// Records that a worker left its loop.
    pub(crate) fn worker_exited(&self) {
        let mut inner = self.inner.lock();
        inner.live_workers -= 1;

        if inner.live_workers == 0 {
            self.stopped.notify_all();
        }
    }

    /// Closes the queue and wakes every parked thread.
    ///
    /// Queued tasks are still handed out to workers until the queue is
    /// empty. Returns `false` if the queue was already closed.
    pub(crate) fn close(&self) -> bool {
        let mut inner = self.inner.lock();
        let first = !inner.closed;
        inner.closed = true;
        drop(inner);

        self.available.notify_all();
        self.space.notify_all();
        first
    }

    /// Removes every task still waiting in the queue.
    pub(crate) fn drain(&self) -> Vec<Box<dyn Runnable>> {
        let drained: Vec<_> = self.inner.lock().queue.drain(..).collect();
        self.space.notify_all();
        drained
    }

    /// Blocks until every worker has exited.
    pub(crate) fn wait_stopped(&self) {
        let mut inner = self.inner.lock();

        while inner.live_workers > 0 {
            self.stopped.wait(&mut inner);
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Number of tasks waiting to be claimed.
    pub(crate) fn queued(&self) -> usize {
        self.inner.lock().queue.len()
    }

    /// Number of tasks being executed.
    pub(crate) fn active(&self) -> usize {
        self.inner.lock().active
    }
}
