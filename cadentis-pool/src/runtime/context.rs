use std::cell::Cell;
use std::fmt;

/// Identifier of a worker thread within its pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerId(usize);

impl WorkerId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Zero-based index of the worker in its pool.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

thread_local! {
    /// Worker running on the current thread, with the key of its pool.
    ///
    /// Set once when a worker thread starts; `None` on every other thread.
    static CURRENT_WORKER: Cell<Option<(usize, WorkerId)>> = const { Cell::new(None) };
}

/// Returns the worker executing the current task.
///
/// Returns `None` when called outside of a pool worker thread.
///
/// # Examples
///
/// ```rust,ignore
/// let handle = pool.submit(|| cadentis_pool::current_worker())?;
/// assert!(handle.get()?.is_some());
/// ```
pub fn current_worker() -> Option<WorkerId> {
    CURRENT_WORKER.with(|w| w.get().map(|(_, id)| id))
}

/// Returns `true` if the current thread is a worker of the pool `pool`.
pub(crate) fn is_worker_of(pool: usize) -> bool {
    CURRENT_WORKER.with(|w| matches!(w.get(), Some((key, _)) if key == pool))
}

/// Runs `f` with the current thread registered as worker `id` of `pool`.
///
/// The previous registration is restored afterwards.
pub(crate) fn enter_worker<R>(pool: usize, id: WorkerId, f: impl FnOnce() -> R) -> R {
    CURRENT_WORKER.with(|w| {
        let prev = w.replace(Some((pool, id)));
        let out = f();
        w.set(prev);
        out
    })
}
