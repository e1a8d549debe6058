use crate::error::{discard_payload, panic_message};
use crate::runtime::context::{self, WorkerId};
use crate::runtime::injector::Injector;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, warn};

/// A worker thread of the pool.
///
/// A `Worker` repeatedly claims the task at the head of the shared intake
/// queue and runs it to completion before claiming the next one, so each
/// worker executes at most one task at a time.
pub(crate) struct Worker {
    /// Identifier of the worker.
    id: WorkerId,

    /// Key of the pool the worker belongs to.
    pool: usize,

    /// Shared intake queue.
    injector: Arc<Injector>,
}

impl Worker {
    pub(crate) fn new(id: WorkerId, pool: usize, injector: Arc<Injector>) -> Self {
        Self { id, pool, injector }
    }

    /// Runs the worker loop.
    ///
    /// # Execution loop
    ///
    /// - Claim the oldest queued task, parking while the queue is empty
    /// - Run it; panics and errors are captured into the task's handle
    /// - Exit once the queue is closed and drained
    ///
    /// A panic escaping a task's own failure capture is logged and the
    /// loop goes on. The worker is always counted out when its thread ends.
    pub(crate) fn run(self) {
        let _exit = ExitGuard {
            id: self.id,
            injector: &self.injector,
        };
        debug!(worker = %self.id, "worker started");

        context::enter_worker(self.pool, self.id, || {
            while let Some(task) = self.injector.pop() {
                let _active = ActiveGuard(&self.injector);
                let task_id = task.id();

                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| task.run())) {
                    warn!(
                        worker = %self.id,
                        task = %task_id,
                        message = %panic_message(payload.as_ref()),
                        "panic escaped task execution"
                    );
                    discard_payload(payload);
                }
            }
        });
    }
}

/// Marks a claimed task as finished, even if running it unwound.
struct ActiveGuard<'a>(&'a Injector);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.finish();
    }
}

/// Counts the worker out of the pool when its loop ends.
struct ExitGuard<'a> {
    id: WorkerId,
    injector: &'a Injector,
}

impl Drop for ExitGuard<'_> {
    fn drop(&mut self) {
        debug!(worker = %self.id, "worker exiting");
        self.injector.worker_exited();
    }
}
