use crate::error::{Error, Result};
use crate::runtime::builder::Config;
use crate::runtime::context::{self, WorkerId};
use crate::runtime::executor::worker::Worker;
use crate::runtime::injector::Injector;
use crate::runtime::task::{Runnable, TaskId};

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{debug, warn};

/// Fixed-size set of worker threads sharing one intake queue.
///
/// The `Executor` is responsible for:
/// - spawning the worker threads,
/// - handing submitted tasks to the intake queue,
/// - closing the queue and joining the workers on shutdown.
pub(crate) struct Executor {
    /// Intake queue shared by all workers.
    injector: Arc<Injector>,

    /// Join handles for worker threads, drained when joined.
    handles: Mutex<Vec<JoinHandle<()>>>,

    /// Number of worker threads.
    workers: usize,
}

impl Executor {
    /// Spawns `config.worker_threads` workers.
    ///
    /// If a thread fails to spawn, the workers already started are shut
    /// down and joined before the error is returned.
    pub(crate) fn new(config: &Config) -> Result<Self> {
        let workers = config.worker_threads;
        let injector = Arc::new(Injector::new(workers, config.queue_capacity));
        let key = pool_key(&injector);

        let mut handles = Vec::with_capacity(workers);

        for index in 0..workers {
            let worker = Worker::new(WorkerId::new(index), key, injector.clone());

            let mut builder =
                thread::Builder::new().name(format!("{}-{index}", config.thread_name));
            if let Some(stack_size) = config.stack_size {
                builder = builder.stack_size(stack_size);
            }

            match builder.spawn(move || worker.run()) {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    injector.close();
                    for handle in handles {
                        let _ = handle.join();
                    }

                    return Err(Error::InvalidConfig(format!(
                        "failed to spawn worker thread {index}: {err}"
                    )));
                }
            }
        }

        debug!(
            workers,
            thread_name = %config.thread_name,
            capacity = ?config.queue_capacity,
            "pool started"
        );

        Ok(Self {
            injector,
            handles: Mutex::new(handles),
            workers,
        })
    }

    /// Hands a task built by `make` to the intake queue.
    pub(crate) fn spawn<R>(
        &self,
        make: impl FnOnce(TaskId) -> (Box<dyn Runnable>, R),
    ) -> Result<R> {
        self.injector.push(make)
    }

    /// Stops accepting tasks and wakes every parked worker.
    ///
    /// Tasks already queued are still executed.
    pub(crate) fn shutdown(&self) {
        if self.injector.close() {
            debug!(
                queued = self.injector.queued(),
                active = self.injector.active(),
                "pool shutting down"
            );
        }
    }

    /// Cancels every task still waiting in the intake queue.
    ///
    /// Returns the number of tasks cancelled.
    pub(crate) fn cancel_pending(&self) -> usize {
        self.injector
            .drain()
            .into_iter()
            .filter(|task| task.cancel())
            .count()
    }

    /// Waits for all worker threads to terminate.
    ///
    /// This should be called after [`shutdown`](Self::shutdown). Called from
    /// one of this pool's own workers it returns immediately, since that
    /// worker could never exit while it waits.
    pub(crate) fn join(&self) {
        if context::is_worker_of(pool_key(&self.injector)) {
            warn!("pool joined from one of its own workers; not waiting");
            return;
        }

        self.injector.wait_stopped();

        for handle in self.handles.lock().drain(..) {
            let _ = handle.join();
        }

        debug!("pool stopped");
    }

    pub(crate) fn workers(&self) -> usize {
        self.workers
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.injector.is_closed()
    }

    pub(crate) fn queued(&self) -> usize {
        self.injector.queued()
    }

    pub(crate) fn active(&self) -> usize {
        self.injector.active()
    }
}

/// Identifies a pool by the address of its injector.
fn pool_key(injector: &Arc<Injector>) -> usize {
    Arc::as_ptr(injector) as usize
}
