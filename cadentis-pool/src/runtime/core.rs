use super::builder::{Config, PoolBuilder};
use super::executor::core::Executor;
use super::task::{Handle, Job, Runnable, Task};
use crate::error::{BoxError, Result};
use crate::stream::{CompletionStream, OrderedStream};

use std::sync::Arc;
use std::time::Duration;

/// Options for [`Pool::shutdown_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownOptions {
    /// Block until every queued and running task has finished.
    pub wait: bool,

    /// Cancel every task still waiting in the intake queue.
    pub cancel_pending: bool,
}

/// A fixed-size pool of worker threads.
///
/// `Pool` is responsible for:
/// - accepting tasks and scheduling them eagerly on its workers,
/// - returning a [`Handle`] per task to observe its outcome,
/// - building ordered and completion-order result streams,
/// - shutting down in an orderly fashion.
///
/// Dropping the pool is equivalent to [`shutdown(true)`](Self::shutdown):
/// it stops accepting tasks and waits for the queued ones to finish.
pub struct Pool {
    /// Worker threads and their intake queue.
    executor: Executor,
}

impl Pool {
    /// Creates a pool with `size` worker threads and default options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`](crate::Error::InvalidConfig) if
    /// `size` is zero.
    pub fn new(size: usize) -> Result<Self> {
        PoolBuilder::new().worker_threads(size).build()
    }

    /// Returns a [`PoolBuilder`] to configure a pool.
    pub fn builder() -> PoolBuilder {
        PoolBuilder::new()
    }

    pub(crate) fn start(config: Config) -> Result<Self> {
        Ok(Self {
            executor: Executor::new(&config)?,
        })
    }

    /// Submits a closure for execution and returns its handle.
    ///
    /// The task is queued immediately and picked up by the first free
    /// worker; this call never waits for it to run. If the closure panics,
    /// the panic is captured and the handle resolves to a failure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShutDown`](crate::Error::ShutDown) once shutdown
    /// has begun.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let handle = pool.submit(|| 2_u32.pow(10))?;
    /// assert_eq!(handle.get()?, 1024);
    /// ```
    pub fn submit<F, T>(&self, f: F) -> Result<Handle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.spawn_job(Box::new(move || Ok(f())))
    }

    /// Submits a fallible closure for execution and returns its handle.
    ///
    /// An `Err` returned by the closure resolves the handle to
    /// [`Error::Task`](crate::Error::Task), like a panic does.
    pub fn try_submit<F, T, E>(&self, f: F) -> Result<Handle<T>>
    where
        F: FnOnce() -> std::result::Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Into<BoxError>,
    {
        self.spawn_job(Box::new(move || f().map_err(Into::into)))
    }

    /// Applies `f` to every input on the pool and streams the results in
    /// input order.
    ///
    /// All inputs are submitted before this returns, so workers start on
    /// them right away, independently of how fast the stream is consumed.
    /// Results that finish ahead of the stream's position are kept in
    /// their handles until the stream reaches them.
    ///
    /// If submission fails part-way, the tasks already submitted are
    /// cancelled and the error is returned.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let squares: Vec<u64> = pool
    ///     .map_ordered(|n: u64| n * n, 1..=4)?
    ///     .collect::<Result<_, _>>()?;
    /// assert_eq!(squares, vec![1, 4, 9, 16]);
    /// ```
    pub fn map_ordered<F, I, T>(&self, f: F, inputs: I) -> Result<OrderedStream<T>>
    where
        F: Fn(I::Item) -> T + Send + Sync + 'static,
        I: IntoIterator,
        I::Item: Send + 'static,
        T: Send + 'static,
    {
        let f = Arc::new(f);

        self.submit_all(inputs, |pool, input| {
            let f = Arc::clone(&f);
            pool.submit(move || f(input))
        })
    }

    /// Fallible variant of [`map_ordered`](Self::map_ordered).
    ///
    /// An `Err` returned for one input is yielded at that input's position.
    pub fn try_map_ordered<F, I, T, E>(&self, f: F, inputs: I) -> Result<OrderedStream<T>>
    where
        F: Fn(I::Item) -> std::result::Result<T, E> + Send + Sync + 'static,
        I: IntoIterator,
        I::Item: Send + 'static,
        T: Send + 'static,
        E: Into<BoxError>,
    {
        let f = Arc::new(f);

        self.submit_all(inputs, |pool, input| {
            let f = Arc::clone(&f);
            pool.try_submit(move || f(input))
        })
    }

    /// Streams the given handles in the order their tasks finish.
    ///
    /// With a `timeout`, the stream yields
    /// [`Error::Timeout`](crate::Error::Timeout) once the deadline passes
    /// while handles are still outstanding, then ends.
    ///
    /// See [`CompletionStream`] for details.
    pub fn stream_completed<T, I>(
        &self,
        handles: I,
        timeout: Option<Duration>,
    ) -> CompletionStream<T>
    where
        I: IntoIterator<Item = Handle<T>>,
    {
        CompletionStream::new(handles, timeout)
    }

    /// Stops accepting tasks.
    ///
    /// With `wait`, blocks until every queued and running task has
    /// finished. Without it, returns immediately; queued and running
    /// tasks still run to completion in the background.
    pub fn shutdown(&self, wait: bool) {
        self.shutdown_with(ShutdownOptions {
            wait,
            cancel_pending: false,
        });
    }

    /// Stops accepting tasks, with control over queued ones.
    ///
    /// Returns the number of tasks cancelled.
    pub fn shutdown_with(&self, options: ShutdownOptions) -> usize {
        self.executor.shutdown();

        let cancelled = if options.cancel_pending {
            self.executor.cancel_pending()
        } else {
            0
        };

        if options.wait {
            self.executor.join();
        }

        cancelled
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.executor.workers()
    }

    /// Number of tasks waiting to be claimed by a worker.
    pub fn queued(&self) -> usize {
        self.executor.queued()
    }

    /// Number of tasks being executed right now.
    pub fn active(&self) -> usize {
        self.executor.active()
    }

    /// Returns `true` once shutdown has begun.
    pub fn is_shutdown(&self) -> bool {
        self.executor.is_shutdown()
    }

    fn spawn_job<T: Send + 'static>(&self, job: Job<T>) -> Result<Handle<T>> {
        self.executor.spawn(|id| {
            let (task, handle) = Task::new(id, job);
            (Box::new(task) as Box<dyn Runnable>, handle)
        })
    }

    fn submit_all<I, T>(
        &self,
        inputs: I,
        mut submit: impl FnMut(&Self, I::Item) -> Result<Handle<T>>,
    ) -> Result<OrderedStream<T>>
    where
        I: IntoIterator,
    {
        let inputs = inputs.into_iter();
        let mut handles = Vec::with_capacity(inputs.size_hint().0);

        for input in inputs {
            match submit(self, input) {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    for handle in &handles {
                        handle.cancel();
                    }
                    return Err(err);
                }
            }
        }

        Ok(OrderedStream::new(handles))
    }
}

impl Drop for Pool {
    /// Shuts the pool down and waits for queued tasks to finish.
    fn drop(&mut self) {
        self.shutdown(true);
    }
}
