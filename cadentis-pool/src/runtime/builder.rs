use super::core::Pool;
use crate::error::{Error, Result};

use std::thread;

/// Default prefix of worker thread names.
const DEFAULT_THREAD_NAME: &str = "cadentis-pool";

/// Validated pool parameters, consumed by the executor.
#[derive(Debug, Clone)]
pub(crate) struct Config {
    pub(crate) worker_threads: usize,
    pub(crate) thread_name: String,
    pub(crate) queue_capacity: Option<usize>,
    pub(crate) stack_size: Option<usize>,
}

/// Builder for configuring and creating a [`Pool`].
///
/// `PoolBuilder` allows customizing pool parameters before starting the
/// worker threads. Invalid values are reported by [`build`](Self::build)
/// as [`Error::InvalidConfig`].
///
/// # Examples
///
/// ```rust,ignore
/// let pool = PoolBuilder::new()
///     .worker_threads(4)
///     .thread_name("fetch")
///     .queue_capacity(128)
///     .build()?;
/// ```
#[derive(Debug, Clone)]
pub struct PoolBuilder {
    /// Number of worker threads.
    worker_threads: usize,

    /// Prefix of worker thread names.
    thread_name: String,

    /// Maximum number of queued tasks, unbounded if `None`.
    queue_capacity: Option<usize>,

    /// Stack size of worker threads, platform default if `None`.
    stack_size: Option<usize>,
}

impl PoolBuilder {
    /// Creates a new `PoolBuilder` with default configuration.
    ///
    /// By default, the number of worker threads is set to the number
    /// of available logical CPUs, falling back to `1` if unavailable,
    /// and the intake queue is unbounded.
    pub fn new() -> Self {
        let worker_threads = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            worker_threads,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            queue_capacity: None,
            stack_size: None,
        }
    }

    /// Sets the number of worker threads. Must be at least `1`.
    pub fn worker_threads(mut self, n: usize) -> Self {
        self.worker_threads = n;
        self
    }

    /// Sets the prefix of worker thread names.
    ///
    /// Workers are named `"{prefix}-{index}"`.
    pub fn thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name = prefix.into();
        self
    }

    /// Bounds the intake queue to `capacity` waiting tasks.
    ///
    /// Once the bound is reached, submitting blocks until a worker claims
    /// a task. Must be at least `1`.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    /// Sets the stack size of worker threads, in bytes.
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Builds the pool with the configured options and starts its workers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the worker count or the queue
    /// capacity is zero, or if a worker thread cannot be spawned.
    pub fn build(self) -> Result<Pool> {
        Pool::start(self.into_config()?)
    }

    fn into_config(self) -> Result<Config> {
        if self.worker_threads == 0 {
            return Err(Error::InvalidConfig(
                "worker_threads must be > 0".to_string(),
            ));
        }

        if self.queue_capacity == Some(0) {
            return Err(Error::InvalidConfig(
                "queue_capacity must be > 0".to_string(),
            ));
        }

        Ok(Config {
            worker_threads: self.worker_threads,
            thread_name: self.thread_name,
            queue_capacity: self.queue_capacity,
            stack_size: self.stack_size,
        })
    }
}

impl Default for PoolBuilder {
    /// Creates a default `PoolBuilder`.
    fn default() -> Self {
        Self::new()
    }
}
