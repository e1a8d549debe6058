//! # Cadentis Pool
//!
//! **Cadentis Pool** is a bounded thread pool for blocking work in the
//! **Nebula** ecosystem. Where the Cadentis runtime drives futures, the pool
//! runs plain closures on a fixed set of OS threads and separates *when work
//! runs* from *when its results are read*.
//!
//! Every submitted closure is queued at once and claimed by the first free
//! worker, strictly first-in first-out. Its outcome lands in a [`Handle`],
//! a write-once cell any number of threads can wait on. Results can then be
//! consumed in two orders:
//!
//! - **Submission order** with [`Pool::map_ordered`], which yields results in
//!   the order of its inputs even when later inputs finish first,
//! - **Completion order** with [`Pool::stream_completed`], which yields
//!   handles as soon as their tasks finish.
//!
//! Failures never take a worker down: errors and panics are captured into
//! the task's handle and surfaced as [`Error::Task`] to whoever reads it.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cadentis_pool::Pool;
//! use std::thread::sleep;
//! use std::time::Duration;
//!
//! fn main() -> cadentis_pool::Result<()> {
//!     let pool = Pool::new(3)?;
//!
//!     let work = |secs: u64| {
//!         sleep(Duration::from_millis(secs * 100));
//!         secs
//!     };
//!
//!     // Submission order: 3, 1, 2
//!     for result in pool.map_ordered(work, [3, 1, 2])? {
//!         println!("{}", result?);
//!     }
//!
//!     // Completion order: 1, 2, 3
//!     let handles = [3, 1, 2].map(|s| pool.submit(move || work(s)));
//!     let handles = handles.into_iter().collect::<Result<Vec<_>, _>>()?;
//!     for handle in pool.stream_completed(handles, None) {
//!         println!("{}", handle?.get()?);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`task`]: Handles, task ids and lifecycle states
//! - [`stream`]: Ordered and completion-order result streams, and [`wait`]

mod error;
mod runtime;

pub mod stream;

pub use error::{BoxError, Error, FailureCause, Result, TaskFailure};
pub use runtime::builder::PoolBuilder;
pub use runtime::context::{WorkerId, current_worker};
pub use runtime::core::{Pool, ShutdownOptions};
pub use runtime::task;
pub use runtime::task::{Handle, TaskId, TaskState};
pub use stream::{CompletionStream, OrderedStream, WaitFor, WaitSet, as_completed, wait};
