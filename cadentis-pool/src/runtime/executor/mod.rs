//! Worker pool implementation.
//!
//! This module contains the components responsible for executing tasks
//! on a fixed set of threads.
//!
//! It is composed of:
//! - [`core`]: the executor owning the threads and their lifecycle,
//! - [`worker`]: the loop each thread runs, claiming tasks from the
//!   shared intake queue.

pub(crate) mod core;
pub(crate) mod worker;
