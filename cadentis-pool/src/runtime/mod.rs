//! Core pool components.
//!
//! This module contains the fundamental building blocks of the pool,
//! including task representation, the intake queue and the workers.
//!
//! It is responsible for:
//! - turning closures into tasks and handles,
//! - queueing tasks in submission order,
//! - running them on a fixed set of worker threads,
//! - starting up and shutting down the pool.

mod executor;
mod injector;

pub(crate) mod builder;
pub(crate) mod context;
pub(crate) mod core;

pub mod task;
