//! Task primitives.
//!
//! This module defines how the pool represents submitted work and its
//! eventual outcome.
//!
//! It includes:
//! - task ids and lifecycle states,
//! - the write-once cell shared by a task and its handles,
//! - [`Handle`], the caller-facing view of that cell,
//! - the type-erased [`Runnable`] abstraction held by the intake queue.
//!
//! Most users will interact with this module through [`Handle`], returned
//! by [`Pool::submit`](crate::Pool::submit).

pub(crate) mod core;
pub(crate) mod handle;
pub(crate) mod state;

pub(crate) use self::core::{Job, Runnable, Task};

pub use self::core::TaskId;
pub use handle::Handle;
pub use state::TaskState;
