//! Result streams.
//!
//! This module turns handles of submitted tasks back into sequences of
//! results, in one of two orders:
//! - [`OrderedStream`]: submission order, as returned by
//!   [`Pool::map_ordered`](crate::Pool::map_ordered),
//! - [`CompletionStream`]: the order in which tasks actually finish.
//!
//! [`wait`] builds on the completion stream to block until the first, the
//! first failing, or every task of a set is done.

mod completed;
mod ordered;
mod wait;

pub use completed::{CompletionStream, as_completed};
pub use ordered::OrderedStream;
pub use wait::{WaitFor, WaitSet, wait};
