use crate::error::{Error, Result};
use crate::runtime::task::Handle;

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Results of a batch of tasks, in submission order.
///
/// Returned by [`Pool::map_ordered`](crate::Pool::map_ordered). Every task
/// was already submitted when the stream was created; iterating only
/// decides when the caller looks at the results.
///
/// Each call to [`next`](Iterator::next) blocks until the task at the
/// current position is terminal, then yields its outcome and moves on.
/// Later tasks may finish first; their results simply wait in their
/// handles until the stream reaches them. A failed task is yielded at
/// its own position, and iteration continues afterwards.
///
/// Dropping the stream before it is exhausted cancels the tasks it has
/// not yielded yet, as long as no worker has claimed them.
pub struct OrderedStream<T> {
    /// Handles not yet yielded, in submission order.
    pending: VecDeque<Handle<T>>,

    /// Number of results yielded so far.
    position: usize,

    /// Overall deadline and the timeout it was derived from.
    deadline: Option<(Instant, Duration)>,

    /// Set once the deadline expired; the stream is then finished.
    expired: bool,
}

impl<T> OrderedStream<T> {
    pub(crate) fn new(handles: Vec<Handle<T>>) -> Self {
        Self {
            pending: handles.into(),
            position: 0,
            deadline: None,
            expired: false,
        }
    }

    /// Limits the total time spent waiting on this stream.
    ///
    /// The deadline is measured from this call. When it passes before the
    /// next result is ready, the stream yields [`Error::Timeout`] once and
    /// then ends. A timeout too large to represent as a deadline leaves
    /// the stream unbounded.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Instant::now()
            .checked_add(timeout)
            .map(|deadline| (deadline, timeout));
        self
    }

    /// Number of results yielded so far.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of results not yet yielded.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if every result has been yielded.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Handles not yet yielded, in submission order.
    pub fn handles(&self) -> impl Iterator<Item = &Handle<T>> {
        self.pending.iter()
    }
}

impl<T: Clone> Iterator for OrderedStream<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.expired {
            return None;
        }

        let handle = self.pending.front()?;

        let outcome = match self.deadline {
            None => handle.get(),
            Some((deadline, timeout)) => handle.get_until(Some(deadline), timeout),
        };

        if let Err(Error::Timeout { .. }) = outcome {
            self.expired = true;
            return Some(outcome);
        }

        self.pending.pop_front();
        self.position += 1;

        Some(outcome)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.expired {
            (0, Some(0))
        } else if self.deadline.is_some() {
            (0, Some(self.pending.len() + 1))
        } else {
            (self.pending.len(), Some(self.pending.len()))
        }
    }
}

impl<T> Drop for OrderedStream<T> {
    /// Cancels every task not yet yielded that is still queued.
    fn drop(&mut self) {
        for handle in &self.pending {
            handle.cancel();
        }
    }
}
