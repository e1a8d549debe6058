use crate::error::{Error, Result};
use crate::runtime::task::Handle;

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

/// Handles yielded in the order their tasks finish.
///
/// Each watched handle posts its registration key to the stream's
/// delivery queue exactly once, at the moment it becomes terminal.
/// Handles that are already terminal when the stream is built are queued
/// immediately, in the order they were given. Iterating blocks until the
/// next handle is terminal and yields it; its outcome can then be read
/// with [`Handle::get`] without blocking.
///
/// Passing the same task twice watches it once.
///
/// With a timeout, the stream yields [`Error::Timeout`] once if the
/// deadline passes while handles are outstanding, then ends. Nothing is
/// lost: [`into_remaining`](Self::into_remaining) returns the handles not
/// yet yielded, ready to be streamed again.
///
/// Dropping the stream unregisters it from the handles it still watches;
/// the tasks themselves are not affected.
///
/// # Examples
///
/// ```rust,ignore
/// let handles = [3, 1, 2].map(|s| pool.submit(move || work(s)).unwrap());
/// for handle in pool.stream_completed(handles, None) {
///     println!("{:?}", handle?.get());
/// }
/// ```
pub struct CompletionStream<T> {
    /// Handles not yet yielded, keyed by registration order.
    pending: BTreeMap<usize, Handle<T>>,

    /// Delivery queue fed by terminal handles.
    receiver: Receiver<usize>,

    /// Sending side of the queue; identifies this stream's registrations.
    sender: Sender<usize>,

    /// Overall deadline and the timeout it was derived from.
    deadline: Option<(Instant, Duration)>,

    /// Set once the deadline expired; the stream is then finished.
    expired: bool,
}

impl<T> CompletionStream<T> {
    /// Starts watching `handles`, with an optional overall `timeout`
    /// measured from this call.
    ///
    /// A timeout too large to represent as a deadline, such as
    /// [`Duration::MAX`], is treated as no timeout.
    pub fn new<I>(handles: I, timeout: Option<Duration>) -> Self
    where
        I: IntoIterator<Item = Handle<T>>,
    {
        let deadline = timeout.and_then(|timeout| {
            Instant::now()
                .checked_add(timeout)
                .map(|deadline| (deadline, timeout))
        });
        let (sender, receiver) = crossbeam_channel::unbounded();

        let mut pending = BTreeMap::new();
        let mut seen = HashSet::new();

        for handle in handles {
            if !seen.insert(Arc::as_ptr(&handle.shared) as usize) {
                continue;
            }

            let key = pending.len();
            handle.watch(key, sender.clone());
            pending.insert(key, handle);
        }

        Self {
            pending,
            receiver,
            sender,
            deadline,
            expired: false,
        }
    }

    /// Number of handles not yet yielded.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if every handle has been yielded.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Consumes the stream and returns the handles it has not yielded,
    /// in registration order.
    pub fn into_remaining(mut self) -> Vec<Handle<T>> {
        let pending = std::mem::take(&mut self.pending);

        for handle in pending.values() {
            handle.unwatch(&self.sender);
        }

        pending.into_values().collect()
    }
}

impl<T> Drop for CompletionStream<T> {
    fn drop(&mut self) {
        for handle in self.pending.values() {
            handle.unwatch(&self.sender);
        }
    }
}

impl<T> Iterator for CompletionStream<T> {
    type Item = Result<Handle<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.expired && !self.pending.is_empty() {
            let key = match self.deadline {
                None => self.receiver.recv().ok()?,
                Some((deadline, timeout)) => match self.receiver.recv_deadline(deadline) {
                    Ok(key) => key,
                    Err(RecvTimeoutError::Timeout) => {
                        self.expired = true;
                        return Some(Err(Error::Timeout { waited: timeout }));
                    }
                    Err(RecvTimeoutError::Disconnected) => return None,
                },
            };

            if let Some(handle) = self.pending.remove(&key) {
                return Some(Ok(handle));
            }
        }

        None
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

/// Streams `handles` in the order their tasks finish.
///
/// Shorthand for [`CompletionStream::new`].
pub fn as_completed<T, I>(handles: I, timeout: Option<Duration>) -> CompletionStream<T>
where
    I: IntoIterator<Item = Handle<T>>,
{
    CompletionStream::new(handles, timeout)
}
