use super::completed::CompletionStream;
use crate::runtime::task::{Handle, TaskState};

use std::time::Duration;

/// When [`wait`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitFor {
    /// As soon as any task is terminal.
    FirstCompleted,
    /// As soon as any task fails, or when all are terminal.
    FirstFailure,
    /// When every task is terminal.
    AllCompleted,
}

/// Handles split by [`wait`].
#[derive(Debug)]
pub struct WaitSet<T> {
    /// Terminal handles: completion order first, then any other handle
    /// found terminal when `wait` returned, in registration order.
    pub done: Vec<Handle<T>>,

    /// Handles still queued or running, in registration order.
    pub pending: Vec<Handle<T>>,
}

/// Blocks until the condition in `wait_for` holds or `timeout` passes,
/// then splits `handles` into terminal and outstanding ones.
///
/// A timeout is not an error here: the call just returns with whatever
/// finished in time. Cancelled tasks count as terminal but not as
/// failures.
pub fn wait<T, I>(handles: I, timeout: Option<Duration>, wait_for: WaitFor) -> WaitSet<T>
where
    I: IntoIterator<Item = Handle<T>>,
{
    let mut stream = CompletionStream::new(handles, timeout);
    let mut done = Vec::new();

    while let Some(Ok(handle)) = stream.next() {
        let stop = match wait_for {
            WaitFor::FirstCompleted => true,
            WaitFor::FirstFailure => handle.state() == TaskState::Failed,
            WaitFor::AllCompleted => false,
        };

        done.push(handle);

        if stop {
            break;
        }
    }

    let (also_done, pending): (Vec<_>, Vec<_>) = stream
        .into_remaining()
        .into_iter()
        .partition(|handle| handle.done());

    done.extend(also_done);

    WaitSet { done, pending }
}
