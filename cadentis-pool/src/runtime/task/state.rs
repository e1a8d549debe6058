/// Task is queued and has not been claimed by a worker.
///
/// This is the only state from which a task can be cancelled.
pub(crate) const PENDING: u8 = 0;

/// Task has been claimed by a worker and is executing.
///
/// At most one worker may observe this state for a given task.
pub(crate) const RUNNING: u8 = 1;

/// Task returned a value.
pub(crate) const COMPLETED: u8 = 2;

/// Task returned an error or panicked.
pub(crate) const FAILED: u8 = 3;

/// Task was cancelled before a worker claimed it.
pub(crate) const CANCELLED: u8 = 4;

/// Observable lifecycle state of a task.
///
/// Transitions only move forward:
/// `Pending -> Running -> Completed | Failed`, or `Pending -> Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Waiting in the intake queue.
    Pending,
    /// Being executed by a worker.
    Running,
    /// Finished with a value.
    Completed,
    /// Finished with an error or a panic.
    Failed,
    /// Cancelled before execution.
    Cancelled,
}

impl TaskState {
    pub(crate) fn from_raw(raw: u8) -> Self {
        match raw {
            PENDING => TaskState::Pending,
            RUNNING => TaskState::Running,
            COMPLETED => TaskState::Completed,
            FAILED => TaskState::Failed,
            _ => TaskState::Cancelled,
        }
    }

    /// Returns `true` for `Completed`, `Failed` and `Cancelled`.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Cancelled
        )
    }
}
