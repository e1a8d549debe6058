//! Error types for the pool.
//!
//! Every fallible operation returns [`Result`], whose error side is the
//! single [`Error`] enum. Failures raised by task payloads are captured
//! into a [`TaskFailure`] and stored in the task's handle, so the same
//! failure can be observed by every consumer of that handle.

use crate::runtime::task::TaskId;

use std::error::Error as StdError;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Boxed error accepted from fallible task payloads.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Result type alias for pool operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type of the pool.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// The task payload returned an error or panicked.
    #[error(transparent)]
    Task(#[from] TaskFailure),

    /// A wait exceeded its deadline.
    ///
    /// The awaited handle or stream is left untouched and can be
    /// waited on again.
    #[error("wait timed out after {waited:?}")]
    Timeout { waited: Duration },

    /// The result of a cancelled task was requested.
    #[error("task {task} was cancelled")]
    Cancelled { task: TaskId },

    /// The pool was configured with invalid parameters.
    #[error("invalid pool configuration: {0}")]
    InvalidConfig(String),

    /// The pool is shutting down and rejects new tasks.
    #[error("pool is shut down and no longer accepts tasks")]
    ShutDown,
}

impl Error {
    /// Returns `true` if this error is a [`Error::Timeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Returns `true` if this error is a [`Error::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled { .. })
    }

    /// Returns the captured task failure, if any.
    pub fn as_task_failure(&self) -> Option<&TaskFailure> {
        match self {
            Error::Task(failure) => Some(failure),
            _ => None,
        }
    }
}

/// A failure captured from a task payload.
///
/// Cloning is cheap: the underlying error or panic message is shared.
#[derive(Error, Debug, Clone)]
#[error("task {task} failed: {cause}")]
pub struct TaskFailure {
    task: TaskId,
    cause: FailureCause,
}

impl TaskFailure {
    pub(crate) fn error(task: TaskId, error: BoxError) -> Self {
        Self {
            task,
            cause: FailureCause::Error(Arc::from(error)),
        }
    }

    pub(crate) fn panic(task: TaskId, message: String) -> Self {
        Self {
            task,
            cause: FailureCause::Panic(Arc::from(message)),
        }
    }

    /// Id of the task that failed.
    pub fn task(&self) -> TaskId {
        self.task
    }

    /// What went wrong inside the task.
    pub fn cause(&self) -> &FailureCause {
        &self.cause
    }

    /// Returns `true` if the task panicked rather than returning an error.
    pub fn is_panic(&self) -> bool {
        matches!(self.cause, FailureCause::Panic(_))
    }
}

/// The reason a task failed.
#[derive(Error, Debug, Clone)]
pub enum FailureCause {
    /// The payload returned `Err`.
    #[error(transparent)]
    Error(Arc<dyn StdError + Send + Sync + 'static>),

    /// The payload panicked; holds the panic message.
    #[error("panicked: {0}")]
    Panic(Arc<str>),
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Drops a panic payload without letting a panicking `Drop` escape.
///
/// A payload whose destructor panics again is leaked.
pub(crate) fn discard_payload(payload: Box<dyn std::any::Any + Send>) {
    if let Err(nested) = panic::catch_unwind(AssertUnwindSafe(move || drop(payload))) {
        std::mem::forget(nested);
    }
}
