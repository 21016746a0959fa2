//! Error types.
//!
//! Registration errors are programming errors and surface synchronously as
//! `Result`s. Barrier errors are runtime outcomes: they are never thrown,
//! only delivered through the resolution channel and the `error` event.

use thiserror::Error;

/// Synchronous registration failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegisterError {
    #[error("task name is required but none was given")]
    MissingName,

    #[error("cannot register task `{0}` twice while it is pending")]
    DuplicateTask(String),
}

/// The latched failure a barrier resolves with.
///
/// `Clone` so the stored outcome can be replayed to listeners that attach
/// after resolution.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BarrierError {
    #[error("task `{task}` failed: {message}")]
    TaskFailed { task: String, message: String },

    #[error("will-ready hook failed: {message}")]
    WillReadyFailed { message: String },
}

impl BarrierError {
    /// The underlying failure message, without the task prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::TaskFailed { message, .. } => message,
            Self::WillReadyFailed { message } => message,
        }
    }
}
