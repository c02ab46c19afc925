//! Error types for continuity.

/// Top-level error type for the propagation layer.
///
/// There are deliberately no retries anywhere behind these: propagation is a
/// pass-through layer, and retry or backpressure policy belongs to whatever
/// executor is being wrapped.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    #[error("Cleanup error: {0}")]
    Cleanup(#[from] CleanupError),
}

/// A submitted task failed to produce its result.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The task body panicked. The panic was contained at the task boundary
    /// and its payload message is carried here; context installed for the
    /// task was already cleaned up when this surfaces.
    #[error("Task panicked: {message}")]
    Panicked { message: String },

    /// The executor dropped the task before it ran (e.g. pool shut down).
    /// No context was ever installed for the task, so there is nothing to
    /// clean up.
    #[error("Task was dropped by the executor before it ran")]
    Canceled,
}

/// The per-thread store was not in the expected state at scope release.
///
/// These indicate a defect in code sharing the thread, not a recoverable
/// condition: something mutated keys owned by an active scope, or cleared
/// the scope flag out from under it. When detected during unwind they are
/// logged rather than returned, so they never mask the in-flight panic.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CleanupError {
    #[error("Installed context key was externally modified before release: {key}")]
    ClobberedKey { key: String },

    #[error("Scope flag was externally cleared before release")]
    ScopeFlagMissing,
}

#[cfg(test)]
mod tests {
    use crate::error::{CleanupError, Error, TaskError};

    #[test]
    fn task_error_converts_into_top_level() {
        let err: Error = TaskError::Canceled.into();
        assert!(matches!(err, Error::Task(TaskError::Canceled)));
    }

    #[test]
    fn cleanup_error_converts_into_top_level() {
        let err: Error = CleanupError::ScopeFlagMissing.into();
        assert!(matches!(err, Error::Cleanup(_)));
    }

    #[test]
    fn messages_name_the_offending_key() {
        let err = CleanupError::ClobberedKey {
            key: "tenant".to_string(),
        };
        assert!(err.to_string().contains("tenant"));
    }
}
