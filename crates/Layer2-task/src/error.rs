//! Errors raised out of task execution

use crate::channel::ChannelError;
use std::time::Duration;
use thiserror::Error;

/// Result type for executor and plugin calls
pub type TaskResult<T> = std::result::Result<T, TaskError>;

/// Error returned by a [`TaskExecutor`](crate::executor::TaskExecutor).
///
/// The worker never lets one of these escape; see [`classify`](crate::classify::classify).
#[derive(Error, Debug)]
pub enum TaskError {
    // ========================================================================
    // Connectivity
    // ========================================================================
    #[error("Failed to connect to the host: {0}")]
    Unreachable(String),

    // ========================================================================
    // I/O family
    // ========================================================================
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("End of input stream")]
    EndOfStream,

    // ========================================================================
    // Early termination requested upstream
    // ========================================================================
    #[error("Interrupted by user")]
    UserInterrupt,

    #[error("Exit requested with status {0}")]
    Exit(i32),

    // ========================================================================
    // Task failures
    // ========================================================================
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Invalid arguments for '{action}': {message}")]
    InvalidArgs { action: String, message: String },

    #[error("Action failed: {0}")]
    Action(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Executor panicked: {0}")]
    Panic(String),

    #[error("Failed to post result: {0}")]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TaskError {
    pub fn invalid_args(action: impl Into<String>, message: impl Into<String>) -> Self {
        TaskError::InvalidArgs {
            action: action.into(),
            message: message.into(),
        }
    }

    /// Errors that belong to the I/O family, resource lookups included
    pub fn is_io_family(&self) -> bool {
        matches!(
            self,
            TaskError::ResourceNotFound(_) | TaskError::Io(_) | TaskError::EndOfStream
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_family() {
        assert!(TaskError::ResourceNotFound("motd.j2".into()).is_io_family());
        assert!(TaskError::EndOfStream.is_io_family());
        assert!(!TaskError::UserInterrupt.is_io_family());
        assert!(!TaskError::Unreachable("ssh".into()).is_io_family());
    }

    #[test]
    fn test_invalid_args_message() {
        let err = TaskError::invalid_args("command", "missing 'cmd'");
        assert_eq!(
            err.to_string(),
            "Invalid arguments for 'command': missing 'cmd'"
        );
    }
}
