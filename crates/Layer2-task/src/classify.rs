//! Failure classification
//!
//! Maps an executor error to what the worker reports:
//!
//! | Error                                     | Kind          |
//! |-------------------------------------------|---------------|
//! | `Unreachable`                             | `Unreachable` |
//! | `ResourceNotFound`                        | `Failure`     |
//! | `Io`, `EndOfStream`, `UserInterrupt`, `Exit` | `Silent`   |
//! | anything else                             | `Failure`     |
//!
//! Rows are evaluated top to bottom. `ResourceNotFound` is part of the I/O
//! family but must be reported, so it is matched before the silent row.

use crate::error::TaskError;
use std::error::Error as StdError;
use std::fmt::Write;

/// What a worker does with an executor error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    /// Post `{unreachable: true}`
    Unreachable,
    /// Post nothing
    Silent,
    /// Post `{failed: true, exception, stdout: ""}`
    Failure,
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Unreachable => "unreachable",
            OutcomeKind::Silent => "silent",
            OutcomeKind::Failure => "failure",
        }
    }
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify an error raised by the executor
pub fn classify(err: &TaskError) -> OutcomeKind {
    match err {
        TaskError::Unreachable(_) => OutcomeKind::Unreachable,
        TaskError::ResourceNotFound(_) => OutcomeKind::Failure,
        TaskError::Io(_)
        | TaskError::EndOfStream
        | TaskError::UserInterrupt
        | TaskError::Exit(_) => OutcomeKind::Silent,
        _ => OutcomeKind::Failure,
    }
}

/// Render an error and its `source()` chain as diagnostic text
pub fn diagnostic(err: &(dyn StdError + 'static)) -> String {
    let mut text = format!("Error: {}", err);

    let mut source = err.source();
    if source.is_some() {
        text.push_str("\n\nCaused by:");
    }

    let mut depth = 0;
    while let Some(cause) = source {
        let _ = write!(text, "\n    {}: {}", depth, cause);
        depth += 1;
        source = cause.source();
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelError;
    use std::io;

    #[test]
    fn test_unreachable() {
        let err = TaskError::Unreachable("ssh: connect to host web1 port 22".into());
        assert_eq!(classify(&err), OutcomeKind::Unreachable);
    }

    #[test]
    fn test_resource_not_found_beats_io_family() {
        let err = TaskError::ResourceNotFound("templates/motd.j2".into());
        assert!(err.is_io_family());
        assert_eq!(classify(&err), OutcomeKind::Failure);
    }

    #[test]
    fn test_silent_conditions() {
        let cases = vec![
            TaskError::Io(io::Error::new(io::ErrorKind::Interrupted, "EINTR")),
            TaskError::Io(io::Error::new(io::ErrorKind::NotFound, "no such file")),
            TaskError::EndOfStream,
            TaskError::UserInterrupt,
            TaskError::Exit(0),
            TaskError::Exit(3),
        ];

        for err in cases {
            assert_eq!(classify(&err), OutcomeKind::Silent, "{}", err);
        }
    }

    #[test]
    fn test_everything_else_fails() {
        let cases = vec![
            TaskError::UnknownAction("nope".into()),
            TaskError::Action("boom".into()),
            TaskError::Panic("index out of bounds".into()),
            TaskError::Timeout(std::time::Duration::from_secs(1)),
            TaskError::Channel(ChannelError::Closed),
            TaskError::Other(anyhow::anyhow!("opaque")),
        ];

        for err in cases {
            assert_eq!(classify(&err), OutcomeKind::Failure, "{}", err);
        }
    }

    #[test]
    fn test_diagnostic_includes_chain() {
        let inner = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err = TaskError::Other(anyhow::Error::new(inner).context("reading /etc/shadow"));

        let text = diagnostic(&err);
        assert!(text.starts_with("Error: reading /etc/shadow"));
        assert!(text.contains("Caused by:"));
        assert!(text.contains("0: denied"));
    }

    #[test]
    fn test_diagnostic_single_error() {
        let text = diagnostic(&TaskError::Action("boom".into()));
        assert_eq!(text, "Error: Action failed: boom");
    }
}
