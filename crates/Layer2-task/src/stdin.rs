//! Per-worker standard input
//!
//! Each worker tries to take its own duplicate of the process's stdin so an
//! interactive action can read from it without racing sibling workers. If the
//! descriptor cannot be duplicated the worker falls back to the shared stream.
//! The duplicate is closed when the `InputStream` is dropped.

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use tracing::debug;

enum Source {
    /// Private duplicate of fd 0
    Private(BufReader<File>),
    /// The process-wide stdin, shared with everyone else
    Ambient(io::Stdin),
    /// Caller-supplied reader
    Provided(Box<dyn BufRead + Send>),
}

/// Input stream handed to the executor
pub struct InputStream {
    source: Source,
}

impl InputStream {
    /// Duplicate stdin, or fall back to the ambient stream on any failure
    pub fn acquire() -> Self {
        Self::acquire_with(duplicate_stdin)
    }

    /// Like [`acquire`](Self::acquire) with a caller-supplied duplication step
    pub fn acquire_with(dup: impl FnOnce() -> io::Result<File>) -> Self {
        match dup() {
            Ok(file) => Self {
                source: Source::Private(BufReader::new(file)),
            },
            Err(e) => {
                debug!(error = %e, "could not duplicate stdin, using ambient stream");
                Self::ambient()
            }
        }
    }

    /// Use the shared process stdin as-is
    pub fn ambient() -> Self {
        Self {
            source: Source::Ambient(io::stdin()),
        }
    }

    /// Read from an arbitrary reader instead of stdin
    pub fn from_reader(reader: impl BufRead + Send + 'static) -> Self {
        Self {
            source: Source::Provided(Box::new(reader)),
        }
    }

    /// True when this stream owns a private descriptor
    pub fn is_private(&self) -> bool {
        matches!(self.source, Source::Private(_))
    }

    /// Read one line including the trailing newline; `Ok(0)` at end of stream
    pub fn read_line(&mut self, buf: &mut String) -> io::Result<usize> {
        match &mut self.source {
            Source::Private(r) => r.read_line(buf),
            Source::Ambient(s) => s.read_line(buf),
            Source::Provided(r) => r.read_line(buf),
        }
    }
}

impl Read for InputStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.source {
            Source::Private(r) => r.read(buf),
            Source::Ambient(s) => s.read(buf),
            Source::Provided(r) => r.read(buf),
        }
    }
}

impl fmt::Debug for InputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.source {
            Source::Private(_) => "private",
            Source::Ambient(_) => "ambient",
            Source::Provided(_) => "provided",
        };
        f.debug_struct("InputStream").field("source", &kind).finish()
    }
}

#[cfg(unix)]
fn duplicate_stdin() -> io::Result<File> {
    use std::os::fd::AsFd;

    let stdin = io::stdin();
    let owned = stdin.as_fd().try_clone_to_owned()?;
    Ok(File::from(owned))
}

#[cfg(not(unix))]
fn duplicate_stdin() -> io::Result<File> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "stdin duplication is not supported on this platform",
    ))
}
