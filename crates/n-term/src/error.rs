// SPDX-License-Identifier: MIT
//
// Error type for the output and OS-plumbing side.
//
// Decoding never fails (malformed input becomes `Event::Unknown`), so the
// only fallible paths live here: polling, reading, raw mode, and window
// geometry. Cancellation is its own variant because a cancelled poll is
// the normal way a reader shuts down, not a failure.

use std::io;

use thiserror::Error;

/// Errors produced by readers, windows, and terminal control.
#[derive(Debug, Error)]
pub enum Error {
    /// A poll or read was cancelled through [`PollReader::cancel`](crate::poll::PollReader::cancel).
    #[error("operation cancelled")]
    Cancelled,

    /// The reader was used after [`close`](crate::poll::PollReader::close).
    #[error("reader closed")]
    Closed,

    /// A window or buffer region was empty or outside its parent.
    #[error("invalid dimensions")]
    InvalidDimensions,

    /// The file descriptor or handle is not a terminal.
    #[error("not a terminal")]
    NotTerminal,

    /// No poll primitive exists for this platform or device.
    #[error("platform not supported")]
    PlatformNotSupported,

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// Whether this error only reports a cancellation.
    #[inline]
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Shorthand result type for n-term.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_is_cancelled() {
        assert!(Error::Cancelled.is_cancelled());
        assert!(!Error::Closed.is_cancelled());
    }

    #[test]
    fn io_errors_convert() {
        let err: Error = io::Error::new(io::ErrorKind::BrokenPipe, "gone").into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.to_string(), "gone");
    }

    #[test]
    fn display_messages() {
        assert_eq!(Error::InvalidDimensions.to_string(), "invalid dimensions");
        assert_eq!(Error::NotTerminal.to_string(), "not a terminal");
    }
}
