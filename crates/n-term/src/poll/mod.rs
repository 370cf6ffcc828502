// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Cancelable readers.
//
// A blocking `read()` on a terminal can't be interrupted from another
// thread, which makes clean shutdown of an input thread impossible.
// Every reader here waits on two things at once: the real source and a
// private cancel signal (a pipe on unix, an event object on Windows).
// `cancel()` fires the signal, so a thread parked in `poll` or `read`
// wakes up and gets `Error::Cancelled` instead of hanging forever.
//
// One backend per OS readiness primitive:
//
//   epoll    Linux, Android
//   kqueue   macOS and the BSDs (select when kqueue can't watch the fd)
//   select   every other unix, and the unix fallback for odd devices
//   windows  WaitForMultipleObjects on the console handle
//   fallback a helper thread reading ahead from any `Read` source
//
// Once cancelled, a reader stays cancelled. Resources are released when
// the reader is dropped; `close` only marks it unusable.

#[cfg(unix)]
pub(crate) mod pipe;

#[cfg(any(target_os = "linux", target_os = "android"))]
pub mod epoll;

#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly",
))]
pub mod kqueue;

#[cfg(unix)]
pub mod select;

#[cfg(windows)]
pub mod windows;

pub mod fallback;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::error::{Error, Result};

// ─── Contract ────────────────────────────────────────────────────────────────

/// A reader whose blocking operations can be cancelled from another
/// thread.
pub trait PollReader: Send + Sync {
    /// Read into `buf`, blocking until data is available. Returns 0 at
    /// end of input.
    ///
    /// # Errors
    ///
    /// [`Error::Cancelled`] after [`cancel`](Self::cancel), [`Error::Closed`]
    /// after [`close`](Self::close), or the underlying I/O error.
    fn read(&self, buf: &mut [u8]) -> Result<usize>;

    /// Wait until the source is readable. `None` waits indefinitely.
    /// Returns `false` when the timeout elapsed first.
    ///
    /// # Errors
    ///
    /// Same as [`read`](Self::read).
    fn poll(&self, timeout: Option<Duration>) -> Result<bool>;

    /// Wake any pending wait and make every later call fail with
    /// [`Error::Cancelled`]. Returns whether the wakeup was delivered; a
    /// `false` return means a thread blocked inside the source itself may
    /// stay blocked until the source produces data.
    fn cancel(&self) -> bool;

    /// Mark the reader closed. Later calls fail with [`Error::Closed`].
    ///
    /// # Errors
    ///
    /// Backend-specific failures while waking a pending wait.
    fn close(&self) -> Result<()>;
}

// ─── Shared state ────────────────────────────────────────────────────────────

/// Cancel and close flags common to every backend.
#[derive(Debug, Default)]
pub(crate) struct CancelState {
    cancelled: AtomicBool,
    closed: AtomicBool,
}

impl CancelState {
    /// Fails when the reader is closed or cancelled.
    pub(crate) fn check(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(Error::Closed)
        } else if self.cancelled.load(Ordering::Acquire) {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    pub(crate) fn set_cancelled(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Returns whether this call did the closing.
    pub(crate) fn set_closed(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }
}

/// Milliseconds for a poll-style timeout, rounding up so a short timeout
/// never turns into a non-blocking check. `None` becomes -1.
#[cfg(unix)]
pub(crate) fn timeout_millis(timeout: Option<Duration>) -> i32 {
    timeout.map_or(-1, |d| {
        i32::try_from(d.as_nanos().div_ceil(1_000_000)).unwrap_or(i32::MAX)
    })
}

/// Read from a raw descriptor, retrying on `EINTR`.
#[cfg(unix)]
pub(crate) fn read_fd(fd: std::os::fd::RawFd, buf: &mut [u8]) -> Result<usize> {
    loop {
        let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
        if n >= 0 {
            #[allow(clippy::cast_sign_loss)] // n >= 0 checked above.
            return Ok(n as usize);
        }
        let err = std::io::Error::last_os_error();
        if err.kind() != std::io::ErrorKind::Interrupted {
            return Err(err.into());
        }
    }
}

// ─── Selection ───────────────────────────────────────────────────────────────

/// The best reader for a unix file descriptor.
///
/// The descriptor is borrowed, not owned: it must stay open for as long as
/// the reader lives.
///
/// # Errors
///
/// Fails when no backend can watch the descriptor (for example a select
/// fallback on a descriptor above `FD_SETSIZE`).
#[cfg(unix)]
pub fn new_for(fd: std::os::fd::RawFd) -> Result<Box<dyn PollReader>> {
    #[cfg(any(target_os = "linux", target_os = "android"))]
    match epoll::EpollReader::new(fd) {
        Ok(r) => {
            tracing::debug!(fd, "poll backend: epoll");
            return Ok(Box::new(r));
        }
        Err(err) => tracing::debug!(fd, %err, "epoll unavailable, trying select"),
    }

    #[cfg(any(
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd",
        target_os = "netbsd",
        target_os = "openbsd",
        target_os = "dragonfly",
    ))]
    match kqueue::KqueueReader::new(fd) {
        Ok(r) => {
            tracing::debug!(fd, "poll backend: kqueue");
            return Ok(Box::new(r));
        }
        Err(err) => tracing::debug!(fd, %err, "kqueue unavailable, trying select"),
    }

    let r = select::SelectReader::new(fd)?;
    tracing::debug!(fd, "poll backend: select");
    Ok(Box::new(r))
}

/// The reader for a console input handle.
///
/// # Errors
///
/// [`Error::NotTerminal`] when the handle isn't a console, or the OS
/// error from creating the cancel event.
#[cfg(windows)]
pub fn new_for(handle: std::os::windows::io::RawHandle) -> Result<Box<dyn PollReader>> {
    let r = windows::ConsoleReader::new(handle)?;
    tracing::debug!("poll backend: windows");
    Ok(Box::new(r))
}

/// The best reader for standard input.
///
/// # Errors
///
/// See [`new_for`].
#[cfg(unix)]
pub fn stdin() -> Result<Box<dyn PollReader>> {
    new_for(libc::STDIN_FILENO)
}

/// The best reader for standard input.
///
/// # Errors
///
/// See [`new_for`].
#[cfg(windows)]
pub fn stdin() -> Result<Box<dyn PollReader>> {
    use std::os::windows::io::AsRawHandle;
    match new_for(std::io::stdin().as_raw_handle()) {
        Err(Error::NotTerminal) => {
            tracing::debug!("stdin is not a console, poll backend: fallback");
            Ok(Box::new(fallback::ThreadReader::new(std::io::stdin())?))
        }
        other => other,
    }
}

/// The thread-backed reader for standard input.
///
/// # Errors
///
/// Fails when the helper thread can't be spawned.
#[cfg(not(any(unix, windows)))]
pub fn stdin() -> Result<Box<dyn PollReader>> {
    tracing::debug!("poll backend: fallback");
    Ok(Box::new(fallback::ThreadReader::new(std::io::stdin())?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_starts_open() {
        let s = CancelState::default();
        assert!(s.check().is_ok());
    }

    #[test]
    fn cancel_then_close() {
        let s = CancelState::default();
        s.set_cancelled();
        assert!(s.check().unwrap_err().is_cancelled());
        assert!(s.set_closed());
        assert!(!s.set_closed());
        assert!(matches!(s.check(), Err(Error::Closed)));
    }

    #[cfg(unix)]
    #[test]
    fn timeout_rounding() {
        assert_eq!(timeout_millis(None), -1);
        assert_eq!(timeout_millis(Some(Duration::ZERO)), 0);
        assert_eq!(timeout_millis(Some(Duration::from_micros(10))), 1);
        assert_eq!(timeout_millis(Some(Duration::from_millis(250))), 250);
        assert_eq!(timeout_millis(Some(Duration::from_secs(u64::MAX))), i32::MAX);
    }
}
