// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// kqueue backend (macOS and the BSDs).
//
// Same shape as the epoll backend: the source and the cancel pipe are
// both registered for EVFILT_READ on one queue, and the event's ident
// says which fired. macOS kqueue reports terminals as always readable,
// so ttys are refused there and the caller falls back to select.

use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::time::Duration;

use super::pipe::CancelPipe;
use super::{CancelState, PollReader, read_fd};
use crate::error::{Error, Result};

/// Cancelable reader built on kqueue.
#[derive(Debug)]
pub struct KqueueReader {
    src: RawFd,
    kq: OwnedFd,
    cancel: CancelPipe,
    state: CancelState,
}

fn read_filter(fd: RawFd) -> libc::kevent {
    let mut ev: libc::kevent = unsafe { std::mem::zeroed() };
    ev.ident = libc::uintptr_t::try_from(fd).unwrap_or_default();
    ev.filter = libc::EVFILT_READ;
    ev.flags = libc::EV_ADD;
    ev
}

fn timespec(d: Duration) -> libc::timespec {
    let mut ts: libc::timespec = unsafe { std::mem::zeroed() };
    ts.tv_sec = libc::time_t::try_from(d.as_secs()).unwrap_or(libc::time_t::MAX);
    ts.tv_nsec = libc::c_long::try_from(d.subsec_nanos()).unwrap_or(0);
    ts
}

impl KqueueReader {
    /// Watch `fd`.
    ///
    /// # Errors
    ///
    /// [`Error::PlatformNotSupported`] for terminals on macOS, otherwise
    /// the OS error from creating the queue or registering a descriptor.
    pub fn new(fd: RawFd) -> Result<Self> {
        #[cfg(any(target_os = "macos", target_os = "ios"))]
        if unsafe { libc::isatty(fd) } == 1 {
            return Err(Error::PlatformNotSupported);
        }

        let raw_kq = unsafe { libc::kqueue() };
        if raw_kq < 0 {
            return Err(std::io::Error::last_os_error().into());
        }
        let kq = unsafe { OwnedFd::from_raw_fd(raw_kq) };
        let cancel = CancelPipe::new()?;

        let changes = [read_filter(fd), read_filter(cancel.read_fd())];
        let rc = unsafe {
            libc::kevent(raw_kq, changes.as_ptr(), 2, std::ptr::null_mut(), 0, std::ptr::null())
        };
        if rc < 0 {
            return Err(std::io::Error::last_os_error().into());
        }

        Ok(Self {
            src: fd,
            kq,
            cancel,
            state: CancelState::default(),
        })
    }
}

impl PollReader for KqueueReader {
    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        while !self.poll(None)? {}
        read_fd(self.src, buf)
    }

    fn poll(&self, timeout: Option<Duration>) -> Result<bool> {
        self.state.check()?;
        let mut events: [libc::kevent; 2] = unsafe { std::mem::zeroed() };
        let ts = timeout.map(timespec);
        let ts_ptr = ts.as_ref().map_or(std::ptr::null(), std::ptr::from_ref);

        let n = loop {
            let n = unsafe {
                libc::kevent(self.kq.as_raw_fd(), std::ptr::null(), 0, events.as_mut_ptr(), 2, ts_ptr)
            };
            if n >= 0 {
                break n;
            }
            let err = std::io::Error::last_os_error();
            if err.kind() != std::io::ErrorKind::Interrupted {
                return Err(err.into());
            }
        };

        #[allow(clippy::cast_sign_loss)] // n >= 0 checked above.
        let fired = &events[..n as usize];
        let cancel_ident = libc::uintptr_t::try_from(self.cancel.read_fd()).unwrap_or_default();
        if fired.iter().any(|ev| ev.ident == cancel_ident) {
            self.state.set_cancelled();
            return Err(Error::Cancelled);
        }
        Ok(!fired.is_empty())
    }

    fn cancel(&self) -> bool {
        self.state.set_cancelled();
        let delivered = self.cancel.signal();
        tracing::debug!(delivered, "kqueue reader cancelled");
        delivered
    }

    fn close(&self) -> Result<()> {
        if self.state.set_closed() {
            self.cancel.signal();
            tracing::debug!("kqueue reader closed");
        }
        Ok(())
    }
}
