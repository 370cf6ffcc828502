// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// select(2) backend.
//
// Works on every unix and with every kind of descriptor, which makes it
// the backstop when epoll or kqueue refuse a device. The price is the
// FD_SETSIZE ceiling: descriptors above it can't be watched at all.

use std::os::fd::RawFd;
use std::time::Duration;

use super::pipe::CancelPipe;
use super::{CancelState, PollReader, read_fd};
use crate::error::{Error, Result};

/// Cancelable reader built on select.
#[derive(Debug)]
pub struct SelectReader {
    src: RawFd,
    cancel: CancelPipe,
    state: CancelState,
}

fn fits(fd: RawFd) -> bool {
    usize::try_from(fd).is_ok_and(|fd| fd < libc::FD_SETSIZE as usize)
}

impl SelectReader {
    /// Watch `fd`.
    ///
    /// # Errors
    ///
    /// [`Error::PlatformNotSupported`] when `fd` or the cancel pipe is
    /// above `FD_SETSIZE`, or the OS error from creating the pipe.
    pub fn new(fd: RawFd) -> Result<Self> {
        let cancel = CancelPipe::new()?;
        if !fits(fd) || !fits(cancel.read_fd()) {
            return Err(Error::PlatformNotSupported);
        }
        Ok(Self {
            src: fd,
            cancel,
            state: CancelState::default(),
        })
    }
}

impl PollReader for SelectReader {
    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        while !self.poll(None)? {}
        read_fd(self.src, buf)
    }

    fn poll(&self, timeout: Option<Duration>) -> Result<bool> {
        self.state.check()?;
        let cancel_fd = self.cancel.read_fd();
        let nfds = self.src.max(cancel_fd) + 1;

        loop {
            // select() overwrites both the set and the timeout.
            let mut set: libc::fd_set = unsafe { std::mem::zeroed() };
            unsafe {
                libc::FD_ZERO(&raw mut set);
                libc::FD_SET(self.src, &raw mut set);
                libc::FD_SET(cancel_fd, &raw mut set);
            }
            let mut tv = timeout.map(|d| {
                let mut tv: libc::timeval = unsafe { std::mem::zeroed() };
                tv.tv_sec = libc::time_t::try_from(d.as_secs()).unwrap_or(libc::time_t::MAX);
                tv.tv_usec = libc::suseconds_t::try_from(d.subsec_micros()).unwrap_or(0);
                tv
            });
            let tv_ptr = tv.as_mut().map_or(std::ptr::null_mut(), std::ptr::from_mut);

            let n = unsafe {
                libc::select(nfds, &raw mut set, std::ptr::null_mut(), std::ptr::null_mut(), tv_ptr)
            };
            if n < 0 {
                let err = std::io::Error::last_os_error();
                if err.kind() == std::io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err.into());
            }
            if n == 0 {
                return Ok(false);
            }
            if unsafe { libc::FD_ISSET(cancel_fd, &raw const set) } {
                self.state.set_cancelled();
                return Err(Error::Cancelled);
            }
            return Ok(unsafe { libc::FD_ISSET(self.src, &raw const set) });
        }
    }

    fn cancel(&self) -> bool {
        self.state.set_cancelled();
        let delivered = self.cancel.signal();
        tracing::debug!(delivered, "select reader cancelled");
        delivered
    }

    fn close(&self) -> Result<()> {
        if self.state.set_closed() {
            self.cancel.signal();
            tracing::debug!("select reader closed");
        }
        Ok(())
    }
}
