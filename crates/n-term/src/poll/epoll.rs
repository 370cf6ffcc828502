// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// epoll backend (Linux, Android).
//
// One epoll instance watches the source and the cancel pipe. Each is
// registered with its own descriptor as the event token, so a wakeup
// tells us directly which one fired.

use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::time::Duration;

use super::pipe::CancelPipe;
use super::{CancelState, PollReader, read_fd, timeout_millis};
use crate::error::{Error, Result};

/// Cancelable reader built on epoll.
#[derive(Debug)]
pub struct EpollReader {
    src: RawFd,
    epoll: OwnedFd,
    cancel: CancelPipe,
    state: CancelState,
}

impl EpollReader {
    /// Watch `fd`. Fails for descriptors epoll refuses, such as regular
    /// files.
    ///
    /// # Errors
    ///
    /// The OS error from creating the instance or registering a descriptor.
    pub fn new(fd: RawFd) -> Result<Self> {
        let epfd = unsafe { libc::epoll_create1(libc::EPOLL_CLOEXEC) };
        if epfd < 0 {
            return Err(std::io::Error::last_os_error().into());
        }
        let epoll = unsafe { OwnedFd::from_raw_fd(epfd) };
        let cancel = CancelPipe::new()?;

        for watched in [fd, cancel.read_fd()] {
            #[allow(clippy::cast_sign_loss)] // Descriptors are non-negative.
            let token = watched as u64;
            let mut ev = libc::epoll_event {
                events: libc::EPOLLIN as u32,
                u64: token,
            };
            if unsafe { libc::epoll_ctl(epfd, libc::EPOLL_CTL_ADD, watched, &raw mut ev) } < 0 {
                return Err(std::io::Error::last_os_error().into());
            }
        }

        Ok(Self {
            src: fd,
            epoll,
            cancel,
            state: CancelState::default(),
        })
    }
}

impl PollReader for EpollReader {
    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        while !self.poll(None)? {}
        read_fd(self.src, buf)
    }

    fn poll(&self, timeout: Option<Duration>) -> Result<bool> {
        self.state.check()?;
        let mut events = [libc::epoll_event { events: 0, u64: 0 }; 2];
        let n = loop {
            let n = unsafe {
                libc::epoll_wait(self.epoll.as_raw_fd(), events.as_mut_ptr(), 2, timeout_millis(timeout))
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
        #[allow(clippy::cast_sign_loss)]
        let cancel_token = self.cancel.read_fd() as u64;
        if fired.iter().any(|ev| ({ ev.u64 }) == cancel_token) {
            self.state.set_cancelled();
            return Err(Error::Cancelled);
        }
        Ok(!fired.is_empty())
    }

    fn cancel(&self) -> bool {
        self.state.set_cancelled();
        let delivered = self.cancel.signal();
        tracing::debug!(delivered, "epoll reader cancelled");
        delivered
    }

    fn close(&self) -> Result<()> {
        if self.state.set_closed() {
            self.cancel.signal();
            tracing::debug!("epoll reader closed");
        }
        Ok(())
    }
}
