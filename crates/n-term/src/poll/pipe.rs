// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// The self-pipe every unix backend waits on next to its source. Writing
// one byte makes the read end readable, which wakes epoll, kqueue or
// select. Both ends are non-blocking and close-on-exec, so the write end
// is also safe to use from a signal handler.

use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

#[derive(Debug)]
pub(crate) struct CancelPipe {
    read: OwnedFd,
    write: OwnedFd,
}

impl CancelPipe {
    pub(crate) fn new() -> io::Result<Self> {
        let mut fds = [0 as RawFd; 2];
        if unsafe { libc::pipe(fds.as_mut_ptr()) } < 0 {
            return Err(io::Error::last_os_error());
        }
        // Own both ends first so they're closed if flag setup fails.
        let (read, write) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
        for fd in [fds[0], fds[1]] {
            set_flags(fd)?;
        }
        Ok(Self { read, write })
    }

    /// The end to watch for readability.
    #[inline]
    pub(crate) fn read_fd(&self) -> RawFd {
        self.read.as_raw_fd()
    }

    /// The end [`signal`](Self::signal) writes to.
    #[inline]
    pub(crate) fn write_fd(&self) -> RawFd {
        self.write.as_raw_fd()
    }

    /// Make the read end readable. Returns whether the byte was written.
    pub(crate) fn signal(&self) -> bool {
        let n = unsafe { libc::write(self.write.as_raw_fd(), b"c".as_ptr().cast(), 1) };
        // A full pipe already holds a wakeup.
        n == 1 || io::Error::last_os_error().kind() == io::ErrorKind::WouldBlock
    }
}

fn set_flags(fd: RawFd) -> io::Result<()> {
    unsafe {
        let fl = libc::fcntl(fd, libc::F_GETFL);
        if fl < 0 || libc::fcntl(fd, libc::F_SETFL, fl | libc::O_NONBLOCK) < 0 {
            return Err(io::Error::last_os_error());
        }
        let fd_flags = libc::fcntl(fd, libc::F_GETFD);
        if fd_flags < 0 || libc::fcntl(fd, libc::F_SETFD, fd_flags | libc::FD_CLOEXEC) < 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_makes_read_end_readable() {
        let p = CancelPipe::new().unwrap();
        assert!(p.signal());
        let mut b = [0u8; 4];
        let n = unsafe { libc::read(p.read_fd(), b.as_mut_ptr().cast(), b.len()) };
        assert_eq!(n, 1);
    }

    #[test]
    fn read_end_is_non_blocking() {
        let p = CancelPipe::new().unwrap();
        let mut b = [0u8; 1];
        let n = unsafe { libc::read(p.read_fd(), b.as_mut_ptr().cast(), 1) };
        assert_eq!(n, -1);
    }
}
