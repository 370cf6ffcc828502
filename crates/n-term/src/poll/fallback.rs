// SPDX-License-Identifier: MIT
//
// Thread-backed reader for sources with no waitable handle.
//
// A helper thread reads ahead from the source into a shared buffer and
// signals a condvar; `poll` and `read` wait on that condvar instead of
// the source, which makes them cancelable. The helper itself may stay
// blocked in the source after a cancel. It exits at the next chunk or at
// end of input, so the leak is bounded by one read.

use std::collections::VecDeque;
use std::io::{self, Read};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use super::{CancelState, PollReader};
use crate::error::Result;

/// Bytes read from the source per call.
const CHUNK: usize = 4096;

/// The helper stops reading ahead once this much is buffered.
const MAX_BUFFERED: usize = 64 * 1024;

#[derive(Debug, Default)]
struct Inner {
    data: VecDeque<u8>,
    eof: bool,
    err: Option<io::Error>,
}

#[derive(Debug, Default)]
struct Shared {
    inner: Mutex<Inner>,
    changed: Condvar,
    state: CancelState,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wake(&self) {
        let _guard = self.lock();
        self.changed.notify_all();
    }
}

/// Cancelable reader over any `Read` source.
#[derive(Debug)]
pub struct ThreadReader {
    shared: Arc<Shared>,
}

impl ThreadReader {
    /// Start reading ahead from `src` on a helper thread.
    ///
    /// # Errors
    ///
    /// The OS error when the thread can't be spawned.
    pub fn new<R: Read + Send + 'static>(src: R) -> Result<Self> {
        let shared = Arc::new(Shared::default());
        let helper = Arc::clone(&shared);
        thread::Builder::new()
            .name("poll-fallback".into())
            .spawn(move || read_ahead(src, &helper))?;
        Ok(Self { shared })
    }
}

fn read_ahead<R: Read>(mut src: R, shared: &Shared) {
    let mut chunk = [0u8; CHUNK];
    loop {
        {
            let mut inner = shared.lock();
            while inner.data.len() >= MAX_BUFFERED && shared.state.check().is_ok() {
                inner = shared.changed.wait(inner).unwrap_or_else(PoisonError::into_inner);
            }
        }
        if shared.state.check().is_err() {
            break;
        }

        let res = src.read(&mut chunk);
        let mut inner = shared.lock();
        let done = match res {
            Ok(0) => {
                inner.eof = true;
                true
            }
            Ok(n) => {
                inner.data.extend(&chunk[..n]);
                false
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => false,
            Err(e) => {
                inner.err = Some(e);
                true
            }
        };
        shared.changed.notify_all();
        if done {
            break;
        }
    }
    tracing::debug!("fallback reader thread exited");
}

impl PollReader for ThreadReader {
    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        while !self.poll(None)? {}
        let mut inner = self.shared.lock();
        if inner.data.is_empty() {
            return match inner.err.take() {
                Some(e) => Err(e.into()),
                None => Ok(0),
            };
        }
        let n = buf.len().min(inner.data.len());
        for (dst, src) in buf.iter_mut().zip(inner.data.drain(..n)) {
            *dst = src;
        }
        self.shared.changed.notify_all();
        Ok(n)
    }

    fn poll(&self, timeout: Option<Duration>) -> Result<bool> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut inner = self.shared.lock();
        loop {
            self.shared.state.check()?;
            if !inner.data.is_empty() || inner.eof || inner.err.is_some() {
                return Ok(true);
            }
            inner = match deadline {
                None => self.shared.changed.wait(inner).unwrap_or_else(PoisonError::into_inner),
                Some(at) => {
                    let left = at.saturating_duration_since(Instant::now());
                    if left.is_zero() {
                        return Ok(false);
                    }
                    self.shared
                        .changed
                        .wait_timeout(inner, left)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }

    fn cancel(&self) -> bool {
        self.shared.state.set_cancelled();
        self.shared.wake();
        tracing::debug!("fallback reader cancelled");
        true
    }

    fn close(&self) -> Result<()> {
        if self.shared.state.set_closed() {
            self.shared.wake();
            tracing::debug!("fallback reader closed");
        }
        Ok(())
    }
}

impl Drop for ThreadReader {
    fn drop(&mut self) {
        self.shared.state.set_closed();
        self.shared.wake();
    }
}
