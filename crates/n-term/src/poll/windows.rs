// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Windows console backend.
//
// The console input handle is waitable: it's signaled while input
// records are queued. We wait on it together with a manual-reset cancel
// event. Records that don't produce bytes (focus, menu, buffer size) also
// signal the handle, so they are drained before reporting readiness,
// otherwise ReadFile would block on a queue holding no text.

use std::os::windows::io::RawHandle;
use std::time::Duration;

use ::windows::Win32::Foundation::{CloseHandle, HANDLE, WAIT_OBJECT_0, WAIT_TIMEOUT};
use ::windows::Win32::Storage::FileSystem::ReadFile;
use ::windows::Win32::System::Console::{
    CONSOLE_MODE, GetConsoleMode, INPUT_RECORD, KEY_EVENT, PeekConsoleInputW, ReadConsoleInputW,
};
use ::windows::Win32::System::Threading::{CreateEventW, INFINITE, SetEvent, WaitForMultipleObjects};
use ::windows::core::PCWSTR;

use super::{CancelState, PollReader};
use crate::error::{Error, Result};

/// Cancelable reader for a console input handle.
#[derive(Debug)]
pub struct ConsoleReader {
    console: HANDLE,
    cancel_event: HANDLE,
    state: CancelState,
}

// The handles are process-wide kernel objects; every call on them is
// thread-safe.
unsafe impl Send for ConsoleReader {}
unsafe impl Sync for ConsoleReader {}

fn win_err(e: &::windows::core::Error) -> Error {
    Error::Io(std::io::Error::from_raw_os_error(e.code().0))
}

impl ConsoleReader {
    /// Watch a console input handle. The handle is borrowed.
    ///
    /// # Errors
    ///
    /// [`Error::NotTerminal`] when the handle isn't a console, or the OS
    /// error from creating the cancel event.
    pub fn new(handle: RawHandle) -> Result<Self> {
        let console = HANDLE(handle);
        let mut mode = CONSOLE_MODE(0);
        if unsafe { GetConsoleMode(console, &mut mode) }.is_err() {
            return Err(Error::NotTerminal);
        }
        let cancel_event =
            unsafe { CreateEventW(None, true, false, PCWSTR::null()) }.map_err(|e| win_err(&e))?;
        Ok(Self {
            console,
            cancel_event,
            state: CancelState::default(),
        })
    }

    /// Whether a key record sits at the front of the queue. Other records
    /// at the front are consumed.
    fn has_key_record(&self) -> Result<bool> {
        let mut rec = [INPUT_RECORD::default()];
        loop {
            let mut n = 0u32;
            unsafe { PeekConsoleInputW(self.console, &mut rec, &mut n) }.map_err(|e| win_err(&e))?;
            if n == 0 {
                return Ok(false);
            }
            if u32::from(rec[0].EventType) == KEY_EVENT {
                return Ok(true);
            }
            unsafe { ReadConsoleInputW(self.console, &mut rec, &mut n) }.map_err(|e| win_err(&e))?;
        }
    }
}

impl PollReader for ConsoleReader {
    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        while !self.poll(None)? {}
        let mut n = 0u32;
        unsafe { ReadFile(self.console, Some(buf), Some(&mut n), None) }.map_err(|e| win_err(&e))?;
        Ok(n as usize)
    }

    fn poll(&self, timeout: Option<Duration>) -> Result<bool> {
        self.state.check()?;
        let ms = timeout.map_or(INFINITE, |d| {
            u32::try_from(d.as_millis()).unwrap_or(INFINITE - 1)
        });
        let handles = [self.console, self.cancel_event];
        let ev = unsafe { WaitForMultipleObjects(&handles, false, ms) };

        if ev == WAIT_OBJECT_0 {
            return self.has_key_record();
        }
        if ev.0 == WAIT_OBJECT_0.0 + 1 {
            self.state.set_cancelled();
            return Err(Error::Cancelled);
        }
        if ev == WAIT_TIMEOUT {
            return Ok(false);
        }
        Err(std::io::Error::last_os_error().into())
    }

    fn cancel(&self) -> bool {
        self.state.set_cancelled();
        let delivered = unsafe { SetEvent(self.cancel_event) }.is_ok();
        tracing::debug!(delivered, "console reader cancelled");
        delivered
    }

    fn close(&self) -> Result<()> {
        if self.state.set_closed() {
            unsafe { SetEvent(self.cancel_event) }.map_err(|e| win_err(&e))?;
            tracing::debug!("console reader closed");
        }
        Ok(())
    }
}

impl Drop for ConsoleReader {
    fn drop(&mut self) {
        let _ = unsafe { CloseHandle(self.cancel_event) };
    }
}
