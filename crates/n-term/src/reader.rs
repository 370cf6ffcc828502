// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Input stream — turns terminal bytes into events on background threads.
//
// Three threads feed one ordered channel of `Event`s:
//
//   read    Blocks in `PollReader::read` and forwards raw chunks.
//   scan    Owns the `EventScanner`. Decodes every chunk as it arrives
//           and keeps an ESC deadline armed while undecoded bytes remain;
//           when the deadline passes, the scanner is told the timeout
//           expired so a lone ESC becomes the Escape key.
//   resize  (unix) Waits on a SIGWINCH self-pipe, queries the window size
//           and emits `Event::WindowSize`.
//
// Why threads? Because `read()` on a tty blocks, and the application must
// stay responsive for rendering and timers. The poll reader makes that
// block cancelable, so `stop()` can always shut everything down: it
// cancels the reader, the read thread exits, its channel closes, and the
// scan thread flushes what's left before exiting too.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use n_input::{Event, EventScanner};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::poll::PollReader;

/// Byte chunk read from the terminal.
///
/// Sized for typical terminal input: a single keypress is 1-6 bytes,
/// a paste can be kilobytes. 4 KB handles both without waste.
const READ_BUF_SIZE: usize = 4096;

/// Background input threads.
///
/// # Example
///
/// ```no_run
/// use std::sync::mpsc;
/// use n_term::config::Config;
/// use n_term::poll;
/// use n_term::reader::InputStream;
///
/// let (tx, rx) = mpsc::channel();
/// let mut input = InputStream::spawn(poll::stdin()?, &Config::default(), tx)?;
///
/// while let Ok(event) = rx.recv() {
///     println!("{event:?}");
/// }
/// input.stop();
/// # Ok::<(), n_term::error::Error>(())
/// ```
pub struct InputStream {
    reader: Arc<dyn PollReader>,
    /// Kept for threads started later. Dropped by `stop()` so the
    /// receiver sees the channel close.
    events: Option<Sender<Event>>,
    threads: Vec<JoinHandle<()>>,
    #[cfg(unix)]
    resize: Option<resize::Watcher>,
}

impl InputStream {
    /// Start the read and scan threads. Events go to `events` in the
    /// order they were decoded.
    ///
    /// # Errors
    ///
    /// Returns an error if a thread can't be spawned.
    pub fn spawn(reader: Box<dyn PollReader>, config: &Config, events: Sender<Event>) -> Result<Self> {
        let reader: Arc<dyn PollReader> = Arc::from(reader);
        let (chunk_tx, chunk_rx) = mpsc::channel();

        let mut stream = Self {
            reader: Arc::clone(&reader),
            events: Some(events.clone()),
            threads: Vec::with_capacity(2),
            #[cfg(unix)]
            resize: None,
        };

        let read = thread::Builder::new()
            .name("input-read".into())
            .spawn(move || read_loop(&*reader, &chunk_tx))?;
        stream.threads.push(read);

        let scanner = config.scanner();
        let esc_timeout = config.esc_timeout;
        let scan = thread::Builder::new()
            .name("input-scan".into())
            .spawn(move || scan_loop(scanner, esc_timeout, &chunk_rx, &events))?;
        stream.threads.push(scan);

        tracing::debug!(esc_timeout_ms = esc_timeout.as_millis(), "input stream started");
        Ok(stream)
    }

    /// Also report window size changes of the terminal behind `tty`.
    /// Only one watcher is active per process; a later call takes over.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is stopped, or the self-pipe, signal
    /// handler or thread can't be set up.
    #[cfg(unix)]
    pub fn watch_resize(&mut self, tty: std::os::fd::RawFd) -> Result<()> {
        let Some(events) = self.events.clone() else {
            return Err(Error::Closed);
        };
        if let Some(mut old) = self.resize.take() {
            old.stop();
        }
        self.resize = Some(resize::Watcher::start(tty, events)?);
        Ok(())
    }

    /// Whether `stop()` has run.
    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        self.events.is_none()
    }

    /// Cancel the reader and join every thread. Bytes still buffered in
    /// the scanner are flushed as events first.
    ///
    /// Idempotent: calling `stop()` again is a no-op.
    pub fn stop(&mut self) {
        if self.events.take().is_none() {
            return;
        }
        if !self.reader.cancel() {
            tracing::warn!("input reader did not acknowledge cancel");
        }
        #[cfg(unix)]
        if let Some(mut watcher) = self.resize.take() {
            watcher.stop();
        }
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
        if let Err(err) = self.reader.close() {
            tracing::warn!(%err, "closing input reader failed");
        }
        tracing::debug!("input stream stopped");
    }
}

impl Drop for InputStream {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for InputStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputStream")
            .field("threads", &self.threads.len())
            .field("stopped", &self.is_stopped())
            .finish_non_exhaustive()
    }
}

// ─── Threads ─────────────────────────────────────────────────────────────────

/// Forward raw chunks until end of input, cancellation, or a closed
/// channel.
fn read_loop(reader: &dyn PollReader, chunks: &Sender<Vec<u8>>) {
    let mut buf = [0u8; READ_BUF_SIZE];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => {
                tracing::debug!("input reached end of file");
                break;
            }
            Ok(n) => {
                if chunks.send(buf[..n].to_vec()).is_err() {
                    break;
                }
            }
            Err(Error::Cancelled | Error::Closed) => break,
            Err(err) => {
                tracing::warn!(%err, "input read failed");
                break;
            }
        }
    }
}

/// Decode chunks into events, honoring the ESC timeout.
fn scan_loop(
    mut scanner: EventScanner,
    esc_timeout: Duration,
    chunks: &Receiver<Vec<u8>>,
    events: &Sender<Event>,
) {
    let mut deadline: Option<Instant> = None;
    loop {
        let next = match deadline {
            Some(at) => chunks.recv_timeout(at.saturating_duration_since(Instant::now())),
            None => chunks.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        let expired = match next {
            Ok(chunk) => {
                tracing::trace!(len = chunk.len(), "input chunk");
                scanner.feed(&chunk);
                false
            }
            Err(RecvTimeoutError::Timeout) => {
                tracing::trace!("esc timeout expired");
                true
            }
            Err(RecvTimeoutError::Disconnected) => {
                send_all(events, scanner.flush());
                break;
            }
        };

        if !send_all(events, scanner.scan(expired)) {
            break;
        }
        deadline = scanner.has_pending().then(|| Instant::now() + esc_timeout);
    }
}

/// Returns `false` once the receiver is gone.
fn send_all(events: &Sender<Event>, batch: Vec<Event>) -> bool {
    batch.into_iter().all(|ev| events.send(ev).is_ok())
}

// ─── Resize ──────────────────────────────────────────────────────────────────

#[cfg(unix)]
mod resize {
    use std::os::fd::RawFd;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::mpsc::Sender;
    use std::thread::{self, JoinHandle};

    use n_input::Event;

    use crate::error::Result;
    use crate::poll::pipe::CancelPipe;
    use crate::poll::{self, PollReader};
    use crate::terminal;

    /// Write end of the active watcher's self-pipe, or -1.
    static WINCH_FD: AtomicI32 = AtomicI32::new(-1);

    /// Async-signal-safe: one atomic load and one `write`.
    extern "C" fn on_winch(_sig: libc::c_int) {
        let fd = WINCH_FD.load(Ordering::Relaxed);
        if fd >= 0 {
            unsafe {
                let _ = libc::write(fd, b"w".as_ptr().cast(), 1);
            }
        }
    }

    pub(super) struct Watcher {
        poller: Arc<dyn PollReader>,
        handle: Option<JoinHandle<()>>,
        previous: Option<libc::sigaction>,
        // Declared last so it outlives the poller watching it.
        pipe: CancelPipe,
    }

    impl Watcher {
        pub(super) fn start(tty: RawFd, events: Sender<Event>) -> Result<Self> {
            let pipe = CancelPipe::new()?;
            let poller: Arc<dyn PollReader> = Arc::from(poll::new_for(pipe.read_fd())?);
            let mut watcher = Self {
                poller: Arc::clone(&poller),
                handle: None,
                previous: None,
                pipe,
            };

            WINCH_FD.store(watcher.pipe.write_fd(), Ordering::SeqCst);
            let previous = unsafe {
                let mut sa: libc::sigaction = std::mem::zeroed();
                sa.sa_sigaction = on_winch as *const () as usize;
                sa.sa_flags = libc::SA_RESTART;
                libc::sigemptyset(&raw mut sa.sa_mask);
                let mut old: libc::sigaction = std::mem::zeroed();
                if libc::sigaction(libc::SIGWINCH, &raw const sa, &raw mut old) != 0 {
                    return Err(std::io::Error::last_os_error().into());
                }
                old
            };
            watcher.previous = Some(previous);

            watcher.handle = Some(
                thread::Builder::new()
                    .name("input-resize".into())
                    .spawn(move || resize_loop(&*poller, tty, &events))?,
            );
            tracing::debug!(tty, "resize watcher started");
            Ok(watcher)
        }

        /// Restore the previous handler and join the thread.
        pub(super) fn stop(&mut self) {
            if let Some(previous) = self.previous.take() {
                unsafe {
                    libc::sigaction(libc::SIGWINCH, &raw const previous, std::ptr::null_mut());
                }
            }
            let _ = WINCH_FD.compare_exchange(self.pipe.write_fd(), -1, Ordering::SeqCst, Ordering::SeqCst);
            self.poller.cancel();
            if let Some(handle) = self.handle.take() {
                let _ = handle.join();
                tracing::debug!("resize watcher stopped");
            }
            let _ = self.poller.close();
        }
    }

    impl Drop for Watcher {
        fn drop(&mut self) {
            self.stop();
        }
    }

    fn resize_loop(poller: &dyn PollReader, tty: RawFd, events: &Sender<Event>) {
        // Several signals between reads collapse into one event.
        let mut buf = [0u8; 64];
        while let Ok(n) = poller.read(&mut buf) {
            if n == 0 {
                break;
            }
            let Some(size) = terminal::size_of_fd(tty) else {
                continue;
            };
            let ev = Event::WindowSize {
                width: i32::from(size.cols),
                height: i32::from(size.rows),
            };
            if events.send(ev).is_err() {
                break;
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::sync::mpsc;
        use std::time::Duration;

        #[test]
        fn watcher_stops_cleanly() {
            let (tx, _rx) = mpsc::channel();
            let mut w = Watcher::start(libc::STDOUT_FILENO, tx).unwrap();
            w.stop();
            w.stop();
            assert!(w.handle.is_none());
            assert!(w.previous.is_none());
        }

        #[test]
        fn signal_byte_wakes_the_thread() {
            let (tx, rx) = mpsc::channel();
            let w = Watcher::start(libc::STDOUT_FILENO, tx).unwrap();
            assert!(w.pipe.signal());
            // Not a tty under test, so no event, but the thread must keep
            // running and stop promptly.
            assert!(rx.recv_timeout(Duration::from_millis(20)).is_err());
            drop(w);
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poll::fallback::ThreadReader;
    use n_input::KeyCode;
    use pretty_assertions::assert_eq;
    use std::io::{self, Read};

    /// A source fed from the test through a channel. Blocks between chunks
    /// and reports end of input once the sender is dropped.
    struct Feed(Receiver<Vec<u8>>);

    impl Read for Feed {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.recv() {
                Ok(chunk) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    Ok(n)
                }
                Err(_) => Ok(0),
            }
        }
    }

    fn stream(config: &Config) -> (Sender<Vec<u8>>, InputStream, Receiver<Event>) {
        let (feed_tx, feed_rx) = mpsc::channel();
        let (tx, rx) = mpsc::channel();
        let reader = Box::new(ThreadReader::new(Feed(feed_rx)).unwrap());
        let input = InputStream::spawn(reader, config, tx).unwrap();
        (feed_tx, input, rx)
    }

    fn next(rx: &Receiver<Event>) -> Event {
        rx.recv_timeout(Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn read_buf_size_reasonable() {
        assert!(READ_BUF_SIZE >= 1024);
        assert!(READ_BUF_SIZE <= 65536);
    }

    // ── Decoding ────────────────────────────────────────────────────────

    #[test]
    fn plain_keys_arrive_in_order() {
        let (feed, _input, rx) = stream(&Config::default());
        feed.send(b"ab".to_vec()).unwrap();
        assert!(next(&rx).is_press("a"));
        assert!(next(&rx).is_press("b"));
    }

    #[test]
    fn lone_escape_waits_for_timeout() {
        let config = Config {
            esc_timeout: Duration::from_millis(20),
            ..Config::default()
        };
        let (feed, _input, rx) = stream(&config);
        let sent = Instant::now();
        feed.send(b"\x1b".to_vec()).unwrap();
        let ev = next(&rx);
        assert_eq!(ev.key().map(|k| k.code), Some(KeyCode::Escape));
        assert!(sent.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn split_sequence_is_joined() {
        let (feed, _input, rx) = stream(&Config::default());
        feed.send(b"\x1b[".to_vec()).unwrap();
        feed.send(b"A".to_vec()).unwrap();
        assert_eq!(next(&rx).key().map(|k| k.code), Some(KeyCode::Up));
    }

    #[test]
    fn end_of_input_flushes_pending_escape() {
        let config = Config {
            esc_timeout: Duration::from_secs(60),
            ..Config::default()
        };
        let (feed, _input, rx) = stream(&config);
        feed.send(b"\x1b".to_vec()).unwrap();
        drop(feed);
        assert_eq!(next(&rx).key().map(|k| k.code), Some(KeyCode::Escape));
    }

    // ── Shutdown ────────────────────────────────────────────────────────

    #[test]
    fn stop_closes_the_channel() {
        let (_feed, mut input, rx) = stream(&Config::default());
        assert!(!input.is_stopped());
        input.stop();
        assert!(input.is_stopped());
        assert!(rx.recv_timeout(Duration::from_secs(2)).is_err());
    }

    #[test]
    fn stop_is_idempotent() {
        let (_feed, mut input, _rx) = stream(&Config::default());
        input.stop();
        input.stop();
    }

    #[test]
    fn drop_stops_stream() {
        let (_feed, input, _rx) = stream(&Config::default());
        drop(input); // Must not hang.
    }

    #[cfg(unix)]
    #[test]
    fn resize_after_stop_is_refused() {
        let (_feed, mut input, _rx) = stream(&Config::default());
        input.stop();
        assert!(matches!(input.watch_resize(libc::STDOUT_FILENO), Err(Error::Closed)));
    }
}
