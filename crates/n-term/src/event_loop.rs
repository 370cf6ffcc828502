// SPDX-License-Identifier: MIT
//
// Event loop — the heartbeat of the terminal application.
//
// This is the module that wires everything together: the input stream
// decodes stdin on its own threads and sends finished events over a
// channel, the application handles them, paints into the screen's window,
// and the renderer writes only what changed. One loop. One heartbeat.
//
// # The Hybrid Model
//
// The loop blocks on the event channel with the configured tick interval
// (8.3ms, 120 Hz, by default). That gives three behaviors in one:
//
//   1. **Instant response**: decoded events arrive on the channel as soon
//      as the scanner produces them. No polling latency.
//
//   2. **Zero CPU idle**: when nothing happens, `recv_timeout` parks the
//      thread and the OS schedules us out.
//
//   3. **Tick-driven animation**: the timeout fires every interval, giving
//      `on_tick` a steady rate. A frame is only rendered when something
//      changed (the dirty flag), so idle screens cost nothing.
//
// # Resize
//
// On unix the input stream watches SIGWINCH and sends `Event::WindowSize`
// down the same channel as keys, so a resize is just another event. Other
// platforms have no signal; the loop re-queries the size once per tick.
//
// # Escape Timeout
//
// The ESC ambiguity is resolved inside the input stream, which flushes a
// lone ESC after `Config::esc_timeout`. The loop never sees partial input.

use std::io::{self, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};

use n_input::Event;

use crate::ansi::CursorShape;
use crate::buffer::{Rect, Screen};
use crate::config::{Config, Environ};
use crate::error::Result;
use crate::poll;
use crate::reader::InputStream;
use crate::screen::TerminalScreen;
use crate::terminal::{self, Size, Terminal};

// ─── App Trait ───────────────────────────────────────────────────────────────

/// What the application tells the event loop to do after handling an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Continue running.
    Continue,
    /// Exit the event loop cleanly.
    Quit,
}

/// Application interface for the event loop.
///
/// The event loop calls these methods in this order each iteration:
///
/// 1. [`on_event`](App::on_event) — for each decoded input event
/// 2. [`on_resize`](App::on_resize) — when the terminal size changes
/// 3. [`on_tick`](App::on_tick) — every iteration (for animations)
/// 4. [`paint`](App::paint) — when the frame is dirty
/// 5. [`cursor`](App::cursor) — after paint, to place the hardware cursor
///
/// Only [`paint`](App::paint) is required.
pub trait App {
    /// Handle a decoded input event.
    ///
    /// Return [`Action::Quit`] to exit the event loop.
    fn on_event(&mut self, _event: &Event) -> Action {
        Action::Continue
    }

    /// Handle a terminal resize. The screen has already been resized.
    fn on_resize(&mut self, _size: Size) {}

    /// Called every loop iteration, even when no input arrived. Return
    /// `true` if state changed and a repaint is needed.
    fn on_tick(&mut self) -> bool {
        false
    }

    /// Paint the current state into `scr`, which covers `area`.
    ///
    /// The window has been cleared before this call — paint everything
    /// you want visible.
    fn paint(&mut self, scr: &mut dyn Screen, area: Rect);

    /// Where to show the hardware cursor after painting, or `None` to
    /// keep it hidden.
    fn cursor(&self) -> Option<(u16, u16, CursorShape)> {
        None
    }
}

// ─── EventLoop ───────────────────────────────────────────────────────────────

/// The terminal event loop.
///
/// Owns the tty, the screen session, and the configuration. Call
/// [`run`](Self::run) to enter the loop; it returns when the application
/// signals [`Action::Quit`] or input ends.
///
/// # Example
///
/// ```no_run
/// use n_input::Event;
/// use n_term::buffer::{Rect, Screen};
/// use n_term::cell::Style;
/// use n_term::event_loop::{Action, App, EventLoop};
///
/// struct Hello;
///
/// impl App for Hello {
///     fn on_event(&mut self, event: &Event) -> Action {
///         if event.is_press("q") { Action::Quit } else { Action::Continue }
///     }
///
///     fn paint(&mut self, scr: &mut dyn Screen, area: Rect) {
///         scr.set_string(area.x, area.y, "hello", Style::DEFAULT);
///     }
/// }
///
/// let mut event_loop = EventLoop::new()?;
/// event_loop.run(&mut Hello)?;
/// # Ok::<(), n_term::error::Error>(())
/// ```
pub struct EventLoop {
    terminal: Terminal,
    screen: TerminalScreen<io::Stdout>,
    config: Config,
}

impl EventLoop {
    /// An event loop configured from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be initialized.
    pub fn new() -> Result<Self> {
        Self::with_config(Config::from_env(&Environ::from_process(), terminal::is_output_tty()))
    }

    /// An event loop with explicit settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be initialized.
    pub fn with_config(config: Config) -> Result<Self> {
        Ok(Self {
            terminal: Terminal::new()?,
            screen: TerminalScreen::new(io::stdout(), &config),
            config,
        })
    }

    /// The current terminal size.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> Size {
        self.terminal.size()
    }

    #[inline]
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The screen session, for modes the loop doesn't manage (title,
    /// progress bar, colors).
    #[inline]
    pub fn screen_mut(&mut self) -> &mut TerminalScreen<io::Stdout> {
        &mut self.screen
    }

    /// Run the event loop until the application returns [`Action::Quit`].
    ///
    /// This method:
    /// 1. Enters raw mode
    /// 2. Sizes the screen and applies the configured modes
    /// 3. Starts the input stream (and the resize watcher on unix)
    /// 4. Runs the loop
    /// 5. Undoes every mode and restores the tty on exit (even on error)
    ///
    /// # Errors
    ///
    /// Returns an error if raw mode, the input stream, or output fails.
    pub fn run(&mut self, app: &mut impl App) -> Result<()> {
        self.terminal.enter()?;

        let size = self.terminal.refresh_size();
        self.screen.resize(size.cols, size.rows);
        let (hard_tabs, backspace) = terminal::movement_optimizations();
        self.screen.optimize_movements(hard_tabs, backspace);
        self.screen.apply_config(&self.config);

        let (tx, rx) = mpsc::channel();
        let result = self.start_input(tx).and_then(|mut input| {
            let res = self.run_inner(app, &rx);
            input.stop();
            res
        });

        // Always clean up, even if the loop errored.
        self.screen.reset();
        let flushed = self.screen.flush();
        self.terminal.leave()?;

        result?;
        flushed?;
        Ok(())
    }

    fn start_input(&self, events: Sender<Event>) -> Result<InputStream> {
        #[cfg_attr(not(unix), allow(unused_mut))]
        let mut input = InputStream::spawn(poll::stdin()?, &self.config, events)?;
        #[cfg(unix)]
        if let Err(err) = input.watch_resize(libc::STDOUT_FILENO) {
            tracing::warn!(%err, "resize watcher unavailable");
        }
        Ok(input)
    }

    /// The inner loop, separated so cleanup runs regardless of outcome.
    fn run_inner(&mut self, app: &mut impl App, rx: &Receiver<Event>) -> Result<()> {
        let mut dirty = true; // First frame always renders.

        loop {
            // ── Receive events ───────────────────────────────────
            match rx.recv_timeout(self.config.tick_interval) {
                Ok(first) => {
                    // Take the whole burst so a paste renders once.
                    for event in std::iter::once(first).chain(rx.try_iter()) {
                        if let Event::WindowSize { width, height } = event {
                            self.resize(app, Size {
                                cols: clamp_dim(width),
                                rows: clamp_dim(height),
                            });
                        }
                        if app.on_event(&event) == Action::Quit {
                            return Ok(());
                        }
                    }
                    dirty = true;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::debug!("input stream ended");
                    return Ok(());
                }
            }

            // ── Resize without SIGWINCH ──────────────────────────
            #[cfg(not(unix))]
            {
                let before = self.terminal.size();
                let after = self.terminal.refresh_size();
                if after != before {
                    self.resize(app, after);
                    dirty = true;
                }
            }

            // ── Tick ─────────────────────────────────────────────
            if app.on_tick() {
                dirty = true;
            }

            // ── Render if dirty ──────────────────────────────────
            if dirty {
                draw_frame(&mut self.screen, app)?;
                dirty = false;
            }
        }
    }

    fn resize(&mut self, app: &mut impl App, size: Size) {
        if size.cols == self.screen.width() && size.rows == self.screen.height() {
            return;
        }
        self.screen.resize(size.cols, size.rows);
        let (hard_tabs, backspace) = terminal::movement_optimizations();
        self.screen.optimize_movements(hard_tabs, backspace);
        app.on_resize(size);
    }
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("size", &self.terminal.size())
            .field("active", &self.terminal.is_active())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Paint one frame of `app` into `screen` and write it out.
///
/// Cursor sequences are only queued when the cursor actually changes.
fn draw_frame<W: Write>(screen: &mut TerminalScreen<W>, app: &mut impl App) -> io::Result<()> {
    let win = screen.window_mut();
    win.clear();
    let area = win.bounds();
    app.paint(win, area);

    match app.cursor() {
        Some((x, y, shape)) => {
            screen.set_cursor_position(i32::from(x), i32::from(y));
            if screen.cursor_style() != (shape, false) {
                screen.set_cursor_style(shape, false);
            }
            if !screen.cursor_visible() {
                screen.show_cursor();
            }
        }
        None if screen.cursor_visible() => screen.hide_cursor(),
        None => {}
    }

    screen.render();
    screen.flush()
}

/// A reported dimension as a cell count. Negative reports become 0.
fn clamp_dim(v: i32) -> u16 {
    u16::try_from(v.max(0)).unwrap_or(u16::MAX)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Style;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn screen(w: u16, h: u16) -> TerminalScreen<Vec<u8>> {
        let cfg = Config {
            term: "xterm-256color".to_string(),
            ..Config::default()
        };
        let mut s = TerminalScreen::new(Vec::new(), &cfg);
        s.resize(w, h);
        s
    }

    fn output(s: &mut TerminalScreen<Vec<u8>>) -> String {
        String::from_utf8(std::mem::take(s.writer_mut())).unwrap()
    }

    // ── Action ──────────────────────────────────────────────────

    #[test]
    fn quit_is_not_continue() {
        assert_ne!(Action::Continue, Action::Quit);
        assert_eq!(format!("{:?}", Action::Quit), "Quit");
    }

    // ── EventLoop construction ─────────────────────────────────

    #[test]
    fn new_reads_a_size() {
        let event_loop = EventLoop::new().unwrap();
        assert!(event_loop.size().area() > 0);
    }

    #[test]
    fn with_config_keeps_settings() {
        let config = Config {
            tick_interval: Duration::from_micros(16667), // 60 Hz
            ..Config::default()
        };
        let event_loop = EventLoop::with_config(config).unwrap();
        assert_eq!(event_loop.config().tick_interval, Duration::from_micros(16667));
    }

    // ── App trait defaults ─────────────────────────────────────

    struct MinimalApp;
    impl App for MinimalApp {
        fn paint(&mut self, _scr: &mut dyn Screen, _area: Rect) {}
    }

    #[test]
    fn app_default_on_event_continues() {
        let mut app = MinimalApp;
        assert_eq!(app.on_event(&Event::Focus), Action::Continue);
    }

    #[test]
    fn app_default_on_tick_not_dirty() {
        let mut app = MinimalApp;
        assert!(!app.on_tick());
    }

    #[test]
    fn app_default_on_resize_is_noop() {
        let mut app = MinimalApp;
        app.on_resize(Size { cols: 100, rows: 50 }); // Must not panic.
    }

    #[test]
    fn app_default_cursor_is_none() {
        let app = MinimalApp;
        assert!(app.cursor().is_none());
    }

    // ── Frames ─────────────────────────────────────────────────

    struct Label {
        text: &'static str,
        cursor: Option<(u16, u16, CursorShape)>,
        seen: Option<Rect>,
    }

    impl App for Label {
        fn paint(&mut self, scr: &mut dyn Screen, area: Rect) {
            self.seen = Some(area);
            scr.set_string(area.x, area.y, self.text, Style::DEFAULT);
        }

        fn cursor(&self) -> Option<(u16, u16, CursorShape)> {
            self.cursor
        }
    }

    #[test]
    fn paint_receives_whole_window() {
        let mut s = screen(6, 2);
        let mut app = Label { text: "hi", cursor: None, seen: None };
        draw_frame(&mut s, &mut app).unwrap();
        assert_eq!(app.seen, Some(Rect { x: 0, y: 0, width: 6, height: 2 }));
        assert!(output(&mut s).contains("hi"));
    }

    #[test]
    fn unchanged_frame_writes_nothing() {
        let mut s = screen(6, 1);
        let mut app = Label { text: "hi", cursor: None, seen: None };
        draw_frame(&mut s, &mut app).unwrap();
        output(&mut s);
        draw_frame(&mut s, &mut app).unwrap();
        assert_eq!(output(&mut s), "");
    }

    #[test]
    fn cursor_is_shown_once() {
        let mut s = screen(6, 1);
        let mut app = Label {
            text: "hi",
            cursor: Some((1, 0, CursorShape::Bar)),
            seen: None,
        };
        draw_frame(&mut s, &mut app).unwrap();
        let first = output(&mut s);
        assert!(first.contains("\x1b[?25h"));
        assert!(s.cursor_visible());
        assert_eq!(s.cursor_position(), (1, 0));
        assert_eq!(s.cursor_style(), (CursorShape::Bar, false));

        draw_frame(&mut s, &mut app).unwrap();
        assert!(!output(&mut s).contains("\x1b[?25h"));
    }

    #[test]
    fn cursor_hides_when_app_drops_it() {
        let mut s = screen(6, 1);
        let mut app = Label {
            text: "hi",
            cursor: Some((0, 0, CursorShape::Block)),
            seen: None,
        };
        draw_frame(&mut s, &mut app).unwrap();
        output(&mut s);
        app.cursor = None;
        draw_frame(&mut s, &mut app).unwrap();
        assert!(output(&mut s).contains("\x1b[?25l"));
        assert!(!s.cursor_visible());
    }

    #[test]
    fn clamp_dim_bounds() {
        assert_eq!(clamp_dim(-3), 0);
        assert_eq!(clamp_dim(80), 80);
        assert_eq!(clamp_dim(1 << 20), u16::MAX);
    }
}
