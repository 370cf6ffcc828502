// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// The tty itself: raw mode, window size, and what happens on a panic.
//
// `Terminal` only touches the line discipline (termios on unix, console
// modes on Windows). Control sequences such as the alternate screen or
// mouse tracking are a `TerminalScreen` concern, so that `reset` can undo
// them in a known order.
//
// A panic while raw would leave the shell with no echo and no line
// editing. The panic hook installed by `enter` writes one pre-built
// restore sequence straight to fd 1, puts the saved line discipline back,
// and only then hands over to the previous hook.

#[cfg(not(unix))]
use std::io::Write;
use std::io;
use std::sync::{Mutex, Once};

// ─── Size ───────────────────────────────────────────────────────────────────

/// Window size in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub cols: u16,
    pub rows: u16,
}

impl Size {
    /// Cell count.
    #[inline]
    #[must_use]
    pub const fn area(self) -> u32 {
        self.cols as u32 * self.rows as u32
    }
}

// ─── Queries ───────────────────────────────────────────────────────────────

/// Query the size of the terminal behind `fd` via `ioctl(TIOCGWINSZ)`.
///
/// Returns `None` if `fd` is not a terminal or the query fails.
#[cfg(unix)]
#[must_use]
pub fn size_of_fd(fd: std::os::fd::RawFd) -> Option<Size> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &raw mut ws) };

    if result == 0 && ws.ws_col > 0 && ws.ws_row > 0 {
        Some(Size {
            cols: ws.ws_col,
            rows: ws.ws_row,
        })
    } else {
        None
    }
}

/// Query the current terminal size from stdout.
#[cfg(unix)]
#[must_use]
pub fn get_size() -> Option<Size> {
    size_of_fd(libc::STDOUT_FILENO)
}

/// Query the visible console window size.
#[cfg(windows)]
#[must_use]
pub fn get_size() -> Option<Size> {
    use ::windows::Win32::System::Console::{
        CONSOLE_SCREEN_BUFFER_INFO, GetConsoleScreenBufferInfo, GetStdHandle, STD_OUTPUT_HANDLE,
    };

    let mut info = CONSOLE_SCREEN_BUFFER_INFO::default();
    unsafe {
        let handle = GetStdHandle(STD_OUTPUT_HANDLE).ok()?;
        GetConsoleScreenBufferInfo(handle, &mut info).ok()?;
    }
    let w = info.srWindow;
    let cols = u16::try_from(i32::from(w.Right) - i32::from(w.Left) + 1).ok()?;
    let rows = u16::try_from(i32::from(w.Bottom) - i32::from(w.Top) + 1).ok()?;
    (cols > 0 && rows > 0).then_some(Size { cols, rows })
}

#[cfg(not(any(unix, windows)))]
#[must_use]
pub fn get_size() -> Option<Size> {
    None
}

/// Whether stdin is a terminal.
#[cfg(unix)]
#[must_use]
pub fn is_tty() -> bool {
    unsafe { libc::isatty(libc::STDIN_FILENO) != 0 }
}

/// Whether stdout is a terminal.
#[cfg(unix)]
#[must_use]
pub fn is_output_tty() -> bool {
    unsafe { libc::isatty(libc::STDOUT_FILENO) != 0 }
}

#[cfg(not(unix))]
#[must_use]
pub fn is_tty() -> bool {
    use std::io::IsTerminal;
    io::stdin().is_terminal()
}

#[cfg(not(unix))]
#[must_use]
pub fn is_output_tty() -> bool {
    use std::io::IsTerminal;
    io::stdout().is_terminal()
}

/// Which cursor-movement shortcuts the tty passes through untouched, as
/// `(hard_tabs, backspace)`.
///
/// A hard tab only moves the cursor when the line discipline isn't
/// expanding tabs to spaces (`TABDLY == TAB0`), and backspace likewise
/// needs `BSDLY == BS0`. Feed the result to
/// [`TerminalScreen::optimize_movements`](crate::screen::TerminalScreen::optimize_movements).
#[cfg(any(target_os = "linux", target_os = "android"))]
#[must_use]
pub fn movement_optimizations() -> (bool, bool) {
    let Ok(termios) = termios::get(libc::STDOUT_FILENO) else {
        return (false, false);
    };
    let hard_tabs = termios.c_oflag & libc::TABDLY == libc::TAB0;
    let backspace = termios.c_oflag & libc::BSDLY == libc::BS0;
    (hard_tabs, backspace)
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
#[must_use]
pub const fn movement_optimizations() -> (bool, bool) {
    (false, false)
}

// ─── Panic restore ──────────────────────────────────────────────────────────

/// Line discipline to put back if we panic while raw. `Terminal` keeps its
/// own copy; the hook only sees this one.
#[cfg(unix)]
static SAVED_TERMIOS: Mutex<Option<libc::termios>> = Mutex::new(None);

/// Console modes to put back if we panic while raw, as `(input, output)`.
#[cfg(windows)]
static SAVED_CONSOLE: Mutex<Option<(u32, u32)>> = Mutex::new(None);

/// Undo everything a session may have switched on, in the order
/// `TerminalScreen::reset` uses, ending with the alternate screen so the
/// shell's own contents come back last.
#[rustfmt::skip]
const EMERGENCY_RESTORE: &[u8] = b"\
    \x1b[?2026l\
    \x1b[=0;1u\
    \x1b[?1006l\x1b[?1003l\x1b[?1002l\x1b[?1000l\
    \x1b[?2004l\
    \x1b[?1004l\
    \x1b[m\
    \x1b[0 q\
    \x1b[?25h\
    \x1b]9;4;0\x07\
    \x1b[?1049l";

static HOOK: Once = Once::new();

/// Chain a hook in front of the current one that writes
/// [`EMERGENCY_RESTORE`] and puts the saved line discipline back, so the
/// panic message lands on a usable terminal.
fn install_panic_hook() {
    HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            write_restore_sequence();
            restore_saved_mode();
            previous(info);
        }));
    });
}

/// One unbuffered write. The panic may have happened with the stdout lock
/// held, so unix goes around it.
fn write_restore_sequence() {
    #[cfg(unix)]
    unsafe {
        let _ = libc::write(libc::STDOUT_FILENO, EMERGENCY_RESTORE.as_ptr().cast(), EMERGENCY_RESTORE.len());
    }

    #[cfg(not(unix))]
    {
        let mut out = io::stdout();
        let _ = out.write_all(EMERGENCY_RESTORE);
        let _ = out.flush();
    }
}

fn restore_saved_mode() {
    #[cfg(unix)]
    if let Some(saved) = SAVED_TERMIOS.lock().ok().and_then(|g| *g) {
        let _ = termios::set(libc::STDIN_FILENO, &saved, libc::TCSANOW);
    }

    #[cfg(windows)]
    if let Some((in_mode, out_mode)) = SAVED_CONSOLE.lock().ok().and_then(|g| *g) {
        let _ = console::set_modes(in_mode, out_mode);
    }
}

#[cfg(any(unix, windows))]
fn remember<T>(slot: &Mutex<Option<T>>, value: Option<T>) {
    if let Ok(mut guard) = slot.lock() {
        *guard = value;
    }
}

// ─── termios ────────────────────────────────────────────────────────────────

#[cfg(unix)]
mod termios {
    use std::io;
    use std::os::fd::RawFd;

    pub(super) fn get(fd: RawFd) -> io::Result<libc::termios> {
        let mut t: libc::termios = unsafe { std::mem::zeroed() };
        if unsafe { libc::tcgetattr(fd, &raw mut t) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(t)
    }

    pub(super) fn set(fd: RawFd, t: &libc::termios, when: libc::c_int) -> io::Result<()> {
        if unsafe { libc::tcsetattr(fd, when, t) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// What `cfmakeraw` does: bytes pass through unprocessed, 8 bits wide,
    /// and a read returns as soon as one byte is there.
    pub(super) fn make_raw(t: &mut libc::termios) {
        t.c_iflag &= !(libc::IGNBRK
            | libc::BRKINT
            | libc::PARMRK
            | libc::ISTRIP
            | libc::INLCR
            | libc::IGNCR
            | libc::ICRNL
            | libc::IXON);
        t.c_oflag &= !libc::OPOST;
        t.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
        t.c_cflag = (t.c_cflag & !(libc::CSIZE | libc::PARENB)) | libc::CS8;
        t.c_cc[libc::VMIN] = 1;
        t.c_cc[libc::VTIME] = 0;
    }
}

// ─── Windows console modes ──────────────────────────────────────────────────

#[cfg(windows)]
mod console {
    use std::io;

    use ::windows::Win32::Foundation::HANDLE;
    use ::windows::Win32::System::Console::{
        CONSOLE_MODE, DISABLE_NEWLINE_AUTO_RETURN, ENABLE_ECHO_INPUT, ENABLE_EXTENDED_FLAGS,
        ENABLE_LINE_INPUT, ENABLE_PROCESSED_INPUT, ENABLE_QUICK_EDIT_MODE,
        ENABLE_VIRTUAL_TERMINAL_INPUT, ENABLE_VIRTUAL_TERMINAL_PROCESSING, ENABLE_WINDOW_INPUT,
        GetConsoleMode, GetStdHandle, STD_INPUT_HANDLE, STD_OUTPUT_HANDLE, SetConsoleMode,
    };

    fn to_io(e: &::windows::core::Error) -> io::Error {
        io::Error::from_raw_os_error(e.code().0)
    }

    fn handles() -> io::Result<(HANDLE, HANDLE)> {
        unsafe {
            let input = GetStdHandle(STD_INPUT_HANDLE).map_err(|e| to_io(&e))?;
            let output = GetStdHandle(STD_OUTPUT_HANDLE).map_err(|e| to_io(&e))?;
            Ok((input, output))
        }
    }

    /// Current `(input, output)` modes, or `None` when not a console.
    pub(super) fn modes() -> Option<(u32, u32)> {
        let (input, output) = handles().ok()?;
        let mut in_mode = CONSOLE_MODE(0);
        let mut out_mode = CONSOLE_MODE(0);
        unsafe {
            GetConsoleMode(input, &mut in_mode).ok()?;
            GetConsoleMode(output, &mut out_mode).ok()?;
        }
        Some((in_mode.0, out_mode.0))
    }

    pub(super) fn set_modes(in_mode: u32, out_mode: u32) -> io::Result<()> {
        let (input, output) = handles()?;
        unsafe {
            SetConsoleMode(input, CONSOLE_MODE(in_mode)).map_err(|e| to_io(&e))?;
            SetConsoleMode(output, CONSOLE_MODE(out_mode)).map_err(|e| to_io(&e))?;
        }
        Ok(())
    }

    /// Raw VT input: no echo, no line editing, no Ctrl+C processing, no
    /// quick-edit selection; VT output without the implicit CR on LF.
    pub(super) fn raw(in_mode: u32, out_mode: u32) -> (u32, u32) {
        let in_raw = (in_mode
            & !(ENABLE_ECHO_INPUT.0 | ENABLE_LINE_INPUT.0 | ENABLE_PROCESSED_INPUT.0 | ENABLE_QUICK_EDIT_MODE.0))
            | ENABLE_EXTENDED_FLAGS.0
            | ENABLE_WINDOW_INPUT.0
            | ENABLE_VIRTUAL_TERMINAL_INPUT.0;
        let out_raw = out_mode | ENABLE_VIRTUAL_TERMINAL_PROCESSING.0 | DISABLE_NEWLINE_AUTO_RETURN.0;
        (in_raw, out_raw)
    }
}

// ─── Terminal ───────────────────────────────────────────────────────────────

/// Raw-mode guard for the controlling tty.
///
/// [`enter`](Self::enter) saves the current mode and goes raw; dropping
/// the guard (or [`leave`](Self::leave)) puts the saved mode back.
///
/// ```no_run
/// use n_term::terminal::Terminal;
///
/// let mut tty = Terminal::new()?;
/// tty.enter()?;
/// // read keys, draw frames
/// tty.leave()?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct Terminal {
    #[cfg(unix)]
    original_termios: Option<libc::termios>,

    /// Saved `(input, output)` console modes.
    #[cfg(windows)]
    original_console: Option<(u32, u32)>,

    /// Last known size; see [`refresh_size`](Self::refresh_size).
    size: Size,
    active: bool,
}

impl Terminal {
    /// A guard that hasn't gone raw yet. The size defaults to 80x24 when
    /// stdout isn't a terminal.
    ///
    /// # Errors
    ///
    /// None today; kept fallible for platforms that must open the tty.
    pub fn new() -> io::Result<Self> {
        let size = get_size().unwrap_or(Size { cols: 80, rows: 24 });

        Ok(Self {
            #[cfg(unix)]
            original_termios: None,
            #[cfg(windows)]
            original_console: None,
            size,
            active: false,
        })
    }

    #[inline]
    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    /// Ask the OS again. Keeps the old size if the query fails.
    pub fn refresh_size(&mut self) -> Size {
        if let Some(s) = get_size() {
            self.size = s;
        }
        self.size
    }

    /// Whether the tty is raw.
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Go raw and install the panic hook. Does nothing to the line
    /// discipline when stdin isn't a terminal, and nothing at all when
    /// already raw.
    ///
    /// # Errors
    ///
    /// Returns an error if the line discipline can't be changed.
    pub fn enter(&mut self) -> io::Result<()> {
        if self.active {
            return Ok(());
        }

        install_panic_hook();
        self.enable_raw_mode()?;
        tracing::debug!(cols = self.size.cols, rows = self.size.rows, "terminal entered raw mode");

        self.active = true;
        Ok(())
    }

    /// Put the saved mode back. Does nothing when not raw.
    ///
    /// # Errors
    ///
    /// Returns an error if the original mode can't be restored.
    pub fn leave(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }

        self.disable_raw_mode()?;
        tracing::debug!("terminal left raw mode");
        self.active = false;
        Ok(())
    }

    // ── Raw mode (termios) ──────────────────────────────────────────

    #[cfg(unix)]
    fn enable_raw_mode(&mut self) -> io::Result<()> {
        if !is_tty() {
            return Ok(());
        }
        let saved = termios::get(libc::STDIN_FILENO)?;
        let mut raw = saved;
        termios::make_raw(&mut raw);
        termios::set(libc::STDIN_FILENO, &raw, libc::TCSAFLUSH)?;

        self.original_termios = Some(saved);
        remember(&SAVED_TERMIOS, Some(saved));
        Ok(())
    }

    #[cfg(unix)]
    fn disable_raw_mode(&mut self) -> io::Result<()> {
        let Some(saved) = self.original_termios else {
            return Ok(());
        };
        termios::set(libc::STDIN_FILENO, &saved, libc::TCSAFLUSH)?;
        self.original_termios = None;
        remember(&SAVED_TERMIOS, None);
        Ok(())
    }

    // ── Raw Mode (console) ──────────────────────────────────────────

    #[cfg(windows)]
    fn enable_raw_mode(&mut self) -> io::Result<()> {
        let Some((in_mode, out_mode)) = console::modes() else {
            return Ok(());
        };
        let (in_raw, out_raw) = console::raw(in_mode, out_mode);
        console::set_modes(in_raw, out_raw)?;
        self.original_console = Some((in_mode, out_mode));
        remember(&SAVED_CONSOLE, Some((in_mode, out_mode)));
        Ok(())
    }

    #[cfg(windows)]
    fn disable_raw_mode(&mut self) -> io::Result<()> {
        if let Some((in_mode, out_mode)) = self.original_console.take() {
            console::set_modes(in_mode, out_mode)?;
            remember(&SAVED_CONSOLE, None);
        }
        Ok(())
    }

    #[cfg(not(any(unix, windows)))]
    fn enable_raw_mode(&mut self) -> io::Result<()> {
        Ok(())
    }

    #[cfg(not(any(unix, windows)))]
    fn disable_raw_mode(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        if self.active {
            let _ = self.leave();
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
