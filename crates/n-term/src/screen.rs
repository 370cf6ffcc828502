// SPDX-License-Identifier: MIT
//
// Terminal screen — one session's worth of terminal state.
//
// `TerminalScreen` ties the pieces together: a `Window` the application
// draws into, a `RenderBuffer` that remembers which lines changed, and a
// `TerminalRenderer` that turns changes into bytes. Around that it tracks
// every terminal mode the session touches (alt screen, cursor, mouse,
// keyboard protocol, bracketed paste, title, colors, progress bar) so that
// `reset` can undo all of it before the program suspends or exits, and
// `restore` can put it back afterwards.
//
// All output is queued. Mode setters and `render` only append to the
// renderer's queue; `flush` places the cursor and writes the whole queue
// to the sink in one call. The one exception is `insert_above`, which
// writes through immediately because it moves the managed area itself.

use std::io::{self, Write};

use crate::ansi::{self, CursorShape, KeyboardEnhancements, MouseMode};
use crate::buffer::{Drawable, Rect, Screen};
use crate::cell::Cell;
use crate::color::{Color, ColorProfile};
use crate::config::Config;
use crate::render_buffer::RenderBuffer;
use crate::renderer::TerminalRenderer;
use crate::window::Window;

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// The cursor as the session last set it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    /// Column, or -1 when never placed.
    pub x: i32,
    /// Row, or -1 when never placed.
    pub y: i32,
    pub shape: CursorShape,
    pub blink: bool,
    /// `None` is the terminal's default cursor color.
    pub color: Option<Color>,
    pub hidden: bool,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            x: -1,
            y: -1,
            shape: CursorShape::Block,
            blink: true,
            color: None,
            hidden: false,
        }
    }
}

impl Cursor {
    /// Whether the style differs from the terminal default (blinking block).
    #[inline]
    #[must_use]
    pub fn is_styled(&self) -> bool {
        self.shape != CursorShape::Block || !self.blink
    }
}

// ─── Progress Bar ────────────────────────────────────────────────────────────

/// Taskbar/tab progress state (OSC 9;4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum ProgressState {
    /// Hide the progress bar.
    #[default]
    None,
    Default,
    Error,
    Indeterminate,
    Warning,
}

/// A progress indicator value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct ProgressBar {
    pub state: ProgressState,
    /// Percentage, always within `0..=100`.
    value: u8,
}

impl ProgressBar {
    /// A progress bar with `value` clamped to 100.
    #[must_use]
    pub fn new(state: ProgressState, value: u8) -> Self {
        Self {
            state,
            value: value.min(100),
        }
    }

    #[inline]
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.value
    }

    /// The OSC sequence that shows this progress.
    #[must_use]
    pub fn sequence(&self) -> String {
        match self.state {
            ProgressState::None => ansi::RESET_PROGRESS_BAR.to_string(),
            ProgressState::Default => ansi::set_progress_bar(1, self.value),
            ProgressState::Error => ansi::set_progress_bar(2, self.value),
            ProgressState::Indeterminate => ansi::INDETERMINATE_PROGRESS_BAR.to_string(),
            ProgressState::Warning => ansi::set_progress_bar(4, self.value),
        }
    }
}

// ─── TerminalScreen ──────────────────────────────────────────────────────────

/// A terminal session writing to `W`.
pub struct TerminalScreen<W: Write> {
    out: W,
    win: Window,
    rbuf: RenderBuffer,
    rend: TerminalRenderer,

    alt_screen: bool,
    keyboard: Option<KeyboardEnhancements>,
    bracketed_paste: bool,
    mouse_mode: MouseMode,
    /// `None` until the session first touches the cursor. The cursor is
    /// then assumed visible.
    cursor: Option<Cursor>,
    background: Option<Color>,
    foreground: Option<Color>,
    progress: Option<ProgressBar>,
    title: String,
}

impl<W: Write> TerminalScreen<W> {
    /// A session in inline mode. Call [`resize`](Self::resize) with the
    /// terminal size before the first render.
    pub fn new(out: W, config: &Config) -> Self {
        let mut rend = TerminalRenderer::from_config(config);
        rend.set_fullscreen(false);
        rend.set_relative_cursor(true);
        rend.set_map_newline(false);
        // Windows consoles scroll regions poorly.
        rend.set_scroll_optim(cfg!(not(windows)));

        Self {
            out,
            win: Window::new(0, 0),
            rbuf: RenderBuffer::new(0, 0),
            rend,
            alt_screen: false,
            keyboard: None,
            bracketed_paste: false,
            mouse_mode: MouseMode::None,
            cursor: None,
            background: None,
            foreground: None,
            progress: None,
            title: String::new(),
        }
    }

    /// Tell the renderer which movement shortcuts the tty allows. Hard
    /// tabs need `TAB0` output processing; backspace needs `BS0`.
    pub fn optimize_movements(&mut self, hard_tabs: bool, backspace: bool) {
        self.rend
            .set_tab_stops(hard_tabs.then_some(self.win.area().width));
        self.rend.set_backspace(backspace);
    }

    // ── Accessors ───────────────────────────────────────────────────────

    #[inline]
    pub const fn writer(&self) -> &W {
        &self.out
    }

    #[inline]
    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.out
    }

    /// The window the application draws into.
    #[inline]
    pub const fn window(&self) -> &Window {
        &self.win
    }

    #[inline]
    pub fn window_mut(&mut self) -> &mut Window {
        &mut self.win
    }

    #[inline]
    pub const fn renderer(&self) -> &TerminalRenderer {
        &self.rend
    }

    #[inline]
    pub fn renderer_mut(&mut self) -> &mut TerminalRenderer {
        &mut self.rend
    }

    #[inline]
    pub const fn width(&self) -> u16 {
        self.win.area().width
    }

    #[inline]
    pub const fn height(&self) -> u16 {
        self.win.area().height
    }

    /// Override the detected color profile.
    pub const fn set_color_profile(&mut self, profile: ColorProfile) {
        self.rend.set_color_profile(profile);
    }

    // ── Frames ──────────────────────────────────────────────────────────

    /// Resize everything to the new terminal size. The next render
    /// repaints the whole frame.
    pub fn resize(&mut self, width: u16, height: u16) {
        tracing::debug!(width, height, "screen resize");
        self.win.resize(width, height);
        self.rbuf.resize(width, height);
        self.rend.resize(width, height);
        self.rend.erase();
    }

    /// Clear the window, draw `d` over all of it, render, and flush.
    pub fn display(&mut self, d: &impl Drawable) -> io::Result<()> {
        self.win.clear();
        let area = self.win.bounds();
        d.draw(&mut self.win, area);
        self.render();
        self.flush()
    }

    /// Queue the changes between the last rendered frame and the window.
    pub fn render(&mut self) {
        let buf = self.win.buffer();
        for y in 0..buf.height() {
            let mut x = 0;
            while x < buf.width() {
                match buf.cell_at(x, y) {
                    Some(c) if !c.is_zero() => {
                        self.rbuf.set_cell(x, y, Some(c));
                        x += u16::from(c.width.max(1));
                    }
                    _ => x += 1,
                }
            }
        }
        self.rend.render(&mut self.rbuf);
    }

    /// Place the cursor and write everything queued.
    ///
    /// Without a visible, placed cursor the inline cursor is kept off the
    /// last column so the terminal doesn't wrap on the next output.
    pub fn flush(&mut self) -> io::Result<()> {
        match self.cursor {
            Some(c) if !c.hidden && c.x >= 0 && c.y >= 0 => self.rend.move_to(c.x, c.y),
            _ if !self.alt_screen => {
                let (x, y) = self.rend.position();
                if x >= i32::from(self.width()) - 1 {
                    self.rend.move_to(0, y);
                }
            }
            _ => {}
        }
        self.rend.flush_to(&mut self.out)?;
        self.out.flush()
    }

    /// Print `text` above the inline frame, pushing the frame down. Written
    /// immediately; the printed lines are not managed afterwards.
    pub fn insert_above(&mut self, text: &str) -> io::Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.rend.flush_to(&mut self.out)?;

        let w = usize::from(self.width());
        let h = i32::from(self.height());
        let (_, y) = self.rend.position();

        let mut seq = String::from("\r");
        let down = h - y - 1;
        if down > 0 {
            seq.push_str(&ansi::cursor_down(down));
        }

        let lines: Vec<&str> = text.split('\n').collect();
        let mut offset = lines.len();
        for line in &lines {
            let lw = ansi::string_width(line);
            if w > 0 && lw > w {
                offset += lw / w;
            }
        }
        let offset = i32::try_from(offset).unwrap_or(i32::MAX);

        // Scroll up to make room, then open lines at the top of the frame.
        seq.push_str(&"\n".repeat(usize::try_from(offset).unwrap_or(0)));
        seq.push_str(&ansi::cursor_up(offset + h - 1));
        seq.push_str(&ansi::insert_line(offset));
        for line in lines {
            seq.push_str(line);
            seq.push_str(ansi::ERASE_LINE_RIGHT);
            seq.push_str("\r\n");
        }

        self.rend.set_position(0, 0);
        self.out.write_all(seq.as_bytes())?;
        self.out.flush()
    }

    // ── Alt screen ──────────────────────────────────────────────────────

    /// Switch to the alternate screen and fullscreen rendering.
    pub fn enter_alt_screen(&mut self) {
        if !self.alt_screen {
            self.rend.enter_alt_screen();
            self.alt_screen = true;
        }
        self.queue_cursor_visibility();
        if let Some(k) = self.keyboard {
            self.rend.write_str(&ansi::kitty_keyboard(k.bits(), 1));
        }
    }

    /// Back to the main screen and inline rendering.
    pub fn exit_alt_screen(&mut self) {
        if self.alt_screen {
            self.rend.exit_alt_screen();
            self.alt_screen = false;
        }
        self.queue_cursor_visibility();
        // The main screen keeps its own keyboard flags.
        if let Some(k) = self.keyboard {
            self.rend.write_str(&ansi::kitty_keyboard(k.bits(), 1));
        }
    }

    #[inline]
    pub const fn is_alt_screen(&self) -> bool {
        self.alt_screen
    }

    fn queue_cursor_visibility(&mut self) {
        if self.cursor_visible() {
            self.rend.write_str(ansi::SHOW_CURSOR);
        } else {
            self.rend.write_str(ansi::HIDE_CURSOR);
        }
    }

    // ── Cursor ──────────────────────────────────────────────────────────

    pub fn hide_cursor(&mut self) {
        self.rend.write_str(ansi::HIDE_CURSOR);
        self.cursor.get_or_insert_with(Cursor::default).hidden = true;
    }

    pub fn show_cursor(&mut self) {
        self.rend.write_str(ansi::SHOW_CURSOR);
        self.cursor.get_or_insert_with(Cursor::default).hidden = false;
    }

    /// Whether the session has shown the cursor.
    #[inline]
    pub fn cursor_visible(&self) -> bool {
        self.cursor.is_some_and(|c| !c.hidden)
    }

    /// Where [`flush`](Self::flush) leaves the cursor. Placing a cursor the
    /// session never showed keeps it hidden.
    pub fn set_cursor_position(&mut self, x: i32, y: i32) {
        let c = self.cursor.get_or_insert(Cursor {
            hidden: true,
            ..Cursor::default()
        });
        c.x = x;
        c.y = y;
    }

    /// `(-1, -1)` until placed.
    #[inline]
    pub fn cursor_position(&self) -> (i32, i32) {
        self.cursor.map_or((-1, -1), |c| (c.x, c.y))
    }

    pub fn set_cursor_style(&mut self, shape: CursorShape, blink: bool) {
        self.rend.write_str(&ansi::set_cursor_style(shape.encode(blink)));
        let c = self.cursor.get_or_insert_with(Cursor::default);
        c.shape = shape;
        c.blink = blink;
    }

    #[inline]
    pub fn cursor_style(&self) -> (CursorShape, bool) {
        self.cursor.map_or((CursorShape::Block, true), |c| (c.shape, c.blink))
    }

    /// `None` resets to the terminal's default.
    pub fn set_cursor_color(&mut self, color: Option<Color>) {
        match color {
            Some(c) => self.rend.write_str(&ansi::set_cursor_color(&c.hex())),
            None => self.rend.write_str(ansi::RESET_CURSOR_COLOR),
        }
        self.cursor.get_or_insert_with(Cursor::default).color = color;
    }

    #[inline]
    pub fn cursor_color(&self) -> Option<Color> {
        self.cursor.and_then(|c| c.color)
    }

    // ── Terminal colors ─────────────────────────────────────────────────

    /// The terminal's default background. `None` resets it.
    pub fn set_background_color(&mut self, color: Option<Color>) {
        match color {
            Some(c) => self.rend.write_str(&ansi::set_background_color(&c.hex())),
            None => self.rend.write_str(ansi::RESET_BACKGROUND_COLOR),
        }
        self.background = color;
    }

    #[inline]
    pub const fn background_color(&self) -> Option<Color> {
        self.background
    }

    /// The terminal's default foreground. `None` resets it.
    pub fn set_foreground_color(&mut self, color: Option<Color>) {
        match color {
            Some(c) => self.rend.write_str(&ansi::set_foreground_color(&c.hex())),
            None => self.rend.write_str(ansi::RESET_FOREGROUND_COLOR),
        }
        self.foreground = color;
    }

    #[inline]
    pub const fn foreground_color(&self) -> Option<Color> {
        self.foreground
    }

    // ── Input modes ─────────────────────────────────────────────────────

    pub fn enable_bracketed_paste(&mut self) {
        self.rend.write_str(ansi::SET_BRACKETED_PASTE);
        self.bracketed_paste = true;
    }

    pub fn disable_bracketed_paste(&mut self) {
        self.rend.write_str(ansi::RESET_BRACKETED_PASTE);
        self.bracketed_paste = false;
    }

    #[inline]
    pub const fn bracketed_paste(&self) -> bool {
        self.bracketed_paste
    }

    pub fn set_mouse_mode(&mut self, mode: MouseMode) {
        self.rend.write_str(&mode.sequence());
        self.mouse_mode = mode;
    }

    #[inline]
    pub const fn mouse_mode(&self) -> MouseMode {
        self.mouse_mode
    }

    /// Kitty keyboard flags. `None` turns the protocol off.
    pub fn set_keyboard_enhancements(&mut self, flags: Option<KeyboardEnhancements>) {
        let bits = flags.map_or(0, |f| f.bits());
        self.rend.write_str(&ansi::kitty_keyboard(bits, 1));
        self.keyboard = flags;
    }

    #[inline]
    pub const fn keyboard_enhancements(&self) -> Option<KeyboardEnhancements> {
        self.keyboard
    }

    // ── Window decorations ──────────────────────────────────────────────

    pub fn set_window_title(&mut self, title: &str) {
        self.rend.write_str(&ansi::set_window_title(title));
        title.clone_into(&mut self.title);
    }

    #[inline]
    pub fn window_title(&self) -> &str {
        &self.title
    }

    pub fn set_progress_bar(&mut self, progress: Option<ProgressBar>) {
        let seq = progress.unwrap_or_default().sequence();
        self.rend.write_str(&seq);
        self.progress = progress;
    }

    #[inline]
    pub const fn progress_bar(&self) -> Option<ProgressBar> {
        self.progress
    }

    fn progress_visible(&self) -> bool {
        self.progress.is_some_and(|p| p.state != ProgressState::None)
    }

    // ── Suspend / resume ────────────────────────────────────────────────

    /// Queue sequences that undo every mode this session set, then park
    /// the cursor on the last line of the frame. Session state is kept
    /// for [`restore`](Self::restore).
    pub fn reset(&mut self) {
        let mut seq = String::new();

        if self.alt_screen {
            if self.keyboard.is_some() {
                seq.push_str(&ansi::kitty_keyboard(0, 1));
            }
            seq.push_str(ansi::RESET_ALT_SCREEN);
        }
        if self.keyboard.is_some() {
            seq.push_str(&ansi::kitty_keyboard(0, 1));
        }
        if self.mouse_mode != MouseMode::None {
            seq.push_str(&MouseMode::None.sequence());
        }

        if self.cursor.is_none_or(|c| !c.hidden) {
            seq.push_str(ansi::SHOW_CURSOR);
        }
        if let Some(c) = self.cursor {
            if c.is_styled() {
                seq.push_str(&ansi::set_cursor_style(0));
            }
            if c.color.is_some() {
                seq.push_str(ansi::RESET_CURSOR_COLOR);
            }
        }
        if self.background.is_some() {
            seq.push_str(ansi::RESET_BACKGROUND_COLOR);
        }
        if self.foreground.is_some() {
            seq.push_str(ansi::RESET_FOREGROUND_COLOR);
        }
        if self.bracketed_paste {
            seq.push_str(ansi::RESET_BRACKETED_PASTE);
        }
        if !self.title.is_empty() {
            seq.push_str(&ansi::set_window_title(""));
        }
        if self.progress_visible() {
            seq.push_str(ansi::RESET_PROGRESS_BAR);
        }

        self.rend.write_str(&seq);

        // Moving comes last so nothing after it can move the cursor again.
        let h = i32::from(self.height());
        if h > 0 {
            self.rend.move_to(0, h - 1);
        }
    }

    /// Re-apply everything [`reset`](Self::reset) undid and queue a render.
    pub fn restore(&mut self) {
        let mut seq = String::new();

        if self.alt_screen {
            seq.push_str(ansi::SET_ALT_SCREEN);
        }
        if self.cursor_visible() {
            seq.push_str(ansi::SHOW_CURSOR);
        } else {
            seq.push_str(ansi::HIDE_CURSOR);
        }
        if let Some(k) = self.keyboard {
            seq.push_str(&ansi::kitty_keyboard(k.bits(), 1));
        }
        if self.mouse_mode != MouseMode::None {
            seq.push_str(&self.mouse_mode.sequence());
        }
        if let Some(c) = self.cursor {
            if c.is_styled() {
                seq.push_str(&ansi::set_cursor_style(c.shape.encode(c.blink)));
            }
            if let Some(color) = c.color {
                seq.push_str(&ansi::set_cursor_color(&color.hex()));
            }
        }
        if let Some(c) = self.background {
            seq.push_str(&ansi::set_background_color(&c.hex()));
        }
        if let Some(c) = self.foreground {
            seq.push_str(&ansi::set_foreground_color(&c.hex()));
        }
        if self.bracketed_paste {
            seq.push_str(ansi::SET_BRACKETED_PASTE);
        }
        if !self.title.is_empty() {
            seq.push_str(&ansi::set_window_title(&self.title));
        }
        if let Some(p) = self.progress.filter(|p| p.state != ProgressState::None) {
            seq.push_str(&p.sequence());
        }

        self.rend.write_str(&seq);
        self.render();
    }

    /// Apply the startup modes a [`Config`] asks for.
    pub fn apply_config(&mut self, config: &Config) {
        if config.alt_screen {
            self.enter_alt_screen();
        }
        if config.bracketed_paste {
            self.enable_bracketed_paste();
        }
        if config.mouse_mode != MouseMode::None {
            self.set_mouse_mode(config.mouse_mode);
        }
        if !config.keyboard_enhancements.is_empty() {
            self.set_keyboard_enhancements(Some(config.keyboard_enhancements));
        }
    }
}

/// Queue raw bytes behind everything already pending.
impl<W: Write> Write for TerminalScreen<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.rend.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Self::flush(self)
    }
}

impl<W: Write> Screen for TerminalScreen<W> {
    fn bounds(&self) -> Rect {
        self.win.bounds()
    }

    fn cell_at(&self, x: u16, y: u16) -> Option<&Cell> {
        self.win.cell_at(x, y)
    }

    fn set_cell(&mut self, x: u16, y: u16, cell: Option<&Cell>) {
        self.win.set_cell(x, y, cell);
    }
}

impl<W: Write> std::fmt::Debug for TerminalScreen<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalScreen")
            .field("size", &(self.width(), self.height()))
            .field("alt_screen", &self.alt_screen)
            .field("mouse_mode", &self.mouse_mode)
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Style;
    use pretty_assertions::assert_eq;

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

    // ── Frames ──────────────────────────────────────────────────────────

    #[test]
    fn first_frame_clears_below_and_draws() {
        let mut s = screen(4, 1);
        s.set_string(0, 0, "hi", Style::DEFAULT);
        s.render();
        s.flush().unwrap();
        assert_eq!(output(&mut s), "\r\x1b[Jhi");
    }

    #[test]
    fn unchanged_frame_writes_nothing() {
        let mut s = screen(4, 1);
        s.set_string(0, 0, "hi", Style::DEFAULT);
        s.render();
        s.flush().unwrap();
        output(&mut s);
        s.render();
        s.flush().unwrap();
        assert_eq!(output(&mut s), "");
    }

    #[test]
    fn display_draws_closure() {
        let mut s = screen(4, 1);
        s.display(&|scr: &mut dyn Screen, area: Rect| {
            scr.set_string(area.x, area.y, "ok", Style::DEFAULT);
        })
        .unwrap();
        assert_eq!(output(&mut s), "\r\x1b[Jok");
    }

    #[test]
    fn visible_cursor_is_placed_on_flush() {
        let mut s = screen(4, 1);
        s.show_cursor();
        s.set_cursor_position(1, 0);
        s.set_string(0, 0, "hi", Style::DEFAULT);
        s.render();
        s.flush().unwrap();
        assert_eq!(output(&mut s), "\x1b[?25h\r\x1b[Jhi\rh");
    }

    #[test]
    fn placing_hidden_cursor_keeps_it_hidden() {
        let mut s = screen(4, 1);
        s.set_cursor_position(2, 0);
        assert!(!s.cursor_visible());
        assert_eq!(s.cursor_position(), (2, 0));
    }

    #[test]
    fn inline_cursor_leaves_last_column() {
        let mut s = screen(3, 1);
        s.set_string(0, 0, "abc", Style::DEFAULT);
        s.render();
        s.flush().unwrap();
        assert_eq!(output(&mut s), "\r\x1b[Jabc\r");
    }

    #[test]
    fn insert_above_pushes_frame_down() {
        let mut s = screen(10, 2);
        s.renderer_mut().set_position(0, 0);
        s.insert_above("log").unwrap();
        assert_eq!(output(&mut s), "\r\x1b[B\n\x1b[2A\x1b[Llog\x1b[K\r\n");
        assert_eq!(s.renderer().position(), (0, 0));
    }

    // ── Modes ───────────────────────────────────────────────────────────

    #[test]
    fn alt_screen_round_trip() {
        let mut s = screen(4, 2);
        s.enter_alt_screen();
        assert!(s.is_alt_screen());
        assert!(s.renderer().is_fullscreen());
        s.exit_alt_screen();
        assert!(!s.is_alt_screen());
        s.flush().unwrap();
        let out = output(&mut s);
        assert!(out.starts_with("\x1b[?1049h\x1b[?25l\x1b[?1049l\x1b[?25l"), "{out:?}");
    }

    #[test]
    fn progress_value_is_clamped() {
        let p = ProgressBar::new(ProgressState::Default, 150);
        assert_eq!(p.value(), 100);
        assert_eq!(p.sequence(), "\x1b]9;4;1;100\x07");
        assert_eq!(ProgressBar::default().sequence(), ansi::RESET_PROGRESS_BAR);
    }

    #[test]
    fn setters_remember_state() {
        let mut s = screen(4, 1);
        s.set_mouse_mode(MouseMode::Drag);
        s.enable_bracketed_paste();
        s.set_window_title("probe");
        s.set_background_color(Some(Color::Rgb(0, 0, 0)));
        s.set_cursor_style(CursorShape::Bar, false);
        assert_eq!(s.mouse_mode(), MouseMode::Drag);
        assert!(s.bracketed_paste());
        assert_eq!(s.window_title(), "probe");
        assert_eq!(s.background_color(), Some(Color::Rgb(0, 0, 0)));
        assert_eq!(s.cursor_style(), (CursorShape::Bar, false));
        s.flush().unwrap();
        let out = output(&mut s);
        assert!(out.contains("\x1b[?1002h\x1b[?1006h"));
        assert!(out.contains("\x1b]11;#000000\x07"));
        assert!(out.contains("\x1b[6 q"));
    }

    #[test]
    fn keyboard_enhancements_write_flag_bits() {
        let mut s = screen(4, 1);
        let flags = KeyboardEnhancements::DISAMBIGUATE_ESCAPE_CODES
            | KeyboardEnhancements::REPORT_EVENT_TYPES;
        s.set_keyboard_enhancements(Some(flags));
        s.set_keyboard_enhancements(None);
        assert_eq!(s.keyboard_enhancements(), None);
        s.flush().unwrap();
        assert_eq!(output(&mut s), "\x1b[=3;1u\x1b[=0;1u");
    }

    #[test]
    fn reset_undoes_modes_in_order() {
        let mut s = screen(4, 2);
        s.set_keyboard_enhancements(Some(KeyboardEnhancements::DISAMBIGUATE_ESCAPE_CODES));
        s.set_mouse_mode(MouseMode::Click);
        s.enable_bracketed_paste();
        s.set_window_title("t");
        s.flush().unwrap();
        output(&mut s);

        s.reset();
        s.flush().unwrap();
        let out = output(&mut s);
        let keyboard = out.find("\x1b[=0;1u").unwrap();
        let mouse = out.find("\x1b[?1000l").unwrap();
        let cursor = out.find("\x1b[?25h").unwrap();
        let paste = out.find("\x1b[?2004l").unwrap();
        let title = out.find("\x1b]2;\x07").unwrap();
        assert!(keyboard < mouse && mouse < cursor && cursor < paste && paste < title);
        // State survives for restore.
        assert_eq!(s.mouse_mode(), MouseMode::Click);
    }

    #[test]
    fn restore_reapplies_modes() {
        let mut s = screen(4, 1);
        s.set_mouse_mode(MouseMode::Motion);
        s.enable_bracketed_paste();
        s.set_progress_bar(Some(ProgressBar::new(ProgressState::Warning, 40)));
        s.reset();
        s.flush().unwrap();
        output(&mut s);

        s.restore();
        s.flush().unwrap();
        let out = output(&mut s);
        assert!(out.contains("\x1b[?1003h"));
        assert!(out.contains("\x1b[?2004h"));
        assert!(out.contains("\x1b]9;4;4;40\x07"));
    }

    #[test]
    fn apply_config_enables_requested_modes() {
        let cfg = Config {
            term: "kitty".to_string(),
            alt_screen: true,
            mouse_mode: MouseMode::Drag,
            ..Config::default()
        };
        let mut s = TerminalScreen::new(Vec::new(), &cfg);
        s.apply_config(&cfg);
        assert!(s.is_alt_screen());
        assert!(s.bracketed_paste());
        assert_eq!(s.mouse_mode(), MouseMode::Drag);
        assert_eq!(
            s.keyboard_enhancements(),
            Some(KeyboardEnhancements::DISAMBIGUATE_ESCAPE_CODES)
        );
    }
}
