// SPDX-License-Identifier: MIT
//
// ANSI escape sequence generation.
//
// Two shapes of helper live here. Fixed sequences are `&str` constants so
// they can be measured and concatenated without allocating. Parameterized
// sequences are small builders that return `String`, because the renderer
// compares the byte length of competing candidates before it commits to
// one. Mode toggles used by the session also get `impl Write` helpers that
// return `io::Result`.
//
// Counted sequences (CUU, ECH, REP, IL, ...) follow the terminal default:
// a count of 1 omits the parameter entirely, so `cuu(1)` is `CSI A`.
// Positions passed to `cursor_position` are 0-based and converted to the
// terminal's 1-based coordinates; single-axis absolute moves (CHA, HPA,
// VPA) take the 1-based value directly.

use std::io::{self, Write};

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

// ─── Fixed Sequences ─────────────────────────────────────────────────────────

/// CUP with no parameters: move to the top-left corner.
pub const CURSOR_HOME: &str = "\x1b[H";
/// EL 0: erase from the cursor to the end of the line.
pub const ERASE_LINE_RIGHT: &str = "\x1b[K";
/// EL 1: erase from the start of the line to the cursor.
pub const ERASE_LINE_LEFT: &str = "\x1b[1K";
/// EL 2: erase the whole line.
pub const ERASE_ENTIRE_LINE: &str = "\x1b[2K";
/// ED 0: erase from the cursor to the end of the screen.
pub const ERASE_SCREEN_BELOW: &str = "\x1b[J";
/// ED 2: erase the whole screen.
pub const ERASE_ENTIRE_SCREEN: &str = "\x1b[2J";
/// RI: move up one line, scrolling down at the top margin.
pub const REVERSE_INDEX: &str = "\x1bM";
/// DECSC.
pub const SAVE_CURSOR: &str = "\x1b7";
/// DECRC.
pub const RESTORE_CURSOR: &str = "\x1b8";
/// SGR with no parameters.
pub const RESET_STYLE: &str = "\x1b[m";
/// DECSTBM with no parameters: the scroll region becomes the full screen.
pub const RESET_SCROLL_REGION: &str = "\x1b[r";

pub const SET_AUTOWRAP: &str = "\x1b[?7h";
pub const RESET_AUTOWRAP: &str = "\x1b[?7l";
/// IRM: characters written shift the rest of the line right.
pub const SET_INSERT_MODE: &str = "\x1b[4h";
pub const RESET_INSERT_MODE: &str = "\x1b[4l";

pub const SHOW_CURSOR: &str = "\x1b[?25h";
pub const HIDE_CURSOR: &str = "\x1b[?25l";

/// Alternate screen with cursor save (DEC 1049).
pub const SET_ALT_SCREEN: &str = "\x1b[?1049h";
pub const RESET_ALT_SCREEN: &str = "\x1b[?1049l";

pub const SET_BRACKETED_PASTE: &str = "\x1b[?2004h";
pub const RESET_BRACKETED_PASTE: &str = "\x1b[?2004l";

pub const SET_FOCUS_EVENTS: &str = "\x1b[?1004h";
pub const RESET_FOCUS_EVENTS: &str = "\x1b[?1004l";

pub const SET_SYNC_OUTPUT: &str = "\x1b[?2026h";
pub const RESET_SYNC_OUTPUT: &str = "\x1b[?2026l";

pub const SET_MOUSE_NORMAL: &str = "\x1b[?1000h";
pub const RESET_MOUSE_NORMAL: &str = "\x1b[?1000l";
pub const SET_MOUSE_BUTTON_EVENT: &str = "\x1b[?1002h";
pub const RESET_MOUSE_BUTTON_EVENT: &str = "\x1b[?1002l";
pub const SET_MOUSE_ANY_EVENT: &str = "\x1b[?1003h";
pub const RESET_MOUSE_ANY_EVENT: &str = "\x1b[?1003l";
pub const SET_MOUSE_EXT_SGR: &str = "\x1b[?1006h";
pub const RESET_MOUSE_EXT_SGR: &str = "\x1b[?1006l";

pub const RESET_FOREGROUND_COLOR: &str = "\x1b]110\x07";
pub const RESET_BACKGROUND_COLOR: &str = "\x1b]111\x07";
pub const RESET_CURSOR_COLOR: &str = "\x1b]112\x07";

/// OSC 8 with an empty URL closes the current hyperlink.
pub const RESET_HYPERLINK: &str = "\x1b]8;;\x07";

pub const RESET_PROGRESS_BAR: &str = "\x1b]9;4;0\x07";
pub const INDETERMINATE_PROGRESS_BAR: &str = "\x1b]9;4;3\x07";

// ── Requests ────────────────────────────────────────────────────────

/// DA1: the terminal answers with `CSI ? ... c`.
pub const REQUEST_PRIMARY_DEVICE_ATTRIBUTES: &str = "\x1b[c";
/// DA2: the terminal answers with `CSI > ... c`.
pub const REQUEST_SECONDARY_DEVICE_ATTRIBUTES: &str = "\x1b[>c";
/// XTVERSION: the terminal answers with `DCS > | name ST`.
pub const REQUEST_TERMINAL_VERSION: &str = "\x1b[>0q";
/// DSR 6: the terminal answers with a cursor position report.
pub const REQUEST_CURSOR_POSITION: &str = "\x1b[6n";
pub const REQUEST_FOREGROUND_COLOR: &str = "\x1b]10;?\x07";
pub const REQUEST_BACKGROUND_COLOR: &str = "\x1b]11;?\x07";
pub const REQUEST_CURSOR_COLOR: &str = "\x1b]12;?\x07";
/// The terminal answers with `CSI ? flags u` when it speaks the Kitty
/// keyboard protocol.
pub const REQUEST_KITTY_KEYBOARD: &str = "\x1b[?u";
/// XTWINOPS 14/16/18: window size in pixels, cell size, and size in cells.
pub const REQUEST_WINDOW_SIZE_PIXELS: &str = "\x1b[14t";
pub const REQUEST_CELL_SIZE: &str = "\x1b[16t";
pub const REQUEST_WINDOW_SIZE_CELLS: &str = "\x1b[18t";
/// DSR 996: the terminal answers with `CSI ? 997 ; 1|2 n` (dark/light).
pub const REQUEST_COLOR_SCHEME: &str = "\x1b[?996n";

// ─── Parameterized Sequences ─────────────────────────────────────────────────

#[inline]
fn counted(n: i32, fin: char) -> String {
    if n <= 1 {
        format!("\x1b[{fin}")
    } else {
        format!("\x1b[{n}{fin}")
    }
}

/// CUP to 0-based `(x, y)`. The origin collapses to `CSI H`, and each axis
/// at 1 drops its parameter.
#[must_use]
pub fn cursor_position(x: i32, y: i32) -> String {
    let (col, row) = (x + 1, y + 1);
    if row <= 1 && col <= 1 {
        return CURSOR_HOME.to_string();
    }
    let mut s = String::from("\x1b[");
    if row > 1 {
        s.push_str(&row.to_string());
    }
    if col > 1 {
        s.push(';');
        s.push_str(&col.to_string());
    }
    s.push('H');
    s
}

/// CUU.
#[must_use]
pub fn cursor_up(n: i32) -> String {
    counted(n, 'A')
}

/// CUD.
#[must_use]
pub fn cursor_down(n: i32) -> String {
    counted(n, 'B')
}

/// CUF.
#[must_use]
pub fn cursor_forward(n: i32) -> String {
    counted(n, 'C')
}

/// CUB.
#[must_use]
pub fn cursor_backward(n: i32) -> String {
    counted(n, 'D')
}

/// CHA to 1-based column.
#[must_use]
pub fn cursor_horizontal_absolute(col: i32) -> String {
    counted(col, 'G')
}

/// HPA to 1-based column. Same effect as CHA, different final byte.
#[must_use]
pub fn horizontal_position_absolute(col: i32) -> String {
    counted(col, '`')
}

/// VPA to 1-based row.
#[must_use]
pub fn vertical_position_absolute(row: i32) -> String {
    counted(row, 'd')
}

/// CHT: forward `n` tab stops.
#[must_use]
pub fn cursor_horizontal_tab(n: i32) -> String {
    counted(n, 'I')
}

/// CBT: backward `n` tab stops.
#[must_use]
pub fn cursor_backward_tab(n: i32) -> String {
    counted(n, 'Z')
}

/// ECH: blank `n` cells from the cursor without moving it.
#[must_use]
pub fn erase_character(n: i32) -> String {
    counted(n, 'X')
}

/// REP: repeat the preceding graphic character `n` times.
#[must_use]
pub fn repeat_previous_character(n: i32) -> String {
    counted(n, 'b')
}

/// ICH: insert `n` blank cells, shifting the rest of the line right.
#[must_use]
pub fn insert_character(n: i32) -> String {
    counted(n, '@')
}

/// DCH: delete `n` cells, shifting the rest of the line left.
#[must_use]
pub fn delete_character(n: i32) -> String {
    counted(n, 'P')
}

/// IL.
#[must_use]
pub fn insert_line(n: i32) -> String {
    counted(n, 'L')
}

/// DL.
#[must_use]
pub fn delete_line(n: i32) -> String {
    counted(n, 'M')
}

/// SU: scroll the region up `n` lines.
#[must_use]
pub fn scroll_up(n: i32) -> String {
    counted(n, 'S')
}

/// SD: scroll the region down `n` lines.
#[must_use]
pub fn scroll_down(n: i32) -> String {
    counted(n, 'T')
}

/// DECSTBM with 1-based inclusive `top` and `bottom`.
#[must_use]
pub fn set_scroll_region(top: i32, bottom: i32) -> String {
    format!("\x1b[{top};{bottom}r")
}

/// OSC 8 hyperlink opener. An empty URL closes the link.
#[must_use]
pub fn hyperlink(url: &str, params: &str) -> String {
    format!("\x1b]8;{params};{url}\x07")
}

/// OSC 2.
#[must_use]
pub fn set_window_title(title: &str) -> String {
    format!("\x1b]2;{title}\x07")
}

/// OSC 10 with a color spec such as `#rrggbb`.
#[must_use]
pub fn set_foreground_color(spec: &str) -> String {
    format!("\x1b]10;{spec}\x07")
}

/// OSC 11.
#[must_use]
pub fn set_background_color(spec: &str) -> String {
    format!("\x1b]11;{spec}\x07")
}

/// OSC 12.
#[must_use]
pub fn set_cursor_color(spec: &str) -> String {
    format!("\x1b]12;{spec}\x07")
}

/// OSC 9;4 progress with an explicit state code (1 normal, 2 error,
/// 4 warning) and a 0–100 percentage.
#[must_use]
pub fn set_progress_bar(state: u8, percent: u8) -> String {
    format!("\x1b]9;4;{state};{}\x07", percent.min(100))
}

/// DECSCUSR. 0 restores the terminal default.
#[must_use]
pub fn set_cursor_style(n: u8) -> String {
    format!("\x1b[{n} q")
}

/// Kitty keyboard: `CSI = flags ; mode u`. Mode 1 replaces the current
/// flags, 2 adds to them, 3 removes them.
#[must_use]
pub fn kitty_keyboard(flags: u8, mode: u8) -> String {
    format!("\x1b[={flags};{mode}u")
}

/// Push Kitty keyboard flags on the terminal's stack.
#[must_use]
pub fn push_kitty_keyboard(flags: u8) -> String {
    format!("\x1b[>{flags}u")
}

/// Pop one entry off the Kitty keyboard stack.
pub const POP_KITTY_KEYBOARD: &str = "\x1b[<u";

/// XTGETTCAP for the given capability names, hex-encoded.
#[must_use]
pub fn request_termcap(names: &[&str]) -> String {
    let hex: Vec<String> = names
        .iter()
        .map(|n| n.bytes().map(|b| format!("{b:02X}")).collect())
        .collect();
    format!("\x1bP+q{}\x1b\\", hex.join(";"))
}

// ─── Mouse Mode ──────────────────────────────────────────────────────────────

/// Mouse tracking granularity. All modes report in SGR format (DEC 1006).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum MouseMode {
    /// No mouse reporting.
    #[default]
    None,
    /// Button press and release (DEC 1000).
    Click,
    /// Press, release, and motion while a button is held (DEC 1002).
    Drag,
    /// Every motion event, with or without buttons (DEC 1003).
    Motion,
}

impl MouseMode {
    /// The sequence that switches the terminal into this mode.
    ///
    /// `None` resets every tracking mode the others could have set.
    #[must_use]
    pub fn sequence(self) -> String {
        match self {
            Self::None => [
                RESET_MOUSE_NORMAL,
                RESET_MOUSE_BUTTON_EVENT,
                RESET_MOUSE_ANY_EVENT,
                RESET_MOUSE_EXT_SGR,
            ]
            .concat(),
            Self::Click => [SET_MOUSE_NORMAL, SET_MOUSE_EXT_SGR].concat(),
            Self::Drag => [SET_MOUSE_BUTTON_EVENT, SET_MOUSE_EXT_SGR].concat(),
            Self::Motion => [SET_MOUSE_ANY_EVENT, SET_MOUSE_EXT_SGR].concat(),
        }
    }
}

/// Switch the terminal's mouse tracking mode.
pub fn set_mouse_mode(w: &mut impl Write, mode: MouseMode) -> io::Result<()> {
    w.write_all(mode.sequence().as_bytes())
}

// ─── Keyboard Enhancements ───────────────────────────────────────────────────

bitflags::bitflags! {
    /// Kitty keyboard protocol progressive-enhancement flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct KeyboardEnhancements: u8 {
        /// Report ambiguous keys (ctrl+i vs Tab, ctrl+m vs Enter...) distinctly.
        const DISAMBIGUATE_ESCAPE_CODES = 1 << 0;
        /// Report repeat and release events.
        const REPORT_EVENT_TYPES        = 1 << 1;
        /// Report shifted and base-layout keys.
        const REPORT_ALTERNATE_KEYS     = 1 << 2;
        /// Report every key, text included, as an escape code.
        const REPORT_ALL_KEYS           = 1 << 3;
        /// Report the text a key produces.
        const REPORT_ASSOCIATED_TEXT    = 1 << 4;
    }
}

/// Replace the terminal's Kitty keyboard flags.
pub fn set_keyboard_enhancements(
    w: &mut impl Write,
    flags: KeyboardEnhancements,
) -> io::Result<()> {
    w.write_all(kitty_keyboard(flags.bits(), 1).as_bytes())
}

// ─── Cursor Shape ────────────────────────────────────────────────────────────

/// Terminal cursor shape (DECSCUSR).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum CursorShape {
    #[default]
    Block,
    Underline,
    Bar,
}

impl CursorShape {
    /// The DECSCUSR parameter for this shape.
    #[must_use]
    pub const fn encode(self, blink: bool) -> u8 {
        let base = match self {
            Self::Block => 1,
            Self::Underline => 3,
            Self::Bar => 5,
        };
        if blink { base } else { base + 1 }
    }
}

/// Set the cursor shape and blink.
pub fn set_cursor_shape(w: &mut impl Write, shape: CursorShape, blink: bool) -> io::Result<()> {
    w.write_all(set_cursor_style(shape.encode(blink)).as_bytes())
}

// ─── Mode Helpers ────────────────────────────────────────────────────────────

/// Enter the alternate screen buffer, saving the cursor.
#[inline]
pub fn enter_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(SET_ALT_SCREEN.as_bytes())
}

/// Leave the alternate screen buffer and restore the cursor.
#[inline]
pub fn exit_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(RESET_ALT_SCREEN.as_bytes())
}

#[inline]
pub fn cursor_hide(w: &mut impl Write) -> io::Result<()> {
    w.write_all(HIDE_CURSOR.as_bytes())
}

#[inline]
pub fn cursor_show(w: &mut impl Write) -> io::Result<()> {
    w.write_all(SHOW_CURSOR.as_bytes())
}

/// Enable or disable bracketed paste (DEC 2004).
#[inline]
pub fn set_bracketed_paste(w: &mut impl Write, enable: bool) -> io::Result<()> {
    w.write_all(if enable { SET_BRACKETED_PASTE } else { RESET_BRACKETED_PASTE }.as_bytes())
}

/// Enable or disable focus reporting (DEC 1004).
#[inline]
pub fn set_focus_events(w: &mut impl Write, enable: bool) -> io::Result<()> {
    w.write_all(if enable { SET_FOCUS_EVENTS } else { RESET_FOCUS_EVENTS }.as_bytes())
}

/// Begin synchronized output (DEC 2026).
#[inline]
pub fn begin_sync(w: &mut impl Write) -> io::Result<()> {
    w.write_all(SET_SYNC_OUTPUT.as_bytes())
}

/// End synchronized output.
#[inline]
pub fn end_sync(w: &mut impl Write) -> io::Result<()> {
    w.write_all(RESET_SYNC_OUTPUT.as_bytes())
}

// ─── Width ───────────────────────────────────────────────────────────────────

/// Display width of `s` in cells, skipping escape sequences.
///
/// CSI sequences run to their final byte, OSC/DCS/APC strings to BEL or
/// ST, and any other ESC pairs with the byte after it.
#[must_use]
pub fn string_width(s: &str) -> usize {
    let mut width = 0;
    let mut text = String::new();
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\x1b' {
            text.push(c);
            continue;
        }
        match chars.next() {
            Some('[') => {
                for c in chars.by_ref() {
                    if ('\x40'..='\x7e').contains(&c) {
                        break;
                    }
                }
            }
            Some(']' | 'P' | '_' | '^' | 'X') => {
                while let Some(c) = chars.next() {
                    if c == '\x07' {
                        break;
                    }
                    if c == '\x1b' && chars.peek() == Some(&'\\') {
                        chars.next();
                        break;
                    }
                }
            }
            _ => {}
        }
        width += graphemes_width(&text);
        text.clear();
    }
    width + graphemes_width(&text)
}

fn graphemes_width(s: &str) -> usize {
    s.graphemes(true).map(UnicodeWidthStr::width).sum()
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Helper: run an ANSI function and return its output as a string.
    fn emit<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> io::Result<()>,
    {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    // ── Cursor ──────────────────────────────────────────────────────────

    #[test]
    fn cursor_position_origin_is_home() {
        assert_eq!(cursor_position(0, 0), "\x1b[H");
    }

    #[test]
    fn cursor_position_omits_unit_axes() {
        assert_eq!(cursor_position(0, 4), "\x1b[5H");
        assert_eq!(cursor_position(9, 0), "\x1b[;10H");
        assert_eq!(cursor_position(10, 20), "\x1b[21;11H");
    }

    #[test]
    fn counted_sequences_drop_unit_count() {
        assert_eq!(cursor_up(1), "\x1b[A");
        assert_eq!(cursor_up(0), "\x1b[A");
        assert_eq!(cursor_down(3), "\x1b[3B");
        assert_eq!(cursor_forward(12), "\x1b[12C");
        assert_eq!(cursor_backward(2), "\x1b[2D");
    }

    #[test]
    fn absolute_moves() {
        assert_eq!(cursor_horizontal_absolute(1), "\x1b[G");
        assert_eq!(cursor_horizontal_absolute(7), "\x1b[7G");
        assert_eq!(horizontal_position_absolute(7), "\x1b[7`");
        assert_eq!(vertical_position_absolute(3), "\x1b[3d");
    }

    #[test]
    fn tab_moves() {
        assert_eq!(cursor_horizontal_tab(1), "\x1b[I");
        assert_eq!(cursor_backward_tab(2), "\x1b[2Z");
    }

    // ── Editing ─────────────────────────────────────────────────────────

    #[test]
    fn edit_sequences() {
        assert_eq!(erase_character(10), "\x1b[10X");
        assert_eq!(repeat_previous_character(5), "\x1b[5b");
        assert_eq!(insert_character(1), "\x1b[@");
        assert_eq!(delete_character(4), "\x1b[4P");
        assert_eq!(insert_line(2), "\x1b[2L");
        assert_eq!(delete_line(1), "\x1b[M");
        assert_eq!(scroll_up(3), "\x1b[3S");
        assert_eq!(scroll_down(1), "\x1b[T");
    }

    #[test]
    fn scroll_region() {
        assert_eq!(set_scroll_region(2, 10), "\x1b[2;10r");
    }

    // ── OSC ─────────────────────────────────────────────────────────────

    #[test]
    fn hyperlinks() {
        assert_eq!(
            hyperlink("https://x.org", "id=1"),
            "\x1b]8;id=1;https://x.org\x07"
        );
        assert_eq!(hyperlink("", ""), RESET_HYPERLINK);
    }

    #[test]
    fn title_and_colors() {
        assert_eq!(set_window_title("hi"), "\x1b]2;hi\x07");
        assert_eq!(set_foreground_color("#ff0000"), "\x1b]10;#ff0000\x07");
        assert_eq!(set_background_color("#000000"), "\x1b]11;#000000\x07");
        assert_eq!(set_cursor_color("#00ff00"), "\x1b]12;#00ff00\x07");
    }

    #[test]
    fn progress_clamps() {
        assert_eq!(set_progress_bar(1, 50), "\x1b]9;4;1;50\x07");
        assert_eq!(set_progress_bar(2, 250), "\x1b]9;4;2;100\x07");
    }

    #[test]
    fn termcap_request_is_hex() {
        assert_eq!(request_termcap(&["TN", "Co"]), "\x1bP+q544E;436F\x1b\\");
    }

    // ── Modes ───────────────────────────────────────────────────────────

    #[test]
    fn mouse_modes() {
        assert_eq!(MouseMode::Click.sequence(), "\x1b[?1000h\x1b[?1006h");
        assert_eq!(MouseMode::Drag.sequence(), "\x1b[?1002h\x1b[?1006h");
        assert_eq!(MouseMode::Motion.sequence(), "\x1b[?1003h\x1b[?1006h");
        assert_eq!(
            emit(|w| set_mouse_mode(w, MouseMode::None)),
            "\x1b[?1000l\x1b[?1002l\x1b[?1003l\x1b[?1006l"
        );
    }

    #[test]
    fn keyboard_enhancements() {
        let flags = KeyboardEnhancements::DISAMBIGUATE_ESCAPE_CODES
            | KeyboardEnhancements::REPORT_EVENT_TYPES;
        assert_eq!(emit(|w| set_keyboard_enhancements(w, flags)), "\x1b[=3;1u");
        assert_eq!(kitty_keyboard(0, 1), "\x1b[=0;1u");
        assert_eq!(push_kitty_keyboard(1), "\x1b[>1u");
    }

    #[test]
    fn cursor_shapes() {
        assert_eq!(CursorShape::Block.encode(true), 1);
        assert_eq!(CursorShape::Block.encode(false), 2);
        assert_eq!(CursorShape::Underline.encode(false), 4);
        assert_eq!(CursorShape::Bar.encode(true), 5);
        assert_eq!(emit(|w| set_cursor_shape(w, CursorShape::Bar, false)), "\x1b[6 q");
    }

    #[test]
    fn toggles() {
        assert_eq!(emit(|w| enter_alt_screen(w)), "\x1b[?1049h");
        assert_eq!(emit(|w| exit_alt_screen(w)), "\x1b[?1049l");
        assert_eq!(emit(|w| cursor_hide(w)), "\x1b[?25l");
        assert_eq!(emit(|w| cursor_show(w)), "\x1b[?25h");
        assert_eq!(emit(|w| set_bracketed_paste(w, true)), "\x1b[?2004h");
        assert_eq!(emit(|w| set_focus_events(w, false)), "\x1b[?1004l");
        assert_eq!(emit(|w| begin_sync(w)), "\x1b[?2026h");
        assert_eq!(emit(|w| end_sync(w)), "\x1b[?2026l");
    }

    // ── Width ───────────────────────────────────────────────────────────

    #[test]
    fn width_plain_and_wide() {
        assert_eq!(string_width("hello"), 5);
        assert_eq!(string_width("世界"), 4);
    }

    #[test]
    fn width_skips_escapes() {
        assert_eq!(string_width("\x1b[1;31mred\x1b[m"), 3);
        assert_eq!(string_width("\x1b]8;;https://x.org\x07link\x1b]8;;\x07"), 4);
        assert_eq!(string_width("\x1b]2;title\x1b\\ok"), 2);
    }
}
