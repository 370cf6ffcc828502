// SPDX-License-Identifier: MIT
//
// Terminal renderer — turn "what the screen should show" into bytes.
//
// The renderer keeps a model of what the terminal currently displays
// (`curbuf`), the real cursor position, and the active pen (SGR style and
// hyperlink). Each render diffs the touched lines of a new buffer against
// that model and queues the cheapest control-sequence program it can find
// to get from one to the other. Nothing reaches the terminal until
// `flush_to`, which writes the whole frame at once.
//
// Choices it makes, per changed span:
//
//   - Cursor movement: absolute CUP, relative CUU/CUD/CUF/CUB, VPA/HPA/
//     CHA, CR-relative, home-relative, hard tabs, backspaces, or simply
//     re-printing the cells between here and there. The shortest wins.
//     Far jumps go straight to CUP.
//   - Runs of identical cells: ECH for blank-equivalent runs, REP for
//     printable ASCII, when the terminal advertises them.
//   - Line tails: EL when the rest of the line is blank, ICH/DCH (or
//     insert mode) when content merely shifted.
//   - Screen bottom: one ED instead of clearing each trailing line.
//   - Fullscreen scrolls: a block of lines that moved is shifted with
//     DECSTBM plus SU/SD (or IL/DL) instead of being repainted.
//
// Two modes matter. Fullscreen (usually the alt screen) owns the whole
// terminal and moves absolutely. Inline mode draws below the shell prompt
// with relative moves only, and grows downward by printing newlines so
// the terminal scrolls to make room.
//
// The "phantom cursor" is the deferred autowrap state: after printing in
// the last column the cursor sits on that column but the next character
// goes to the next line. Any explicit move first cancels it with CR.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::{self, Write};

use bitflags::bitflags;

use crate::ansi;
use crate::buffer::{Buffer, Line, Rect, Screen};
use crate::caps::Capabilities;
use crate::cell::{Attr, Cell, Link, Style, UnderlineStyle};
use crate::color::ColorProfile;
use crate::config::Config;
use crate::render_buffer::RenderBuffer;
use crate::tabstops::TabStops;

// ─── Tuning ──────────────────────────────────────────────────────────────────

/// Moves longer than this (taxicab) to columns away from either edge use
/// CUP without trying local movement.
pub const LONG_DISTANCE: i32 = 7;

/// Byte overhead charged to an ICH shift when comparing against a repaint.
pub const ICH_OVERHEAD: i32 = 3;

/// Byte overhead charged to a DCH shift when comparing against a repaint.
pub const DCH_OVERHEAD: i32 = 3;

/// A shifted block must keep at least this many changed non-blank lines
/// to be worth a hardware scroll.
pub const MIN_SCROLL_LINES: usize = 2;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    struct Flags: u8 {
        const RELATIVE_CURSOR = 1 << 0;
        const FULLSCREEN      = 1 << 1;
        const MAP_NEWLINE     = 1 << 2;
        const SCROLL_OPTIM    = 1 << 3;
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

#[inline]
fn dim(v: u16) -> i32 {
    i32::from(v)
}

#[inline]
fn to_u16(v: i32) -> u16 {
    u16::try_from(v.max(0)).unwrap_or(u16::MAX)
}

#[inline]
fn len(s: &str) -> i32 {
    i32::try_from(s.len()).unwrap_or(i32::MAX)
}

#[inline]
fn cell_at(buf: &Buffer, x: i32, y: i32) -> Option<&Cell> {
    buf.cell_at(u16::try_from(x).ok()?, u16::try_from(y).ok()?)
}

/// Cell equality where "no cell" (out of bounds) only equals itself.
#[inline]
fn cell_eq(a: Option<&Cell>, b: Option<&Cell>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        (None, None) => true,
        _ => false,
    }
}

/// Whether erase sequences (EL, ED, ECH) can produce `c`.
///
/// Assumes background color erase, which every xterm-compatible terminal
/// implements.
fn can_clear_with(c: Option<&Cell>) -> bool {
    let Some(c) = c else {
        return true;
    };
    if c.width != 1 || c.content != " " {
        return false;
    }
    let harmless = Attr::BOLD | Attr::FAINT | Attr::ITALIC | Attr::BLINK | Attr::RAPID_BLINK;
    c.style.underline == UnderlineStyle::None
        && c.style.attrs.difference(harmless).is_empty()
        && c.link.is_zero()
}

/// REP only repeats the last printed code point, and some terminals get it
/// wrong for anything but ASCII.
fn is_repeatable(c: &Cell) -> bool {
    c.width == 1 && c.content.len() == 1 && matches!(c.content.as_bytes()[0], 0x20..=0x7e)
}

fn not_local(cols: i32, fx: i32, fy: i32, tx: i32, ty: i32) -> bool {
    tx > LONG_DISTANCE
        && tx < cols - 1 - LONG_DISTANCE
        && (ty - fy).abs() + (tx - fx).abs() > LONG_DISTANCE
}

/// Copy `new` into `old` on row `y` from column `first` on.
fn sync_line(old: &mut Buffer, new: &Buffer, y: i32, first: i32) {
    let (Some(o), Some(n)) = (old.line_mut(to_u16(y)), new.line(to_u16(y))) else {
        return;
    };
    let m = o.len().min(n.len());
    let f = usize::try_from(first).unwrap_or(0);
    let f = if f < m { f } else { 0 };
    o[f..m].clone_from_slice(&n[f..m]);
}

fn line_hash(line: &Line) -> u64 {
    let mut h = DefaultHasher::new();
    line.hash(&mut h);
    h.finish()
}

// ─── Emitter ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
struct SavedCursor {
    x: i32,
    y: i32,
    pen: Style,
    link: Link,
}

/// Output queue plus the model of the terminal's cursor and pen.
///
/// Every method that takes `old` treats it as the committed screen model;
/// `new` is the frame being rendered.
#[derive(Debug)]
struct Emitter {
    out: Vec<u8>,
    x: i32,
    y: i32,
    pen: Style,
    link: Link,
    saved: SavedCursor,
    at_phantom: bool,
    flags: Flags,
    caps: Capabilities,
    tabs: Option<TabStops>,
    profile: ColorProfile,
    /// How far down inline mode has already scrolled the terminal.
    scroll_height: i32,
}

impl Emitter {
    #[inline]
    fn put(&mut self, s: &str) {
        self.out.extend_from_slice(s.as_bytes());
    }

    #[inline]
    fn has(&self, f: Flags) -> bool {
        self.flags.contains(f)
    }

    /// A space in the current pen: what erase sequences would leave behind.
    fn clear_blank(&self) -> Cell {
        Cell {
            content: " ".to_string(),
            style: self.pen,
            link: self.link.clone(),
            width: 1,
        }
    }

    // ── Pen ─────────────────────────────────────────────────────────────

    /// Switch the pen to the cell's style and link. `None` resets both.
    fn update_pen(&mut self, cell: Option<&Cell>) {
        let Some(cell) = cell else {
            if !self.pen.is_zero() {
                self.put(ansi::RESET_STYLE);
                self.pen = Style::DEFAULT;
            }
            if !self.link.is_zero() {
                self.put(ansi::RESET_HYPERLINK);
                self.link = Link::default();
            }
            return;
        };

        let new_style = cell.style.convert(self.profile);
        let old_style = self.pen.convert(self.profile);
        if new_style != old_style {
            let seq = new_style.diff(&old_style);
            self.put(&seq);
            self.pen = cell.style;
        }

        let new_link = cell.link.clone().convert(self.profile);
        let old_link = self.link.clone().convert(self.profile);
        if new_link != old_link {
            self.put(&ansi::hyperlink(&new_link.url, &new_link.params));
            self.link.clone_from(&cell.link);
        }
    }

    // ── Cells ───────────────────────────────────────────────────────────

    fn put_attr_cell(&mut self, width: i32, cell: Option<&Cell>) {
        // Placeholders are never written; the wide cell before them already
        // covered their columns.
        if cell.is_some_and(Cell::is_zero) {
            return;
        }
        if self.at_phantom {
            self.x = 0;
            self.y += 1;
            self.at_phantom = false;
        }

        self.update_pen(cell);
        let w = match cell {
            Some(c) => {
                self.put(&c.content);
                i32::from(c.width)
            }
            None => {
                self.put(" ");
                1
            }
        };

        self.x += w;
        if self.x >= width {
            self.at_phantom = true;
        }
    }

    fn put_cell(&mut self, new: &Buffer, cell: Option<&Cell>) {
        let (w, h) = (dim(new.width()), dim(new.height()));
        if self.has(Flags::FULLSCREEN) && self.x == w - 1 && self.y == h - 1 {
            self.put_cell_lr(w, cell);
        } else {
            self.put_attr_cell(w, cell);
        }
    }

    /// The bottom-right cell, written with autowrap off so the screen
    /// doesn't scroll.
    fn put_cell_lr(&mut self, width: i32, cell: Option<&Cell>) {
        if cell.is_some_and(Cell::is_zero) {
            return;
        }
        let x = self.x;
        self.put(ansi::RESET_AUTOWRAP);
        self.put_attr_cell(width, cell);
        self.at_phantom = false;
        self.x = x;
        self.put(ansi::SET_AUTOWRAP);
    }

    // ── Movement ────────────────────────────────────────────────────────

    /// Move to `(x, y)`, handling autowrap overflow and the phantom state.
    ///
    /// Coordinates are clamped to the larger of the two buffers so a move
    /// in the middle of a resize stays on screen.
    fn move_to(&mut self, old: &Buffer, new: Option<&Buffer>, x: i32, y: i32) {
        let mut width = dim(old.width());
        let mut height = dim(old.height());
        if let Some(n) = new {
            width = width.max(dim(n.width()));
            height = height.max(dim(n.height()));
        }

        let (mut x, mut y) = (x, y);
        if width > 0 && x >= width {
            y += x / width;
            x %= width;
        }

        // Some moves (LF in particular) paint the new position with the
        // current background.
        if y != self.y && !(self.pen.is_zero() && self.link.is_zero()) {
            self.update_pen(None);
        }

        if self.at_phantom {
            self.x = 0;
            self.put("\r");
            self.at_phantom = false;
        }

        if height > 0 {
            self.y = self.y.min(height - 1);
            y = y.min(height - 1);
        }

        if x == self.x && y == self.y {
            return;
        }
        self.move_cursor(new, x, y, true);
    }

    /// Emit the cheapest sequence to `(x, y)` without any bounds checks.
    fn move_cursor(&mut self, new: Option<&Buffer>, x: i32, y: i32, overwrite: bool) {
        if !self.has(Flags::FULLSCREEN)
            && self.has(Flags::RELATIVE_CURSOR)
            && self.x == -1
            && self.y == -1
        {
            // First move in inline mode: all we know is the row.
            self.put("\r");
            self.x = 0;
            self.y = 0;
        }
        let (seq, scrolled) = self.cursor_program(new, x, y, overwrite);
        self.scroll_height = self.scroll_height.max(scrolled);
        self.put(&seq);
        self.x = x;
        self.y = y;
    }

    /// The shortest known way from the current position to `(x, y)`, and
    /// how far down it scrolled in inline mode.
    fn cursor_program(&self, new: Option<&Buffer>, x: i32, y: i32, overwrite: bool) -> (String, i32) {
        let (fx, fy) = (self.x, self.y);
        let relative = self.has(Flags::RELATIVE_CURSOR);
        let mut seq = String::new();
        let mut scrolled = 0;

        if !relative {
            let width = self
                .tabs
                .as_ref()
                .map(|t| dim(t.width()))
                .or_else(|| new.map(|n| dim(n.width())));
            seq = ansi::cursor_position(x, y);
            match width {
                Some(w) if fx != -1 && fy != -1 && !not_local(w, fx, fy, x, y) => {}
                _ => return (seq, 0),
            }
        }

        let mut trials = 0u8;
        if self.caps.contains(Capabilities::HT) {
            trials |= 0b10;
        }
        if self.caps.contains(Capabilities::BS) {
            trials |= 0b01;
        }

        for i in 0..=trials {
            if i & !trials != 0 {
                continue;
            }
            let tabs = i & 0b10 != 0;
            let bs = i & 0b01 != 0;

            let (s, h) = self.relative_move(new, fx, fy, x, y, overwrite, tabs, bs);
            if (i == 0 && seq.is_empty()) || s.len() < seq.len() {
                seq = s;
                scrolled = h;
            }

            let (s, h) = self.relative_move(new, 0, fy, x, y, overwrite, tabs, bs);
            if s.len() + 1 < seq.len() {
                seq = format!("\r{s}");
                scrolled = h;
            }

            if !relative {
                let (s, h) = self.relative_move(new, 0, 0, x, y, overwrite, tabs, bs);
                if ansi::CURSOR_HOME.len() + s.len() < seq.len() {
                    seq = format!("{}{s}", ansi::CURSOR_HOME);
                    scrolled = h;
                }
            }
        }

        (seq, scrolled)
    }

    /// Local movement from `(fx, fy)` to `(tx, ty)`.
    #[allow(clippy::too_many_arguments, clippy::fn_params_excessive_bools)]
    fn relative_move(
        &self,
        new: Option<&Buffer>,
        fx: i32,
        fy: i32,
        tx: i32,
        ty: i32,
        overwrite: bool,
        use_tabs: bool,
        use_backspace: bool,
    ) -> (String, i32) {
        let relative = self.has(Flags::RELATIVE_CURSOR);
        let mut fx = fx;
        let mut seq = String::new();
        let mut scrolled = 0;

        if ty != fy {
            let mut yseq = String::new();
            if self.caps.contains(Capabilities::VPA) && !relative {
                yseq = ansi::vertical_position_absolute(ty + 1);
            }

            if ty > fy {
                let n = ty - fy;
                let cud = ansi::cursor_down(n);
                if yseq.is_empty() || cud.len() < yseq.len() {
                    yseq = cud;
                }
                // Inline mode grows the screen with newlines.
                let must_scroll = !self.has(Flags::FULLSCREEN) && ty > self.scroll_height;
                if must_scroll || n < len(&yseq) {
                    yseq = "\n".repeat(usize::try_from(n).unwrap_or(0));
                    scrolled = ty;
                    if self.has(Flags::MAP_NEWLINE) {
                        fx = 0;
                    }
                }
            } else {
                let n = fy - ty;
                let cuu = ansi::cursor_up(n);
                if yseq.is_empty() || cuu.len() < yseq.len() {
                    yseq = cuu;
                }
                if n == 1 && fy - 1 > 0 {
                    yseq = ansi::REVERSE_INDEX.to_string();
                }
            }
            seq.push_str(&yseq);
        }

        if tx != fx {
            let mut xseq = String::new();
            if !relative {
                if self.caps.contains(Capabilities::HPA) {
                    xseq = ansi::horizontal_position_absolute(tx + 1);
                } else if self.caps.contains(Capabilities::CHA) {
                    xseq = ansi::cursor_horizontal_absolute(tx + 1);
                }
            }

            if tx > fx {
                let mut n = tx - fx;
                if let (true, Some(tabs), true) = (use_tabs, &self.tabs, fx >= 0) {
                    let next = |c: i32| dim(tabs.next(to_u16(c)));
                    let last = dim(tabs.width()) - 1;
                    let mut count = 0;
                    let mut col = fx;
                    while next(col) <= tx {
                        count += 1;
                        if col == next(col) || col >= last {
                            break;
                        }
                        col = next(col);
                    }
                    if count > 0 {
                        let cht = ansi::cursor_horizontal_tab(count);
                        let tab = "\t".repeat(usize::try_from(count).unwrap_or(0));
                        if self.caps.contains(Capabilities::CHT) && cht.len() < tab.len() {
                            seq.push_str(&cht);
                        } else {
                            seq.push_str(&tab);
                        }
                        n = tx - col;
                        fx = col;
                    }
                }

                if n <= 0 {
                    xseq.clear();
                } else {
                    let cuf = ansi::cursor_forward(n);
                    if xseq.is_empty() || cuf.len() < xseq.len() {
                        xseq = cuf;
                    }
                    if let (true, Some(new)) = (overwrite && ty >= 0, new) {
                        if let Some(ovw) = self.overwrite_run(new, fx, ty, n) {
                            if ovw.len() < xseq.len() {
                                xseq = ovw;
                            }
                        }
                    }
                }
            } else {
                let mut n = fx - tx;
                if let (true, Some(tabs), true) =
                    (use_tabs, &self.tabs, self.caps.contains(Capabilities::CBT))
                {
                    let prev = |c: i32| dim(tabs.prev(to_u16(c)));
                    let mut col = fx;
                    let mut count = 0;
                    while prev(col) >= tx {
                        col = prev(col);
                        count += 1;
                        if col == prev(col) || col <= 0 {
                            break;
                        }
                    }
                    if count > 0 {
                        seq.push_str(&ansi::cursor_backward_tab(count));
                        n = col - tx;
                    }
                }

                if n <= 0 {
                    xseq.clear();
                } else {
                    let cub = ansi::cursor_backward(n);
                    if xseq.is_empty() || cub.len() < xseq.len() {
                        xseq = cub;
                    }
                    if use_backspace && n < len(&xseq) {
                        xseq = "\x08".repeat(usize::try_from(n).unwrap_or(0));
                    }
                }
            }

            seq.push_str(&xseq);
        }

        (seq, scrolled)
    }

    /// Re-print the `n` cells right of `(fx, y)` to move across them.
    /// Only possible when every one of them is whole and already in the
    /// current pen.
    fn overwrite_run(&self, new: &Buffer, fx: i32, y: i32, n: i32) -> Option<String> {
        let mut s = String::new();
        let mut i = 0;
        while i < n {
            let c = cell_at(new, fx + i, y)?;
            let w = i32::from(c.width);
            if w == 0 || i + w > n || c.style != self.pen || c.link != self.link {
                return None;
            }
            s.push_str(&c.content);
            i += w;
        }
        Some(s)
    }

    // ── Spans ───────────────────────────────────────────────────────────

    /// Write `n` cells of `line`, using ECH and REP for runs when allowed.
    /// Returns whether the cursor was left short of the end of the span.
    fn emit_range(&mut self, old: &Buffer, new: &Buffer, line: &[Cell], n: i32) -> bool {
        let has_ech = self.caps.contains(Capabilities::ECH);
        let has_rep = self.caps.contains(Capabilities::REP);
        let mut line = line;
        let mut n = n;

        if !has_ech && !has_rep {
            for c in line.iter().take(usize::try_from(n).unwrap_or(0)) {
                self.put_cell(new, Some(c));
            }
            return false;
        }

        while n > 0 {
            while n > 1 && !cell_eq(line.first(), line.get(1)) {
                self.put_cell(new, line.first());
                line = line.get(1..).unwrap_or_default();
                n -= 1;
            }

            let Some(cell0) = line.first().cloned() else {
                return false;
            };
            if n == 1 {
                self.put_cell(new, Some(&cell0));
                return false;
            }

            let mut count = 2;
            while count < n && cell_eq(line.get(usize::try_from(count).unwrap_or(0)), Some(&cell0)) {
                count += 1;
            }

            let ech = ansi::erase_character(count);
            let skip = if count < n { len(&ansi::cursor_forward(count)) } else { 0 };
            let rep = ansi::repeat_previous_character(count);

            if has_ech && count > len(&ech) + skip && can_clear_with(Some(&cell0)) {
                self.update_pen(Some(&cell0));
                self.put(&ech);
                if count < n {
                    let (x, y) = (self.x + count, self.y);
                    self.move_to(old, Some(new), x, y);
                } else {
                    return true;
                }
            } else if has_rep && count > len(&rep) && is_repeatable(&cell0) {
                // Leave the last cell to a real write so the phantom state
                // is tracked.
                let wrap = self.x + count >= dim(new.width());
                let mut reps = if wrap { count - 1 } else { count };

                self.update_pen(Some(&cell0));
                self.put_cell(new, Some(&cell0));
                reps -= 1;
                if reps > 0 {
                    self.put(&ansi::repeat_previous_character(reps));
                    self.x += reps;
                }
                if wrap {
                    self.put_cell(new, Some(&cell0));
                }
            } else {
                for i in 0..count {
                    self.put_cell(new, line.get(usize::try_from(i).unwrap_or(0)));
                }
            }

            line = line.get(usize::try_from(count).unwrap_or(0)..).unwrap_or_default();
            n -= count;
        }

        false
    }

    /// Write columns `start..=end` of row `y`, skipping an unchanged tail.
    fn put_range(&mut self, old: &Buffer, new: &Buffer, y: i32, start: i32, end: i32) -> bool {
        let Some(line) = new.line(to_u16(y)) else {
            return false;
        };
        let from = line.cells().get(usize::try_from(start).unwrap_or(0)..).unwrap_or_default();

        let inline = len(&ansi::cursor_position(start, y))
            .min(len(&ansi::horizontal_position_absolute(start + 1)))
            .min(len(&ansi::cursor_forward(start + 1)));
        if end - start + 1 <= inline {
            return self.emit_range(old, new, from, end - start + 1);
        }

        let mut same = 0;
        for j in start..=end {
            let (oc, nc) = (cell_at(old, j, y), cell_at(new, j, y));
            if same == 0 && oc.is_some_and(Cell::is_zero) {
                continue;
            }
            if cell_eq(oc, nc) {
                same += 1;
            } else {
                same = 0;
            }
        }

        let eoi = self.emit_range(old, new, from, end + 1 - same - start);
        if same == 0 { eoi } else { true }
    }

    fn el0_cost(&self) -> i32 {
        if self.caps.is_empty() {
            len(ansi::ERASE_LINE_RIGHT)
        } else {
            0
        }
    }

    /// Clear from the cursor to the end of the line.
    fn clear_to_end(&mut self, old: &mut Buffer, new: &Buffer, blank: &Cell, force: bool) {
        let mut force = force;
        let nw = dim(new.width());
        if self.y >= 0 {
            for j in self.x.max(0)..nw {
                if !cell_eq(cell_at(old, j, self.y), Some(blank)) {
                    old.set_cell(to_u16(j), to_u16(self.y), Some(blank));
                    force = true;
                }
            }
        }

        if force && !self.at_phantom && self.x < nw {
            self.update_pen(Some(blank));
            let count = nw - self.x;
            if self.el0_cost() <= count {
                self.put(ansi::ERASE_LINE_RIGHT);
            } else {
                for _ in 0..count {
                    self.put_cell(new, Some(blank));
                }
            }
        }
    }

    /// Insert `count` cells from `line` at the cursor, shifting the rest
    /// of the row right.
    fn insert_cells(&mut self, new: &Buffer, line: &[Cell], count: i32) {
        let ich = self.caps.contains(Capabilities::ICH);
        if ich {
            self.put(&ansi::insert_character(count));
        } else {
            self.put(ansi::SET_INSERT_MODE);
        }
        let w = dim(new.width());
        for i in 0..count {
            self.put_attr_cell(w, line.get(usize::try_from(i).unwrap_or(0)));
        }
        if !ich {
            self.put(ansi::RESET_INSERT_MODE);
        }
    }

    // ── Lines ───────────────────────────────────────────────────────────

    /// Bring row `y` of the terminal from `old` to `new`.
    #[allow(clippy::too_many_lines, clippy::cognitive_complexity)]
    fn transform_line(&mut self, old: &mut Buffer, new: &Buffer, y: i32) {
        let ow = dim(old.width());
        let nw = dim(new.width());
        let o = |b: &Buffer, x: i32| cell_at(b, x, y).cloned();
        let mut first = 0;

        // Leading blanks might be cheaper to clear with EL 1.
        let blank = o(new, 0);
        if can_clear_with(blank.as_ref()) {
            let o_first = (0..ow)
                .find(|&x| !cell_eq(cell_at(&*old, x, y), blank.as_ref()))
                .unwrap_or(ow);
            let n_first = (0..nw)
                .find(|&x| !cell_eq(cell_at(new, x, y), blank.as_ref()))
                .unwrap_or(nw);

            if n_first == o_first {
                first = n_first;
                while first < nw && cell_eq(cell_at(old, first, y), cell_at(new, first, y)) {
                    first += 1;
                }
            } else if o_first > n_first {
                first = n_first;
            } else {
                first = o_first;
                if len(ansi::ERASE_LINE_LEFT) < n_first - o_first {
                    if n_first >= nw {
                        self.move_to(old, Some(new), 0, y);
                        self.update_pen(blank.as_ref());
                        self.put(ansi::ERASE_LINE_RIGHT);
                    } else {
                        self.move_to(old, Some(new), n_first - 1, y);
                        self.update_pen(blank.as_ref());
                        self.put(ansi::ERASE_LINE_LEFT);
                    }
                    while first < n_first {
                        old.set_cell(to_u16(first), to_u16(y), blank.as_ref());
                        first += 1;
                    }
                }
            }
        } else {
            while first < nw && cell_eq(cell_at(new, first, y), cell_at(old, first, y)) {
                first += 1;
            }
        }

        if first >= nw {
            return;
        }

        // A line ending in something EL can't produce is rewritten up to
        // its last difference.
        let blank = o(new, nw - 1);
        if blank.is_some() && !can_clear_with(blank.as_ref()) {
            let mut n_last = nw - 1;
            while n_last > first && cell_eq(cell_at(new, n_last, y), cell_at(old, n_last, y)) {
                n_last -= 1;
            }
            self.move_to(old, Some(new), first, y);
            self.put_range(old, new, y, first, n_last);
            sync_line(old, new, y, first);
            return;
        }
        let blank = blank.unwrap_or_default();

        let mut o_last = nw - 1;
        while o_last > first && cell_eq(cell_at(old, o_last, y), Some(&blank)) {
            o_last -= 1;
        }
        let mut n_last = nw - 1;
        while n_last > first && cell_eq(cell_at(new, n_last, y), Some(&blank)) {
            n_last -= 1;
        }

        if n_last == first && self.el0_cost() < o_last - n_last {
            // One cell then blanks.
            self.move_to(old, Some(new), first, y);
            if !cell_eq(cell_at(new, first, y), Some(&blank)) {
                let c = o(new, first);
                self.put_cell(new, c.as_ref());
            }
            self.clear_to_end(old, new, &blank, false);
        } else if n_last != o_last && !cell_eq(cell_at(new, n_last, y), cell_at(old, o_last, y)) {
            // Different tails: repaint and clear whatever is left.
            self.move_to(old, Some(new), first, y);
            if o_last - n_last > self.el0_cost() {
                if self.put_range(old, new, y, first, n_last) {
                    self.move_to(old, Some(new), n_last + 1, y);
                }
                self.clear_to_end(old, new, &blank, false);
            } else {
                let n = n_last.max(o_last);
                self.put_range(old, new, y, first, n);
            }
        } else {
            // Matching tails: maybe the middle just shifted.
            let n_last_non_blank = n_last;
            let o_last_non_blank = o_last;

            while cell_eq(cell_at(new, n_last, y), cell_at(old, o_last, y)) {
                if !cell_eq(cell_at(new, n_last - 1, y), cell_at(old, o_last - 1, y)) {
                    break;
                }
                n_last -= 1;
                o_last -= 1;
                if n_last == -1 || o_last == -1 {
                    break;
                }
            }

            let mut n = n_last.min(o_last);
            if n >= first {
                self.move_to(old, Some(new), first, y);
                self.put_range(old, new, y, first, n);
            }

            if o_last < n_last {
                let m = n_last_non_blank.max(o_last_non_blank);
                if n != 0 {
                    while n > 0 {
                        match cell_at(new, n + 1, y) {
                            Some(c) if c.is_zero() => {
                                n -= 1;
                                o_last -= 1;
                            }
                            _ => break,
                        }
                    }
                } else if n >= first && cell_at(new, n, y).is_some_and(|c| c.width > 1) {
                    while cell_at(new, n + 1, y).is_some_and(Cell::is_zero) {
                        n += 1;
                        o_last += 1;
                    }
                }

                self.move_to(old, Some(new), n + 1, y);
                let ich_cost = ICH_OVERHEAD + n_last - o_last;
                if self.caps.contains(Capabilities::ICH) && (n_last < n_last_non_blank || ich_cost > m - n) {
                    self.put_range(old, new, y, n + 1, m);
                } else {
                    let rest = new
                        .line(to_u16(y))
                        .and_then(|l| l.cells().get(usize::try_from(n + 1).unwrap_or(0)..))
                        .unwrap_or_default();
                    self.insert_cells(new, rest, n_last - o_last);
                }
            } else if o_last > n_last {
                self.move_to(old, Some(new), n + 1, y);
                let dch_cost = DCH_OVERHEAD + o_last - n_last;
                if !self.caps.contains(Capabilities::ICH)
                    || dch_cost > len(ansi::ERASE_LINE_RIGHT) + n_last_non_blank - (n + 1)
                {
                    if self.put_range(old, new, y, n + 1, n_last_non_blank) {
                        self.move_to(old, Some(new), n_last_non_blank + 1, y);
                    }
                    self.clear_to_end(old, new, &blank, false);
                } else {
                    // DCH pulls in cells from the right margin in the pen's
                    // background.
                    self.update_pen(Some(&blank));
                    self.put(&ansi::delete_character(o_last - n_last));
                }
            }
        }

        sync_line(old, new, y, first);
    }

    // ── Screen ──────────────────────────────────────────────────────────

    /// ED from the cursor, mirrored in `old`.
    fn clear_to_bottom(&mut self, old: &mut Buffer, blank: &Cell) {
        let row = to_u16(self.y);
        let col = to_u16(self.x);
        self.update_pen(Some(blank));
        self.put(ansi::ERASE_SCREEN_BELOW);

        let w = old.width();
        old.fill_area(Some(blank), Rect::new(col, row, w.saturating_sub(col), 1));
        let below = row.saturating_add(1);
        old.fill_area(Some(blank), Rect::new(0, below, w, old.height().saturating_sub(below)));
    }

    /// If the last rows of `new` are blank and some of them aren't on
    /// screen yet, clear them all with one ED. Returns the first row that
    /// still needs line-by-line work.
    fn clear_bottom(&mut self, old: &mut Buffer, new: &Buffer, total: i32) -> i32 {
        if total <= 0 {
            return 0;
        }

        let mut top = total;
        let blank = self.clear_blank();
        if !can_clear_with(Some(&blank)) {
            return top;
        }

        let (ow, nw) = (dim(old.width()), dim(new.width()));
        for row in (0..total).rev() {
            let new_blank = (0..nw).all(|c| cell_at(new, c, row) == Some(&blank));
            if !new_blank {
                break;
            }
            // Rows the old model doesn't have were cleared with the screen.
            let old_blank = (0..ow).all(|c| cell_at(&*old, c, row).is_none_or(|x| *x == blank));
            if !old_blank {
                top = row;
            }
        }

        if top < total {
            self.move_to(old, Some(new), 0, top);
            self.clear_to_bottom(old, &blank);
        }
        top
    }

    fn clear_screen(&mut self, old: &mut Buffer, blank: &Cell) {
        self.update_pen(Some(blank));
        self.put(ansi::CURSOR_HOME);
        self.put(ansi::ERASE_ENTIRE_SCREEN);
        self.x = 0;
        self.y = 0;
        self.at_phantom = false;
        old.fill(Some(blank));
    }

    fn clear_below(&mut self, old: &mut Buffer, new: &Buffer, blank: &Cell, row: i32) {
        self.move_to(old, Some(new), 0, row);
        self.clear_to_bottom(old, blank);
    }

    /// Clear everything and repaint `new` from scratch.
    fn clear_update(&mut self, old: &mut Buffer, new: &Buffer) {
        let blank = self.clear_blank();
        let nh = dim(new.height());
        let rows = if self.has(Flags::FULLSCREEN) {
            self.clear_screen(old, &blank);
            dim(old.height()).max(nh)
        } else {
            self.clear_below(old, new, &blank, 0);
            nh
        };
        let rows = self.clear_bottom(old, new, rows);
        for y in 0..rows.min(nh) {
            self.transform_line(old, new, y);
        }
    }

    /// Shift the largest moved block of lines with a hardware scroll.
    /// Rows inside the scrolled region are marked dirty.
    fn scroll_optimize(&mut self, old: &mut Buffer, new: &Buffer, dirty: &mut [bool]) {
        let h = dim(new.height());
        if h < 3 || old.width() != new.width() || old.height() != new.height() {
            return;
        }

        let oldh: Vec<u64> = old.lines().iter().map(line_hash).collect();
        let newh: Vec<u64> = new.lines().iter().map(line_hash).collect();
        let blank = line_hash(&Line::new(new.width()));
        let at = |v: &[u64], i: i32| v[usize::try_from(i).unwrap_or(0)];

        // (changed non-blank lines, shift, first row, end row)
        let mut best: Option<(usize, i32, i32, i32)> = None;
        for k in (1 - h)..h {
            if k == 0 {
                continue;
            }
            let mut i = (-k).max(0);
            while i < h && i + k < h {
                if at(&newh, i) != at(&oldh, i + k) {
                    i += 1;
                    continue;
                }
                let start = i;
                let mut useful = 0;
                while i < h && i + k >= 0 && i + k < h && at(&newh, i) == at(&oldh, i + k) {
                    if at(&newh, i) != blank && at(&newh, i) != at(&oldh, i) {
                        useful += 1;
                    }
                    i += 1;
                }
                if useful >= MIN_SCROLL_LINES && best.is_none_or(|(u, ..)| useful > u) {
                    best = Some((useful, k, start, i));
                }
            }
        }

        let Some((useful, k, start, end)) = best else {
            return;
        };
        let (top, bottom) = if k > 0 { (start, end - 1 + k) } else { (start + k, end - 1) };
        tracing::debug!(shift = k, top, bottom, lines = useful, "scroll optimization");

        // Scrolled-in lines take the pen's background.
        self.update_pen(None);
        self.put(&ansi::set_scroll_region(top + 1, bottom + 1));
        // DECSTBM homes the cursor.
        self.x = 0;
        self.y = 0;
        self.at_phantom = false;

        let w = new.width();
        let region = Rect::new(0, to_u16(top), w, to_u16(bottom - top + 1));
        if k > 0 {
            if self.caps.contains(Capabilities::SU) {
                self.put(&ansi::scroll_up(k));
            } else {
                self.move_cursor(None, 0, top, false);
                self.put(&ansi::delete_line(k));
            }
            old.delete_line_area(to_u16(top), to_u16(k), None, region);
        } else {
            if self.caps.contains(Capabilities::SD) {
                self.put(&ansi::scroll_down(-k));
            } else {
                self.move_cursor(None, 0, top, false);
                self.put(&ansi::insert_line(-k));
            }
            old.insert_line_area(to_u16(top), to_u16(-k), None, region);
        }

        self.put(ansi::RESET_SCROLL_REGION);
        self.x = 0;
        self.y = 0;

        for row in top..=bottom {
            if let Some(d) = dirty.get_mut(usize::try_from(row).unwrap_or(usize::MAX)) {
                *d = true;
            }
        }
    }
}

// ─── TerminalRenderer ────────────────────────────────────────────────────────

/// Diffing renderer with a buffered output queue.
///
/// Not thread-safe: one render pass at a time, from one owner.
#[derive(Debug)]
pub struct TerminalRenderer {
    em: Emitter,
    /// What the terminal shows.
    curbuf: Buffer,
    /// Repaint everything on the next render.
    clear: bool,
    term: String,
}

impl TerminalRenderer {
    /// A renderer for terminal type `term` (as in `$TERM`), downsampling
    /// colors to `profile`. Starts in inline mode.
    #[must_use]
    pub fn new(term: &str, profile: ColorProfile) -> Self {
        Self {
            em: Emitter {
                out: Vec::new(),
                x: -1,
                y: -1,
                pen: Style::DEFAULT,
                link: Link::default(),
                saved: SavedCursor {
                    x: -1,
                    y: -1,
                    ..SavedCursor::default()
                },
                at_phantom: false,
                flags: Flags::RELATIVE_CURSOR,
                caps: Capabilities::for_term(term),
                tabs: None,
                profile,
                scroll_height: 0,
            },
            curbuf: Buffer::default(),
            clear: false,
            term: term.to_string(),
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.term, config.color_profile)
    }

    // ── Settings ────────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub const fn color_profile(&self) -> ColorProfile {
        self.em.profile
    }

    pub const fn set_color_profile(&mut self, profile: ColorProfile) {
        self.em.profile = profile;
    }

    #[inline]
    #[must_use]
    pub const fn capabilities(&self) -> Capabilities {
        self.em.caps
    }

    /// Override the capability profile derived from the terminal type.
    pub const fn set_capabilities(&mut self, caps: Capabilities) {
        self.em.caps = caps;
    }

    /// Use hardware scrolling for moved blocks in fullscreen mode.
    pub fn set_scroll_optim(&mut self, on: bool) {
        self.em.flags.set(Flags::SCROLL_OPTIM, on);
    }

    /// Whether the tty maps LF to CR LF on output.
    pub fn set_map_newline(&mut self, on: bool) {
        self.em.flags.set(Flags::MAP_NEWLINE, on);
    }

    /// Whether backspace may be used to move left.
    pub fn set_backspace(&mut self, on: bool) {
        self.em.caps.set(Capabilities::BS, on);
    }

    /// Enable hard-tab movement with default stops across `width` columns.
    /// `None` disables it, as does the Linux console.
    pub fn set_tab_stops(&mut self, width: Option<u16>) {
        match width {
            Some(w) if !self.term.starts_with("linux") => {
                self.em.caps.insert(Capabilities::HT);
                self.em.tabs = Some(TabStops::with_default_interval(w));
            }
            _ => {
                self.em.caps.remove(Capabilities::HT);
                self.em.tabs = None;
            }
        }
    }

    /// Whether the renderer owns the whole screen.
    pub fn set_fullscreen(&mut self, on: bool) {
        self.em.flags.set(Flags::FULLSCREEN, on);
    }

    #[inline]
    #[must_use]
    pub fn is_fullscreen(&self) -> bool {
        self.em.has(Flags::FULLSCREEN)
    }

    /// Restrict movement to relative sequences.
    pub fn set_relative_cursor(&mut self, on: bool) {
        self.em.flags.set(Flags::RELATIVE_CURSOR, on);
    }

    // ── Cursor & alt screen ─────────────────────────────────────────────

    /// Remember the cursor position and pen, as DECSC does.
    pub fn save_cursor(&mut self) {
        self.em.saved = SavedCursor {
            x: self.em.x,
            y: self.em.y,
            pen: self.em.pen,
            link: self.em.link.clone(),
        };
    }

    /// Go back to the saved position and pen, as DECRC does.
    pub fn restore_cursor(&mut self) {
        let s = self.em.saved.clone();
        self.em.x = s.x;
        self.em.y = s.y;
        self.em.pen = s.pen;
        self.em.link = s.link;
        self.em.at_phantom = false;
    }

    /// Queue DECSET 1049 and switch to fullscreen, absolute movement. The
    /// next render repaints from scratch.
    pub fn enter_alt_screen(&mut self) {
        self.save_cursor();
        self.em.put(ansi::SET_ALT_SCREEN);
        self.set_fullscreen(true);
        self.set_relative_cursor(false);
        self.erase();
    }

    /// Queue DECRST 1049 and go back to inline mode.
    pub fn exit_alt_screen(&mut self) {
        self.erase();
        self.set_relative_cursor(true);
        self.set_fullscreen(false);
        self.em.put(ansi::RESET_ALT_SCREEN);
        self.restore_cursor();
    }

    /// Print `text` above the managed area. The printed lines are not
    /// tracked; in fullscreen they are overwritten by the next frame.
    pub fn prepend_string(&mut self, newbuf: &Buffer, text: &str) {
        if text.is_empty() {
            return;
        }

        let w = dim(newbuf.width());
        let h = dim(newbuf.height());
        self.em.move_to(&self.curbuf, Some(newbuf), 0, h - 1);

        let lines: Vec<&str> = text.split('\n').collect();
        let mut offset = 0;
        for line in &lines {
            let lw = i32::try_from(ansi::string_width(line)).unwrap_or(i32::MAX);
            offset += if w > 0 { ((lw + w - 1) / w).max(1) } else { 1 };
        }

        // Scroll the screen up from the bottom, then open that many lines
        // at the top of the managed area and print into them.
        self.em.put(&"\n".repeat(usize::try_from(offset).unwrap_or(0)));
        self.em.y += offset;
        self.em.move_cursor(Some(newbuf), 0, 0, false);
        self.em.put(&ansi::insert_line(offset));
        for line in lines {
            self.em.put(line);
            self.em.put("\r\n");
        }
    }

    /// Move the cursor to `(x, y)` with the shortest sequence.
    pub fn move_to(&mut self, x: i32, y: i32) {
        self.em.move_to(&self.curbuf, Some(&self.curbuf), x, y);
    }

    /// Where the renderer believes the cursor is. `(-1, -1)` until the
    /// first move.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> (i32, i32) {
        (self.em.x, self.em.y)
    }

    /// Tell the renderer the cursor was moved behind its back.
    pub const fn set_position(&mut self, x: i32, y: i32) {
        self.em.x = x;
        self.em.y = y;
        self.em.at_phantom = false;
    }

    // ── Rendering ───────────────────────────────────────────────────────

    /// Queue the changes needed to show `newbuf`, then mark it clean.
    pub fn render(&mut self, newbuf: &mut RenderBuffer) {
        if !self.clear && newbuf.touched_lines() == 0 {
            return;
        }

        let new = newbuf.buffer();
        let (nw, nh) = (new.width(), new.height());
        if self.curbuf.bounds().is_empty() {
            self.curbuf = Buffer::new(nw, nh);
        }
        if self.curbuf.width() != nw || self.curbuf.height() != nh {
            tracing::debug!(
                from = ?(self.curbuf.width(), self.curbuf.height()),
                to = ?(nw, nh),
                "frame size changed"
            );
            self.clear = true;
        }

        let em = &mut self.em;
        let old = &mut self.curbuf;
        if self.clear {
            tracing::debug!(width = nw, height = nh, "full redraw");
            em.clear_update(old, new);
            // Everything was repainted.
            old.clone_from(new);
            self.clear = false;
        } else {
            let mut dirty: Vec<bool> = (0..nh).map(|y| newbuf.is_touched(y)).collect();
            if em.has(Flags::SCROLL_OPTIM) && em.has(Flags::FULLSCREEN) {
                em.scroll_optimize(old, new, &mut dirty);
            }
            let rows = em.clear_bottom(old, new, dim(nh));
            for y in 0..rows.min(dim(nh)) {
                if dirty[usize::try_from(y).unwrap_or(0)] {
                    em.transform_line(old, new, y);
                }
            }
        }

        // Inline mode keeps the cursor on the last line so the terminal has
        // scrolled far enough for the whole frame.
        if !em.has(Flags::FULLSCREEN) && em.scroll_height < dim(nh) - 1 {
            em.move_to(old, Some(new), 0, dim(nh) - 1);
        }
        em.update_pen(None);
        newbuf.clear_touched();
    }

    /// Repaint everything now.
    pub fn redraw(&mut self, newbuf: &mut RenderBuffer) {
        self.clear = true;
        self.render(newbuf);
    }

    /// Repaint everything on the next render.
    pub const fn erase(&mut self) {
        self.clear = true;
    }

    /// The terminal was resized to `width` columns.
    pub fn resize(&mut self, width: u16, height: u16) {
        tracing::debug!(width, height, "renderer resize");
        if let Some(tabs) = &mut self.em.tabs {
            tabs.resize(width);
        }
        self.em.scroll_height = 0;
    }

    // ── Output ──────────────────────────────────────────────────────────

    /// Bytes queued for the next flush.
    #[inline]
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.em.out.len()
    }

    /// The queued bytes.
    #[inline]
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        &self.em.out
    }

    /// Queue raw text.
    pub fn write_str(&mut self, s: &str) {
        self.em.put(s);
    }

    /// Write everything queued to `w` in one call and empty the queue.
    pub fn flush_to(&mut self, w: &mut impl Write) -> io::Result<()> {
        if self.em.out.is_empty() {
            return Ok(());
        }
        tracing::trace!(bytes = self.em.out.len(), "flush");
        let result = w.write_all(&self.em.out);
        self.em.out.clear();
        result
    }
}

/// Writes are queued; nothing reaches the terminal until
/// [`TerminalRenderer::flush_to`].
impl Write for TerminalRenderer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.em.out.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn frame(width: u16, rows: &[&str]) -> RenderBuffer {
        let mut rb = RenderBuffer::new(width, u16::try_from(rows.len()).unwrap());
        for (y, row) in rows.iter().enumerate() {
            rb.set_string(0, u16::try_from(y).unwrap(), row, Style::DEFAULT);
        }
        rb
    }

    fn take(r: &mut TerminalRenderer) -> String {
        let mut out = Vec::new();
        r.flush_to(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn render(r: &mut TerminalRenderer, width: u16, rows: &[&str]) -> String {
        let mut rb = frame(width, rows);
        r.render(&mut rb);
        take(r)
    }

    fn fullscreen(term: &str) -> TerminalRenderer {
        let mut r = TerminalRenderer::new(term, ColorProfile::TrueColor);
        r.set_fullscreen(true);
        r.set_relative_cursor(false);
        r
    }

    fn has_csi(s: &str, final_byte: u8) -> bool {
        s.split("\x1b[").skip(1).any(|p| {
            let digits = p.bytes().take_while(u8::is_ascii_digit).count();
            p.as_bytes().get(digits) == Some(&final_byte)
        })
    }

    fn has_ech(s: &str) -> bool {
        has_csi(s, b'X')
    }

    // ── Inline basics ───────────────────────────────────────────────────

    #[test]
    fn first_inline_frame() {
        let mut r = TerminalRenderer::new("xterm-256color", ColorProfile::TrueColor);
        assert_eq!(render(&mut r, 4, &["hi"]), "\rhi");
    }

    #[test]
    fn unchanged_frame_emits_nothing() {
        let mut r = TerminalRenderer::new("xterm-256color", ColorProfile::TrueColor);
        render(&mut r, 4, &["hi"]);
        assert_eq!(render(&mut r, 4, &["hi"]), "");
    }

    #[test]
    fn untouched_buffer_is_skipped() {
        let mut r = TerminalRenderer::new("xterm-256color", ColorProfile::TrueColor);
        let mut rb = frame(4, &["hi"]);
        r.render(&mut rb);
        take(&mut r);
        r.render(&mut rb);
        assert_eq!(r.buffered(), 0);
    }

    #[test]
    fn single_cell_change_overwrites_to_reach_it() {
        let mut r = TerminalRenderer::new("xterm-256color", ColorProfile::TrueColor);
        render(&mut r, 4, &["hi"]);
        assert_eq!(render(&mut r, 4, &["ho"]), "\rho");
    }

    #[test]
    fn shorter_line_clears_to_end() {
        let mut r = TerminalRenderer::new("xterm-256color", ColorProfile::TrueColor);
        render(&mut r, 8, &["hello"]);
        assert_eq!(render(&mut r, 8, &["he"]), "\rhe\x1b[K");
    }

    #[test]
    fn styles_are_reset_after_frame() {
        let mut r = TerminalRenderer::new("xterm-256color", ColorProfile::TrueColor);
        let mut rb = RenderBuffer::new(3, 1);
        let bold = Cell::new("x").with_style(Style::new().with_attrs(Attr::BOLD));
        rb.set_cell(0, 0, Some(&bold));
        r.render(&mut rb);
        assert_eq!(take(&mut r), "\r\x1b[1mx\x1b[m");
    }

    #[test]
    fn inline_frame_grows_with_newlines() {
        let mut r = TerminalRenderer::new("xterm-256color", ColorProfile::TrueColor);
        assert_eq!(render(&mut r, 5, &["ui", ""]), "\rui\r\n");
        assert_eq!(r.position(), (0, 1));
    }

    // ── Fullscreen ──────────────────────────────────────────────────────

    #[test]
    fn fullscreen_uses_absolute_position() {
        let mut r = fullscreen("xterm-256color");
        assert_eq!(render(&mut r, 4, &["", "ab"]), "\x1b[2Hab");
    }

    #[test]
    fn alt_screen_clears_first() {
        let mut r = TerminalRenderer::new("xterm-256color", ColorProfile::TrueColor);
        r.enter_alt_screen();
        assert!(r.is_fullscreen());
        assert_eq!(render(&mut r, 3, &["a"]), "\x1b[?1049h\x1b[H\x1b[2Ja");
    }

    #[test]
    fn exit_alt_screen_restores_inline_mode() {
        let mut r = TerminalRenderer::new("xterm-256color", ColorProfile::TrueColor);
        r.enter_alt_screen();
        r.exit_alt_screen();
        assert!(!r.is_fullscreen());
        assert_eq!(take(&mut r), "\x1b[?1049h\x1b[?1049l");
        assert_eq!(r.position(), (-1, -1));
    }

    #[test]
    fn scroll_up_uses_scroll_region() {
        let mut r = fullscreen("kitty");
        r.set_scroll_optim(true);
        render(&mut r, 5, &["a", "b", "c", "d"]);
        assert_eq!(render(&mut r, 5, &["b", "c", "d", ""]), "\x1b[1;4r\x1b[S\x1b[r");
    }

    #[test]
    fn scroll_down_uses_scroll_region() {
        let mut r = fullscreen("kitty");
        r.set_scroll_optim(true);
        render(&mut r, 5, &["a", "b", "c", "d"]);
        assert_eq!(render(&mut r, 5, &["x", "a", "b", "c"]), "\x1b[1;4r\x1b[T\x1b[rx");
    }

    // ── Capabilities ────────────────────────────────────────────────────

    #[test]
    fn blank_run_uses_ech_when_available() {
        let mut r = TerminalRenderer::new("xterm-256color", ColorProfile::TrueColor);
        let before = format!("a{}b", "x".repeat(20));
        let after = format!("a{}b", " ".repeat(20));
        render(&mut r, 22, &[before.as_str()]);
        assert_eq!(render(&mut r, 22, &[after.as_str()]), "\ra\x1b[20X");
    }

    #[test]
    fn blank_run_without_ech_is_written_out() {
        let mut r = TerminalRenderer::new("vt100", ColorProfile::TrueColor);
        let before = format!("a{}b", "x".repeat(20));
        let after = format!("a{}b", " ".repeat(20));
        render(&mut r, 22, &[before.as_str()]);
        let out = render(&mut r, 22, &[after.as_str()]);
        assert!(!has_ech(&out));
        assert_eq!(out, format!("\ra{}", " ".repeat(20)));
    }

    #[test]
    fn shifted_tail_uses_dch_when_available() {
        let mut r = TerminalRenderer::new("xterm-256color", ColorProfile::TrueColor);
        render(&mut r, 20, &["abcdefghijklmnop"]);
        let out = render(&mut r, 20, &["abefghijklmnop"]);
        assert!(out.contains("\x1b[2P"), "{out:?}");
    }

    #[test]
    fn shifted_tail_without_dch_is_rewritten() {
        let mut r = TerminalRenderer::new("vt100", ColorProfile::TrueColor);
        render(&mut r, 20, &["abcdefghijklmnop"]);
        let out = render(&mut r, 20, &["abefghijklmnop"]);
        assert!(!has_csi(&out, b'P'), "{out:?}");
        assert!(out.contains("fghijklmnop"), "{out:?}");
    }

    #[test]
    fn ascii_run_uses_rep() {
        let mut r = TerminalRenderer::new("kitty", ColorProfile::TrueColor);
        let line = format!("a{}b", "-".repeat(20));
        assert_eq!(render(&mut r, 22, &[line.as_str()]), "\ra-\x1b[19bb");
    }

    #[test]
    fn rep_is_not_used_for_wide_text() {
        let mut r = TerminalRenderer::new("kitty", ColorProfile::TrueColor);
        let line = "世".repeat(8);
        assert_eq!(render(&mut r, 16, &[line.as_str()]), format!("\r{line}"));
    }

    // ── Session helpers ─────────────────────────────────────────────────

    #[test]
    fn prepend_opens_lines_above() {
        let mut r = TerminalRenderer::new("xterm-256color", ColorProfile::TrueColor);
        let mut rb = frame(5, &["ui", ""]);
        r.render(&mut rb);
        take(&mut r);
        r.prepend_string(rb.buffer(), "log");
        assert_eq!(take(&mut r), "\n\x1b[2A\x1b[Llog\r\n");
    }

    #[test]
    fn raw_writes_are_queued() {
        let mut r = TerminalRenderer::new("xterm", ColorProfile::TrueColor);
        write!(r, "abc").unwrap();
        assert_eq!(r.buffered(), 3);
        assert_eq!(take(&mut r), "abc");
        assert_eq!(r.buffered(), 0);
    }

    #[test]
    fn colors_are_downsampled() {
        use crate::color::Color;
        let mut r = TerminalRenderer::new("xterm", ColorProfile::Ansi);
        let mut rb = RenderBuffer::new(2, 1);
        let red = Cell::new("x").with_style(Style::new().with_fg(Color::Rgb(255, 0, 0)));
        rb.set_cell(0, 0, Some(&red));
        r.render(&mut rb);
        let out = take(&mut r);
        assert!(!out.contains("38;2"), "{out:?}");
    }

    #[test]
    fn tab_stops_disabled_on_linux_console() {
        let mut r = TerminalRenderer::new("linux", ColorProfile::Ansi);
        r.set_tab_stops(Some(80));
        assert!(!r.capabilities().contains(Capabilities::HT));
        let mut r = TerminalRenderer::new("xterm", ColorProfile::Ansi);
        r.set_tab_stops(Some(80));
        assert!(r.capabilities().contains(Capabilities::HT));
    }

    // ── Properties ──────────────────────────────────────────────────────

    fn arb_cell() -> impl Strategy<Value = Cell> {
        (prop::sample::select(vec![" ", " ", "a", "b", "-", "世"]), any::<bool>()).prop_map(|(g, bold)| {
            let style = if bold { Style::new().with_attrs(Attr::BOLD) } else { Style::DEFAULT };
            Cell::new(g).with_style(style)
        })
    }

    fn arb_buffer() -> impl Strategy<Value = Buffer> {
        (1u16..12, 1u16..6).prop_flat_map(|(w, h)| {
            prop::collection::vec(arb_cell(), usize::from(w) * usize::from(h)).prop_map(move |cells| {
                let mut b = Buffer::new(w, h);
                for (i, c) in cells.iter().enumerate() {
                    let i = u16::try_from(i).unwrap();
                    b.set_cell(i % w, i / w, Some(c));
                }
                b
            })
        })
    }

    fn arb_renderer() -> impl Strategy<Value = TerminalRenderer> {
        (
            prop::sample::select(vec!["xterm-256color", "kitty", "vt100", "linux", "alacritty"]),
            any::<bool>(),
            any::<bool>(),
        )
            .prop_map(|(term, full, scroll)| {
                let mut r = TerminalRenderer::new(term, ColorProfile::TrueColor);
                if full {
                    r.set_fullscreen(true);
                    r.set_relative_cursor(false);
                }
                r.set_scroll_optim(scroll);
                r
            })
    }

    proptest! {
        #[test]
        fn rerendering_identical_frame_is_silent(mut r in arb_renderer(), buf in arb_buffer()) {
            let mut first = RenderBuffer::from(buf.clone());
            r.render(&mut first);
            take(&mut r);

            let mut second = RenderBuffer::from(buf);
            r.render(&mut second);
            prop_assert_eq!(take(&mut r), "");
        }

        #[test]
        fn any_transition_then_repeat_is_silent(
            mut r in arb_renderer(),
            (a, b) in arb_buffer().prop_flat_map(|a| {
                let (w, h) = (a.width(), a.height());
                let cells = prop::collection::vec(arb_cell(), usize::from(w) * usize::from(h));
                (Just(a), cells.prop_map(move |cells| {
                    let mut b = Buffer::new(w, h);
                    for (i, c) in cells.iter().enumerate() {
                        let i = u16::try_from(i).unwrap();
                        b.set_cell(i % w, i / w, Some(c));
                    }
                    b
                }))
            }),
        ) {
            r.render(&mut RenderBuffer::from(a));
            r.render(&mut RenderBuffer::from(b.clone()));
            take(&mut r);
            r.render(&mut RenderBuffer::from(b));
            prop_assert_eq!(take(&mut r), "");
        }
    }
}
