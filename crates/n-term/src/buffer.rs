// SPDX-License-Identifier: MIT
//
// Buffer — the 2D cell grid that everything paints to.
//
// A Buffer is a stack of equal-width Lines. Applications paint into it
// through the `Screen` trait; the renderer diffs it against what the
// terminal last showed.
//
// Design:
//
//   - One `Vec<Cell>` per line. Region operations (insert/delete line)
//     move whole row slices, and the renderer scans one line at a time,
//     so rows are the natural unit.
//
//   - Wide characters occupy `width` columns: the owner cell followed by
//     placeholders (width 0, empty content). `Line::set` keeps that
//     invariant: writing over any part of an existing wide cell, from
//     either side, first blanks the whole old cell, so no placeholder is
//     ever left without its owner.
//
//   - Region operations implement terminal semantics exactly (IL, DL,
//     ICH, DCH): they act only inside a caller-given rectangle, shift
//     content within it, fill vacated cells with a caller-supplied blank,
//     clamp counts to the available space, and drop whatever is pushed
//     out. Nothing outside the rectangle is touched.

use std::fmt;

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::ansi;
use crate::cell::{Cell, Link, Style};

// ─── Geometry ────────────────────────────────────────────────────────────────

/// A cell position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Position {
    pub x: u16,
    pub y: u16,
}

impl Position {
    #[inline]
    #[must_use]
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

/// A rectangle of cells. The right and bottom edges are exclusive.
///
/// ```
/// use n_term::buffer::Rect;
///
/// let r = Rect::new(10, 5, 80, 24);
/// assert!(r.contains(10, 5));
/// assert!(r.contains(89, 28));
/// assert!(!r.contains(90, 5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    #[inline]
    #[must_use]
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self { x, y, width, height }
    }

    /// Right edge (exclusive).
    #[inline]
    #[must_use]
    pub const fn right(self) -> u16 {
        self.x.saturating_add(self.width)
    }

    /// Bottom edge (exclusive).
    #[inline]
    #[must_use]
    pub const fn bottom(self) -> u16 {
        self.y.saturating_add(self.height)
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    #[must_use]
    pub const fn contains(self, x: u16, y: u16) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Whether `other` lies entirely inside this rectangle.
    #[must_use]
    pub const fn contains_rect(self, other: Self) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// The overlapping part of two rectangles, `None` if they don't overlap.
    #[must_use]
    pub fn intersect(self, other: Self) -> Option<Self> {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());
        (x2 > x1 && y2 > y1).then(|| Self::new(x1, y1, x2 - x1, y2 - y1))
    }

    /// This rectangle shifted by `(dx, dy)`.
    #[inline]
    #[must_use]
    pub const fn offset(self, dx: u16, dy: u16) -> Self {
        Self::new(self.x.saturating_add(dx), self.y.saturating_add(dy), self.width, self.height)
    }
}

// ─── Line ────────────────────────────────────────────────────────────────────

/// One row of cells.
#[derive(Clone, PartialEq, Eq, Default, Hash)]
pub struct Line(pub Vec<Cell>);

/// `c` turned into a one-column space that keeps its style and link.
fn emptied(c: &Cell) -> Cell {
    Cell {
        content: " ".to_string(),
        style: c.style,
        link: c.link.clone(),
        width: 1,
    }
}

impl Line {
    /// A line of `width` blank cells.
    #[must_use]
    pub fn new(width: u16) -> Self {
        Self(vec![Cell::default(); usize::from(width)])
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u16 {
        u16::try_from(self.0.len()).unwrap_or(u16::MAX)
    }

    #[inline]
    #[must_use]
    pub fn at(&self, x: u16) -> Option<&Cell> {
        self.0.get(usize::from(x))
    }

    #[inline]
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.0
    }

    /// Blank the whole wide cell that covers column `col`, if any.
    fn break_wide(&mut self, col: usize) {
        let Some(c) = self.0.get(col) else {
            return;
        };
        let (start, w) = if c.width > 1 {
            (col, usize::from(c.width))
        } else if c.is_placeholder() {
            let mut owner = None;
            for start in (0..col).rev() {
                let o = &self.0[start];
                if o.width > 1 {
                    if col - start < usize::from(o.width) {
                        owner = Some((start, usize::from(o.width)));
                    }
                    break;
                }
                if !o.is_placeholder() {
                    break;
                }
            }
            match owner {
                Some(found) => found,
                None => return,
            }
        } else {
            return;
        };

        let blank = emptied(&self.0[start]);
        let end = (start + w).min(self.0.len());
        for slot in &mut self.0[start..end] {
            slot.clone_from(&blank);
        }
    }

    /// Set the cell at `x`. `None` writes a blank default cell.
    ///
    /// Any wide cell the write overlaps is blanked first. A wide cell that
    /// does not fit before the end of the line is written as blanks in its
    /// style instead.
    pub fn set(&mut self, x: u16, cell: Option<&Cell>) {
        let x = usize::from(x);
        let len = self.0.len();
        if x >= len {
            return;
        }

        let cw = cell.map_or(1, |c| usize::from(c.width.max(1)));
        for col in x..(x + cw).min(len) {
            self.break_wide(col);
        }

        let Some(c) = cell else {
            self.0[x] = Cell::default();
            return;
        };

        if x + cw > len {
            let blank = emptied(c);
            for slot in &mut self.0[x..] {
                slot.clone_from(&blank);
            }
            return;
        }

        self.0[x].clone_from(c);
        for slot in &mut self.0[x + 1..x + cw] {
            *slot = Cell::placeholder();
        }
    }

    /// The line with styles, hyperlinks, and resets, ready to print.
    ///
    /// Blank default cells are deferred, so trailing spaces are dropped.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        render_line(&mut out, self);
        out
    }
}

impl std::ops::Deref for Line {
    type Target = [Cell];

    fn deref(&self) -> &[Cell] {
        &self.0
    }
}

impl std::ops::DerefMut for Line {
    fn deref_mut(&mut self) -> &mut [Cell] {
        &mut self.0
    }
}

impl fmt::Display for Line {
    /// Plain text with trailing blanks trimmed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let blank = Cell::default();
        let mut pending = 0usize;
        for c in &self.0 {
            if c.is_zero() {
                continue;
            }
            if *c == blank {
                pending += 1;
                continue;
            }
            for _ in 0..pending {
                f.write_str(" ")?;
            }
            pending = 0;
            f.write_str(&c.content)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line({:?})", self.to_string())
    }
}

fn render_line(out: &mut String, line: &Line) {
    let blank = Cell::default();
    let mut pen = Style::DEFAULT;
    let mut link = Link::default();
    let mut pending = 0usize;

    for c in line.cells() {
        if c.is_zero() {
            continue;
        }
        if *c == blank {
            if !pen.is_zero() {
                out.push_str(ansi::RESET_STYLE);
                pen = Style::DEFAULT;
            }
            if !link.is_zero() {
                out.push_str(ansi::RESET_HYPERLINK);
                link = Link::default();
            }
            pending += 1;
            continue;
        }

        for _ in 0..pending {
            out.push(' ');
        }
        pending = 0;

        if c.style != pen {
            out.push_str(&c.style.diff(&pen));
            pen = c.style;
        }
        if c.link != link {
            out.push_str(&ansi::hyperlink(&c.link.url, &c.link.params));
            link.clone_from(&c.link);
        }
        out.push_str(&c.content);
    }

    if !link.is_zero() {
        out.push_str(ansi::RESET_HYPERLINK);
    }
    if !pen.is_zero() {
        out.push_str(ansi::RESET_STYLE);
    }
}

// ─── Screen & Drawable ───────────────────────────────────────────────────────

/// Anything cells can be painted onto.
pub trait Screen {
    /// The paintable area.
    fn bounds(&self) -> Rect;

    /// The cell at `(x, y)`, `None` when out of bounds.
    fn cell_at(&self, x: u16, y: u16) -> Option<&Cell>;

    /// Set the cell at `(x, y)`. `None` writes a blank.
    fn set_cell(&mut self, x: u16, y: u16, cell: Option<&Cell>);

    /// Paint `text` starting at `(x, y)` in `style`, one grapheme per cell.
    ///
    /// Stops at the right edge of the bounds; a wide grapheme that would
    /// straddle the edge is not drawn. Returns the number of columns
    /// painted.
    fn set_string(&mut self, x: u16, y: u16, text: &str, style: Style) -> u16 {
        let right = self.bounds().right();
        let mut col = x;
        for g in text.graphemes(true) {
            let w = u16::try_from(UnicodeWidthStr::width(g)).unwrap_or(u16::MAX);
            if w == 0 {
                continue;
            }
            if col.saturating_add(w) > right {
                break;
            }
            let cell = Cell::new(g).with_style(style);
            self.set_cell(col, y, Some(&cell));
            col += w;
        }
        col - x
    }
}

/// Something that can draw itself onto a [`Screen`] inside an area.
pub trait Drawable {
    fn draw(&self, scr: &mut dyn Screen, area: Rect);
}

impl<F> Drawable for F
where
    F: Fn(&mut dyn Screen, Rect),
{
    fn draw(&self, scr: &mut dyn Screen, area: Rect) {
        self(scr, area);
    }
}

// ─── Buffer ──────────────────────────────────────────────────────────────────

/// A grid of cells.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Buffer {
    lines: Vec<Line>,
    width: u16,
}

impl Buffer {
    /// A `width × height` buffer of blank cells.
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            lines: (0..height).map(|_| Line::new(width)).collect(),
            width,
        }
    }

    #[inline]
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u16 {
        u16::try_from(self.lines.len()).unwrap_or(u16::MAX)
    }

    #[inline]
    #[must_use]
    pub fn line(&self, y: u16) -> Option<&Line> {
        self.lines.get(usize::from(y))
    }

    #[inline]
    pub fn line_mut(&mut self, y: u16) -> Option<&mut Line> {
        self.lines.get_mut(usize::from(y))
    }

    #[inline]
    #[must_use]
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Resize in place. New cells are blank; cells past the new edges are
    /// dropped.
    pub fn resize(&mut self, width: u16, height: u16) {
        if width != self.width {
            for line in &mut self.lines {
                line.0.resize(usize::from(width), Cell::default());
                // A wide cell cut by the new edge would leave no room for
                // its placeholders.
                if let Some(last) = width.checked_sub(1) {
                    line.break_wide(usize::from(last));
                }
            }
            self.width = width;
        }
        self.lines.resize_with(usize::from(height), || Line::new(width));
    }

    /// Fill the whole buffer with `cell` (`None` = blank).
    pub fn fill(&mut self, cell: Option<&Cell>) {
        self.fill_area(cell, self.bounds());
    }

    /// Fill `area` with `cell`, stepping by the cell's width.
    pub fn fill_area(&mut self, cell: Option<&Cell>, area: Rect) {
        let step = cell.map_or(1, |c| c.width.max(1));
        let Some(area) = area.intersect(self.bounds()) else {
            return;
        };
        for y in area.y..area.bottom() {
            let mut x = area.x;
            while x < area.right() {
                self.set_cell(x, y, cell);
                x = x.saturating_add(u16::from(step));
            }
        }
    }

    /// Blank every cell.
    pub fn clear(&mut self) {
        self.fill(None);
    }

    /// Blank every cell inside `area`.
    pub fn clear_area(&mut self, area: Rect) {
        self.fill_area(None, area);
    }

    /// A copy of `area`, or `None` if it does not lie inside the buffer.
    #[must_use]
    pub fn clone_area(&self, area: Rect) -> Option<Self> {
        if !self.bounds().contains_rect(area) {
            return None;
        }
        let mut out = Self::new(area.width, area.height);
        for y in area.y..area.bottom() {
            for x in area.x..area.right() {
                if let Some(c) = self.cell_at(x, y).filter(|c| !c.is_zero()) {
                    out.set_cell(x - area.x, y - area.y, Some(c));
                }
            }
        }
        Some(out)
    }

    // ── Line operations ─────────────────────────────────────────────

    /// Run `op`, then put back every cell left or right of `area` on the
    /// area's rows. Region edits never leak past the rectangle, even when
    /// a wide cell straddles its edge.
    fn keep_outside(&mut self, area: Rect, op: impl FnOnce(&mut Self)) {
        let Some(area) = area.intersect(self.bounds()) else {
            return;
        };
        let rows = usize::from(area.y)..usize::from(area.bottom());
        let (x0, x1) = (usize::from(area.x), usize::from(area.right()));
        let saved: Vec<(Vec<Cell>, Vec<Cell>)> = self.lines[rows.clone()]
            .iter()
            .map(|l| (l.0[..x0].to_vec(), l.0[x1..].to_vec()))
            .collect();
        op(self);
        for (line, (left, right)) in self.lines[rows].iter_mut().zip(saved) {
            line.0[..x0].clone_from_slice(&left);
            line.0[x1..].clone_from_slice(&right);
        }
    }

    /// Insert `n` lines at `y` across the whole buffer (IL).
    pub fn insert_line(&mut self, y: u16, n: u16, cell: Option<&Cell>) {
        self.insert_line_area(y, n, cell, self.bounds());
    }

    /// Insert `n` lines at `y` inside `area`.
    ///
    /// Rows from `y` down shift by `n` within the area's columns; rows
    /// pushed past the area's bottom are lost. The inserted rows are filled
    /// with `cell`.
    pub fn insert_line_area(&mut self, y: u16, n: u16, cell: Option<&Cell>, area: Rect) {
        self.keep_outside(area, |b| b.insert_lines_in(y, n, cell, area));
    }

    fn insert_lines_in(&mut self, y: u16, n: u16, cell: Option<&Cell>, area: Rect) {
        let Some(area) = area.intersect(self.bounds()) else {
            return;
        };
        if n == 0 || y < area.y || y >= area.bottom() {
            return;
        }
        let n = n.min(area.bottom() - y);
        let (x0, x1) = (usize::from(area.x), usize::from(area.right()));

        for i in (y + n..area.bottom()).rev() {
            let (src, dst) = (usize::from(i - n), usize::from(i));
            let (head, tail) = self.lines.split_at_mut(dst);
            tail[0].0[x0..x1].clone_from_slice(&head[src].0[x0..x1]);
        }
        for i in y..y + n {
            for x in area.x..area.right() {
                self.set_cell(x, i, cell);
            }
        }
    }

    /// Delete `n` lines at `y` across the whole buffer (DL).
    pub fn delete_line(&mut self, y: u16, n: u16, cell: Option<&Cell>) {
        self.delete_line_area(y, n, cell, self.bounds());
    }

    /// Delete `n` lines at `y` inside `area`.
    ///
    /// Rows below shift up within the area's columns; the vacated rows at
    /// the area's bottom are filled with `cell`.
    pub fn delete_line_area(&mut self, y: u16, n: u16, cell: Option<&Cell>, area: Rect) {
        self.keep_outside(area, |b| b.delete_lines_in(y, n, cell, area));
    }

    fn delete_lines_in(&mut self, y: u16, n: u16, cell: Option<&Cell>, area: Rect) {
        let Some(area) = area.intersect(self.bounds()) else {
            return;
        };
        if n == 0 || y < area.y || y >= area.bottom() {
            return;
        }
        let n = n.min(area.bottom() - y);
        let (x0, x1) = (usize::from(area.x), usize::from(area.right()));

        for dst in y..area.bottom() - n {
            let (dst, src) = (usize::from(dst), usize::from(dst + n));
            let (head, tail) = self.lines.split_at_mut(src);
            head[dst].0[x0..x1].clone_from_slice(&tail[0].0[x0..x1]);
        }
        for i in area.bottom() - n..area.bottom() {
            for x in area.x..area.right() {
                self.set_cell(x, i, cell);
            }
        }
    }

    // ── Cell operations ─────────────────────────────────────────────

    /// Insert `n` blank cells at `(x, y)` across the full line (ICH).
    pub fn insert_cell(&mut self, x: u16, y: u16, n: u16, cell: Option<&Cell>) {
        self.insert_cell_area(x, y, n, cell, self.bounds());
    }

    /// Insert `n` cells at `(x, y)` inside `area`, shifting the rest of the
    /// row right. Cells pushed past the area's right edge are lost.
    pub fn insert_cell_area(&mut self, x: u16, y: u16, n: u16, cell: Option<&Cell>, area: Rect) {
        self.keep_outside(area, |b| b.insert_cells_in(x, y, n, cell, area));
    }

    fn insert_cells_in(&mut self, x: u16, y: u16, n: u16, cell: Option<&Cell>, area: Rect) {
        let Some(area) = area.intersect(self.bounds()) else {
            return;
        };
        if n == 0 || !area.contains(x, y) {
            return;
        }
        let n = n.min(area.right() - x);
        let right = usize::from(area.right());
        let (xs, ns) = (usize::from(x), usize::from(n));
        let Some(line) = self.lines.get_mut(usize::from(y)) else {
            return;
        };

        line.break_wide(xs);
        if right - ns > xs {
            line.break_wide(right - ns);
        }
        line.0[xs..right].rotate_right(ns);
        for i in x..x + n {
            line.set(i, cell);
        }
    }

    /// Delete `n` cells at `(x, y)` across the full line (DCH).
    pub fn delete_cell(&mut self, x: u16, y: u16, n: u16, cell: Option<&Cell>) {
        self.delete_cell_area(x, y, n, cell, self.bounds());
    }

    /// Delete `n` cells at `(x, y)` inside `area`, shifting the rest of the
    /// row left and filling the vacated cells at the area's right edge.
    pub fn delete_cell_area(&mut self, x: u16, y: u16, n: u16, cell: Option<&Cell>, area: Rect) {
        self.keep_outside(area, |b| b.delete_cells_in(x, y, n, cell, area));
    }

    fn delete_cells_in(&mut self, x: u16, y: u16, n: u16, cell: Option<&Cell>, area: Rect) {
        let Some(area) = area.intersect(self.bounds()) else {
            return;
        };
        if n == 0 || !area.contains(x, y) {
            return;
        }
        let n = n.min(area.right() - x);
        let right = usize::from(area.right());
        let (xs, ns) = (usize::from(x), usize::from(n));
        let Some(line) = self.lines.get_mut(usize::from(y)) else {
            return;
        };

        line.break_wide(xs);
        line.break_wide(xs + ns - 1);
        line.break_wide(right - 1);
        line.0[xs..right].rotate_left(ns);
        for i in area.right() - n..area.right() {
            line.set(i, cell);
        }
    }

    /// Plain-text and styled renderings of the whole buffer.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            render_line(&mut out, line);
        }
        out
    }
}

impl Screen for Buffer {
    fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height())
    }

    fn cell_at(&self, x: u16, y: u16) -> Option<&Cell> {
        self.lines.get(usize::from(y)).and_then(|l| l.at(x))
    }

    fn set_cell(&mut self, x: u16, y: u16, cell: Option<&Cell>) {
        if let Some(line) = self.lines.get_mut(usize::from(y)) {
            line.set(x, cell);
        }
    }
}

impl Drawable for Buffer {
    /// Copy this buffer onto `scr` with its origin at the area's corner.
    fn draw(&self, scr: &mut dyn Screen, area: Rect) {
        let Some(area) = area.intersect(scr.bounds()) else {
            return;
        };
        for y in area.y..area.bottom() {
            let mut x = area.x;
            while x < area.right() {
                match self.cell_at(x - area.x, y - area.y) {
                    Some(c) if !c.is_zero() => {
                        let w = u16::from(c.width.max(1));
                        scr.set_cell(x, y, Some(c));
                        x = x.saturating_add(w);
                    }
                    _ => x += 1,
                }
            }
        }
    }
}

impl fmt::Display for Buffer {
    /// Plain text, one line per row, trailing blanks trimmed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{line}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Buffer({}x{})", self.width, self.height())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Attr;
    use crate::color::Color;
    use pretty_assertions::assert_eq;

    fn buf_from(rows: &[&str]) -> Buffer {
        let w = rows.iter().map(|r| ansi::string_width(r)).max().unwrap_or(0);
        let mut b = Buffer::new(u16::try_from(w).unwrap(), u16::try_from(rows.len()).unwrap());
        for (y, row) in rows.iter().enumerate() {
            b.set_string(0, u16::try_from(y).unwrap(), row, Style::DEFAULT);
        }
        b
    }

    fn rows(b: &Buffer) -> Vec<String> {
        b.lines().iter().map(ToString::to_string).collect()
    }

    fn assert_no_orphans(line: &Line) {
        let mut expect_placeholders = 0u8;
        for (i, c) in line.cells().iter().enumerate() {
            if expect_placeholders > 0 {
                assert!(c.is_placeholder(), "column {i} should be a placeholder");
                expect_placeholders -= 1;
            } else {
                assert!(!c.is_placeholder(), "orphan placeholder at column {i}");
                expect_placeholders = c.width.saturating_sub(1);
            }
        }
    }

    // ── Rect ────────────────────────────────────────────────────────────

    #[test]
    fn rect_edges() {
        let r = Rect::new(2, 3, 10, 4);
        assert_eq!(r.right(), 12);
        assert_eq!(r.bottom(), 7);
        assert!(!r.is_empty());
        assert!(Rect::new(0, 0, 0, 5).is_empty());
    }

    #[test]
    fn rect_intersection() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        assert_eq!(a.intersect(b), Some(Rect::new(5, 5, 5, 5)));
        assert_eq!(a.intersect(Rect::new(10, 0, 3, 3)), None);
    }

    #[test]
    fn rect_containment() {
        let a = Rect::new(0, 0, 10, 10);
        assert!(a.contains_rect(Rect::new(2, 2, 8, 8)));
        assert!(!a.contains_rect(Rect::new(2, 2, 9, 8)));
    }

    // ── Wide cells ──────────────────────────────────────────────────────

    #[test]
    fn wide_cell_writes_placeholder() {
        let mut line = Line::new(4);
        line.set(1, Some(&Cell::new("世")));
        assert_eq!(line[1].width, 2);
        assert!(line[2].is_placeholder());
        assert_no_orphans(&line);
    }

    #[test]
    fn overwriting_placeholder_blanks_the_wide_cell() {
        let mut line = Line::new(4);
        line.set(0, Some(&Cell::new("世")));
        line.set(1, Some(&Cell::new("x")));
        assert_eq!(line[0], Cell::default());
        assert_eq!(line[1].content, "x");
        assert_no_orphans(&line);
    }

    #[test]
    fn overwriting_owner_blanks_placeholders() {
        let mut line = Line::new(4);
        line.set(0, Some(&Cell::new("世")));
        line.set(0, Some(&Cell::new("a")));
        assert_eq!(line[0].content, "a");
        assert_eq!(line[1], Cell::default());
        assert_no_orphans(&line);
    }

    #[test]
    fn wide_over_wide_shifted_by_one() {
        let mut line = Line::new(5);
        line.set(1, Some(&Cell::new("世")));
        line.set(0, Some(&Cell::new("界")));
        assert_eq!(line[0].content, "界");
        assert!(line[1].is_placeholder());
        assert_eq!(line[2], Cell::default());
        assert_no_orphans(&line);
    }

    #[test]
    fn blanked_wide_cell_keeps_style() {
        let style = Style::new().with_bg(Color::BLUE);
        let mut line = Line::new(4);
        line.set(0, Some(&Cell::new("世").with_style(style)));
        line.set(1, None);
        assert_eq!(line[0], Cell::blank(style));
        assert_eq!(line[1], Cell::default());
    }

    #[test]
    fn wide_cell_at_edge_becomes_blank() {
        let mut line = Line::new(3);
        line.set(2, Some(&Cell::new("世")));
        assert_eq!(line[2], Cell::default());
        assert_no_orphans(&line);
    }

    // ── Buffer basics ───────────────────────────────────────────────────

    #[test]
    fn new_buffer_is_blank() {
        let b = Buffer::new(3, 2);
        assert_eq!(b.width(), 3);
        assert_eq!(b.height(), 2);
        assert_eq!(b.cell_at(2, 1), Some(&Cell::default()));
        assert_eq!(b.cell_at(3, 0), None);
        assert_eq!(b.to_string(), "\n");
    }

    #[test]
    fn set_string_and_display() {
        let b = buf_from(&["hello", "wo"]);
        assert_eq!(b.to_string(), "hello\nwo");
    }

    #[test]
    fn set_string_stops_at_edge() {
        let mut b = Buffer::new(3, 1);
        assert_eq!(b.set_string(1, 0, "a世", Style::DEFAULT), 1);
        assert_eq!(b.to_string(), " a");
    }

    #[test]
    fn resize_grows_and_shrinks() {
        let mut b = buf_from(&["abc", "def"]);
        b.resize(5, 3);
        assert_eq!(rows(&b), vec!["abc", "def", ""]);
        b.resize(2, 1);
        assert_eq!(rows(&b), vec!["ab"]);
    }

    #[test]
    fn resize_cuts_wide_cell_cleanly() {
        let mut b = buf_from(&["a世"]);
        b.resize(2, 1);
        assert_no_orphans(b.line(0).unwrap());
        assert_eq!(b.to_string(), "a");
    }

    #[test]
    fn fill_and_clear_area() {
        let mut b = Buffer::new(4, 3);
        b.fill_area(Some(&Cell::new("#")), Rect::new(1, 1, 2, 1));
        assert_eq!(rows(&b), vec!["", " ##", ""]);
        b.clear_area(Rect::new(2, 1, 5, 5));
        assert_eq!(rows(&b), vec!["", " #", ""]);
    }

    #[test]
    fn fill_steps_by_width() {
        let mut b = Buffer::new(4, 1);
        b.fill(Some(&Cell::new("世")));
        assert_eq!(b.to_string(), "世世");
        assert_no_orphans(b.line(0).unwrap());
    }

    #[test]
    fn clone_area_inside_and_outside() {
        let b = buf_from(&["abcd", "efgh"]);
        let c = b.clone_area(Rect::new(1, 0, 2, 2)).unwrap();
        assert_eq!(rows(&c), vec!["bc", "fg"]);
        assert!(b.clone_area(Rect::new(3, 0, 2, 1)).is_none());
    }

    // ── Line operations ─────────────────────────────────────────────────

    #[test]
    fn insert_line_full_width() {
        let mut b = buf_from(&["a", "b", "c", "d"]);
        b.insert_line(1, 2, None);
        assert_eq!(rows(&b), vec!["a", "", "", "b"]);
    }

    #[test]
    fn insert_line_clamps_count() {
        let mut b = buf_from(&["a", "b", "c"]);
        b.insert_line(1, 10, Some(&Cell::new("x")));
        assert_eq!(rows(&b), vec!["a", "x", "x"]);
    }

    #[test]
    fn delete_line_full_width() {
        let mut b = buf_from(&["a", "b", "c", "d"]);
        b.delete_line(0, 1, None);
        assert_eq!(rows(&b), vec!["b", "c", "d", ""]);
    }

    #[test]
    fn line_ops_stay_inside_area() {
        let mut b = buf_from(&["0123", "4567", "89ab", "cdef"]);
        let area = Rect::new(1, 1, 2, 2);
        b.insert_line_area(1, 1, Some(&Cell::new(".")), area);
        assert_eq!(rows(&b), vec!["0123", "4..7", "856b", "cdef"]);
        b.delete_line_area(1, 1, Some(&Cell::new("*")), area);
        assert_eq!(rows(&b), vec!["0123", "4567", "8**b", "cdef"]);
    }

    #[test]
    fn line_ops_leave_straddling_wide_cell_alone() {
        let mut b = buf_from(&["ab世", "cdef"]);
        let before = b.line(0).unwrap().cells()[3].clone();
        b.insert_line_area(0, 1, Some(&Cell::new(".")), Rect::new(0, 0, 3, 2));
        assert!(before.is_placeholder());
        assert_eq!(b.line(0).unwrap().cells()[3], before);
        assert_eq!(b.line(1).unwrap().cells()[3], Cell::new("f"));
    }

    #[test]
    fn line_op_outside_area_is_ignored() {
        let mut b = buf_from(&["a", "b"]);
        b.insert_line_area(0, 1, None, Rect::new(0, 1, 1, 1));
        assert_eq!(rows(&b), vec!["a", "b"]);
    }

    // ── Cell operations ─────────────────────────────────────────────────

    #[test]
    fn insert_cell_shifts_right() {
        let mut b = buf_from(&["abcdef"]);
        b.insert_cell(1, 0, 2, None);
        assert_eq!(b.to_string(), "a  bcd");
    }

    #[test]
    fn delete_cell_shifts_left() {
        let mut b = buf_from(&["abcdef"]);
        b.delete_cell(1, 0, 2, Some(&Cell::new("-")));
        assert_eq!(b.to_string(), "adef--");
    }

    #[test]
    fn cell_ops_never_touch_cells_left_of_area() {
        let mut b = buf_from(&["ab世cd"]);
        let left: Vec<Cell> = b.line(0).unwrap().cells()[..3].to_vec();
        b.delete_cell_area(3, 0, 1, Some(&Cell::new(".")), Rect::new(3, 0, 3, 1));
        assert_eq!(&b.line(0).unwrap().cells()[..3], left.as_slice());
        b.insert_cell_area(3, 0, 1, None, Rect::new(3, 0, 3, 1));
        assert_eq!(&b.line(0).unwrap().cells()[..3], left.as_slice());
    }

    #[test]
    fn cell_ops_never_touch_cells_right_of_area() {
        let mut b = buf_from(&["abc世"]);
        let right: Vec<Cell> = b.line(0).unwrap().cells()[4..].to_vec();
        b.insert_cell_area(0, 0, 2, Some(&Cell::new("-")), Rect::new(0, 0, 4, 1));
        assert_eq!(&b.line(0).unwrap().cells()[4..], right.as_slice());
        assert_eq!(b.line(0).unwrap().cells()[0], Cell::new("-"));
        b.delete_cell_area(0, 0, 1, None, Rect::new(0, 0, 4, 1));
        assert_eq!(&b.line(0).unwrap().cells()[4..], right.as_slice());
    }

    #[test]
    fn cell_ops_stay_inside_area() {
        let mut b = buf_from(&["abcdef"]);
        let area = Rect::new(1, 0, 3, 1);
        b.insert_cell_area(1, 0, 1, Some(&Cell::new(".")), area);
        assert_eq!(b.to_string(), "a.bcef");
        b.delete_cell_area(1, 0, 5, Some(&Cell::new("*")), area);
        assert_eq!(b.to_string(), "a***ef");
    }

    #[test]
    fn delete_cell_keeps_wide_cells_whole() {
        let mut b = buf_from(&["ab世cd"]);
        b.delete_cell(1, 0, 1, None);
        assert_eq!(b.to_string(), "a世cd");
        assert_no_orphans(b.line(0).unwrap());
    }

    #[test]
    fn delete_cell_splitting_wide_cell_blanks_it() {
        let mut b = buf_from(&["a世bc"]);
        b.delete_cell(1, 0, 1, None);
        assert_no_orphans(b.line(0).unwrap());
        assert_eq!(b.to_string(), "a bc");
    }

    #[test]
    fn insert_cell_pushing_wide_cell_off_edge() {
        let mut b = buf_from(&["ab世"]);
        b.insert_cell(0, 0, 1, None);
        assert_no_orphans(b.line(0).unwrap());
        assert_eq!(b.to_string(), " ab");
    }

    // ── Rendering ───────────────────────────────────────────────────────

    #[test]
    fn render_line_with_styles() {
        let mut b = Buffer::new(6, 1);
        let bold = Style::new().with_attrs(Attr::BOLD);
        b.set_string(0, 0, "ab", bold);
        b.set_string(3, 0, "c", Style::DEFAULT);
        assert_eq!(b.render(), "\x1b[1mab\x1b[m c");
    }

    #[test]
    fn render_line_with_link() {
        let mut b = Buffer::new(2, 1);
        let c = Cell::new("x").with_link(Link::new("https://x.org", &[]));
        b.set_cell(0, 0, Some(&c));
        assert_eq!(b.render(), "\x1b]8;;https://x.org\x07x\x1b]8;;\x07");
    }

    // ── Drawable ────────────────────────────────────────────────────────

    #[test]
    fn buffer_draws_at_offset() {
        let src = buf_from(&["ab", "cd"]);
        let mut dst = Buffer::new(4, 3);
        src.draw(&mut dst, Rect::new(1, 1, 2, 2));
        assert_eq!(rows(&dst), vec!["", " ab", " cd"]);
    }

    #[test]
    fn closures_are_drawable() {
        let hello = |scr: &mut dyn Screen, area: Rect| {
            scr.set_string(area.x, area.y, "hi", Style::DEFAULT);
        };
        let mut dst = Buffer::new(4, 1);
        hello.draw(&mut dst, Rect::new(2, 0, 2, 1));
        assert_eq!(dst.to_string(), "  hi");
    }
}
