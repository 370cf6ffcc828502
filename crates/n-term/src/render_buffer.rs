// SPDX-License-Identifier: MIT
//
// RenderBuffer — a Buffer that remembers which lines changed.
//
// Every write records a per-line span of touched columns. The renderer
// only diffs touched lines, then clears the spans once the frame has been
// encoded. Writes that leave a cell unchanged do not touch it, so an
// application that repaints an identical frame costs the renderer nothing.
//
// Mutation goes through this type, never through the inner Buffer
// directly, so the spans can't drift from the content.

use std::ops::Deref;

use crate::buffer::{Buffer, Drawable, Rect, Screen};
use crate::cell::Cell;

/// Touched columns of one line, `first..end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub first: u16,
    pub end: u16,
}

impl Span {
    fn union(self, first: u16, end: u16) -> Self {
        Self {
            first: self.first.min(first),
            end: self.end.max(end),
        }
    }
}

/// A [`Buffer`] plus per-line touched spans.
#[derive(Debug, Clone, Default)]
pub struct RenderBuffer {
    buffer: Buffer,
    touched: Vec<Option<Span>>,
}

impl RenderBuffer {
    /// A blank buffer with nothing touched.
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            buffer: Buffer::new(width, height),
            touched: vec![None; usize::from(height)],
        }
    }

    /// Wrap an existing buffer. Every line starts out touched.
    #[must_use]
    pub fn from_buffer(buffer: Buffer) -> Self {
        let mut rb = Self {
            touched: vec![None; usize::from(buffer.height())],
            buffer,
        };
        rb.touch_all();
        rb
    }

    #[inline]
    #[must_use]
    pub const fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    #[must_use]
    pub fn into_buffer(self) -> Buffer {
        self.buffer
    }

    // ── Touch tracking ──────────────────────────────────────────────

    /// Mark `n` columns starting at `x` on line `y` as touched. `n == 0`
    /// still marks the line.
    pub fn touch_line(&mut self, x: u16, y: u16, n: u16) {
        let Some(slot) = self.touched.get_mut(usize::from(y)) else {
            return;
        };
        let end = x.saturating_add(n);
        *slot = Some(slot.map_or(Span { first: x, end }, |s| s.union(x, end)));
    }

    /// Mark a single cell as touched.
    #[inline]
    pub fn touch(&mut self, x: u16, y: u16) {
        self.touch_line(x, y, 1);
    }

    /// Mark every line as fully touched.
    pub fn touch_all(&mut self) {
        let w = self.buffer.width();
        for y in 0..self.buffer.height() {
            self.touch_line(0, y, w);
        }
    }

    /// The touched span of line `y`, `None` when the line is clean.
    #[inline]
    #[must_use]
    pub fn touched(&self, y: u16) -> Option<Span> {
        self.touched.get(usize::from(y)).copied().flatten()
    }

    #[inline]
    #[must_use]
    pub fn is_touched(&self, y: u16) -> bool {
        self.touched(y).is_some()
    }

    /// Number of touched lines.
    #[must_use]
    pub fn touched_lines(&self) -> usize {
        self.touched.iter().filter(|t| t.is_some()).count()
    }

    /// Mark every line clean.
    pub fn clear_touched(&mut self) {
        self.touched.fill(None);
    }

    fn touch_rows(&mut self, area: Rect) {
        for y in area.y..area.bottom() {
            self.touch_line(area.x, y, area.width);
        }
    }

    // ── Mutation ────────────────────────────────────────────────────

    /// Resize the buffer. The whole buffer is marked touched.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.buffer.resize(width, height);
        self.touched.resize(usize::from(height), None);
        self.touch_all();
    }

    pub fn fill(&mut self, cell: Option<&Cell>) {
        self.fill_area(cell, self.bounds());
    }

    pub fn fill_area(&mut self, cell: Option<&Cell>, area: Rect) {
        let Some(area) = area.intersect(self.bounds()) else {
            return;
        };
        self.buffer.fill_area(cell, area);
        self.touch_rows(area);
    }

    pub fn clear(&mut self) {
        self.fill(None);
    }

    pub fn clear_area(&mut self, area: Rect) {
        self.fill_area(None, area);
    }

    pub fn insert_line(&mut self, y: u16, n: u16, cell: Option<&Cell>) {
        self.insert_line_area(y, n, cell, self.bounds());
    }

    pub fn insert_line_area(&mut self, y: u16, n: u16, cell: Option<&Cell>, area: Rect) {
        self.buffer.insert_line_area(y, n, cell, area);
        if let Some(area) = area.intersect(self.bounds()) {
            self.touch_rows(area);
        }
    }

    pub fn delete_line(&mut self, y: u16, n: u16, cell: Option<&Cell>) {
        self.delete_line_area(y, n, cell, self.bounds());
    }

    pub fn delete_line_area(&mut self, y: u16, n: u16, cell: Option<&Cell>, area: Rect) {
        self.buffer.delete_line_area(y, n, cell, area);
        if let Some(area) = area.intersect(self.bounds()) {
            self.touch_rows(area);
        }
    }

    pub fn insert_cell(&mut self, x: u16, y: u16, n: u16, cell: Option<&Cell>) {
        self.insert_cell_area(x, y, n, cell, self.bounds());
    }

    /// Insert cells inside `area`. Everything from `x` to the area's right
    /// edge shifts, so all of it is touched.
    pub fn insert_cell_area(&mut self, x: u16, y: u16, n: u16, cell: Option<&Cell>, area: Rect) {
        self.buffer.insert_cell_area(x, y, n, cell, area);
        if n > 0 && area.contains(x, y) {
            self.touch_line(x, y, area.right().min(self.buffer.width()).saturating_sub(x));
        }
    }

    pub fn delete_cell(&mut self, x: u16, y: u16, n: u16, cell: Option<&Cell>) {
        self.delete_cell_area(x, y, n, cell, self.bounds());
    }

    pub fn delete_cell_area(&mut self, x: u16, y: u16, n: u16, cell: Option<&Cell>, area: Rect) {
        self.buffer.delete_cell_area(x, y, n, cell, area);
        if n > 0 && area.contains(x, y) {
            self.touch_line(x, y, area.right().min(self.buffer.width()).saturating_sub(x));
        }
    }
}

impl Deref for RenderBuffer {
    type Target = Buffer;

    fn deref(&self) -> &Buffer {
        &self.buffer
    }
}

impl From<Buffer> for RenderBuffer {
    fn from(buffer: Buffer) -> Self {
        Self::from_buffer(buffer)
    }
}

impl Screen for RenderBuffer {
    fn bounds(&self) -> Rect {
        self.buffer.bounds()
    }

    fn cell_at(&self, x: u16, y: u16) -> Option<&Cell> {
        self.buffer.cell_at(x, y)
    }

    /// Set a cell, touching it only if the content actually changes.
    fn set_cell(&mut self, x: u16, y: u16, cell: Option<&Cell>) {
        let Some(current) = self.buffer.cell_at(x, y) else {
            return;
        };
        let changed = match cell {
            Some(c) => current != c,
            None => *current != Cell::default(),
        };
        if changed {
            let w = cell.map_or(1, |c| u16::from(c.width.max(1)));
            // A write can blank a wide cell that starts to the left.
            let first = x.saturating_sub(1);
            self.touch_line(first, y, w + (x - first));
        }
        self.buffer.set_cell(x, y, cell);
    }
}

impl Drawable for RenderBuffer {
    fn draw(&self, scr: &mut dyn Screen, area: Rect) {
        self.buffer.draw(scr, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Style;
    use pretty_assertions::assert_eq;

    #[test]
    fn fresh_buffer_is_clean() {
        let rb = RenderBuffer::new(4, 3);
        assert_eq!(rb.touched_lines(), 0);
    }

    #[test]
    fn from_buffer_touches_everything() {
        let rb = RenderBuffer::from(Buffer::new(4, 3));
        assert_eq!(rb.touched_lines(), 3);
        assert_eq!(rb.touched(1), Some(Span { first: 0, end: 4 }));
    }

    #[test]
    fn writes_touch_only_on_change() {
        let mut rb = RenderBuffer::new(4, 2);
        rb.set_cell(0, 0, None);
        assert_eq!(rb.touched_lines(), 0);

        rb.set_cell(2, 1, Some(&Cell::new("x")));
        assert_eq!(rb.touched_lines(), 1);
        assert!(rb.is_touched(1));
        assert_eq!(rb.touched(1), Some(Span { first: 1, end: 3 }));
    }

    #[test]
    fn spans_merge() {
        let mut rb = RenderBuffer::new(10, 1);
        rb.touch_line(2, 0, 1);
        rb.touch_line(6, 0, 2);
        assert_eq!(rb.touched(0), Some(Span { first: 2, end: 8 }));
    }

    #[test]
    fn identical_repaint_stays_clean() {
        let mut rb = RenderBuffer::new(8, 1);
        rb.set_string(0, 0, "hello", Style::DEFAULT);
        rb.clear_touched();
        rb.set_string(0, 0, "hello", Style::DEFAULT);
        assert_eq!(rb.touched_lines(), 0);
    }

    #[test]
    fn out_of_bounds_touch_is_ignored() {
        let mut rb = RenderBuffer::new(2, 2);
        rb.touch_line(0, 5, 1);
        rb.set_cell(0, 9, Some(&Cell::new("x")));
        assert_eq!(rb.touched_lines(), 0);
    }

    #[test]
    fn region_ops_touch_area_rows() {
        let mut rb = RenderBuffer::new(4, 4);
        rb.insert_line_area(1, 1, None, Rect::new(0, 1, 4, 2));
        assert_eq!(rb.touched_lines(), 2);
        assert!(rb.is_touched(1) && rb.is_touched(2));
        rb.clear_touched();

        rb.delete_cell(1, 3, 1, None);
        assert_eq!(rb.touched(3), Some(Span { first: 1, end: 4 }));
    }

    #[test]
    fn resize_touches_all() {
        let mut rb = RenderBuffer::new(2, 2);
        rb.resize(3, 4);
        assert_eq!(rb.touched_lines(), 4);
        assert_eq!(rb.width(), 3);
    }

    #[test]
    fn clear_touched_resets() {
        let mut rb = RenderBuffer::new(2, 2);
        rb.touch_all();
        rb.clear_touched();
        assert_eq!(rb.touched_lines(), 0);
    }
}
