// SPDX-License-Identifier: MIT
//
// Windows — positioned regions that applications draw into.
//
// A `Window` owns its Buffer and may own child windows, each with its own
// Buffer and a position relative to its parent. Drawing a window onto a
// screen paints the parent first and the children on top, in creation
// order.
//
// A `View` is a window that owns nothing. It borrows its parent's Buffer
// mutably and translates coordinates by an offset, so several regions can
// be drawn independently without copying. The borrow checker enforces
// what the view relationship needs: the parent stays alive and untouched
// for as long as the view exists.

use crate::buffer::{Buffer, Drawable, Rect, Screen};
use crate::cell::Cell;
use crate::error::{Error, Result};

// ─── Window ──────────────────────────────────────────────────────────────────

/// An owning window.
#[derive(Debug, Clone, Default)]
pub struct Window {
    /// Position relative to the parent; size matches the buffer.
    bounds: Rect,
    buffer: Buffer,
    children: Vec<Window>,
}

impl Window {
    /// A root window at the origin.
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            bounds: Rect::new(0, 0, width, height),
            buffer: Buffer::new(width, height),
            children: Vec::new(),
        }
    }

    /// Position and size relative to the parent.
    #[inline]
    #[must_use]
    pub const fn area(&self) -> Rect {
        self.bounds
    }

    #[inline]
    #[must_use]
    pub const fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    #[inline]
    pub fn buffer_mut(&mut self) -> &mut Buffer {
        &mut self.buffer
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    #[inline]
    pub fn children_mut(&mut self) -> &mut [Self] {
        &mut self.children
    }

    /// Create a child window occupying `area` of this window.
    ///
    /// `area` is in this window's coordinates and must be non-empty and
    /// lie entirely inside it.
    pub fn new_child(&mut self, area: Rect) -> Result<&mut Self> {
        if area.is_empty() || !self.bounds().contains_rect(area) {
            return Err(Error::InvalidDimensions);
        }
        let idx = self.children.len();
        self.children.push(Self {
            bounds: area,
            buffer: Buffer::new(area.width, area.height),
            children: Vec::new(),
        });
        Ok(&mut self.children[idx])
    }

    /// A borrowed view over `area` of this window's buffer.
    pub fn view(&mut self, area: Rect) -> Result<View<'_>> {
        View::over(&mut self.buffer, area)
    }

    /// Move the window within its parent.
    pub const fn move_to(&mut self, x: u16, y: u16) {
        self.bounds.x = x;
        self.bounds.y = y;
    }

    /// Resize the window and its buffer. Children keep their positions.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.bounds.width = width;
        self.bounds.height = height;
        self.buffer.resize(width, height);
    }

    /// Blank the buffer. Children are left alone.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Paint with this window's top-left corner at `(ax, ay)` on `scr`.
    fn draw_at(&self, scr: &mut dyn Screen, ax: u16, ay: u16, clip: Rect) {
        let abs = Rect::new(ax, ay, self.bounds.width, self.bounds.height);
        let Some(vis) = abs.intersect(clip) else {
            return;
        };
        for y in vis.y..vis.bottom() {
            let mut x = vis.x;
            while x < vis.right() {
                match self.buffer.cell_at(x - abs.x, y - abs.y) {
                    Some(c) if !c.is_zero() => {
                        let w = u16::from(c.width.max(1));
                        if x.saturating_add(w) <= vis.right() {
                            scr.set_cell(x, y, Some(c));
                        } else {
                            scr.set_cell(x, y, Some(&Cell::blank(c.style)));
                        }
                        x = x.saturating_add(w);
                    }
                    _ => x += 1,
                }
            }
        }
        for child in &self.children {
            let (cx, cy) = (ax.saturating_add(child.bounds.x), ay.saturating_add(child.bounds.y));
            child.draw_at(scr, cx, cy, vis);
        }
    }
}

impl Screen for Window {
    fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.bounds.width, self.bounds.height)
    }

    fn cell_at(&self, x: u16, y: u16) -> Option<&Cell> {
        self.buffer.cell_at(x, y)
    }

    fn set_cell(&mut self, x: u16, y: u16, cell: Option<&Cell>) {
        self.buffer.set_cell(x, y, cell);
    }
}

impl Drawable for Window {
    /// Paint the window and its children with the window's origin at the
    /// area's corner, clipped to the area.
    fn draw(&self, scr: &mut dyn Screen, area: Rect) {
        let Some(clip) = area.intersect(scr.bounds()) else {
            return;
        };
        self.draw_at(scr, area.x, area.y, clip);
    }
}

// ─── View ────────────────────────────────────────────────────────────────────

/// A non-owning window over part of another buffer.
#[derive(Debug)]
pub struct View<'a> {
    buffer: &'a mut Buffer,
    /// Area in the backing buffer's coordinates.
    area: Rect,
}

impl<'a> View<'a> {
    fn over(buffer: &'a mut Buffer, area: Rect) -> Result<Self> {
        if area.is_empty() || !buffer.bounds().contains_rect(area) {
            return Err(Error::InvalidDimensions);
        }
        Ok(Self { buffer, area })
    }

    /// The view's area in the backing buffer.
    #[inline]
    #[must_use]
    pub const fn area(&self) -> Rect {
        self.area
    }

    /// A nested view. `area` is relative to this view.
    pub fn view(&mut self, area: Rect) -> Result<View<'_>> {
        if area.is_empty() || !self.bounds().contains_rect(area) {
            return Err(Error::InvalidDimensions);
        }
        View::over(self.buffer, area.offset(self.area.x, self.area.y))
    }

    /// Blank every cell in the view.
    pub fn clear(&mut self) {
        self.buffer.clear_area(self.area);
    }

    /// Fill the view with `cell`.
    pub fn fill(&mut self, cell: Option<&Cell>) {
        self.buffer.fill_area(cell, self.area);
    }

    pub fn insert_line(&mut self, y: u16, n: u16, cell: Option<&Cell>) {
        self.buffer.insert_line_area(y.saturating_add(self.area.y), n, cell, self.area);
    }

    pub fn delete_line(&mut self, y: u16, n: u16, cell: Option<&Cell>) {
        self.buffer.delete_line_area(y.saturating_add(self.area.y), n, cell, self.area);
    }

    pub fn insert_cell(&mut self, x: u16, y: u16, n: u16, cell: Option<&Cell>) {
        let (x, y) = (x.saturating_add(self.area.x), y.saturating_add(self.area.y));
        self.buffer.insert_cell_area(x, y, n, cell, self.area);
    }

    pub fn delete_cell(&mut self, x: u16, y: u16, n: u16, cell: Option<&Cell>) {
        let (x, y) = (x.saturating_add(self.area.x), y.saturating_add(self.area.y));
        self.buffer.delete_cell_area(x, y, n, cell, self.area);
    }
}

impl Screen for View<'_> {
    fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.area.width, self.area.height)
    }

    fn cell_at(&self, x: u16, y: u16) -> Option<&Cell> {
        if !self.bounds().contains(x, y) {
            return None;
        }
        self.buffer.cell_at(self.area.x + x, self.area.y + y)
    }

    /// Writes outside the view are dropped. A wide cell that would spill
    /// past the view's right edge is written as a blank in its style.
    fn set_cell(&mut self, x: u16, y: u16, cell: Option<&Cell>) {
        if !self.bounds().contains(x, y) {
            return;
        }
        let (bx, by) = (self.area.x + x, self.area.y + y);
        match cell {
            Some(c) if x.saturating_add(u16::from(c.width)) > self.area.width => {
                self.buffer.set_cell(bx, by, Some(&Cell::blank(c.style)));
            }
            _ => self.buffer.set_cell(bx, by, cell),
        }
    }
}
