// SPDX-License-Identifier: MIT
//
// Tab stops — where a hard tab moves the cursor.
//
// The renderer uses these to walk the cursor with `\t` (or CHT/CBT) when
// that is shorter than an explicit move. Terminals start with a stop every
// 8 columns, and we assume nobody changed that.

/// The default tab interval.
pub const DEFAULT_INTERVAL: u16 = 8;

/// Tab stops across one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabStops {
    stops: Vec<bool>,
    interval: u16,
}

impl TabStops {
    /// Stops every `interval` columns across `width` columns.
    #[must_use]
    pub fn new(width: u16, interval: u16) -> Self {
        let mut ts = Self {
            stops: Vec::new(),
            interval,
        };
        ts.resize(width);
        ts
    }

    /// Stops every 8 columns.
    #[must_use]
    pub fn with_default_interval(width: u16) -> Self {
        Self::new(width, DEFAULT_INTERVAL)
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u16 {
        u16::try_from(self.stops.len()).unwrap_or(u16::MAX)
    }

    /// Resize, placing default stops in any new columns.
    pub fn resize(&mut self, width: u16) {
        let old = self.stops.len();
        self.stops.resize(usize::from(width), false);
        if self.interval == 0 {
            return;
        }
        let interval = usize::from(self.interval);
        for (col, stop) in self.stops.iter_mut().enumerate().skip(old) {
            *stop = col % interval == 0;
        }
    }

    /// Whether `col` is a stop.
    #[inline]
    #[must_use]
    pub fn is_stop(&self, col: u16) -> bool {
        self.stops.get(usize::from(col)).copied().unwrap_or(false)
    }

    pub fn set(&mut self, col: u16) {
        if let Some(s) = self.stops.get_mut(usize::from(col)) {
            *s = true;
        }
    }

    pub fn reset(&mut self, col: u16) {
        if let Some(s) = self.stops.get_mut(usize::from(col)) {
            *s = false;
        }
    }

    /// Remove every stop.
    pub fn clear(&mut self) {
        self.stops.fill(false);
    }

    /// The next stop after `col`, or the last column if there is none.
    #[must_use]
    pub fn next(&self, col: u16) -> u16 {
        let last = self.width().saturating_sub(1);
        ((col.saturating_add(1))..self.width())
            .find(|&c| self.is_stop(c))
            .unwrap_or(last)
    }

    /// The previous stop before `col`, or column 0 if there is none.
    #[must_use]
    pub fn prev(&self, col: u16) -> u16 {
        (0..col.min(self.width())).rev().find(|&c| self.is_stop(c)).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_stops_every_eight() {
        let ts = TabStops::with_default_interval(24);
        assert!(ts.is_stop(0));
        assert!(ts.is_stop(8));
        assert!(ts.is_stop(16));
        assert!(!ts.is_stop(7));
    }

    #[test]
    fn next_and_prev() {
        let ts = TabStops::with_default_interval(20);
        assert_eq!(ts.next(0), 8);
        assert_eq!(ts.next(8), 16);
        assert_eq!(ts.next(16), 19);
        assert_eq!(ts.prev(16), 8);
        assert_eq!(ts.prev(9), 8);
        assert_eq!(ts.prev(3), 0);
        assert_eq!(ts.prev(0), 0);
    }

    #[test]
    fn set_reset_clear() {
        let mut ts = TabStops::with_default_interval(10);
        ts.set(3);
        assert_eq!(ts.next(0), 3);
        ts.reset(3);
        assert_eq!(ts.next(0), 8);
        ts.clear();
        assert_eq!(ts.next(0), 9);
    }

    #[test]
    fn resize_extends_default_stops() {
        let mut ts = TabStops::with_default_interval(10);
        ts.resize(30);
        assert_eq!(ts.width(), 30);
        assert!(ts.is_stop(24));
        ts.resize(5);
        assert_eq!(ts.next(0), 4);
    }
}
