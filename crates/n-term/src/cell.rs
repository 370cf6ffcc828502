// SPDX-License-Identifier: MIT
//
// Cell — the atomic unit of terminal rendering.
//
// Every grid position on screen is a Cell: one grapheme cluster, its
// display width, a Style, and an optional hyperlink. The whole output
// pipeline exists to produce, diff, and emit these.
//
// Wide characters (CJK, most emoji) occupy two or more columns. The first
// cell holds the grapheme and its full width; the columns it covers hold
// placeholder cells (width 0, empty content). Placeholders carry no text
// of their own and are never written to the terminal: the renderer skips
// them because the wide cell already advanced the cursor over them.
//
// Styles compare by value. The renderer keeps the "pen" (the style the
// terminal is currently drawing with) and asks `Style::diff` for the
// shortest SGR that moves the pen to the next cell's style. Resets come
// before sets inside one sequence so an attribute turned off never
// clobbers one being turned on.

use std::fmt::{self, Write as _};

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::color::{Color, ColorProfile};

// ─── Text Attributes ─────────────────────────────────────────────────────────

bitflags::bitflags! {
    /// Text attributes stored as a compact bitfield.
    ///
    /// These map directly to SGR parameters. Combine with bitwise OR:
    ///
    /// ```
    /// use n_term::cell::Attr;
    ///
    /// let a = Attr::BOLD | Attr::ITALIC;
    /// assert!(a.contains(Attr::BOLD));
    /// assert!(!a.contains(Attr::FAINT));
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Attr: u8 {
        /// SGR 1 — increased intensity.
        const BOLD          = 1 << 0;
        /// SGR 2 — decreased intensity.
        const FAINT         = 1 << 1;
        /// SGR 3 — italic.
        const ITALIC        = 1 << 2;
        /// SGR 5 — slow blink.
        const BLINK         = 1 << 3;
        /// SGR 6 — rapid blink. Rarely supported.
        const RAPID_BLINK   = 1 << 4;
        /// SGR 7 — swap foreground and background.
        const REVERSE       = 1 << 5;
        /// SGR 8 — invisible text.
        const CONCEAL       = 1 << 6;
        /// SGR 9 — crossed-out text.
        const STRIKETHROUGH = 1 << 7;
    }
}

// ─── Underline Style ─────────────────────────────────────────────────────────

/// Underline style for a cell.
///
/// Kept apart from [`Attr`] so there is no "underlined" bit that could
/// disagree with the style. Anything other than `None` is underlined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
#[repr(u8)]
pub enum UnderlineStyle {
    #[default]
    None = 0,
    /// SGR 4.
    Single = 1,
    /// SGR 4:2.
    Double = 2,
    /// SGR 4:3, the wavy line.
    Curly = 3,
    /// SGR 4:4.
    Dotted = 4,
    /// SGR 4:5.
    Dashed = 5,
}

impl UnderlineStyle {
    /// Whether any underline is active.
    #[inline]
    #[must_use]
    pub const fn is_underlined(self) -> bool {
        !matches!(self, Self::None)
    }
}

// ─── SGR assembly ────────────────────────────────────────────────────────────

/// Collects SGR parameters and renders them as one `CSI ... m`.
#[derive(Default)]
struct Sgr(String);

impl Sgr {
    fn push(&mut self, param: &str) {
        if !self.0.is_empty() {
            self.0.push(';');
        }
        self.0.push_str(param);
    }

    fn color(&mut self, color: Option<Color>, basic: u8, bright: u8, ext: u8, reset: u8) {
        if !self.0.is_empty() {
            self.0.push(';');
        }
        // Writing into a String cannot fail.
        let _ = match color {
            None => write!(self.0, "{reset}"),
            Some(Color::Ansi(i)) if i < 8 => write!(self.0, "{}", u16::from(basic) + u16::from(i)),
            Some(Color::Ansi(i)) if i < 16 => {
                write!(self.0, "{}", u16::from(bright) + u16::from(i) - 8)
            }
            Some(Color::Ansi(i) | Color::Indexed(i)) => write!(self.0, "{ext};5;{i}"),
            Some(Color::Rgb(r, g, b)) => write!(self.0, "{ext};2;{r};{g};{b}"),
        };
    }

    fn fg(&mut self, color: Option<Color>) {
        self.color(color, 30, 90, 38, 39);
    }

    fn bg(&mut self, color: Option<Color>) {
        self.color(color, 40, 100, 48, 49);
    }

    fn underline_color(&mut self, color: Option<Color>) {
        // There are no short forms for underline colors.
        match color {
            Some(Color::Ansi(i)) => {
                self.push("58;5");
                self.push(&i.to_string());
            }
            other => self.color(other, 0, 0, 58, 59),
        }
    }

    fn underline(&mut self, style: UnderlineStyle) {
        match style {
            UnderlineStyle::None => self.push("24"),
            UnderlineStyle::Single => self.push("4"),
            UnderlineStyle::Double => self.push("4:2"),
            UnderlineStyle::Curly => self.push("4:3"),
            UnderlineStyle::Dotted => self.push("4:4"),
            UnderlineStyle::Dashed => self.push("4:5"),
        }
    }

    fn finish(self) -> String {
        format!("\x1b[{}m", self.0)
    }
}

// ─── Style ───────────────────────────────────────────────────────────────────

/// Visual attributes of a cell. `None` colors mean "terminal default".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Style {
    pub fg: Option<Color>,
    pub bg: Option<Color>,
    pub underline_color: Option<Color>,
    pub underline: UnderlineStyle,
    pub attrs: Attr,
}

impl Style {
    /// The default style: no colors, no attributes.
    pub const DEFAULT: Self = Self {
        fg: None,
        bg: None,
        underline_color: None,
        underline: UnderlineStyle::None,
        attrs: Attr::empty(),
    };

    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self::DEFAULT
    }

    #[inline]
    #[must_use]
    pub const fn with_fg(self, fg: Color) -> Self {
        Self { fg: Some(fg), ..self }
    }

    #[inline]
    #[must_use]
    pub const fn with_bg(self, bg: Color) -> Self {
        Self { bg: Some(bg), ..self }
    }

    #[inline]
    #[must_use]
    pub const fn with_attrs(self, attrs: Attr) -> Self {
        Self { attrs, ..self }
    }

    #[inline]
    #[must_use]
    pub const fn with_underline(self, underline: UnderlineStyle) -> Self {
        Self { underline, ..self }
    }

    #[inline]
    #[must_use]
    pub const fn with_underline_color(self, color: Color) -> Self {
        Self {
            underline_color: Some(color),
            ..self
        }
    }

    /// Whether this is the default style.
    #[inline]
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::DEFAULT
    }

    /// The complete SGR sequence for this style, starting from a reset pen.
    ///
    /// The default style yields the bare reset `CSI m`.
    #[must_use]
    pub fn sgr(&self) -> String {
        if self.is_zero() {
            return RESET.to_string();
        }

        let mut b = Sgr::default();
        let a = self.attrs;
        if a.contains(Attr::BOLD) {
            b.push("1");
        }
        if a.contains(Attr::FAINT) {
            b.push("2");
        }
        if a.contains(Attr::ITALIC) {
            b.push("3");
        }
        if a.contains(Attr::BLINK) {
            b.push("5");
        }
        if a.contains(Attr::RAPID_BLINK) {
            b.push("6");
        }
        if a.contains(Attr::REVERSE) {
            b.push("7");
        }
        if a.contains(Attr::CONCEAL) {
            b.push("8");
        }
        if a.contains(Attr::STRIKETHROUGH) {
            b.push("9");
        }
        if self.underline.is_underlined() {
            b.underline(self.underline);
        }
        if self.fg.is_some() {
            b.fg(self.fg);
        }
        if self.bg.is_some() {
            b.bg(self.bg);
        }
        if self.underline_color.is_some() {
            b.underline_color(self.underline_color);
        }
        b.finish()
    }

    /// The SGR sequence that moves the pen from `from` to `self`.
    ///
    /// Equal styles yield an empty string. Moving to the default style is
    /// always the 3-byte reset. Otherwise color changes come first, then
    /// attribute resets, then attribute sets. Bold and faint share reset
    /// code 22, as do both blinks with 25, so turning one off re-applies
    /// the other if it stays on.
    ///
    /// When `CSI 0 ; <full style> m` is shorter than the delta, that wins.
    #[must_use]
    pub fn diff(&self, from: &Self) -> String {
        if self == from {
            return String::new();
        }
        if self.is_zero() {
            return RESET.to_string();
        }

        let delta = self.delta(from);
        let full = self.sgr();
        match full.strip_prefix("\x1b[") {
            Some(params) if params.len() + 4 < delta.len() => format!("\x1b[0;{params}"),
            _ => delta,
        }
    }

    fn delta(&self, from: &Self) -> String {

        let mut b = Sgr::default();

        if from.fg != self.fg {
            b.fg(self.fg);
        }
        if from.bg != self.bg {
            b.bg(self.bg);
        }
        if from.underline_color != self.underline_color {
            b.underline_color(self.underline_color);
        }

        let f = from.attrs;
        let t = self.attrs;
        let has = |set: Attr, flag: Attr| set.contains(flag);

        let mut bold_changed = has(f, Attr::BOLD) != has(t, Attr::BOLD);
        let mut faint_changed = has(f, Attr::FAINT) != has(t, Attr::FAINT);
        if (bold_changed || faint_changed)
            && ((has(f, Attr::BOLD) && !has(t, Attr::BOLD))
                || (has(f, Attr::FAINT) && !has(t, Attr::FAINT)))
        {
            b.push("22");
            bold_changed = true;
            faint_changed = true;
        }

        let italic_changed = has(f, Attr::ITALIC) != has(t, Attr::ITALIC);
        if italic_changed && !has(t, Attr::ITALIC) {
            b.push("23");
        }

        let underline_changed = from.underline != self.underline;
        if underline_changed && !self.underline.is_underlined() {
            b.push("24");
        }

        let mut blink_changed = has(f, Attr::BLINK) != has(t, Attr::BLINK);
        let mut rapid_changed = has(f, Attr::RAPID_BLINK) != has(t, Attr::RAPID_BLINK);
        if (blink_changed || rapid_changed)
            && ((has(f, Attr::BLINK) && !has(t, Attr::BLINK))
                || (has(f, Attr::RAPID_BLINK) && !has(t, Attr::RAPID_BLINK)))
        {
            b.push("25");
            blink_changed = true;
            rapid_changed = true;
        }

        let reverse_changed = has(f, Attr::REVERSE) != has(t, Attr::REVERSE);
        if reverse_changed && !has(t, Attr::REVERSE) {
            b.push("27");
        }
        let conceal_changed = has(f, Attr::CONCEAL) != has(t, Attr::CONCEAL);
        if conceal_changed && !has(t, Attr::CONCEAL) {
            b.push("28");
        }
        let strike_changed = has(f, Attr::STRIKETHROUGH) != has(t, Attr::STRIKETHROUGH);
        if strike_changed && !has(t, Attr::STRIKETHROUGH) {
            b.push("29");
        }

        if bold_changed && has(t, Attr::BOLD) {
            b.push("1");
        }
        if faint_changed && has(t, Attr::FAINT) {
            b.push("2");
        }
        if italic_changed && has(t, Attr::ITALIC) {
            b.push("3");
        }
        if underline_changed && self.underline == UnderlineStyle::Single {
            b.push("4");
        }
        if blink_changed && has(t, Attr::BLINK) {
            b.push("5");
        }
        if rapid_changed && has(t, Attr::RAPID_BLINK) {
            b.push("6");
        }
        if reverse_changed && has(t, Attr::REVERSE) {
            b.push("7");
        }
        if conceal_changed && has(t, Attr::CONCEAL) {
            b.push("8");
        }
        if strike_changed && has(t, Attr::STRIKETHROUGH) {
            b.push("9");
        }
        if underline_changed && self.underline > UnderlineStyle::Single {
            b.underline(self.underline);
        }

        b.finish()
    }

    /// Downsample the style's colors to `profile`.
    ///
    /// `Ascii` keeps attributes but drops colors; `NoTty` drops everything.
    #[must_use]
    pub fn convert(self, profile: ColorProfile) -> Self {
        match profile {
            ColorProfile::TrueColor => self,
            ColorProfile::NoTty => Self::DEFAULT,
            _ => Self {
                fg: self.fg.and_then(|c| profile.convert(c)),
                bg: self.bg.and_then(|c| profile.convert(c)),
                underline_color: self.underline_color.and_then(|c| profile.convert(c)),
                ..self
            },
        }
    }

    /// Wrap `text` in this style followed by a reset.
    #[must_use]
    pub fn styled(&self, text: &str) -> String {
        if self.is_zero() {
            return text.to_string();
        }
        format!("{}{text}{RESET}", self.sgr())
    }
}

/// The shortest SGR reset.
pub const RESET: &str = "\x1b[m";

// ─── Link ────────────────────────────────────────────────────────────────────

/// An OSC 8 hyperlink. An empty URL means "no link".
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash)]
pub struct Link {
    pub url: String,
    /// Colon-separated `key=value` parameters, e.g. `id=42`.
    pub params: String,
}

impl Link {
    /// Create a link; `params` are joined with `:`.
    #[must_use]
    pub fn new(url: impl Into<String>, params: &[&str]) -> Self {
        Self {
            url: url.into(),
            params: params.join(":"),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.url.is_empty() && self.params.is_empty()
    }

    /// Links are dropped entirely when output is not a terminal.
    #[must_use]
    pub fn convert(self, profile: ColorProfile) -> Self {
        if profile == ColorProfile::NoTty {
            Self::default()
        } else {
            self
        }
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

// ─── Cell ────────────────────────────────────────────────────────────────────

/// One grid position: a grapheme, its width, its style and link.
///
/// - `width == 1`: a normal cell.
/// - `width >= 2`: a wide cell; the next `width - 1` columns hold
///   placeholders.
/// - `width == 0` with empty content: a placeholder, or a never-written
///   cell in a fresh line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cell {
    pub content: String,
    pub style: Style,
    pub link: Link,
    pub width: u8,
}

impl Default for Cell {
    /// A blank cell: a single space, width 1, default style, no link.
    fn default() -> Self {
        Self {
            content: " ".to_string(),
            style: Style::DEFAULT,
            link: Link::default(),
            width: 1,
        }
    }
}

impl Cell {
    /// Build a cell from the first grapheme cluster of `s`.
    ///
    /// Anything past the first grapheme is ignored. An empty string yields
    /// a placeholder. Control characters and combining marks measured as
    /// zero-width still occupy one column.
    #[must_use]
    pub fn new(s: &str) -> Self {
        let Some(g) = s.graphemes(true).next() else {
            return Self::placeholder();
        };
        if g == " " {
            return Self::default();
        }
        let w = u8::try_from(UnicodeWidthStr::width(g)).unwrap_or(u8::MAX);
        Self {
            content: g.to_string(),
            style: Style::DEFAULT,
            link: Link::default(),
            width: w.max(1),
        }
    }

    /// Build a cell from a single character.
    #[must_use]
    pub fn from_char(ch: char) -> Self {
        let mut buf = [0u8; 4];
        Self::new(ch.encode_utf8(&mut buf))
    }

    /// The zero cell: no content, width 0. Used for wide-cell placeholders.
    #[inline]
    #[must_use]
    pub const fn placeholder() -> Self {
        Self {
            content: String::new(),
            style: Style::DEFAULT,
            link: Link {
                url: String::new(),
                params: String::new(),
            },
            width: 0,
        }
    }

    /// A blank cell with the given style. Used for fills and clears.
    #[must_use]
    pub fn blank(style: Style) -> Self {
        Self {
            style,
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn with_style(self, style: Style) -> Self {
        Self { style, ..self }
    }

    #[inline]
    #[must_use]
    pub fn with_link(self, link: Link) -> Self {
        Self { link, ..self }
    }

    /// Whether this is the zero cell.
    #[inline]
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.width == 0 && self.content.is_empty() && self.style.is_zero() && self.link.is_zero()
    }

    /// Whether this cell is a wide-character placeholder.
    #[inline]
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.width == 0 && self.content.is_empty()
    }

    /// Whether the cell is a space whose only visible attribute is its
    /// background. Such cells can be produced by erase operations.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.content == " "
            && self.width == 1
            && self.link.is_zero()
            && self.style.fg.is_none()
            && self.style.attrs.is_empty()
            && !self.style.underline.is_underlined()
    }

    /// Reset to a blank default cell.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // ── Cells ───────────────────────────────────────────────────────────

    #[test]
    fn default_cell_is_blank_space() {
        let c = Cell::default();
        assert_eq!(c.content, " ");
        assert_eq!(c.width, 1);
        assert!(c.is_blank());
        assert!(!c.is_zero());
    }

    #[test]
    fn placeholder_is_zero() {
        let p = Cell::placeholder();
        assert!(p.is_zero());
        assert!(p.is_placeholder());
        assert_eq!(Cell::new(""), p);
    }

    #[test]
    fn new_measures_width() {
        assert_eq!(Cell::new("a").width, 1);
        assert_eq!(Cell::new("世").width, 2);
        assert_eq!(Cell::new("🎉").width, 2);
    }

    #[test]
    fn new_keeps_only_first_grapheme() {
        let c = Cell::new("héllo");
        assert_eq!(c.content, "h");
        let e = Cell::new("e\u{301}x");
        assert_eq!(e.content, "e\u{301}");
        assert_eq!(e.width, 1);
    }

    #[test]
    fn from_char_matches_new() {
        assert_eq!(Cell::from_char('x'), Cell::new("x"));
        assert_eq!(Cell::from_char(' '), Cell::default());
    }

    #[test]
    fn styled_cells_differ() {
        let a = Cell::new("a");
        let b = Cell::new("a").with_style(Style::new().with_attrs(Attr::BOLD));
        assert_ne!(a, b);
    }

    #[test]
    fn blank_with_background_is_blank() {
        assert!(Cell::blank(Style::new().with_bg(Color::BLUE)).is_blank());
        assert!(!Cell::blank(Style::new().with_fg(Color::BLUE).with_attrs(Attr::REVERSE)).is_blank());
        assert!(!Cell::new("x").is_blank());
    }

    // ── Style SGR ───────────────────────────────────────────────────────

    #[test]
    fn zero_style_is_reset() {
        assert_eq!(Style::new().sgr(), "\x1b[m");
    }

    #[test]
    fn full_sgr_order() {
        let s = Style::new()
            .with_attrs(Attr::BOLD | Attr::ITALIC)
            .with_underline(UnderlineStyle::Curly)
            .with_fg(Color::RED)
            .with_bg(Color::Indexed(200))
            .with_underline_color(Color::Rgb(1, 2, 3));
        assert_eq!(s.sgr(), "\x1b[1;3;4:3;31;48;5;200;58;2;1;2;3m");
    }

    #[test]
    fn bright_colors_use_short_codes() {
        let s = Style::new().with_fg(Color::Ansi(9)).with_bg(Color::Ansi(15));
        assert_eq!(s.sgr(), "\x1b[91;107m");
    }

    #[test]
    fn ansi_past_fifteen_is_indexed() {
        assert_eq!(Style::new().with_fg(Color::Ansi(42)).sgr(), "\x1b[38;5;42m");
    }

    #[test]
    fn single_underline_is_plain_four() {
        let s = Style::new().with_underline(UnderlineStyle::Single);
        assert_eq!(s.sgr(), "\x1b[4m");
    }

    #[test]
    fn all_attrs() {
        let s = Style::new().with_attrs(Attr::all());
        assert_eq!(s.sgr(), "\x1b[1;2;3;5;6;7;8;9m");
    }

    #[test]
    fn styled_wraps_text() {
        let s = Style::new().with_attrs(Attr::BOLD);
        assert_eq!(s.styled("hi"), "\x1b[1mhi\x1b[m");
        assert_eq!(Style::new().styled("hi"), "hi");
    }

    // ── Style diff ──────────────────────────────────────────────────────

    #[test]
    fn diff_equal_is_empty() {
        let s = Style::new().with_fg(Color::RED);
        assert_eq!(s.diff(&s), "");
    }

    #[test]
    fn diff_to_default_is_reset() {
        let from = Style::new().with_fg(Color::RED).with_attrs(Attr::BOLD);
        assert_eq!(Style::new().diff(&from), "\x1b[m");
    }

    #[test]
    fn diff_from_default_sets_only_what_is_needed() {
        let to = Style::new().with_fg(Color::GREEN).with_attrs(Attr::BOLD);
        assert_eq!(to.diff(&Style::new()), "\x1b[32;1m");
    }

    #[test]
    fn diff_color_change_only() {
        let from = Style::new().with_fg(Color::RED).with_attrs(Attr::BOLD);
        let to = Style::new().with_fg(Color::BLUE).with_attrs(Attr::BOLD);
        assert_eq!(to.diff(&from), "\x1b[34m");
    }

    #[test]
    fn diff_unset_color_uses_default_code() {
        let from = Style::new().with_fg(Color::RED).with_bg(Color::BLUE);
        let to = Style::new().with_fg(Color::RED);
        assert_eq!(to.diff(&from), "\x1b[49m");
    }

    #[test]
    fn diff_dropping_bold_keeps_faint() {
        let from = Style::new().with_attrs(Attr::BOLD | Attr::FAINT | Attr::ITALIC);
        let to = Style::new().with_attrs(Attr::FAINT | Attr::ITALIC);
        assert_eq!(to.diff(&from), "\x1b[22;2m");
    }

    #[test]
    fn diff_resets_before_sets() {
        let from = Style::new().with_attrs(Attr::ITALIC | Attr::BOLD);
        let to = Style::new().with_attrs(Attr::REVERSE | Attr::BOLD);
        assert_eq!(to.diff(&from), "\x1b[23;7m");
    }

    #[test]
    fn diff_falls_back_to_reset_when_shorter() {
        let from = Style::new()
            .with_attrs(Attr::BOLD | Attr::ITALIC | Attr::REVERSE)
            .with_underline(UnderlineStyle::Single);
        let to = Style::new().with_fg(Color::RED);
        assert_eq!(to.diff(&from), "\x1b[0;31m");

        let from = Style::new().with_attrs(Attr::ITALIC);
        let to = Style::new().with_attrs(Attr::REVERSE);
        assert_eq!(to.diff(&from), "\x1b[0;7m");
    }

    #[test]
    fn diff_is_never_longer_than_a_full_reset() {
        let styles = [
            Style::new().with_attrs(Attr::BOLD),
            Style::new().with_fg(Color::RED).with_attrs(Attr::ITALIC | Attr::STRIKETHROUGH),
            Style::new().with_bg(Color::Rgb(1, 2, 3)).with_underline(UnderlineStyle::Curly),
            Style::new().with_attrs(Attr::BLINK | Attr::RAPID_BLINK | Attr::CONCEAL),
        ];
        for from in &styles {
            for to in &styles {
                let full = format!("{RESET}{}", to.sgr());
                assert!(to.diff(from).len() < full.len(), "{from:?} -> {to:?}");
            }
        }
    }

    #[test]
    fn diff_underline_styles() {
        let from = Style::new().with_underline(UnderlineStyle::Single).with_attrs(Attr::BOLD);
        let to = Style::new().with_underline(UnderlineStyle::Curly).with_attrs(Attr::BOLD);
        assert_eq!(to.diff(&from), "\x1b[4:3m");

        let off = Style::new().with_attrs(Attr::BOLD);
        assert_eq!(off.diff(&from), "\x1b[24m");
    }

    // ── Conversion ──────────────────────────────────────────────────────

    #[test]
    fn convert_ascii_keeps_attrs() {
        let s = Style::new().with_fg(Color::RED).with_attrs(Attr::BOLD);
        let c = s.convert(ColorProfile::Ascii);
        assert_eq!(c.fg, None);
        assert_eq!(c.attrs, Attr::BOLD);
    }

    #[test]
    fn convert_notty_drops_everything() {
        let s = Style::new().with_fg(Color::RED).with_attrs(Attr::BOLD);
        assert!(s.convert(ColorProfile::NoTty).is_zero());
    }

    #[test]
    fn convert_ansi256_snaps_rgb() {
        let s = Style::new().with_bg(Color::Rgb(255, 0, 0));
        assert_eq!(s.convert(ColorProfile::Ansi256).bg, Some(Color::Indexed(196)));
    }

    // ── Links ───────────────────────────────────────────────────────────

    #[test]
    fn link_params_are_joined() {
        let l = Link::new("https://example.com", &["id=1", "x=y"]);
        assert_eq!(l.params, "id=1:x=y");
        assert_eq!(l.to_string(), "https://example.com");
        assert!(!l.is_zero());
        assert!(Link::default().is_zero());
    }

    #[test]
    fn link_dropped_without_tty() {
        let l = Link::new("https://example.com", &[]);
        assert!(l.clone().convert(ColorProfile::NoTty).is_zero());
        assert_eq!(l.clone().convert(ColorProfile::Ascii), l);
    }
}
