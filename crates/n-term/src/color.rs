// SPDX-License-Identifier: MIT
//
// Terminal colors and color-profile downsampling.
//
// A cell color is one of three encodings a terminal understands: the 16
// basic ANSI colors (SGR 30–37/90–97), an index into the 256-color palette
// (SGR 38;5;N), or 24-bit RGB (SGR 38;2;R;G;B). "Default" is not a color
// here; it is the absence of one (`Option<Color>::None` in `Style`).
//
// A `ColorProfile` describes what the terminal can actually display. Before
// the renderer writes a style it converts each color down to the profile:
// TrueColor keeps everything, Ansi256 snaps RGB onto the palette, Ansi
// snaps onto the basic 16, and Ascii / NoTty drop colors entirely.
//
// Snapping uses perceptual distance in Oklab rather than Euclidean RGB,
// which keeps dark blues from collapsing into black and muted greens from
// turning gray. The palette's Oklab coordinates are computed once and
// cached for the lifetime of the process.

use std::fmt;

use crate::config::Environ;

// ─── Color ───────────────────────────────────────────────────────────────────

/// A terminal color in one of the three wire encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    /// One of the 16 basic ANSI colors (`0..16`). Values past 15 are
    /// treated as palette indices.
    Ansi(u8),
    /// An index into the 256-color palette.
    Indexed(u8),
    /// 24-bit color.
    Rgb(u8, u8, u8),
}

impl Color {
    pub const BLACK: Self = Self::Ansi(0);
    pub const RED: Self = Self::Ansi(1);
    pub const GREEN: Self = Self::Ansi(2);
    pub const YELLOW: Self = Self::Ansi(3);
    pub const BLUE: Self = Self::Ansi(4);
    pub const MAGENTA: Self = Self::Ansi(5);
    pub const CYAN: Self = Self::Ansi(6);
    pub const WHITE: Self = Self::Ansi(7);
    pub const BRIGHT_BLACK: Self = Self::Ansi(8);
    pub const BRIGHT_WHITE: Self = Self::Ansi(15);

    /// Resolve the color to RGB using the xterm default palette.
    #[must_use]
    pub fn to_rgb(self) -> (u8, u8, u8) {
        match self {
            Self::Ansi(i) | Self::Indexed(i) => palette::ansi256_to_rgb(i),
            Self::Rgb(r, g, b) => (r, g, b),
        }
    }

    /// Parse `#rrggbb` or `#rgb` (the `#` is optional).
    #[must_use]
    pub fn from_hex(s: &str) -> Option<Self> {
        let s = s.strip_prefix('#').unwrap_or(s);
        let b = s.as_bytes();
        match b.len() {
            3 => {
                let r = hex_digit(b[0])?;
                let g = hex_digit(b[1])?;
                let bl = hex_digit(b[2])?;
                Some(Self::Rgb(r << 4 | r, g << 4 | g, bl << 4 | bl))
            }
            6 => Some(Self::Rgb(
                hex_byte(b[0], b[1])?,
                hex_byte(b[2], b[3])?,
                hex_byte(b[4], b[5])?,
            )),
            _ => None,
        }
    }

    /// The color as `#rrggbb`.
    #[must_use]
    pub fn hex(self) -> String {
        let (r, g, b) = self.to_rgb();
        format!("#{r:02x}{g:02x}{b:02x}")
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex())
    }
}

impl From<n_input::Rgb> for Color {
    fn from(c: n_input::Rgb) -> Self {
        Self::Rgb(c.r, c.g, c.b)
    }
}

#[inline]
const fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

#[inline]
const fn hex_byte(hi: u8, lo: u8) -> Option<u8> {
    match (hex_digit(hi), hex_digit(lo)) {
        (Some(h), Some(l)) => Some(h << 4 | l),
        _ => None,
    }
}

// ─── Color Profile ───────────────────────────────────────────────────────────

/// What the terminal can display, ordered from least to most capable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ColorProfile {
    /// Output is not a terminal: no colors and no attributes beyond text.
    NoTty,
    /// A terminal that must not receive colors (`NO_COLOR`, dumb terminals).
    Ascii,
    /// The 16 basic colors.
    Ansi,
    /// The 256-color palette.
    Ansi256,
    /// 24-bit color.
    #[default]
    TrueColor,
}

impl ColorProfile {
    /// Downsample `color` to this profile. `None` means "use the default".
    #[must_use]
    pub fn convert(self, color: Color) -> Option<Color> {
        match self {
            Self::NoTty | Self::Ascii => None,
            Self::TrueColor => Some(color),
            Self::Ansi256 => Some(match color {
                Color::Rgb(r, g, b) => Color::Indexed(palette::nearest_ansi256(r, g, b)),
                c => c,
            }),
            Self::Ansi => Some(match color {
                Color::Ansi(i) if i < 16 => color,
                Color::Ansi(i) | Color::Indexed(i) => {
                    let (r, g, b) = palette::ansi256_to_rgb(i);
                    Color::Ansi(palette::nearest_ansi16(r, g, b))
                }
                Color::Rgb(r, g, b) => Color::Ansi(palette::nearest_ansi16(r, g, b)),
            }),
        }
    }

    /// Detect the profile from the environment.
    ///
    /// Non-terminals and `TERM=dumb` get [`NoTty`](Self::NoTty) and
    /// [`Ascii`](Self::Ascii) respectively. A non-empty `NO_COLOR` wins over
    /// everything else. `COLORTERM=truecolor|24bit` and a handful of
    /// terminal families known to support it give
    /// [`TrueColor`](Self::TrueColor); a `256color` suffix gives
    /// [`Ansi256`](Self::Ansi256).
    #[must_use]
    pub fn detect(env: &Environ, is_tty: bool) -> Self {
        if !is_tty {
            return Self::NoTty;
        }

        let term = env.get("TERM").unwrap_or_default();
        if term == "dumb" {
            return Self::Ascii;
        }
        if env.get("NO_COLOR").is_some_and(|v| !v.is_empty()) {
            return Self::Ascii;
        }

        let colorterm = env.get("COLORTERM").unwrap_or_default().to_ascii_lowercase();
        if colorterm == "truecolor" || colorterm == "24bit" {
            return Self::TrueColor;
        }

        const TRUECOLOR_FAMILIES: [&str; 8] = [
            "alacritty", "contour", "foot", "ghostty", "kitty", "rio", "wezterm", "direct",
        ];
        if TRUECOLOR_FAMILIES.iter().any(|f| term.contains(f)) {
            return Self::TrueColor;
        }
        if term.contains("256color") {
            return Self::Ansi256;
        }
        if term.is_empty() {
            return Self::Ascii;
        }
        Self::Ansi
    }

    /// Whether any color at all is written.
    #[inline]
    #[must_use]
    pub const fn has_color(self) -> bool {
        !matches!(self, Self::NoTty | Self::Ascii)
    }
}

impl fmt::Display for ColorProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoTty => "NoTTY",
            Self::Ascii => "Ascii",
            Self::Ansi => "ANSI",
            Self::Ansi256 => "ANSI256",
            Self::TrueColor => "TrueColor",
        })
    }
}

// ─── Palette ─────────────────────────────────────────────────────────────────

pub mod palette {
    //! The xterm 256-color palette and perceptual nearest-match.
    //!
    //! - Colors 0–7: standard colors
    //! - Colors 8–15: bright variants
    //! - Colors 16–231: a 6×6×6 RGB cube
    //! - Colors 232–255: a 24-step grayscale ramp

    use std::sync::OnceLock;

    /// The xterm defaults for the basic 16 colors.
    pub const ANSI16_RGB: [(u8, u8, u8); 16] = [
        (0, 0, 0),       // 0: Black
        (128, 0, 0),     // 1: Red
        (0, 128, 0),     // 2: Green
        (128, 128, 0),   // 3: Yellow
        (0, 0, 128),     // 4: Blue
        (128, 0, 128),   // 5: Magenta
        (0, 128, 128),   // 6: Cyan
        (192, 192, 192), // 7: White
        (128, 128, 128), // 8: Bright Black
        (255, 0, 0),     // 9: Bright Red
        (0, 255, 0),     // 10: Bright Green
        (255, 255, 0),   // 11: Bright Yellow
        (0, 0, 255),     // 12: Bright Blue
        (255, 0, 255),   // 13: Bright Magenta
        (0, 255, 255),   // 14: Bright Cyan
        (255, 255, 255), // 15: Bright White
    ];

    /// Convert a palette index to RGB.
    #[must_use]
    pub const fn ansi256_to_rgb(idx: u8) -> (u8, u8, u8) {
        match idx {
            0..=15 => ANSI16_RGB[idx as usize],
            16..=231 => {
                let i = idx - 16;
                (cube_value(i / 36), cube_value((i % 36) / 6), cube_value(i % 6))
            }
            232..=255 => {
                let v = 8 + 10 * (idx - 232);
                (v, v, v)
            }
        }
    }

    // The cube steps are 0, 95, 135, 175, 215, 255.
    const fn cube_value(i: u8) -> u8 {
        if i == 0 { 0 } else { 55 + 40 * i }
    }

    fn palette_oklab() -> &'static [(f32, f32, f32); 256] {
        static OKLAB: OnceLock<[(f32, f32, f32); 256]> = OnceLock::new();
        OKLAB.get_or_init(|| {
            let mut out = [(0.0, 0.0, 0.0); 256];
            for (idx, slot) in (0u8..=255).zip(out.iter_mut()) {
                let (r, g, b) = ansi256_to_rgb(idx);
                *slot = super::rgb8_to_oklab(r, g, b);
            }
            out
        })
    }

    fn nearest_in(r: u8, g: u8, b: u8, range: std::ops::RangeInclusive<u8>) -> u8 {
        let (l1, a1, b1) = super::rgb8_to_oklab(r, g, b);
        let table = palette_oklab();

        let mut best_idx = *range.start();
        let mut best_dist = f32::MAX;
        for idx in range {
            let (l2, a2, b2) = table[idx as usize];
            let dl = l1 - l2;
            let da = a1 - a2;
            let db = b1 - b2;
            let dist = db.mul_add(db, dl.mul_add(dl, da * da));
            if dist < best_dist {
                best_dist = dist;
                best_idx = idx;
            }
        }
        best_idx
    }

    /// Nearest palette entry in the extended range (16–255).
    ///
    /// The basic 16 are skipped because terminals commonly remap them.
    #[must_use]
    pub fn nearest_ansi256(r: u8, g: u8, b: u8) -> u8 {
        nearest_in(r, g, b, 16..=255)
    }

    /// Nearest basic ANSI color.
    #[must_use]
    pub fn nearest_ansi16(r: u8, g: u8, b: u8) -> u8 {
        nearest_in(r, g, b, 0..=15)
    }
}

// ─── Oklab ───────────────────────────────────────────────────────────────────
//
// sRGB → linear sRGB → LMS → Oklab, using Björn Ottosson's matrices.

#[inline]
fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn rgb8_to_oklab(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let r = srgb_to_linear(f32::from(r) / 255.0);
    let g = srgb_to_linear(f32::from(g) / 255.0);
    let b = srgb_to_linear(f32::from(b) / 255.0);

    let l = 0.051_445_995f32.mul_add(b, 0.412_221_47f32.mul_add(r, 0.536_332_55 * g));
    let m = 0.107_396_96f32.mul_add(b, 0.211_903_5f32.mul_add(r, 0.680_699_5 * g));
    let s = 0.629_978_7f32.mul_add(b, 0.088_302_46f32.mul_add(r, 0.281_718_84 * g));

    let l_ = l.cbrt();
    let m_ = m.cbrt();
    let s_ = s.cbrt();

    (
        0.004_072_047f32.mul_add(-s_, 0.210_454_26f32.mul_add(l_, 0.793_617_8 * m_)),
        0.450_593_7f32.mul_add(s_, 1.977_998_5f32.mul_add(l_, -(2.428_592_2 * m_))),
        0.808_675_77f32.mul_add(-s_, 0.025_904_037f32.mul_add(l_, 0.782_771_77 * m_)),
    )
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn env(vars: &[&str]) -> Environ {
        Environ::new(vars.iter().map(|s| (*s).to_string()).collect())
    }

    // ── Palette ─────────────────────────────────────────────────────────

    #[test]
    fn palette_basic_colors() {
        assert_eq!(palette::ansi256_to_rgb(0), (0, 0, 0));
        assert_eq!(palette::ansi256_to_rgb(9), (255, 0, 0));
        assert_eq!(palette::ansi256_to_rgb(15), (255, 255, 255));
    }

    #[test]
    fn palette_cube() {
        assert_eq!(palette::ansi256_to_rgb(16), (0, 0, 0));
        assert_eq!(palette::ansi256_to_rgb(21), (0, 0, 255));
        assert_eq!(palette::ansi256_to_rgb(196), (255, 0, 0));
        assert_eq!(palette::ansi256_to_rgb(231), (255, 255, 255));
        assert_eq!(palette::ansi256_to_rgb(17), (0, 0, 95));
    }

    #[test]
    fn palette_grayscale() {
        assert_eq!(palette::ansi256_to_rgb(232), (8, 8, 8));
        assert_eq!(palette::ansi256_to_rgb(255), (238, 238, 238));
    }

    #[test]
    fn nearest_exact_matches() {
        assert_eq!(palette::nearest_ansi256(255, 0, 0), 196);
        assert_eq!(palette::nearest_ansi256(0, 0, 255), 21);
        assert_eq!(palette::nearest_ansi16(255, 0, 0), 9);
        assert_eq!(palette::nearest_ansi16(0, 0, 0), 0);
        assert_eq!(palette::nearest_ansi16(255, 255, 255), 15);
    }

    #[test]
    fn nearest_gray_uses_ramp() {
        assert_eq!(palette::nearest_ansi256(128, 128, 128), 244);
    }

    // ── Color ───────────────────────────────────────────────────────────

    #[test]
    fn hex_parse() {
        assert_eq!(Color::from_hex("#ff8000"), Some(Color::Rgb(255, 128, 0)));
        assert_eq!(Color::from_hex("0a0B0c"), Some(Color::Rgb(10, 11, 12)));
        assert_eq!(Color::from_hex("#fff"), Some(Color::Rgb(255, 255, 255)));
        assert_eq!(Color::from_hex("#ggg"), None);
        assert_eq!(Color::from_hex("#12345"), None);
    }

    #[test]
    fn hex_format() {
        assert_eq!(Color::Rgb(255, 128, 0).hex(), "#ff8000");
        assert_eq!(Color::RED.hex(), "#800000");
        assert_eq!(Color::Indexed(196).to_string(), "#ff0000");
    }

    #[test]
    fn from_input_rgb() {
        assert_eq!(Color::from(n_input::Rgb::new(1, 2, 3)), Color::Rgb(1, 2, 3));
    }

    // ── Conversion ──────────────────────────────────────────────────────

    #[test]
    fn truecolor_keeps_everything() {
        let c = Color::Rgb(12, 34, 56);
        assert_eq!(ColorProfile::TrueColor.convert(c), Some(c));
    }

    #[test]
    fn ascii_and_notty_drop_colors() {
        assert_eq!(ColorProfile::Ascii.convert(Color::RED), None);
        assert_eq!(ColorProfile::NoTty.convert(Color::Rgb(1, 2, 3)), None);
    }

    #[test]
    fn ansi256_snaps_rgb() {
        assert_eq!(
            ColorProfile::Ansi256.convert(Color::Rgb(255, 0, 0)),
            Some(Color::Indexed(196))
        );
        assert_eq!(ColorProfile::Ansi256.convert(Color::BLUE), Some(Color::BLUE));
    }

    #[test]
    fn ansi_snaps_everything_to_sixteen() {
        assert_eq!(
            ColorProfile::Ansi.convert(Color::Rgb(250, 5, 5)),
            Some(Color::Ansi(9))
        );
        assert_eq!(ColorProfile::Ansi.convert(Color::Indexed(196)), Some(Color::Ansi(9)));
        assert_eq!(ColorProfile::Ansi.convert(Color::GREEN), Some(Color::GREEN));
    }

    #[test]
    fn profiles_are_ordered() {
        assert!(ColorProfile::TrueColor > ColorProfile::Ansi256);
        assert!(ColorProfile::Ansi256 > ColorProfile::Ansi);
        assert!(ColorProfile::Ansi > ColorProfile::Ascii);
        assert!(ColorProfile::Ascii > ColorProfile::NoTty);
    }

    // ── Detection ───────────────────────────────────────────────────────

    #[test]
    fn detect_not_a_tty() {
        assert_eq!(
            ColorProfile::detect(&env(&["TERM=xterm-256color"]), false),
            ColorProfile::NoTty
        );
    }

    #[test]
    fn detect_no_color_wins() {
        let e = env(&["TERM=xterm-256color", "COLORTERM=truecolor", "NO_COLOR=1"]);
        assert_eq!(ColorProfile::detect(&e, true), ColorProfile::Ascii);
    }

    #[test]
    fn detect_empty_no_color_is_ignored() {
        let e = env(&["TERM=xterm-256color", "NO_COLOR="]);
        assert_eq!(ColorProfile::detect(&e, true), ColorProfile::Ansi256);
    }

    #[test]
    fn detect_colorterm() {
        let e = env(&["TERM=xterm", "COLORTERM=24bit"]);
        assert_eq!(ColorProfile::detect(&e, true), ColorProfile::TrueColor);
    }

    #[test]
    fn detect_families() {
        assert_eq!(
            ColorProfile::detect(&env(&["TERM=xterm-kitty"]), true),
            ColorProfile::TrueColor
        );
        assert_eq!(
            ColorProfile::detect(&env(&["TERM=kitty"]), true),
            ColorProfile::TrueColor
        );
        assert_eq!(
            ColorProfile::detect(&env(&["TERM=screen-256color"]), true),
            ColorProfile::Ansi256
        );
        assert_eq!(ColorProfile::detect(&env(&["TERM=vt100"]), true), ColorProfile::Ansi);
        assert_eq!(ColorProfile::detect(&env(&["TERM=dumb"]), true), ColorProfile::Ascii);
    }
}
