// SPDX-License-Identifier: MIT
//
// Decoded input events.
//
// Everything the decoder can produce lives in one enum: keys, mouse,
// paste, focus, and the many terminal reports that arrive on the same
// input stream (cursor position, device attributes, mode reports, color
// queries, clipboard contents...). Sequences that are well-formed but
// not understood become `Unknown` carrying the raw bytes, never an error.

use std::fmt;

use crate::key::Key;
use crate::mouse::Mouse;

/// Which introducer an unrecognized sequence started with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequenceKind {
    /// Not an escape sequence, or an incomplete one.
    Raw,
    Csi,
    Ss3,
    Osc,
    Dcs,
    Sos,
    Pm,
    Apc,
}

/// Kitty keyboard protocol progressive-enhancement flags.
pub mod kitty_flags {
    pub const DISAMBIGUATE_ESCAPE_CODES: i32 = 1;
    pub const REPORT_EVENT_TYPES: i32 = 2;
    pub const REPORT_ALTERNATE_KEYS: i32 = 4;
    pub const REPORT_ALL_KEYS_AS_ESCAPE_CODES: i32 = 8;
    pub const REPORT_ASSOCIATED_TEXT: i32 = 16;
}

/// DECRPM setting value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeSetting {
    NotRecognized,
    Set,
    Reset,
    PermanentlySet,
    PermanentlyReset,
}

impl ModeSetting {
    #[must_use]
    pub const fn from_param(v: i32) -> Self {
        match v {
            1 => Self::Set,
            2 => Self::Reset,
            3 => Self::PermanentlySet,
            4 => Self::PermanentlyReset,
            _ => Self::NotRecognized,
        }
    }

    /// Set or permanently set.
    #[must_use]
    pub const fn is_set(self) -> bool {
        matches!(self, Self::Set | Self::PermanentlySet)
    }
}

/// A terminal mode number, DEC-private (`?`) or ANSI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mode {
    pub number: i32,
    pub dec: bool,
}

/// A 24-bit color reported by the terminal (OSC 10/11/12 replies).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// HSL lightness below one half.
    #[must_use]
    pub fn is_dark(self) -> bool {
        let max = self.r.max(self.g).max(self.b);
        let min = self.r.min(self.g).min(self.b);
        let lightness = (f32::from(max) + f32::from(min)) / (2.0 * 255.0);
        lightness < 0.5
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Clipboard targeted by an OSC 52 reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClipboardSelection {
    /// `c`: the system clipboard.
    #[default]
    System,
    /// `p`: the primary selection.
    Primary,
}

impl ClipboardSelection {
    #[must_use]
    pub const fn from_byte(b: u8) -> Self {
        if b == b'p' {
            Self::Primary
        } else {
            Self::System
        }
    }
}

/// A decoded input event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // ── Keyboard ───────────────────────────────────────────────
    KeyPress(Key),
    KeyRelease(Key),

    // ── Mouse ──────────────────────────────────────────────────
    MouseClick(Mouse),
    MouseRelease(Mouse),
    MouseWheel(Mouse),
    MouseMotion(Mouse),

    // ── Paste ──────────────────────────────────────────────────
    /// A complete bracketed paste.
    Paste(String),
    /// `CSI 200 ~`. The scanner reports it, then the collected `Paste`,
    /// then `PasteEnd`.
    PasteStart,
    /// `CSI 201 ~`.
    PasteEnd,

    // ── Focus / appearance ─────────────────────────────────────
    Focus,
    Blur,
    DarkColorScheme,
    LightColorScheme,

    // ── Size reports ───────────────────────────────────────────
    /// Terminal size in cells.
    WindowSize { width: i32, height: i32 },
    /// Terminal size in pixels.
    PixelSize { width: i32, height: i32 },
    /// Size of one cell in pixels.
    CellSize { width: i32, height: i32 },

    // ── Reports ────────────────────────────────────────────────
    /// 0-indexed cursor position (`CSI row ; col R`).
    CursorPosition { x: i32, y: i32 },
    /// XTVERSION name.
    TerminalVersion(String),
    /// XTerm `modifyOtherKeys` level.
    ModifyOtherKeys(i32),
    /// Kitty keyboard flags currently in effect.
    KeyboardEnhancements(i32),
    PrimaryDeviceAttributes(Vec<i32>),
    SecondaryDeviceAttributes(Vec<i32>),
    TertiaryDeviceAttributes(Vec<u8>),
    ModeReport { mode: Mode, value: ModeSetting },
    ForegroundColor(Rgb),
    BackgroundColor(Rgb),
    CursorColor(Rgb),
    /// Unhandled XTWINOPS reply.
    WindowOp { op: i32, args: Vec<i32> },
    /// XTGETTCAP reply, `name=value` pairs joined by `;`.
    Capability(String),
    Clipboard {
        content: String,
        selection: ClipboardSelection,
    },
    /// Kitty graphics protocol reply.
    KittyGraphics {
        options: Vec<(String, String)>,
        payload: Vec<u8>,
    },

    // ── Structural ─────────────────────────────────────────────
    /// Several events decoded from one sequence.
    Multi(Vec<Self>),
    /// A well-formed sequence we don't understand.
    Unknown { kind: SequenceKind, bytes: Vec<u8> },
    /// A cancelled sequence (CAN/SUB) the scanner drops silently.
    Ignored(Vec<u8>),
}

impl Event {
    pub(crate) fn unknown(kind: SequenceKind, bytes: &[u8]) -> Self {
        Self::Unknown {
            kind,
            bytes: bytes.to_vec(),
        }
    }

    /// The key payload of a press or release.
    #[must_use]
    pub const fn key(&self) -> Option<&Key> {
        match self {
            Self::KeyPress(k) | Self::KeyRelease(k) => Some(k),
            _ => None,
        }
    }

    /// The mouse payload of any mouse event.
    #[must_use]
    pub const fn mouse(&self) -> Option<&Mouse> {
        match self {
            Self::MouseClick(m)
            | Self::MouseRelease(m)
            | Self::MouseWheel(m)
            | Self::MouseMotion(m) => Some(m),
            _ => None,
        }
    }

    /// Whether this is a key press matching the keystroke string.
    #[must_use]
    pub fn is_press(&self, keystroke: &str) -> bool {
        matches!(self, Self::KeyPress(k) if k.matches(keystroke))
    }
}

/// Helpers for interpreting [`Event::KeyboardEnhancements`] flags.
#[must_use]
pub const fn supports_key_disambiguation(flags: i32) -> bool {
    flags & kitty_flags::DISAMBIGUATE_ESCAPE_CODES != 0
}

#[must_use]
pub const fn supports_key_releases(flags: i32) -> bool {
    flags & kitty_flags::REPORT_EVENT_TYPES != 0
}

#[must_use]
pub const fn supports_uniform_key_layout(flags: i32) -> bool {
    supports_key_disambiguation(flags)
        && flags & kitty_flags::REPORT_ALTERNATE_KEYS != 0
        && flags & kitty_flags::REPORT_ALL_KEYS_AS_ESCAPE_CODES != 0
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyPress(k) | Self::KeyRelease(k) => write!(f, "{k}"),
            Self::MouseClick(m) | Self::MouseRelease(m) | Self::MouseWheel(m) => write!(f, "{m}"),
            Self::MouseMotion(m) => {
                if m.button == crate::mouse::MouseButton::None {
                    write!(f, "{m}motion")
                } else {
                    write!(f, "{m}+motion")
                }
            }
            Self::Paste(s) | Self::TerminalVersion(s) | Self::Capability(s) => f.write_str(s),
            Self::Clipboard { content, .. } => f.write_str(content),
            Self::ForegroundColor(c) | Self::BackgroundColor(c) | Self::CursorColor(c) => {
                write!(f, "{c}")
            }
            Self::Multi(events) => {
                for e in events {
                    writeln!(f, "{e}")?;
                }
                Ok(())
            }
            Self::Unknown { bytes, .. } | Self::Ignored(bytes) => {
                write!(f, "{:?}", String::from_utf8_lossy(bytes))
            }
            other => write!(f, "{other:?}"),
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{KeyCode, Modifiers};
    use crate::mouse::MouseButton;

    #[test]
    fn rgb_darkness() {
        assert!(Rgb::new(0, 0, 0).is_dark());
        assert!(Rgb::new(0x1e, 0x1e, 0x2e).is_dark());
        assert!(!Rgb::new(0xff, 0xff, 0xff).is_dark());
        assert!(!Rgb::new(0xee, 0xe8, 0xd5).is_dark());
    }

    #[test]
    fn rgb_hex() {
        assert_eq!(Rgb::new(0xab, 0x01, 0xff).to_string(), "#ab01ff");
    }

    #[test]
    fn motion_display() {
        let m = Mouse {
            button: MouseButton::Left,
            ..Mouse::default()
        };
        assert_eq!(Event::MouseMotion(m).to_string(), "left+motion");
        assert_eq!(Event::MouseMotion(Mouse::default()).to_string(), "motion");
    }

    #[test]
    fn kitty_flag_helpers() {
        assert!(supports_key_disambiguation(1));
        assert!(!supports_key_releases(1));
        assert!(supports_key_releases(3));
        assert!(supports_uniform_key_layout(1 | 4 | 8));
        assert!(!supports_uniform_key_layout(1 | 4));
    }

    #[test]
    fn is_press_matches_keystroke() {
        let ev = Event::KeyPress(Key::with_mods(KeyCode::Char('c'), Modifiers::CTRL));
        assert!(ev.is_press("ctrl+c"));
        assert!(!Event::KeyRelease(Key::new(KeyCode::Char('c'))).is_press("c"));
    }

    #[test]
    fn mode_setting_from_param() {
        assert_eq!(ModeSetting::from_param(1), ModeSetting::Set);
        assert_eq!(ModeSetting::from_param(9), ModeSetting::NotRecognized);
        assert!(ModeSetting::PermanentlySet.is_set());
    }
}
