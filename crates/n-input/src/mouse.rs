// SPDX-License-Identifier: MIT
//
// Mouse events and the shared xterm button-byte layout.
//
// Both the X10 (`CSI M Cb Cx Cy`) and SGR (`CSI < Cb ; Cx ; Cy M|m`)
// encodings pack the button and modifiers into one integer:
//
//   bits 0-1  button ordinal (3 = release in X10)
//   bit  2    shift
//   bit  3    alt
//   bit  4    ctrl
//   bit  5    motion (ignored for wheel buttons)
//   bit  6    wheel
//   bit  7    extra buttons (back / forward / 10 / 11)
//
// Positions are 0-indexed here; the wire format is 1-indexed.

use std::fmt;

use crate::key::Modifiers;

const BIT_SHIFT: i32 = 0b0000_0100;
const BIT_ALT: i32 = 0b0000_1000;
const BIT_CTRL: i32 = 0b0001_0000;
const BIT_MOTION: i32 = 0b0010_0000;
const BIT_WHEEL: i32 = 0b0100_0000;
const BIT_ADD: i32 = 0b1000_0000;
const BITS_MASK: i32 = 0b0000_0011;

/// Mouse button identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MouseButton {
    /// No button (plain motion, or X10 release).
    #[default]
    None,
    Left,
    Middle,
    Right,
    WheelUp,
    WheelDown,
    WheelLeft,
    WheelRight,
    Backward,
    Forward,
    Button10,
    Button11,
}

impl MouseButton {
    const ORDER: [Self; 12] = [
        Self::None,
        Self::Left,
        Self::Middle,
        Self::Right,
        Self::WheelUp,
        Self::WheelDown,
        Self::WheelLeft,
        Self::WheelRight,
        Self::Backward,
        Self::Forward,
        Self::Button10,
        Self::Button11,
    ];

    /// Lowercase name as used in keystroke-style strings.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Left => "left",
            Self::Middle => "middle",
            Self::Right => "right",
            Self::WheelUp => "wheelup",
            Self::WheelDown => "wheeldown",
            Self::WheelLeft => "wheelleft",
            Self::WheelRight => "wheelright",
            Self::Backward => "backward",
            Self::Forward => "forward",
            Self::Button10 => "button10",
            Self::Button11 => "button11",
        }
    }

    /// Whether this is one of the four wheel directions.
    #[must_use]
    pub const fn is_wheel(self) -> bool {
        matches!(
            self,
            Self::WheelUp | Self::WheelDown | Self::WheelLeft | Self::WheelRight
        )
    }

    fn offset(self, by: i32) -> Self {
        let idx = Self::ORDER.iter().position(|b| *b == self).unwrap_or(0);
        usize::try_from(by)
            .ok()
            .and_then(|by| Self::ORDER.get(idx + by).copied())
            .unwrap_or(Self::None)
    }
}

/// A decoded mouse event payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Mouse {
    /// 0-indexed column.
    pub x: i32,
    /// 0-indexed row.
    pub y: i32,
    pub button: MouseButton,
    pub mods: Modifiers,
}

impl fmt::Display for Mouse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mods.contains(Modifiers::CTRL) {
            f.write_str("ctrl+")?;
        }
        if self.mods.contains(Modifiers::ALT) {
            f.write_str("alt+")?;
        }
        if self.mods.contains(Modifiers::SHIFT) {
            f.write_str("shift+")?;
        }
        if self.button != MouseButton::None {
            f.write_str(self.button.name())?;
        }
        Ok(())
    }
}

/// Button byte decoded into its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ButtonByte {
    pub mods: Modifiers,
    pub button: MouseButton,
    pub is_release: bool,
    pub is_motion: bool,
}

/// Split an xterm mouse button value into button, modifiers, and flags.
pub(crate) fn parse_button(b: i32) -> ButtonByte {
    let mut mods = Modifiers::empty();
    if b & BIT_ALT != 0 {
        mods |= Modifiers::ALT;
    }
    if b & BIT_CTRL != 0 {
        mods |= Modifiers::CTRL;
    }
    if b & BIT_SHIFT != 0 {
        mods |= Modifiers::SHIFT;
    }

    let low = b & BITS_MASK;
    let mut is_release = false;
    let button = if b & BIT_ADD != 0 {
        MouseButton::Backward.offset(low)
    } else if b & BIT_WHEEL != 0 {
        MouseButton::WheelUp.offset(low)
    } else if low == BITS_MASK {
        is_release = true;
        MouseButton::None
    } else {
        MouseButton::Left.offset(low)
    };

    // Motion bit is meaningless for wheel events.
    let is_motion = b & BIT_MOTION != 0 && !button.is_wheel();

    ButtonByte {
        mods,
        button,
        is_release,
        is_motion,
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn plain_buttons() {
        assert_eq!(parse_button(0).button, MouseButton::Left);
        assert_eq!(parse_button(1).button, MouseButton::Middle);
        assert_eq!(parse_button(2).button, MouseButton::Right);
    }

    #[test]
    fn release_sentinel() {
        let b = parse_button(3);
        assert_eq!(b.button, MouseButton::None);
        assert!(b.is_release);
    }

    #[test]
    fn wheel_ignores_motion_bit() {
        let b = parse_button(BIT_WHEEL | BIT_MOTION | 1);
        assert_eq!(b.button, MouseButton::WheelDown);
        assert!(!b.is_motion);
    }

    #[test]
    fn extra_buttons() {
        assert_eq!(parse_button(BIT_ADD).button, MouseButton::Backward);
        assert_eq!(parse_button(BIT_ADD | 1).button, MouseButton::Forward);
        assert_eq!(parse_button(BIT_ADD | 3).button, MouseButton::Button11);
    }

    #[test]
    fn modifier_bits() {
        let b = parse_button(BIT_SHIFT | BIT_CTRL | BIT_MOTION);
        assert_eq!(b.mods, Modifiers::SHIFT | Modifiers::CTRL);
        assert_eq!(b.button, MouseButton::Left);
        assert!(b.is_motion);
    }

    #[test]
    fn display() {
        let m = Mouse {
            x: 0,
            y: 0,
            button: MouseButton::Right,
            mods: Modifiers::CTRL | Modifiers::SHIFT,
        };
        assert_eq!(m.to_string(), "ctrl+shift+right");
        assert_eq!(Mouse::default().to_string(), "");
    }
}
