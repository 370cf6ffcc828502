// SPDX-License-Identifier: MIT
//
// Key identity, modifiers, and keystroke naming.
//
// A decoded keypress carries three views of the same physical key:
//
// - `code`: the key as the terminal reported it, lowercase for letters
// - `shifted_code`: the character produced with Shift held, when known
// - `base_code`: the key in the standard US PC-101 layout, when known
//
// Plus the `text` the key would insert, which is empty unless the key
// is printable under its current modifiers. Keeping text separate from
// identity lets "shift+a" and "A" match the same binding while still
// letting an editor insert the right character.
//
// Keystroke strings follow the `ctrl+alt+shift+meta+hyper+super+name`
// convention. A modifier key never lists itself ("leftctrl", not
// "ctrl+leftctrl").

use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// Keyboard modifier flags.
    ///
    /// Lock keys are tracked as modifiers so Kitty and Win32 reports can
    /// carry them; most bindings want to ignore them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Modifiers: u16 {
        const SHIFT       = 1 << 0;
        const ALT         = 1 << 1;
        const CTRL        = 1 << 2;
        const META        = 1 << 3;
        const HYPER       = 1 << 4;
        const SUPER       = 1 << 5;
        const CAPS_LOCK   = 1 << 6;
        const NUM_LOCK    = 1 << 7;
        const SCROLL_LOCK = 1 << 8;
    }
}

impl Modifiers {
    /// Decode an xterm-style modifier parameter (`1 + bitmask`).
    ///
    /// The xterm bitmask orders shift/alt/ctrl/meta, which lines up with
    /// our low bits. Parameters below 2 mean "no modifiers".
    #[must_use]
    pub const fn from_xterm(param: i32) -> Self {
        if param <= 1 {
            return Self::empty();
        }
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let bits = (param - 1) as u16;
        Self::from_bits_truncate(bits)
    }

    /// Decode a Kitty keyboard protocol modifier bitmask (already minus 1).
    ///
    /// Kitty orders its bits shift, alt, ctrl, super, hyper, meta, caps,
    /// num; super and meta swap places relative to ours.
    #[must_use]
    pub const fn from_kitty(bits: i32) -> Self {
        let mut m = Self::empty().bits();
        if bits & 1 != 0 {
            m |= Self::SHIFT.bits();
        }
        if bits & 2 != 0 {
            m |= Self::ALT.bits();
        }
        if bits & 4 != 0 {
            m |= Self::CTRL.bits();
        }
        if bits & 8 != 0 {
            m |= Self::SUPER.bits();
        }
        if bits & 16 != 0 {
            m |= Self::HYPER.bits();
        }
        if bits & 32 != 0 {
            m |= Self::META.bits();
        }
        if bits & 64 != 0 {
            m |= Self::CAPS_LOCK.bits();
        }
        if bits & 128 != 0 {
            m |= Self::NUM_LOCK.bits();
        }
        Self::from_bits_truncate(m)
    }
}

// ─── KeyCode ────────────────────────────────────────────────────────────────

/// Identity of a key.
///
/// Printable characters use [`Char`](KeyCode::Char), always lowercase for
/// ASCII letters. Keys that share a code point with a C0 control (Enter,
/// Tab, Backspace, Escape, Space) have dedicated variants so matching
/// never depends on which byte the terminal happened to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyCode {
    /// No key identity. Raw console records that only carry a UTF-16 code
    /// unit decode to this until they are reassembled.
    #[default]
    Null,
    /// A Unicode character.
    Char(char),
    /// A multi-rune grapheme cluster; the key's `text` holds the cluster.
    Extended,
    Enter,
    Tab,
    Backspace,
    Escape,
    Space,
    // ── Navigation / editing ───────────────────────────────────
    Up,
    Down,
    Right,
    Left,
    Begin,
    Find,
    Insert,
    Delete,
    Select,
    PageUp,
    PageDown,
    Home,
    End,
    // ── Keypad ─────────────────────────────────────────────────
    KpEnter,
    KpEqual,
    KpMultiply,
    KpPlus,
    KpComma,
    KpMinus,
    KpDecimal,
    KpDivide,
    /// Keypad digit 0–9.
    Kp(u8),
    KpSep,
    KpUp,
    KpDown,
    KpLeft,
    KpRight,
    KpPageUp,
    KpPageDown,
    KpHome,
    KpEnd,
    KpInsert,
    KpDelete,
    KpBegin,
    // ── Function keys ──────────────────────────────────────────
    /// F1 through F63.
    F(u8),
    // ── Locks and system ───────────────────────────────────────
    CapsLock,
    ScrollLock,
    NumLock,
    PrintScreen,
    Pause,
    Menu,
    // ── Media ──────────────────────────────────────────────────
    MediaPlay,
    MediaPause,
    MediaPlayPause,
    MediaReverse,
    MediaStop,
    MediaFastForward,
    MediaRewind,
    MediaNext,
    MediaPrev,
    MediaRecord,
    LowerVolume,
    RaiseVolume,
    Mute,
    // ── Modifier keys themselves ───────────────────────────────
    LeftShift,
    LeftAlt,
    LeftCtrl,
    LeftSuper,
    LeftHyper,
    LeftMeta,
    RightShift,
    RightAlt,
    RightCtrl,
    RightSuper,
    RightHyper,
    RightMeta,
    IsoLevel3Shift,
    IsoLevel5Shift,
}

impl KeyCode {
    /// Map a code point to a key code, folding the control characters
    /// that name keys (CR, HT, DEL, ESC, SP) into their named variants.
    #[must_use]
    pub const fn from_char(c: char) -> Self {
        match c {
            '\r' => Self::Enter,
            '\t' => Self::Tab,
            '\x7f' => Self::Backspace,
            '\x1b' => Self::Escape,
            ' ' => Self::Space,
            _ => Self::Char(c),
        }
    }

    /// The code point equivalent of this key, if it has one.
    #[must_use]
    pub const fn as_char(self) -> Option<char> {
        match self {
            Self::Char(c) => Some(c),
            Self::Enter => Some('\r'),
            Self::Tab => Some('\t'),
            Self::Backspace => Some('\x7f'),
            Self::Escape => Some('\x1b'),
            Self::Space => Some(' '),
            _ => None,
        }
    }

    /// Whether this code is a printable character (space included).
    #[must_use]
    pub fn is_printable(self) -> bool {
        match self {
            Self::Space => true,
            Self::Char(c) => !c.is_control(),
            _ => false,
        }
    }

    /// The canonical keystroke name, or `None` for plain characters.
    #[must_use]
    pub fn name(self) -> Option<&'static str> {
        const F_NAMES: [&str; 63] = [
            "f1", "f2", "f3", "f4", "f5", "f6", "f7", "f8", "f9", "f10", "f11", "f12", "f13",
            "f14", "f15", "f16", "f17", "f18", "f19", "f20", "f21", "f22", "f23", "f24", "f25",
            "f26", "f27", "f28", "f29", "f30", "f31", "f32", "f33", "f34", "f35", "f36", "f37",
            "f38", "f39", "f40", "f41", "f42", "f43", "f44", "f45", "f46", "f47", "f48", "f49",
            "f50", "f51", "f52", "f53", "f54", "f55", "f56", "f57", "f58", "f59", "f60", "f61",
            "f62", "f63",
        ];
        const DIGITS: [&str; 10] = ["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"];

        Some(match self {
            Self::Null | Self::Char(_) | Self::Extended => return None,
            Self::Enter | Self::KpEnter => "enter",
            Self::Tab => "tab",
            Self::Backspace => "backspace",
            Self::Escape => "esc",
            Self::Space => "space",
            Self::Up | Self::KpUp => "up",
            Self::Down | Self::KpDown => "down",
            Self::Right | Self::KpRight => "right",
            Self::Left | Self::KpLeft => "left",
            Self::Begin | Self::KpBegin => "begin",
            Self::Find => "find",
            Self::Insert | Self::KpInsert => "insert",
            Self::Delete | Self::KpDelete => "delete",
            Self::Select => "select",
            Self::PageUp | Self::KpPageUp => "pgup",
            Self::PageDown | Self::KpPageDown => "pgdown",
            Self::Home | Self::KpHome => "home",
            Self::End | Self::KpEnd => "end",
            Self::KpEqual => "equal",
            Self::KpMultiply => "mul",
            Self::KpPlus => "plus",
            Self::KpComma => "comma",
            Self::KpMinus => "minus",
            Self::KpDecimal => "period",
            Self::KpDivide => "div",
            Self::Kp(n) => return DIGITS.get(usize::from(n)).copied(),
            Self::KpSep => "sep",
            Self::F(n) => return F_NAMES.get(usize::from(n).wrapping_sub(1)).copied(),
            Self::CapsLock => "capslock",
            Self::ScrollLock => "scrolllock",
            Self::NumLock => "numlock",
            Self::PrintScreen => "printscreen",
            Self::Pause => "pause",
            Self::Menu => "menu",
            Self::MediaPlay => "mediaplay",
            Self::MediaPause => "mediapause",
            Self::MediaPlayPause => "mediaplaypause",
            Self::MediaReverse => "mediareverse",
            Self::MediaStop => "mediastop",
            Self::MediaFastForward => "mediafastforward",
            Self::MediaRewind => "mediarewind",
            Self::MediaNext => "medianext",
            Self::MediaPrev => "mediaprev",
            Self::MediaRecord => "mediarecord",
            Self::LowerVolume => "lowervol",
            Self::RaiseVolume => "raisevol",
            Self::Mute => "mute",
            Self::LeftShift => "leftshift",
            Self::LeftAlt => "leftalt",
            Self::LeftCtrl => "leftctrl",
            Self::LeftSuper => "leftsuper",
            Self::LeftHyper => "lefthyper",
            Self::LeftMeta => "leftmeta",
            Self::RightShift => "rightshift",
            Self::RightAlt => "rightalt",
            Self::RightCtrl => "rightctrl",
            Self::RightSuper => "rightsuper",
            Self::RightHyper => "righthyper",
            Self::RightMeta => "rightmeta",
            Self::IsoLevel3Shift => "isolevel3shift",
            Self::IsoLevel5Shift => "isolevel5shift",
        })
    }

    /// Parse a key name as used in binding strings ("pgup", "kp5", "f12").
    ///
    /// Keypad keys use a `kp` prefix here so "kpenter" and "enter" stay
    /// distinct when matching.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        if let Some(n) = name.strip_prefix('f') {
            if let Ok(n) = n.parse::<u8>() {
                return (1..=63).contains(&n).then_some(Self::F(n));
            }
        }
        if let Some(rest) = name.strip_prefix("kp") {
            if let [d @ b'0'..=b'9'] = rest.as_bytes() {
                return Some(Self::Kp(d - b'0'));
            }
        }
        Some(match name {
            "enter" => Self::Enter,
            "tab" => Self::Tab,
            "backspace" => Self::Backspace,
            "escape" | "esc" => Self::Escape,
            "space" => Self::Space,
            "up" => Self::Up,
            "down" => Self::Down,
            "left" => Self::Left,
            "right" => Self::Right,
            "begin" => Self::Begin,
            "find" => Self::Find,
            "insert" => Self::Insert,
            "delete" => Self::Delete,
            "select" => Self::Select,
            "pgup" => Self::PageUp,
            "pgdown" => Self::PageDown,
            "home" => Self::Home,
            "end" => Self::End,
            "kpenter" => Self::KpEnter,
            "kpequal" => Self::KpEqual,
            "kpmul" => Self::KpMultiply,
            "kpplus" => Self::KpPlus,
            "kpcomma" => Self::KpComma,
            "kpminus" => Self::KpMinus,
            "kpperiod" => Self::KpDecimal,
            "kpdiv" => Self::KpDivide,
            "kpsep" => Self::KpSep,
            "kpup" => Self::KpUp,
            "kpdown" => Self::KpDown,
            "kpleft" => Self::KpLeft,
            "kpright" => Self::KpRight,
            "kppgup" => Self::KpPageUp,
            "kppgdown" => Self::KpPageDown,
            "kphome" => Self::KpHome,
            "kpend" => Self::KpEnd,
            "kpinsert" => Self::KpInsert,
            "kpdelete" => Self::KpDelete,
            "kpbegin" => Self::KpBegin,
            "capslock" => Self::CapsLock,
            "scrolllock" => Self::ScrollLock,
            "numlock" => Self::NumLock,
            "printscreen" => Self::PrintScreen,
            "pause" => Self::Pause,
            "menu" => Self::Menu,
            "mediaplay" => Self::MediaPlay,
            "mediapause" => Self::MediaPause,
            "mediaplaypause" => Self::MediaPlayPause,
            "mediareverse" => Self::MediaReverse,
            "mediastop" => Self::MediaStop,
            "mediafastforward" => Self::MediaFastForward,
            "mediarewind" => Self::MediaRewind,
            "medianext" => Self::MediaNext,
            "mediaprev" => Self::MediaPrev,
            "mediarecord" => Self::MediaRecord,
            "lowervol" => Self::LowerVolume,
            "raisevol" => Self::RaiseVolume,
            "mute" => Self::Mute,
            "leftshift" => Self::LeftShift,
            "leftalt" => Self::LeftAlt,
            "leftctrl" => Self::LeftCtrl,
            "leftsuper" => Self::LeftSuper,
            "lefthyper" => Self::LeftHyper,
            "leftmeta" => Self::LeftMeta,
            "rightshift" => Self::RightShift,
            "rightalt" => Self::RightAlt,
            "rightctrl" => Self::RightCtrl,
            "rightsuper" => Self::RightSuper,
            "righthyper" => Self::RightHyper,
            "rightmeta" => Self::RightMeta,
            "isolevel3shift" => Self::IsoLevel3Shift,
            "isolevel5shift" => Self::IsoLevel5Shift,
            _ => return None,
        })
    }
}

/// Single-character uppercase mapping; characters whose uppercase form
/// expands to several (`ß` → `SS`) are left alone.
pub(crate) fn to_upper(c: char) -> char {
    let mut it = c.to_uppercase();
    match (it.next(), it.next()) {
        (Some(u), None) => u,
        _ => c,
    }
}

/// Single-character lowercase mapping.
pub(crate) fn to_lower(c: char) -> char {
    let mut it = c.to_lowercase();
    match (it.next(), it.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

// ─── Key ────────────────────────────────────────────────────────────────────

/// One decoded key press or release.
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash)]
pub struct Key {
    /// Text the key inserts. Empty unless the key is printable under its
    /// modifiers (so "ctrl+a" has no text but "shift+a" has "A").
    pub text: String,
    /// Active modifiers.
    pub mods: Modifiers,
    /// Key identity.
    pub code: KeyCode,
    /// Character produced with Shift held, when the protocol reports it.
    pub shifted_code: Option<char>,
    /// Key in the standard US PC-101 layout, when the protocol reports it.
    pub base_code: Option<KeyCode>,
    /// Auto-repeat (Kitty event type 2).
    pub is_repeat: bool,
}

impl Key {
    /// A key with no modifiers and no text.
    #[must_use]
    pub fn new(code: KeyCode) -> Self {
        Self {
            code,
            ..Self::default()
        }
    }

    /// A key with the given modifiers and no text.
    #[must_use]
    pub fn with_mods(code: KeyCode, mods: Modifiers) -> Self {
        Self {
            code,
            mods,
            ..Self::default()
        }
    }

    /// A printable character key whose text is the character itself.
    #[must_use]
    pub fn char(c: char) -> Self {
        Self {
            code: KeyCode::from_char(c),
            text: c.to_string(),
            ..Self::default()
        }
    }

    /// The keystroke form: modifiers then key name, e.g. `ctrl+shift+a`.
    #[must_use]
    pub fn keystroke(&self) -> String {
        let mut s = String::new();
        let code = self.code;

        let prefixes = [
            (Modifiers::CTRL, "ctrl+", KeyCode::LeftCtrl, KeyCode::RightCtrl),
            (Modifiers::ALT, "alt+", KeyCode::LeftAlt, KeyCode::RightAlt),
            (Modifiers::SHIFT, "shift+", KeyCode::LeftShift, KeyCode::RightShift),
            (Modifiers::META, "meta+", KeyCode::LeftMeta, KeyCode::RightMeta),
            (Modifiers::HYPER, "hyper+", KeyCode::LeftHyper, KeyCode::RightHyper),
            (Modifiers::SUPER, "super+", KeyCode::LeftSuper, KeyCode::RightSuper),
        ];
        for (flag, prefix, left, right) in prefixes {
            if self.mods.contains(flag) && code != left && code != right {
                s.push_str(prefix);
            }
        }

        if let Some(name) = code.name() {
            s.push_str(name);
            return s;
        }

        let code = self.base_code.unwrap_or(code);
        match code {
            KeyCode::Extended => s.push_str(&self.text),
            other => {
                if let Some(name) = other.name() {
                    s.push_str(name);
                } else if let Some(c) = other.as_char() {
                    s.push(c);
                }
            }
        }
        s
    }

    /// Whether this key matches a keystroke string such as `"ctrl+a"`,
    /// `"shift+tab"`, `"A"`, or `"kpenter"`.
    ///
    /// Matches either on exact modifiers + code, or on inserted text, so
    /// `"A"` matches both `shift+a` and a caps-locked `a`.
    #[must_use]
    pub fn matches(&self, keystroke: &str) -> bool {
        let mut mods = Modifiers::empty();
        let mut code = KeyCode::Null;
        let mut text = String::new();

        for part in keystroke.split('+') {
            match part {
                "ctrl" => mods |= Modifiers::CTRL,
                "alt" => mods |= Modifiers::ALT,
                "shift" => mods |= Modifiers::SHIFT,
                "meta" => mods |= Modifiers::META,
                "hyper" => mods |= Modifiers::HYPER,
                "super" => mods |= Modifiers::SUPER,
                "capslock" => mods |= Modifiers::CAPS_LOCK,
                "scrolllock" => mods |= Modifiers::SCROLL_LOCK,
                "numlock" => mods |= Modifiers::NUM_LOCK,
                _ => {
                    if let Some(k) = KeyCode::from_name(part) {
                        code = k;
                    } else {
                        let mut chars = part.chars();
                        match (chars.next(), chars.next()) {
                            (Some(c), None) => code = KeyCode::from_char(c),
                            _ => {
                                code = KeyCode::Extended;
                                text = part.to_string();
                            }
                        }
                    }
                }
            }
        }

        let smod = mods - (Modifiers::SHIFT | Modifiers::CAPS_LOCK);
        if smod.is_empty() && text.is_empty() && code.is_printable() {
            if let Some(c) = code.as_char() {
                if mods.intersects(Modifiers::SHIFT | Modifiers::CAPS_LOCK) {
                    text.extend(c.to_uppercase());
                } else {
                    text.push(c);
                }
            }
        }

        (self.mods == mods && self.code == code) || (!self.text.is_empty() && self.text == text)
    }

    /// Whether this key matches any of the given keystroke strings.
    #[must_use]
    pub fn matches_any(&self, keystrokes: &[&str]) -> bool {
        keystrokes.iter().any(|k| self.matches(k))
    }
}

impl fmt::Display for Key {
    /// The inserted text when printable, otherwise the keystroke.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.text.is_empty() && self.text != " " {
            f.write_str(&self.text)
        } else {
            f.write_str(&self.keystroke())
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
