// SPDX-License-Identifier: MIT
//
// Windows console input records.
//
// The console hands us discrete records (key, mouse, buffer resize,
// focus) instead of a byte stream. Rather than growing a second decode
// path, records are re-serialized into the escape vocabulary the byte
// decoder already speaks:
//
//   key     → `CSI Vk ; Sc ; Uc ; Kd ; Cs ; Rc _`   (win32-input-mode)
//   mouse   → `CSI < Cb ; Cx ; Cy M|m`              (SGR mouse)
//   resize  → `CSI 8 ; rows ; cols t`
//   focus   → `CSI I` / `CSI O`
//
// Terminals running in win32-input-mode emit the key form themselves,
// so both sources meet in `CSI … _`. Records with a zero virtual key
// carry a bare UTF-16 code unit (IME input, pasted text, surrogate
// halves); [`GraphemeAssembler`] glues those back into whole code points
// before they reach the decoder.

use std::fmt::Write as _;

use unicode_segmentation::UnicodeSegmentation;

use crate::event::Event;
use crate::key::{to_lower, to_upper, Key, KeyCode, Modifiers};

// ─── Constants ──────────────────────────────────────────────────────────────

/// `dwControlKeyState` bits.
pub mod cks {
    pub const RIGHT_ALT_PRESSED: u32 = 0x0001;
    pub const LEFT_ALT_PRESSED: u32 = 0x0002;
    pub const RIGHT_CTRL_PRESSED: u32 = 0x0004;
    pub const LEFT_CTRL_PRESSED: u32 = 0x0008;
    pub const SHIFT_PRESSED: u32 = 0x0010;
    pub const NUMLOCK_ON: u32 = 0x0020;
    pub const SCROLLLOCK_ON: u32 = 0x0040;
    pub const CAPSLOCK_ON: u32 = 0x0080;
    pub const ENHANCED_KEY: u32 = 0x0100;
}

/// Virtual-key codes we map to key identities.
pub mod vk {
    pub const BACK: u16 = 0x08;
    pub const TAB: u16 = 0x09;
    pub const RETURN: u16 = 0x0D;
    pub const SHIFT: u16 = 0x10;
    pub const CONTROL: u16 = 0x11;
    pub const MENU: u16 = 0x12;
    pub const PAUSE: u16 = 0x13;
    pub const CAPITAL: u16 = 0x14;
    pub const ESCAPE: u16 = 0x1B;
    pub const SPACE: u16 = 0x20;
    pub const PRIOR: u16 = 0x21;
    pub const NEXT: u16 = 0x22;
    pub const END: u16 = 0x23;
    pub const HOME: u16 = 0x24;
    pub const LEFT: u16 = 0x25;
    pub const UP: u16 = 0x26;
    pub const RIGHT: u16 = 0x27;
    pub const DOWN: u16 = 0x28;
    pub const SELECT: u16 = 0x29;
    pub const SNAPSHOT: u16 = 0x2C;
    pub const INSERT: u16 = 0x2D;
    pub const DELETE: u16 = 0x2E;
    pub const LWIN: u16 = 0x5B;
    pub const RWIN: u16 = 0x5C;
    pub const APPS: u16 = 0x5D;
    pub const NUMPAD0: u16 = 0x60;
    pub const NUMPAD9: u16 = 0x69;
    pub const MULTIPLY: u16 = 0x6A;
    pub const ADD: u16 = 0x6B;
    pub const SEPARATOR: u16 = 0x6C;
    pub const SUBTRACT: u16 = 0x6D;
    pub const DECIMAL: u16 = 0x6E;
    pub const DIVIDE: u16 = 0x6F;
    pub const F1: u16 = 0x70;
    pub const F24: u16 = 0x87;
    pub const NUMLOCK: u16 = 0x90;
    pub const SCROLL: u16 = 0x91;
    pub const LSHIFT: u16 = 0xA0;
    pub const RSHIFT: u16 = 0xA1;
    pub const LCONTROL: u16 = 0xA2;
    pub const RCONTROL: u16 = 0xA3;
    pub const LMENU: u16 = 0xA4;
    pub const RMENU: u16 = 0xA5;
    pub const VOLUME_MUTE: u16 = 0xAD;
    pub const VOLUME_DOWN: u16 = 0xAE;
    pub const VOLUME_UP: u16 = 0xAF;
    pub const MEDIA_NEXT_TRACK: u16 = 0xB0;
    pub const MEDIA_PREV_TRACK: u16 = 0xB1;
    pub const MEDIA_STOP: u16 = 0xB2;
    pub const MEDIA_PLAY_PAUSE: u16 = 0xB3;
    pub const OEM_1: u16 = 0xBA;
    pub const OEM_PLUS: u16 = 0xBB;
    pub const OEM_COMMA: u16 = 0xBC;
    pub const OEM_MINUS: u16 = 0xBD;
    pub const OEM_PERIOD: u16 = 0xBE;
    pub const OEM_2: u16 = 0xBF;
    pub const OEM_3: u16 = 0xC0;
    pub const OEM_4: u16 = 0xDB;
    pub const OEM_5: u16 = 0xDC;
    pub const OEM_6: u16 = 0xDD;
    pub const OEM_7: u16 = 0xDE;
}

/// `dwButtonState` bits.
pub mod button {
    pub const FROM_LEFT_1ST: u32 = 0x0001;
    pub const RIGHTMOST: u32 = 0x0002;
    pub const FROM_LEFT_2ND: u32 = 0x0004;
    pub const FROM_LEFT_3RD: u32 = 0x0008;
    pub const FROM_LEFT_4TH: u32 = 0x0010;
    pub const MASK: u32 = 0x001F;
}

/// `dwEventFlags` bits.
pub mod mouse_flags {
    pub const MOUSE_MOVED: u32 = 0x0001;
    pub const DOUBLE_CLICK: u32 = 0x0002;
    pub const MOUSE_WHEELED: u32 = 0x0004;
    pub const MOUSE_HWHEELED: u32 = 0x0008;
}

// ─── Records ────────────────────────────────────────────────────────────────

/// A `KEY_EVENT_RECORD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyRecord {
    pub key_down: bool,
    pub repeat_count: u16,
    pub virtual_key: u16,
    pub scan_code: u16,
    /// One UTF-16 code unit.
    pub unicode_char: u16,
    pub control_key_state: u32,
}

/// A `MOUSE_EVENT_RECORD`, position 0-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MouseRecord {
    pub x: i16,
    pub y: i16,
    pub button_state: u32,
    pub control_key_state: u32,
    pub event_flags: u32,
}

/// One console input record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleRecord {
    Key(KeyRecord),
    Mouse(MouseRecord),
    WindowBufferSize { width: i16, height: i16 },
    Focus(bool),
    Menu,
}

// ─── Serialization ──────────────────────────────────────────────────────────

/// Turns console records into escape sequences.
///
/// Mouse records report the full button state, not transitions, so the
/// encoder remembers the last state to tell presses from releases.
#[derive(Debug, Clone, Default)]
pub struct RecordEncoder {
    last_buttons: u32,
}

impl RecordEncoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the escape form of `rec` to `out`.
    pub fn encode(&mut self, rec: &ConsoleRecord, out: &mut Vec<u8>) {
        let mut s = String::new();
        match *rec {
            ConsoleRecord::Key(k) => {
                let _ = write!(
                    s,
                    "\x1b[{};{};{};{};{};{}_",
                    k.virtual_key,
                    k.scan_code,
                    k.unicode_char,
                    u8::from(k.key_down),
                    k.control_key_state,
                    k.repeat_count
                );
            }
            ConsoleRecord::Mouse(m) => self.encode_mouse(&m, &mut s),
            ConsoleRecord::WindowBufferSize { width, height } => {
                let _ = write!(s, "\x1b[8;{height};{width}t");
            }
            ConsoleRecord::Focus(true) => s.push_str("\x1b[I"),
            ConsoleRecord::Focus(false) => s.push_str("\x1b[O"),
            ConsoleRecord::Menu => {}
        }
        out.extend_from_slice(s.as_bytes());
    }

    fn encode_mouse(&mut self, m: &MouseRecord, s: &mut String) {
        let mut cb = 0u32;
        let state = m.control_key_state;
        if state & cks::SHIFT_PRESSED != 0 {
            cb |= 0b0000_0100;
        }
        if state & (cks::LEFT_ALT_PRESSED | cks::RIGHT_ALT_PRESSED) != 0 {
            cb |= 0b0000_1000;
        }
        if state & (cks::LEFT_CTRL_PRESSED | cks::RIGHT_CTRL_PRESSED) != 0 {
            cb |= 0b0001_0000;
        }

        // The high word of the button state is the signed wheel delta.
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let delta = (m.button_state >> 16) as u16 as i16;

        let fin = if m.event_flags & mouse_flags::MOUSE_WHEELED != 0 {
            cb |= if delta > 0 { 64 } else { 65 };
            'M'
        } else if m.event_flags & mouse_flags::MOUSE_HWHEELED != 0 {
            cb |= if delta > 0 { 67 } else { 66 };
            'M'
        } else {
            let held = m.button_state & button::MASK;
            let pressed = held & !self.last_buttons;
            let released = self.last_buttons & !held;
            self.last_buttons = held;

            if released != 0 {
                cb |= button_code(released);
                'm'
            } else if pressed != 0 {
                cb |= button_code(pressed);
                'M'
            } else if m.event_flags & mouse_flags::MOUSE_MOVED != 0 {
                cb |= if held == 0 { 3 } else { button_code(held) };
                cb |= 0b0010_0000;
                'M'
            } else {
                return;
            }
        };

        let x = i32::from(m.x) + 1;
        let y = i32::from(m.y) + 1;
        let _ = write!(s, "\x1b[<{cb};{x};{y}{fin}");
    }
}

/// SGR button ordinal for the lowest set console button bit.
const fn button_code(bits: u32) -> u32 {
    if bits & button::FROM_LEFT_1ST != 0 {
        0
    } else if bits & button::FROM_LEFT_2ND != 0 {
        1
    } else if bits & button::RIGHTMOST != 0 {
        2
    } else if bits & button::FROM_LEFT_3RD != 0 {
        128
    } else {
        129
    }
}

// ─── UTF-16 reassembly ──────────────────────────────────────────────────────

/// Collects zero-virtual-key records into whole code points.
///
/// Key-down and key-up records are tracked separately. On drain, down
/// text is emitted as raw UTF-8 (it decodes as ordinary typed text) and
/// up text as Kitty release sequences, one per grapheme cluster.
#[derive(Debug, Clone, Default)]
pub struct GraphemeAssembler {
    /// Pending high surrogate, `[up, down]`.
    half: [Option<u16>; 2],
    runes: [Vec<char>; 2],
}

impl GraphemeAssembler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one UTF-16 code unit.
    pub fn push(&mut self, key_down: bool, unit: u16) {
        let kd = usize::from(key_down);
        if let Some(high) = self.half[kd].take() {
            let c = char::decode_utf16([high, unit])
                .next()
                .and_then(Result::ok)
                .unwrap_or(char::REPLACEMENT_CHARACTER);
            self.runes[kd].push(c);
        } else if (0xD800..=0xDFFF).contains(&unit) {
            self.half[kd] = Some(unit);
        } else {
            let c = char::from_u32(u32::from(unit)).unwrap_or(char::REPLACEMENT_CHARACTER);
            self.runes[kd].push(c);
        }
    }

    /// Whether any complete code points are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runes.iter().all(Vec::is_empty)
    }

    /// Emit and clear everything buffered. Pending surrogate halves stay.
    pub fn drain_into(&mut self, out: &mut Vec<u8>) {
        if !self.runes[1].is_empty() {
            let text: String = self.runes[1].drain(..).collect();
            out.extend_from_slice(text.as_bytes());
        }
        if !self.runes[0].is_empty() {
            let text: String = self.runes[0].drain(..).collect();
            for g in text.graphemes(true) {
                let cps: Vec<String> = g
                    .chars()
                    .filter(|c| *c != '\0')
                    .map(|c| u32::from(c).to_string())
                    .collect();
                let Some(first) = g.chars().next() else {
                    continue;
                };
                let seq = format!("\x1b[{};1:3;{}u", u32::from(first), cps.join(":"));
                out.extend_from_slice(seq.as_bytes());
            }
        }
    }
}

// ─── Key records → events ───────────────────────────────────────────────────

/// AltGr arrives as left ctrl + right alt and still types text.
const ALT_GR: u32 = cks::LEFT_CTRL_PRESSED | cks::RIGHT_ALT_PRESSED;

/// Decode one key record. `last_cks` carries the control-key state of
/// the previous record so a bare Shift/Ctrl/Alt release can still be
/// attributed to the left or right key.
pub(crate) fn key_event(rec: &KeyRecord, last_cks: &mut u32) -> Event {
    let ev = key_event_once(rec, *last_cks);
    if rec.virtual_key != 0 {
        *last_cks = rec.control_key_state;
    }
    if rec.repeat_count > 1 {
        Event::Multi(vec![ev; usize::from(rec.repeat_count)])
    } else {
        ev
    }
}

fn key_event_once(rec: &KeyRecord, last_cks: u32) -> Event {
    let r = char::from_u32(u32::from(rec.unicode_char));
    let state = rec.control_key_state;

    if rec.virtual_key == 0 {
        let key = Key {
            base_code: r.map(KeyCode::from_char),
            mods: translate_control_key_state(state),
            ..Key::default()
        };
        return press_or_release(rec.key_down, key);
    }

    let mut key = Key::default();
    let (base, pad_text) = vk_key(rec.virtual_key, state, last_cks);
    key.base_code = base;
    if let Some(t) = pad_text {
        key.text.push(t);
    }

    let alt_gr = state & ALT_GR == ALT_GR;

    let state = state & !(cks::NUMLOCK_ON | cks::SCROLLLOCK_ON);
    key.code = base.unwrap_or(KeyCode::Null);
    if let Some(c) = r.filter(|c| !c.is_control()) {
        key.code = KeyCode::from_char(c);
        let plain = state & !(cks::SHIFT_PRESSED | cks::CAPSLOCK_ON) == 0;
        if plain || alt_gr {
            key.text = c.to_string();
        }
    }

    key.mods = translate_control_key_state(state);
    ensure_key_case(&mut key, state);
    press_or_release(rec.key_down, key)
}

fn press_or_release(down: bool, key: Key) -> Event {
    if down {
        Event::KeyPress(key)
    } else {
        Event::KeyRelease(key)
    }
}

/// Key identity for a virtual-key code, plus the text numpad keys type.
fn vk_key(code: u16, state: u32, last: u32) -> (Option<KeyCode>, Option<char>) {
    let side = |s: u32, left: u32, right: u32, l: KeyCode, r: KeyCode| {
        if s & left != 0 {
            Some(l)
        } else if s & right != 0 {
            Some(r)
        } else {
            None
        }
    };

    let k = match code {
        vk::BACK => KeyCode::Backspace,
        vk::TAB => KeyCode::Tab,
        vk::RETURN => KeyCode::Enter,
        vk::SHIFT => {
            let pick = |s: u32| {
                (s & cks::SHIFT_PRESSED != 0).then(|| {
                    if s & cks::ENHANCED_KEY != 0 {
                        KeyCode::RightShift
                    } else {
                        KeyCode::LeftShift
                    }
                })
            };
            return (pick(state).or_else(|| pick(last)), None);
        }
        vk::CONTROL => {
            let pick = |s| {
                side(
                    s,
                    cks::LEFT_CTRL_PRESSED,
                    cks::RIGHT_CTRL_PRESSED,
                    KeyCode::LeftCtrl,
                    KeyCode::RightCtrl,
                )
            };
            return (pick(state).or_else(|| pick(last)), None);
        }
        vk::MENU => {
            let pick = |s| {
                side(
                    s,
                    cks::LEFT_ALT_PRESSED,
                    cks::RIGHT_ALT_PRESSED,
                    KeyCode::LeftAlt,
                    KeyCode::RightAlt,
                )
            };
            return (pick(state).or_else(|| pick(last)), None);
        }
        vk::PAUSE => KeyCode::Pause,
        vk::CAPITAL => KeyCode::CapsLock,
        vk::ESCAPE => KeyCode::Escape,
        vk::SPACE => KeyCode::Space,
        vk::PRIOR => KeyCode::PageUp,
        vk::NEXT => KeyCode::PageDown,
        vk::END => KeyCode::End,
        vk::HOME => KeyCode::Home,
        vk::LEFT => KeyCode::Left,
        vk::UP => KeyCode::Up,
        vk::RIGHT => KeyCode::Right,
        vk::DOWN => KeyCode::Down,
        vk::SELECT => KeyCode::Select,
        vk::SNAPSHOT => KeyCode::PrintScreen,
        vk::INSERT => KeyCode::Insert,
        vk::DELETE => KeyCode::Delete,
        0x30..=0x39 => KeyCode::Char(char::from(u8::try_from(code).unwrap_or(b'0'))),
        0x41..=0x5A => {
            let upper = u8::try_from(code).unwrap_or(b'A');
            KeyCode::Char(char::from(upper.to_ascii_lowercase()))
        }
        vk::LWIN => KeyCode::LeftSuper,
        vk::RWIN => KeyCode::RightSuper,
        vk::APPS => KeyCode::Menu,
        vk::NUMPAD0..=vk::NUMPAD9 => {
            let n = u8::try_from(code - vk::NUMPAD0).unwrap_or(0);
            return (Some(KeyCode::Kp(n)), Some(char::from(b'0' + n)));
        }
        vk::MULTIPLY => return (Some(KeyCode::KpMultiply), Some('*')),
        vk::ADD => return (Some(KeyCode::KpPlus), Some('+')),
        vk::SEPARATOR => return (Some(KeyCode::KpComma), Some(',')),
        vk::SUBTRACT => return (Some(KeyCode::KpMinus), Some('-')),
        vk::DECIMAL => return (Some(KeyCode::KpDecimal), Some('.')),
        vk::DIVIDE => return (Some(KeyCode::KpDivide), Some('/')),
        vk::F1..=vk::F24 => KeyCode::F(u8::try_from(code - vk::F1 + 1).unwrap_or(1)),
        vk::NUMLOCK => KeyCode::NumLock,
        vk::SCROLL => KeyCode::ScrollLock,
        vk::LSHIFT => KeyCode::LeftShift,
        vk::RSHIFT => KeyCode::RightShift,
        vk::LCONTROL => KeyCode::LeftCtrl,
        vk::RCONTROL => KeyCode::RightCtrl,
        vk::LMENU => KeyCode::LeftAlt,
        vk::RMENU => KeyCode::RightAlt,
        vk::VOLUME_MUTE => KeyCode::Mute,
        vk::VOLUME_DOWN => KeyCode::LowerVolume,
        vk::VOLUME_UP => KeyCode::RaiseVolume,
        vk::MEDIA_NEXT_TRACK => KeyCode::MediaNext,
        vk::MEDIA_PREV_TRACK => KeyCode::MediaPrev,
        vk::MEDIA_STOP => KeyCode::MediaStop,
        vk::MEDIA_PLAY_PAUSE => KeyCode::MediaPlayPause,
        vk::OEM_1 => KeyCode::Char(';'),
        vk::OEM_PLUS => KeyCode::Char('+'),
        vk::OEM_COMMA => KeyCode::Char(','),
        vk::OEM_MINUS => KeyCode::Char('-'),
        vk::OEM_PERIOD => KeyCode::Char('.'),
        vk::OEM_2 => KeyCode::Char('/'),
        vk::OEM_3 => KeyCode::Char('`'),
        vk::OEM_4 => KeyCode::Char('['),
        vk::OEM_5 => KeyCode::Char('\\'),
        vk::OEM_6 => KeyCode::Char(']'),
        vk::OEM_7 => KeyCode::Char('\''),
        _ => return (None, None),
    };
    (Some(k), None)
}

/// Fix the case of a letter's text to match Shift / Caps Lock.
fn ensure_key_case(key: &mut Key, state: u32) {
    if key.text.is_empty() {
        return;
    }
    let KeyCode::Char(c) = key.code else {
        return;
    };
    let shifted = state & (cks::SHIFT_PRESSED | cks::CAPSLOCK_ON) != 0;
    let fixed = if shifted && c.is_lowercase() {
        to_upper(c)
    } else if !shifted && c.is_uppercase() {
        to_lower(c)
    } else {
        return;
    };
    key.shifted_code = Some(fixed);
    key.text = fixed.to_string();
}

/// Control-key state bits to modifier flags.
#[must_use]
pub fn translate_control_key_state(state: u32) -> Modifiers {
    let mut m = Modifiers::empty();
    if state & (cks::LEFT_CTRL_PRESSED | cks::RIGHT_CTRL_PRESSED) != 0 {
        m |= Modifiers::CTRL;
    }
    if state & (cks::LEFT_ALT_PRESSED | cks::RIGHT_ALT_PRESSED) != 0 {
        m |= Modifiers::ALT;
    }
    if state & cks::SHIFT_PRESSED != 0 {
        m |= Modifiers::SHIFT;
    }
    if state & cks::CAPSLOCK_ON != 0 {
        m |= Modifiers::CAPS_LOCK;
    }
    if state & cks::NUMLOCK_ON != 0 {
        m |= Modifiers::NUM_LOCK;
    }
    if state & cks::SCROLLLOCK_ON != 0 {
        m |= Modifiers::SCROLL_LOCK;
    }
    m
}

// ─── Tests ──────────────────────────────────────────────────────────────────
