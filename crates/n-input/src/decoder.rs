// SPDX-License-Identifier: MIT
//
// Escape-sequence decoder.
//
// Turns the first sequence in a byte buffer into one Event and reports
// how many bytes it used. The decoder is stateless with respect to the
// stream (the scanner owns buffering, paste, and timeouts); the only
// state it carries is configuration plus the previous Win32 control-key
// state, which left/right modifier attribution needs.
//
// Dispatch is on the first byte:
//
//   ESC          SS3 / DCS / CSI / OSC / APC / PM / SOS by the next byte,
//                otherwise alt + whatever the rest decodes to
//   C1 8-bit     the same introducers in single-byte form
//   C0 / SP/ DEL control keys (legacy flags pick ambiguous meanings)
//   0x80..0x9F   remaining C1 bytes, reported as ctrl+alt
//   anything     one UTF-8 grapheme cluster
//
// Incomplete input is reported as `Unknown { kind: Raw }` covering the
// bytes seen so far, which tells the scanner to wait for more. A
// sequence that is complete but not understood becomes `Unknown` of the
// matching kind and is consumed.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bitflags::bitflags;
use unicode_segmentation::UnicodeSegmentation;

use crate::event::{ClipboardSelection, Event, Mode, ModeSetting, Rgb, SequenceKind};
use crate::key::{Key, KeyCode, Modifiers, to_lower, to_upper};
use crate::key_table::KeyTable;
use crate::mouse::{Mouse, parse_button};
use crate::win32::{self, KeyRecord};

// ─── Byte constants ─────────────────────────────────────────────────────────

pub(crate) const NUL: u8 = 0x00;
pub(crate) const SOH: u8 = 0x01;
pub(crate) const BEL: u8 = 0x07;
pub(crate) const BS: u8 = 0x08;
pub(crate) const HT: u8 = 0x09;
pub(crate) const CR: u8 = 0x0D;
pub(crate) const CAN: u8 = 0x18;
pub(crate) const SUB: u8 = 0x1A;
pub(crate) const ESC: u8 = 0x1B;
pub(crate) const FS: u8 = 0x1C;
pub(crate) const US: u8 = 0x1F;
pub(crate) const SP: u8 = 0x20;
pub(crate) const DEL: u8 = 0x7F;

pub(crate) const SS3: u8 = 0x8F;
pub(crate) const DCS: u8 = 0x90;
pub(crate) const SOS: u8 = 0x98;
pub(crate) const CSI: u8 = 0x9B;
pub(crate) const ST: u8 = 0x9C;
pub(crate) const OSC: u8 = 0x9D;
pub(crate) const PM: u8 = 0x9E;
pub(crate) const APC: u8 = 0x9F;

const MAX_CSI_PARAMS: usize = 32;
const MAX_DCS_PARAMS: usize = 16;

bitflags! {
    /// Choices for bytes that legacy terminals use for two different keys.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct LegacyFlags: u8 {
        /// NUL is ctrl+@ rather than ctrl+space.
        const CTRL_AT           = 1 << 0;
        /// HT is ctrl+i rather than Tab.
        const CTRL_I            = 1 << 1;
        /// CR is ctrl+m rather than Enter.
        const CTRL_M            = 1 << 2;
        /// A lone ESC byte is ctrl+[ rather than Escape.
        const CTRL_OPEN_BRACKET = 1 << 3;
        /// DEL is Delete rather than Backspace.
        const BACKSPACE         = 1 << 4;
        /// `CSI 1 ~` is Find rather than Home.
        const FIND              = 1 << 5;
        /// `CSI 4 ~` is Select rather than End.
        const SELECT            = 1 << 6;
        /// Capability-database F13+ are real function keys, not modified F1–F12.
        const FKEYS             = 1 << 7;
    }
}

// ─── Parameters ─────────────────────────────────────────────────────────────

const MISSING: i32 = -1;

/// One numeric parameter; `more` marks a `:` sub-parameter separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Param {
    value: i32,
    more: bool,
}

impl Param {
    const fn or(self, def: i32) -> i32 {
        if self.value == MISSING { def } else { self.value }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Params {
    list: [Param; MAX_CSI_PARAMS],
    len: usize,
}

impl Params {
    /// Parameter `i` with `def` standing in for an omitted value, or
    /// `None` past the end.
    fn get(&self, i: usize, def: i32) -> Option<i32> {
        self.as_slice().get(i).map(|p| p.or(def))
    }

    fn or(&self, i: usize, def: i32) -> i32 {
        self.get(i, def).unwrap_or(def)
    }

    fn has_more(&self, i: usize) -> bool {
        self.as_slice().get(i).is_some_and(|p| p.more)
    }

    fn as_slice(&self) -> &[Param] {
        &self.list[..self.len]
    }

    const fn len(&self) -> usize {
        self.len
    }

    const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Scan parameter bytes (0x30–0x3F) starting at `i`. Prefix bytes in
/// that range (`<=>?`) are stepped over without starting a value.
fn scan_params(b: &[u8], mut i: usize, max: usize) -> (Params, usize) {
    let mut pa = Params::default();
    let mut seen = false;
    while pa.len < max {
        let Some(&c) = b.get(i) else { break };
        if !(0x30..=0x3F).contains(&c) {
            break;
        }
        seen = true;
        match c {
            b'0'..=b'9' => {
                let cur = &mut pa.list[pa.len];
                if cur.value == MISSING {
                    cur.value = 0;
                }
                cur.value = cur
                    .value
                    .saturating_mul(10)
                    .saturating_add(i32::from(c - b'0'));
            }
            b':' | b';' => {
                if c == b':' {
                    pa.list[pa.len].more = true;
                }
                pa.len += 1;
                if pa.len < max {
                    pa.list[pa.len] = Param {
                        value: MISSING,
                        more: false,
                    };
                }
            }
            _ => {}
        }
        i += 1;
    }
    if seen && pa.len < max {
        pa.len += 1;
    }
    (pa, i)
}

/// Length of a 7-bit (`ESC x`) or 8-bit introducer at the buffer start.
fn intro_len(b: &[u8]) -> usize {
    if b.first() == Some(&ESC) { 2 } else { 1 }
}

fn char_from(v: i32) -> char {
    u32::try_from(v)
        .ok()
        .and_then(char::from_u32)
        .unwrap_or(char::REPLACEMENT_CHARACTER)
}

fn printable(v: i32) -> Option<char> {
    u32::try_from(v)
        .ok()
        .and_then(char::from_u32)
        .filter(|c| !c.is_control())
}

fn press(code: KeyCode, mods: Modifiers) -> Event {
    Event::KeyPress(Key::with_mods(code, mods))
}

fn alt_key(b: u8) -> Event {
    press(KeyCode::from_char(char::from(b)), Modifiers::ALT)
}

fn alt_shift_key(b: u8) -> Event {
    press(
        KeyCode::Char(char::from(b.to_ascii_lowercase())),
        Modifiers::SHIFT | Modifiers::ALT,
    )
}

fn raw(b: &[u8]) -> Event {
    Event::unknown(SequenceKind::Raw, b)
}

const fn fkey(n: i32) -> KeyCode {
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    let n = n as u8;
    KeyCode::F(n)
}

const ARROWS: [KeyCode; 4] = [KeyCode::Up, KeyCode::Down, KeyCode::Right, KeyCode::Left];

// ─── EventDecoder ───────────────────────────────────────────────────────────

/// Decodes one event at a time from raw terminal input.
#[derive(Debug, Clone)]
pub struct EventDecoder {
    legacy: LegacyFlags,
    table: Option<Arc<KeyTable>>,
    last_cks: u32,
}

impl Default for EventDecoder {
    fn default() -> Self {
        Self::new(LegacyFlags::empty())
    }
}

impl EventDecoder {
    /// A decoder using the shared literal-sequence table for `legacy`.
    #[must_use]
    pub fn new(legacy: LegacyFlags) -> Self {
        Self {
            legacy,
            table: Some(KeyTable::shared(legacy)),
            last_cks: 0,
        }
    }

    /// Replace the literal-sequence table (for instance one built with
    /// capability-database entries).
    #[must_use]
    pub fn with_key_table(mut self, table: Arc<KeyTable>) -> Self {
        self.table = Some(table);
        self
    }

    #[must_use]
    pub const fn legacy(&self) -> LegacyFlags {
        self.legacy
    }

    /// Drop the literal-sequence table. Decoding is unchanged; the
    /// scanner just loses its early match for ambiguous prefixes.
    #[must_use]
    pub fn without_key_table(mut self) -> Self {
        self.table = None;
        self
    }

    #[must_use]
    pub const fn has_key_table(&self) -> bool {
        self.table.is_some()
    }

    /// Change the legacy flags. An installed table is swapped for the
    /// shared table matching the new flags.
    pub fn set_legacy(&mut self, legacy: LegacyFlags) {
        self.legacy = legacy;
        if self.table.is_some() {
            self.table = Some(KeyTable::shared(legacy));
        }
    }

    /// Exact-match lookup in the literal-sequence table.
    #[must_use]
    pub fn lookup(&self, seq: &[u8]) -> Option<&Key> {
        self.table.as_deref().and_then(|t| t.get(seq))
    }

    /// Decode the first event in `buf`.
    ///
    /// Returns the number of bytes consumed and the event; `(0, None)`
    /// only for an empty buffer. Never panics on any input.
    pub fn decode(&mut self, buf: &[u8]) -> (usize, Option<Event>) {
        if buf.is_empty() {
            return (0, None);
        }
        let (n, ev) = self.decode_one(buf);
        (n, Some(ev))
    }

    fn decode_one(&mut self, buf: &[u8]) -> (usize, Event) {
        let b = buf[0];
        match b {
            ESC => self.parse_escape(buf),
            SS3 => parse_ss3(buf),
            DCS => parse_dcs(buf),
            CSI => self.parse_csi(buf),
            OSC => parse_osc(buf),
            APC => parse_st_terminated(buf, StString::Apc),
            PM => parse_st_terminated(buf, StString::Pm),
            SOS => parse_st_terminated(buf, StString::Sos),
            _ if b <= US || b == DEL || b == SP => (1, self.parse_control(b)),
            // Never a UTF-8 lead byte.
            0x80..=0x9F => (
                1,
                press(KeyCode::Char(char::from(b - 0x40)), Modifiers::CTRL | Modifiers::ALT),
            ),
            _ => self.parse_utf8(buf),
        }
    }

    fn parse_escape(&mut self, buf: &[u8]) -> (usize, Event) {
        let Some(&next) = buf.get(1) else {
            return (1, self.parse_control(ESC));
        };
        match next {
            b'O' => parse_ss3(buf),
            b'P' => parse_dcs(buf),
            b'[' => self.parse_csi(buf),
            b']' => parse_osc(buf),
            b'_' => parse_st_terminated(buf, StString::Apc),
            b'^' => parse_st_terminated(buf, StString::Pm),
            b'X' => parse_st_terminated(buf, StString::Sos),
            _ => match self.decode_one(&buf[1..]) {
                (n, Event::KeyPress(mut k)) => {
                    k.text.clear();
                    k.mods |= Modifiers::ALT;
                    (n + 1, Event::KeyPress(k))
                }
                _ => (1, self.parse_control(ESC)),
            },
        }
    }

    // ── Control bytes ──

    fn parse_control(&self, b: u8) -> Event {
        let ctrl = |c: u8| press(KeyCode::Char(char::from(c)), Modifiers::CTRL);
        let plain = |code| press(code, Modifiers::empty());
        match b {
            NUL if self.legacy.contains(LegacyFlags::CTRL_AT) => ctrl(b'@'),
            NUL => press(KeyCode::Space, Modifiers::CTRL),
            BS => ctrl(b'h'),
            HT if self.legacy.contains(LegacyFlags::CTRL_I) => ctrl(b'i'),
            HT => plain(KeyCode::Tab),
            CR if self.legacy.contains(LegacyFlags::CTRL_M) => ctrl(b'm'),
            CR => plain(KeyCode::Enter),
            ESC if self.legacy.contains(LegacyFlags::CTRL_OPEN_BRACKET) => ctrl(b'['),
            ESC => plain(KeyCode::Escape),
            DEL if self.legacy.contains(LegacyFlags::BACKSPACE) => plain(KeyCode::Delete),
            DEL => plain(KeyCode::Backspace),
            SP => Event::KeyPress(Key::char(' ')),
            SOH..=SUB => ctrl(b + 0x60),
            FS..=US => ctrl(b + 0x40),
            _ => raw(&[b]),
        }
    }

    fn parse_utf8(&self, b: &[u8]) -> (usize, Event) {
        let c = b[0];
        if c <= US || c == DEL {
            return (1, self.parse_control(c));
        }
        if c < DEL {
            let ch = char::from(c);
            let mut k = Key::char(ch);
            if ch.is_ascii_uppercase() {
                k.code = KeyCode::Char(ch.to_ascii_lowercase());
                k.shifted_code = Some(ch);
                k.mods |= Modifiers::SHIFT;
            }
            return (1, Event::KeyPress(k));
        }

        let s = match std::str::from_utf8(b) {
            Ok(s) => s,
            Err(e) => match std::str::from_utf8(&b[..e.valid_up_to()]) {
                Ok(s) if !s.is_empty() => s,
                // Truncated or invalid lead: let the scanner decide.
                _ => return (1, raw(&b[..1])),
            },
        };
        let Some(cluster) = s.graphemes(true).next() else {
            return (1, raw(&b[..1]));
        };
        let mut chars = cluster.chars();
        let code = match (chars.next(), chars.next()) {
            (Some(c), None) => KeyCode::Char(c),
            _ => KeyCode::Extended,
        };
        let key = Key {
            text: cluster.to_string(),
            code,
            ..Key::default()
        };
        (cluster.len(), Event::KeyPress(key))
    }

    // ── CSI ──

    fn parse_csi(&mut self, b: &[u8]) -> (usize, Event) {
        if b.len() == 2 && b[0] == ESC {
            return (2, alt_key(b[1]));
        }

        let i = intro_len(b);
        let prefix = match b.get(i) {
            Some(&c @ b'<'..=b'?') => c,
            _ => 0,
        };
        let (pa, mut i) = scan_params(b, i, MAX_CSI_PARAMS);

        let mut intermed = 0;
        while let Some(&c @ 0x20..=0x2F) = b.get(i) {
            intermed = c;
            i += 1;
        }

        let Some(&fin) = b.get(i).filter(|c| (0x40..=0x7E).contains(*c)) else {
            // URxvt reports shifted editing keys as `CSI n $`.
            if intermed == b'$' && b[i - 1] == b'$' {
                let mut tilde = b[..i - 1].to_vec();
                tilde.push(b'~');
                if let (n, Event::KeyPress(mut k)) = self.parse_csi(&tilde) {
                    k.mods |= Modifiers::SHIFT;
                    return (n, Event::KeyPress(k));
                }
            }
            if i >= b.len() {
                return (i, raw(&b[..i]));
            }
            return (i, Event::unknown(SequenceKind::Csi, &b[..i]));
        };
        i += 1;

        // X10 mouse: three raw bytes follow the final.
        if prefix == 0 && intermed == 0 && fin == b'M' {
            if i + 3 > b.len() {
                return (b.len(), raw(b));
            }
            return (i + 3, x10_mouse(&b[i..i + 3]));
        }

        match self.dispatch_csi(prefix, intermed, fin, &pa) {
            Some(ev) => (i, ev),
            None => (i, Event::unknown(SequenceKind::Csi, &b[..i])),
        }
    }

    fn dispatch_csi(&mut self, prefix: u8, intermed: u8, fin: u8, pa: &Params) -> Option<Event> {
        match (prefix, intermed, fin) {
            (b'?' | 0, b'$', b'y') => {
                let number = pa.get(0, MISSING).filter(|&m| m != MISSING)?;
                let value = pa.get(1, 0)?;
                Some(Event::ModeReport {
                    mode: Mode {
                        number,
                        dec: prefix == b'?',
                    },
                    value: ModeSetting::from_param(value),
                })
            }
            (b'?', 0, b'c') => Some(Event::PrimaryDeviceAttributes(device_attrs(pa))),
            (b'>', 0, b'c') => Some(Event::SecondaryDeviceAttributes(device_attrs(pa))),
            (b'?', 0, b'u') => Some(Event::KeyboardEnhancements(pa.or(0, MISSING))),
            (b'?', 0, b'R') => {
                let row = pa.or(0, 1);
                let col = pa.get(1, 1)?;
                Some(Event::CursorPosition {
                    x: col - 1,
                    y: row - 1,
                })
            }
            (b'<', 0, b'M' | b'm') if pa.len() == 3 => Some(sgr_mouse(fin, pa)),
            (b'>', 0, b'm') => {
                if pa.get(0, 0)? != 4 {
                    return None;
                }
                let level = pa.get(1, MISSING).filter(|&v| v != MISSING)?;
                Some(Event::ModifyOtherKeys(level))
            }
            (b'?', 0, b'n') => match (pa.or(0, MISSING), pa.or(1, MISSING)) {
                (997, 1) => Some(Event::DarkColorScheme),
                (997, 2) => Some(Event::LightColorScheme),
                _ => None,
            },
            (0, 0, b'I') => Some(Event::Focus),
            (0, 0, b'O') => Some(Event::Blur),
            (0, 0, b'R') if pa.len() == 2 => {
                let row = pa.or(0, 1);
                let col = pa.or(1, 1);
                let pos = Event::CursorPosition {
                    x: col - 1,
                    y: row - 1,
                };
                // `CSI 1 ; mod R` is also modified F3; at row 1 the two
                // can't be told apart, so report both.
                if row == 1 && (0..=15).contains(&(col - 1)) {
                    let f3 = press(KeyCode::F(3), Modifiers::from_xterm(col));
                    return Some(Event::Multi(vec![f3, pos]));
                }
                Some(pos)
            }
            (0, 0, b'R') if !pa.is_empty() => None,
            (0, 0, b'a'..=b'd' | b'A'..=b'F' | b'H' | b'P'..=b'S' | b'Z') => letter_key(fin, pa),
            (0, 0, b'u') if !pa.is_empty() => Some(kitty_keyboard(pa)),
            (0, 0, b'_') if pa.len() == 6 => Some(self.win32_key(pa)),
            (0, 0, b'@' | b'^' | b'~') => self.csi_tilde(fin, pa),
            (0, 0, b't') => window_op(pa),
            _ => None,
        }
    }

    fn win32_key(&mut self, pa: &Params) -> Event {
        let u16_at = |i| u16::try_from(pa.or(i, 0)).unwrap_or(0);
        let rec = KeyRecord {
            virtual_key: u16_at(0),
            scan_code: u16_at(1),
            unicode_char: u16_at(2),
            key_down: pa.or(3, 0) == 1,
            control_key_state: u32::try_from(pa.or(4, 0)).unwrap_or(0),
            repeat_count: u16_at(5).max(1),
        };
        win32::key_event(&rec, &mut self.last_cks)
    }

    fn csi_tilde(&self, fin: u8, pa: &Params) -> Option<Event> {
        if pa.is_empty() {
            return None;
        }
        let param = pa.or(0, 0);
        if fin == b'~' {
            match param {
                27 => return (pa.len() == 3).then(|| modify_other_keys(pa)),
                200 => return Some(Event::PasteStart),
                201 => return Some(Event::PasteEnd),
                _ => {}
            }
        }

        let code = match param {
            1 if self.legacy.contains(LegacyFlags::FIND) => KeyCode::Find,
            1 | 7 => KeyCode::Home,
            2 => KeyCode::Insert,
            3 => KeyCode::Delete,
            4 if self.legacy.contains(LegacyFlags::SELECT) => KeyCode::Select,
            4 | 8 => KeyCode::End,
            5 => KeyCode::PageUp,
            6 => KeyCode::PageDown,
            11..=15 => fkey(param - 10),
            17..=21 => fkey(param - 11),
            23..=26 => fkey(param - 12),
            28..=29 => fkey(param - 13),
            31..=34 => fkey(param - 14),
            _ => return None,
        };

        let mut k = Key::new(code);
        let m = pa.or(1, MISSING);
        if pa.len() > 1 && m != MISSING {
            k.mods |= Modifiers::from_xterm(m);
        }
        match fin {
            b'^' => k.mods |= Modifiers::CTRL,
            b'@' => k.mods |= Modifiers::CTRL | Modifiers::SHIFT,
            _ => return Some(kitty_ext(pa, k)),
        }
        Some(Event::KeyPress(k))
    }
}

// ─── CSI helpers ────────────────────────────────────────────────────────────

fn device_attrs(pa: &Params) -> Vec<i32> {
    pa.as_slice()
        .iter()
        .map(|p| if p.more { 0 } else { p.or(0) })
        .collect()
}

fn letter_key(fin: u8, pa: &Params) -> Option<Event> {
    let (code, mods) = match fin {
        b'a'..=b'd' => (ARROWS[usize::from(fin - b'a')], Modifiers::SHIFT),
        b'A'..=b'D' => (ARROWS[usize::from(fin - b'A')], Modifiers::empty()),
        b'E' => (KeyCode::Begin, Modifiers::empty()),
        b'F' => (KeyCode::End, Modifiers::empty()),
        b'H' => (KeyCode::Home, Modifiers::empty()),
        b'P'..=b'S' => (KeyCode::F(fin - b'P' + 1), Modifiers::empty()),
        b'Z' => (KeyCode::Tab, Modifiers::SHIFT),
        _ => return None,
    };
    if (pa.len() > 2 && !pa.has_more(1)) || pa.or(0, 1) != 1 {
        return None;
    }
    let mut k = Key::with_mods(code, mods);
    if pa.len() > 1 {
        k.mods |= Modifiers::from_xterm(pa.or(1, 1));
    }
    Some(kitty_ext(pa, k))
}

/// Kitty event-type sub-parameter on legacy sequences: `CSI 1 ; mod:type X`.
fn kitty_ext(pa: &Params, mut k: Key) -> Event {
    let list = pa.as_slice();
    if list.len() > 2 && list[0].or(1) == 1 && list[1].more {
        match list[2].or(1) {
            2 => k.is_repeat = true,
            3 => return Event::KeyRelease(k),
            _ => {}
        }
    }
    Event::KeyPress(k)
}

fn modify_other_keys(pa: &Params) -> Event {
    let mods = Modifiers::from_xterm(pa.or(1, 1));
    let code = match pa.or(2, 1) {
        8 | 127 => KeyCode::Backspace,
        9 => KeyCode::Tab,
        13 => KeyCode::Enter,
        27 => KeyCode::Escape,
        r => {
            let c = char_from(r);
            let mut k = Key::with_mods(KeyCode::from_char(c), mods);
            if mods.bits() <= Modifiers::SHIFT.bits() && !c.is_control() {
                k.text = c.to_string();
            }
            return Event::KeyPress(k);
        }
    };
    press(code, mods)
}

fn window_op(pa: &Params) -> Option<Event> {
    let op = pa.get(0, 0)?;
    let ev = match (op, pa.len()) {
        (4, 3) => Event::PixelSize {
            width: pa.or(2, 0),
            height: pa.or(1, 0),
        },
        (6, 3) => Event::CellSize {
            width: pa.or(2, 0),
            height: pa.or(1, 0),
        },
        (8, 3) => Event::WindowSize {
            width: pa.or(2, 0),
            height: pa.or(1, 0),
        },
        // In-band resize: cells then pixels.
        (48, 5) => Event::Multi(vec![
            Event::WindowSize {
                width: pa.or(2, 0),
                height: pa.or(1, 0),
            },
            Event::PixelSize {
                width: pa.or(4, 0),
                height: pa.or(3, 0),
            },
        ]),
        _ => Event::WindowOp {
            op,
            args: (1..pa.len()).map(|j| pa.or(j, 0)).collect(),
        },
    };
    Some(ev)
}

// ─── Mouse ──────────────────────────────────────────────────────────────────

/// Three bytes, each offset by 32: button, column, row. Coordinates are
/// 1-based on the wire. Button ordinals are xterm's, so `0x20` is a left
/// press and `0x21` a middle one.
fn x10_mouse(v: &[u8]) -> Event {
    let mut b = i32::from(v[0]);
    if b >= 32 {
        b -= 32;
    }
    let bb = parse_button(b);
    let m = Mouse {
        x: i32::from(v[1]) - 33,
        y: i32::from(v[2]) - 33,
        button: bb.button,
        mods: bb.mods,
    };
    if m.button.is_wheel() {
        Event::MouseWheel(m)
    } else if bb.is_motion {
        Event::MouseMotion(m)
    } else if bb.is_release {
        Event::MouseRelease(m)
    } else {
        Event::MouseClick(m)
    }
}

fn sgr_mouse(fin: u8, pa: &Params) -> Event {
    let bb = parse_button(pa.or(0, 0));
    let m = Mouse {
        x: pa.or(1, 1) - 1,
        y: pa.or(2, 1) - 1,
        button: bb.button,
        mods: bb.mods,
    };
    // Some terminals report motion with the release final.
    if m.button.is_wheel() {
        Event::MouseWheel(m)
    } else if !bb.is_motion && fin == b'm' {
        Event::MouseRelease(m)
    } else if bb.is_motion {
        Event::MouseMotion(m)
    } else {
        Event::MouseClick(m)
    }
}

// ─── Kitty keyboard ─────────────────────────────────────────────────────────

/// `CSI code[:shifted[:base]] ; mods[:event] ; text... u`
fn kitty_keyboard(pa: &Params) -> Event {
    let mut key = Key::default();
    let mut release = false;
    let (mut idx, mut sub) = (0, 0);

    for p in pa.as_slice() {
        match (idx, sub) {
            (0, 0) => {
                let code = p.or(1);
                let code = kitty_key(code).unwrap_or_else(|| KeyCode::from_char(char_from(code)));
                key = Key::new(code);
            }
            (0, 1) => {
                if let Some(c) = printable(p.or(1)) {
                    key.shifted_code = Some(c);
                }
            }
            (0, 2) => {
                if let Some(c) = printable(p.or(1)) {
                    key.base_code = Some(KeyCode::from_char(c));
                }
            }
            (1, 0) => {
                let m = p.or(1);
                if m > 1 {
                    key.mods = Modifiers::from_kitty(m - 1);
                    if key.mods.bits() > Modifiers::SHIFT.bits() {
                        key.text.clear();
                    }
                }
            }
            (1, 1) => match p.or(1) {
                2 => key.is_repeat = true,
                3 => release = true,
                _ => {}
            },
            (2, _) => {
                let cp = p.or(0);
                if cp != 0 {
                    key.text.push(char_from(cp));
                }
            }
            _ => {}
        }
        sub += 1;
        if !p.more {
            idx += 1;
            sub = 0;
        }
    }

    // Num lock never changes the text.
    let key_mod = key.mods - Modifiers::NUM_LOCK;
    let print_mod = key_mod.bits() <= Modifiers::SHIFT.bits()
        || key_mod == Modifiers::CAPS_LOCK
        || key_mod == Modifiers::SHIFT | Modifiers::CAPS_LOCK;

    if key.text.is_empty() && print_mod {
        if let Some(c) = keypad_text(key.code) {
            key.text.push(c);
        }
    }
    if key.text.is_empty() && print_mod && key.code.is_printable() {
        if let Some(c) = key.code.as_char() {
            let c = if key_mod.is_empty() {
                c
            } else if let Some(s) = key.shifted_code {
                s
            } else if key_mod.intersects(Modifiers::SHIFT | Modifiers::CAPS_LOCK) {
                to_upper(c)
            } else {
                to_lower(c)
            };
            key.text.push(c);
        }
    }

    if release {
        Event::KeyRelease(key)
    } else {
        Event::KeyPress(key)
    }
}

fn keypad_text(code: KeyCode) -> Option<char> {
    match code {
        KeyCode::Kp(n) => char::from_digit(u32::from(n), 10),
        KeyCode::KpEqual => Some('='),
        KeyCode::KpMultiply => Some('*'),
        KeyCode::KpPlus => Some('+'),
        KeyCode::KpMinus => Some('-'),
        KeyCode::KpDecimal => Some('.'),
        KeyCode::KpDivide => Some('/'),
        KeyCode::KpSep => Some(','),
        _ => None,
    }
}

/// Kitty functional key numbers, including the private-use block.
fn kitty_key(code: i32) -> Option<KeyCode> {
    let key = match code {
        8 | 127 | 57347 => KeyCode::Backspace,
        9 | 57346 => KeyCode::Tab,
        13 | 57345 => KeyCode::Enter,
        27 | 57344 => KeyCode::Escape,
        57348 => KeyCode::Insert,
        57349 => KeyCode::Delete,
        57350 => KeyCode::Left,
        57351 => KeyCode::Right,
        57352 => KeyCode::Up,
        57353 => KeyCode::Down,
        57354 => KeyCode::PageUp,
        57355 => KeyCode::PageDown,
        57356 => KeyCode::Home,
        57357 => KeyCode::End,
        57358 => KeyCode::CapsLock,
        57359 => KeyCode::ScrollLock,
        57360 => KeyCode::NumLock,
        57361 => KeyCode::PrintScreen,
        57362 => KeyCode::Pause,
        57363 => KeyCode::Menu,
        57364..=57398 => fkey(code - 57363),
        57399..=57408 => {
            #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
            let n = (code - 57399) as u8;
            KeyCode::Kp(n)
        }
        57409 => KeyCode::KpDecimal,
        57410 => KeyCode::KpDivide,
        57411 => KeyCode::KpMultiply,
        57412 => KeyCode::KpMinus,
        57413 => KeyCode::KpPlus,
        57414 => KeyCode::KpEnter,
        57415 => KeyCode::KpEqual,
        57416 => KeyCode::KpSep,
        57417 => KeyCode::KpLeft,
        57418 => KeyCode::KpRight,
        57419 => KeyCode::KpUp,
        57420 => KeyCode::KpDown,
        57421 => KeyCode::KpPageUp,
        57422 => KeyCode::KpPageDown,
        57423 => KeyCode::KpHome,
        57424 => KeyCode::KpEnd,
        57425 => KeyCode::KpInsert,
        57426 => KeyCode::KpDelete,
        57427 => KeyCode::KpBegin,
        57428 => KeyCode::MediaPlay,
        57429 => KeyCode::MediaPause,
        57430 => KeyCode::MediaPlayPause,
        57431 => KeyCode::MediaReverse,
        57432 => KeyCode::MediaStop,
        57433 => KeyCode::MediaFastForward,
        57434 => KeyCode::MediaRewind,
        57435 => KeyCode::MediaNext,
        57436 => KeyCode::MediaPrev,
        57437 => KeyCode::MediaRecord,
        57438 => KeyCode::LowerVolume,
        57439 => KeyCode::RaiseVolume,
        57440 => KeyCode::Mute,
        57441 => KeyCode::LeftShift,
        57442 => KeyCode::LeftCtrl,
        57443 => KeyCode::LeftAlt,
        57444 => KeyCode::LeftSuper,
        57445 => KeyCode::LeftHyper,
        57446 => KeyCode::LeftMeta,
        57447 => KeyCode::RightShift,
        57448 => KeyCode::RightCtrl,
        57449 => KeyCode::RightAlt,
        57450 => KeyCode::RightSuper,
        57451 => KeyCode::RightHyper,
        57452 => KeyCode::RightMeta,
        57453 => KeyCode::IsoLevel3Shift,
        57454 => KeyCode::IsoLevel5Shift,
        _ => return None,
    };
    Some(key)
}

// ─── SS3 ────────────────────────────────────────────────────────────────────

fn parse_ss3(b: &[u8]) -> (usize, Event) {
    if b.len() == 2 && b[0] == ESC {
        return (2, alt_shift_key(b[1]));
    }

    let mut i = intro_len(b);
    // Some terminals put a modifier between the introducer and the key.
    let mut m: i32 = 0;
    while let Some(&d @ b'0'..=b'9') = b.get(i) {
        m = m.saturating_mul(10).saturating_add(i32::from(d - b'0'));
        i += 1;
    }

    let Some(&gl) = b.get(i) else {
        return (i, raw(&b[..i]));
    };
    if !(0x21..=0x7E).contains(&gl) {
        return (i, Event::unknown(SequenceKind::Ss3, &b[..i]));
    }
    i += 1;

    let (code, mods) = match gl {
        b'a'..=b'd' => (ARROWS[usize::from(gl - b'a')], Modifiers::CTRL),
        b'A'..=b'D' => (ARROWS[usize::from(gl - b'A')], Modifiers::empty()),
        b'E' => (KeyCode::Begin, Modifiers::empty()),
        b'F' => (KeyCode::End, Modifiers::empty()),
        b'H' => (KeyCode::Home, Modifiers::empty()),
        b'P'..=b'S' => (KeyCode::F(gl - b'P' + 1), Modifiers::empty()),
        b'M' => (KeyCode::KpEnter, Modifiers::empty()),
        b'X' => (KeyCode::KpEqual, Modifiers::empty()),
        b'j' => (KeyCode::KpMultiply, Modifiers::empty()),
        b'k' => (KeyCode::KpPlus, Modifiers::empty()),
        b'l' => (KeyCode::KpComma, Modifiers::empty()),
        b'm' => (KeyCode::KpMinus, Modifiers::empty()),
        b'n' => (KeyCode::KpDecimal, Modifiers::empty()),
        b'o' => (KeyCode::KpDivide, Modifiers::empty()),
        b'p'..=b'y' => (KeyCode::Kp(gl - b'p'), Modifiers::empty()),
        _ => return (i, Event::unknown(SequenceKind::Ss3, &b[..i])),
    };
    let mut k = Key::with_mods(code, mods);
    if m > 0 {
        k.mods |= Modifiers::from_xterm(m);
    }
    (i, Event::KeyPress(k))
}

// ─── OSC ────────────────────────────────────────────────────────────────────

fn parse_osc(b: &[u8]) -> (usize, Event) {
    if b.len() == 2 && b[0] == ESC {
        return (2, alt_key(b[1]));
    }

    let mut i = intro_len(b);
    let mut cmd: i32 = -1;
    while let Some(&d @ b'0'..=b'9') = b.get(i) {
        cmd = cmd
            .max(0)
            .saturating_mul(10)
            .saturating_add(i32::from(d - b'0'));
        i += 1;
    }
    let mut start = 0;
    if b.get(i) == Some(&b';') {
        i += 1;
        start = i;
    }

    let Some(off) = b[i..]
        .iter()
        .position(|c| matches!(*c, BEL | ESC | ST | CAN | SUB))
    else {
        return (b.len(), raw(b));
    };
    let end = i + off;
    i = end + 1;

    match b[end] {
        CAN | SUB => return (i, Event::Ignored(b[..i].to_vec())),
        ESC => match b.get(i) {
            Some(b'\\') => i += 1,
            None => return (b.len(), raw(b)),
            Some(_) => {
                // `ESC ]` followed by another escape was alt+] after all.
                if b[0] == ESC && (cmd == -1 || (start == 0 && end == 2)) {
                    return (2, alt_key(b[1]));
                }
                return (i, Event::Ignored(b[..i].to_vec()));
            }
        },
        _ => {}
    }

    if start == 0 || end <= start {
        return (i, Event::unknown(SequenceKind::Osc, &b[..i]));
    }
    let data = &b[start..end];
    let ev = match cmd {
        10 => parse_xcolor(data).map(Event::ForegroundColor),
        11 => parse_xcolor(data).map(Event::BackgroundColor),
        12 => parse_xcolor(data).map(Event::CursorColor),
        52 => Some(parse_clipboard(data)),
        _ => None,
    };
    (
        i,
        ev.unwrap_or_else(|| Event::unknown(SequenceKind::Osc, &b[..i])),
    )
}

/// `#rgb`, `#rrggbb`, ... or `rgb:r/g/b` with 1–4 hex digits per
/// component, scaled to 8 bits.
fn parse_xcolor(data: &[u8]) -> Option<Rgb> {
    let s = std::str::from_utf8(data).ok()?;
    if let Some(hex) = s.strip_prefix('#') {
        let n = hex.len();
        if n == 0 || n % 3 != 0 || n > 12 || !hex.bytes().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let w = n / 3;
        let comp = |k: usize| scale_hex(&hex[k * w..(k + 1) * w]);
        return Some(Rgb::new(comp(0)?, comp(1)?, comp(2)?));
    }
    let rest = s.strip_prefix("rgb:")?;
    let mut parts = rest.split('/');
    let (r, g, bl) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    Some(Rgb::new(scale_hex(r)?, scale_hex(g)?, scale_hex(bl)?))
}

fn scale_hex(s: &str) -> Option<u8> {
    if s.is_empty() || s.len() > 4 || !s.bytes().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let v = u32::from_str_radix(s, 16).ok()?;
    let v = match s.len() {
        1 => v * 17,
        2 => v,
        3 => v >> 4,
        _ => v >> 8,
    };
    u8::try_from(v).ok()
}

fn parse_clipboard(data: &[u8]) -> Event {
    let parts: Vec<&[u8]> = data.split(|&c| c == b';').collect();
    let (sel, payload) = match parts.as_slice() {
        [sel, payload] if !sel.is_empty() => (sel[0], *payload),
        _ => {
            return Event::Clipboard {
                content: String::new(),
                selection: ClipboardSelection::System,
            };
        }
    };
    match STANDARD.decode(payload) {
        Ok(bytes) => Event::Clipboard {
            content: String::from_utf8_lossy(&bytes).into_owned(),
            selection: ClipboardSelection::from_byte(sel),
        },
        Err(_) => Event::Clipboard {
            content: String::from_utf8_lossy(payload).into_owned(),
            selection: ClipboardSelection::System,
        },
    }
}

// ─── SOS / PM / APC ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StString {
    Sos,
    Pm,
    Apc,
}

impl StString {
    const fn kind(self) -> SequenceKind {
        match self {
            Self::Sos => SequenceKind::Sos,
            Self::Pm => SequenceKind::Pm,
            Self::Apc => SequenceKind::Apc,
        }
    }

    /// What `ESC <intro>` means when no string follows.
    fn default_key(self, intro: u8) -> Event {
        match self {
            Self::Sos => alt_shift_key(intro),
            Self::Pm | Self::Apc => alt_key(intro),
        }
    }
}

fn parse_st_terminated(b: &[u8], kind: StString) -> (usize, Event) {
    if b.len() == 2 && b[0] == ESC {
        return (2, kind.default_key(b[1]));
    }

    let start = intro_len(b);
    let Some(off) = b[start..]
        .iter()
        .position(|c| matches!(*c, ESC | ST | CAN | SUB))
    else {
        return (b.len(), raw(b));
    };
    let end = start + off;
    let mut i = end + 1;

    match b[end] {
        CAN | SUB => return (i, Event::Ignored(b[..i].to_vec())),
        ESC => match b.get(i) {
            Some(b'\\') => i += 1,
            None => return (b.len(), raw(b)),
            Some(_) if start == end && b[0] == ESC => return (2, kind.default_key(b[1])),
            Some(_) => return (i, Event::Ignored(b[..i].to_vec())),
        },
        _ => {}
    }

    let data = &b[start..end];
    let ev = match kind {
        StString::Apc => kitty_graphics(data),
        StString::Sos | StString::Pm => None,
    };
    (i, ev.unwrap_or_else(|| Event::unknown(kind.kind(), &b[..i])))
}

/// `G key=value,key=value;payload`
fn kitty_graphics(data: &[u8]) -> Option<Event> {
    let rest = data.strip_prefix(b"G")?;
    let mut parts = rest.splitn(2, |&c| c == b';');
    let opts = parts.next().unwrap_or_default();
    let payload = parts.next().unwrap_or_default().to_vec();
    let options = String::from_utf8_lossy(opts)
        .split(',')
        .filter_map(|kv| kv.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Some(Event::KittyGraphics { options, payload })
}

// ─── DCS ────────────────────────────────────────────────────────────────────

fn parse_dcs(b: &[u8]) -> (usize, Event) {
    if b.len() == 2 && b[0] == ESC {
        return (2, alt_shift_key(b[1]));
    }

    let i = intro_len(b);
    let prefix = match b.get(i) {
        Some(&c @ b'<'..=b'?') => c,
        _ => 0,
    };
    let (pa, mut i) = scan_params(b, i, MAX_DCS_PARAMS);

    let mut intermed = 0;
    while let Some(&c @ 0x20..=0x2F) = b.get(i) {
        intermed = c;
        i += 1;
    }

    let Some(&fin) = b.get(i) else {
        return (i, raw(&b[..i]));
    };
    if !(0x40..=0x7E).contains(&fin) {
        return (i, Event::unknown(SequenceKind::Dcs, &b[..i]));
    }
    i += 1;

    let start = i;
    let Some(off) = b[start..].iter().position(|c| *c == ST || *c == ESC) else {
        return (b.len(), raw(b));
    };
    let end = start + off;
    i = end + 1;
    if b[end] == ESC {
        match b.get(i) {
            Some(b'\\') => i += 1,
            None => return (b.len(), raw(b)),
            // Cut short by another sequence; leave its ESC in place.
            Some(_) => return (end, Event::Ignored(b[..end].to_vec())),
        }
    }

    let data = &b[start..end];
    let ev = match (prefix, intermed, fin) {
        (0, b'+', b'r') if pa.or(0, 0) == 1 => Some(Event::Capability(parse_termcap(data))),
        (b'>', 0, b'|') => Some(Event::TerminalVersion(
            String::from_utf8_lossy(data).into_owned(),
        )),
        (0, b'!', b'|') => Some(decode_hex(data).map_or_else(
            || {
                let mut seq = b"\x1bP!|".to_vec();
                seq.extend_from_slice(data);
                seq.extend_from_slice(b"\x1b\\");
                Event::Unknown {
                    kind: SequenceKind::Dcs,
                    bytes: seq,
                }
            },
            Event::TertiaryDeviceAttributes,
        )),
        _ => None,
    };
    (i, ev.unwrap_or_else(|| Event::unknown(SequenceKind::Dcs, &b[..i])))
}

/// XTGETTCAP reply data: hex `name=value` pairs separated by `;`.
/// Entries that fail to decode are skipped.
fn parse_termcap(data: &[u8]) -> String {
    let mut out = String::new();
    for entry in data.split(|&c| c == b';') {
        let mut kv = entry.splitn(2, |&c| c == b'=');
        let Some(name) = kv.next().and_then(decode_hex).filter(|n| !n.is_empty()) else {
            continue;
        };
        let value = match kv.next() {
            Some(v) => match decode_hex(v) {
                Some(v) => v,
                None => continue,
            },
            None => Vec::new(),
        };
        if !out.is_empty() {
            out.push(';');
        }
        out.push_str(&String::from_utf8_lossy(&name));
        if !value.is_empty() {
            out.push('=');
            out.push_str(&String::from_utf8_lossy(&value));
        }
    }
    out
}

fn decode_hex(s: &[u8]) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    s.chunks_exact(2)
        .map(|pair| {
            let hi = char::from(pair[0]).to_digit(16)?;
            let lo = char::from(pair[1]).to_digit(16)?;
            u8::try_from(hi << 4 | lo).ok()
        })
        .collect()
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mouse::MouseButton;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn decode(input: &[u8]) -> (usize, Event) {
        let mut d = EventDecoder::default();
        let (n, ev) = d.decode(input);
        (n, ev.expect("non-empty input always yields an event"))
    }

    fn key(input: &[u8]) -> Key {
        match decode(input) {
            (n, Event::KeyPress(k)) => {
                assert_eq!(n, input.len(), "consumed all of {input:?}");
                k
            }
            other => panic!("{input:?} decoded to {other:?}"),
        }
    }

    fn mouse_at(x: i32, y: i32, button: MouseButton) -> Mouse {
        Mouse {
            x,
            y,
            button,
            mods: Modifiers::empty(),
        }
    }

    // ── Parameters ──

    #[test]
    fn params_missing_and_sub() {
        let (pa, i) = scan_params(b"1;;3:4m", 0, MAX_CSI_PARAMS);
        assert_eq!(i, 6);
        assert_eq!(pa.len(), 4);
        assert_eq!(pa.get(1, 7), Some(7));
        assert_eq!(pa.get(2, 0), Some(3));
        assert!(pa.has_more(2));
        assert_eq!(pa.get(9, 0), None);
    }

    #[test]
    fn empty_buffer() {
        let mut d = EventDecoder::default();
        assert_eq!(d.decode(b""), (0, None));
    }

    // ── Keys ──

    #[test]
    fn printable_ascii() {
        let k = key(b"a");
        assert_eq!(k.code, KeyCode::Char('a'));
        assert_eq!(k.text, "a");

        let k = key(b"A");
        assert_eq!(k.code, KeyCode::Char('a'));
        assert_eq!(k.shifted_code, Some('A'));
        assert_eq!(k.mods, Modifiers::SHIFT);
        assert_eq!(k.text, "A");
    }

    #[test]
    fn control_bytes() {
        assert!(key(b"\x01").matches("ctrl+a"));
        assert_eq!(key(b"\r").code, KeyCode::Enter);
        assert_eq!(key(b"\t").code, KeyCode::Tab);
        assert_eq!(key(b"\x7f").code, KeyCode::Backspace);
        assert_eq!(key(b"\x00"), Key::with_mods(KeyCode::Space, Modifiers::CTRL));
        assert_eq!(key(b"\x1c"), Key::with_mods(KeyCode::Char('\\'), Modifiers::CTRL));
        assert_eq!(key(b" ").text, " ");
    }

    #[test]
    fn legacy_flags_pick_meanings() {
        let mut d = EventDecoder::new(LegacyFlags::CTRL_I | LegacyFlags::BACKSPACE);
        assert_eq!(
            d.decode(b"\t").1,
            Some(press(KeyCode::Char('i'), Modifiers::CTRL))
        );
        assert_eq!(d.decode(b"\x7f").1, Some(press(KeyCode::Delete, Modifiers::empty())));
        d.set_legacy(LegacyFlags::FIND);
        assert_eq!(d.decode(b"\x1b[1~").1, Some(press(KeyCode::Find, Modifiers::empty())));
    }

    #[test]
    fn key_table_can_be_dropped() {
        let d = EventDecoder::default();
        assert!(d.has_key_table());
        assert!(d.lookup(b"\x1b[A").is_some());

        let mut d = d.without_key_table();
        assert!(!d.has_key_table());
        assert_eq!(d.lookup(b"\x1b[A"), None);
        d.set_legacy(LegacyFlags::FIND);
        assert!(!d.has_key_table());
        assert_eq!(d.decode(b"\x1b[A").1, Some(press(KeyCode::Up, Modifiers::empty())));
    }

    #[test]
    fn lone_esc_follows_open_bracket_flag() {
        let ctrl_bracket = press(KeyCode::Char('['), Modifiers::CTRL);
        let mut d = EventDecoder::new(LegacyFlags::CTRL_OPEN_BRACKET);
        assert_eq!(d.decode(b"\x1b"), (1, Some(ctrl_bracket.clone())));
        assert_eq!(
            d.decode(b"\x1b\x1b"),
            (2, Some(press(KeyCode::Char('['), Modifiers::CTRL | Modifiers::ALT)))
        );
        // Still a prefix when something follows.
        assert_eq!(d.decode(b"\x1b[A").1, Some(press(KeyCode::Up, Modifiers::empty())));

        assert_eq!(decode(b"\x1b"), (1, press(KeyCode::Escape, Modifiers::empty())));
        assert_ne!(decode(b"\x1b").1, ctrl_bracket);
    }

    #[test]
    fn alt_prefix() {
        let k = key(b"\x1ba");
        assert_eq!(k.code, KeyCode::Char('a'));
        assert_eq!(k.mods, Modifiers::ALT);
        assert!(k.text.is_empty());
        assert_eq!(key(b"\x1b\x1b[A"), Key::with_mods(KeyCode::Up, Modifiers::ALT));
        assert_eq!(key(b"\x1b"), Key::new(KeyCode::Escape));
    }

    #[test]
    fn modified_cursor_keys() {
        assert_eq!(key(b"\x1b[1;5A"), Key::with_mods(KeyCode::Up, Modifiers::CTRL));
        assert_eq!(
            key(b"\x1b[1;4D"),
            Key::with_mods(KeyCode::Left, Modifiers::SHIFT | Modifiers::ALT)
        );
        assert_eq!(key(b"\x1b[Z"), Key::with_mods(KeyCode::Tab, Modifiers::SHIFT));
        assert_eq!(key(b"\x9bA"), Key::new(KeyCode::Up));
    }

    #[test]
    fn ss3_keys() {
        assert_eq!(key(b"\x1bOP"), Key::new(KeyCode::F(1)));
        assert_eq!(key(b"\x1bOa"), Key::with_mods(KeyCode::Up, Modifiers::CTRL));
        assert_eq!(key(b"\x1bO5A"), Key::with_mods(KeyCode::Up, Modifiers::CTRL));
        assert_eq!(key(b"\x1bOq"), Key::new(KeyCode::Kp(1)));
        assert_eq!(
            key(b"\x1bO"),
            Key::with_mods(KeyCode::Char('o'), Modifiers::SHIFT | Modifiers::ALT)
        );
    }

    #[test]
    fn tilde_keys() {
        assert_eq!(key(b"\x1b[3~"), Key::new(KeyCode::Delete));
        assert_eq!(key(b"\x1b[15;2~"), Key::with_mods(KeyCode::F(5), Modifiers::SHIFT));
        assert_eq!(key(b"\x1b[24~"), Key::new(KeyCode::F(12)));
        assert_eq!(key(b"\x1b[5^"), Key::with_mods(KeyCode::PageUp, Modifiers::CTRL));
        assert_eq!(key(b"\x1b[2$"), Key::with_mods(KeyCode::Insert, Modifiers::SHIFT));
    }

    #[test]
    fn modify_other_keys_sequence() {
        assert_eq!(key(b"\x1b[27;5;106~"), Key::with_mods(KeyCode::Char('j'), Modifiers::CTRL));
        let k = key(b"\x1b[27;2;65~");
        assert_eq!(k.text, "A");
        assert_eq!(key(b"\x1b[27;5;13~"), Key::with_mods(KeyCode::Enter, Modifiers::CTRL));
    }

    #[test]
    fn kitty_keys() {
        let k = key(b"\x1b[97;5u");
        assert_eq!(k.code, KeyCode::Char('a'));
        assert_eq!(k.mods, Modifiers::CTRL);
        assert!(k.text.is_empty());

        let k = key(b"\x1b[97:65;2u");
        assert_eq!(k.shifted_code, Some('A'));
        assert_eq!(k.text, "A");

        let k = key(b"\x1b[97;2u");
        assert_eq!(k.text, "A");

        assert_eq!(key(b"\x1b[57399u").text, "0");
        assert_eq!(key(b"\x1b[57441;2u").code, KeyCode::LeftShift);
        assert_eq!(key(b"\x1b[13u").code, KeyCode::Enter);
    }

    #[test]
    fn kitty_release_and_repeat() {
        match decode(b"\x1b[97;1:3u") {
            (_, Event::KeyRelease(k)) => assert_eq!(k.code, KeyCode::Char('a')),
            other => panic!("{other:?}"),
        }
        assert!(key(b"\x1b[97;1:2u").is_repeat);
        // Event type on a legacy sequence.
        match decode(b"\x1b[1;1:3A") {
            (_, Event::KeyRelease(k)) => assert_eq!(k.code, KeyCode::Up),
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn kitty_associated_text() {
        let k = key(b"\x1b[97;2;65u");
        assert_eq!(k.text, "A");
    }

    #[test]
    fn utf8_graphemes() {
        let k = key("é".as_bytes());
        assert_eq!(k.code, KeyCode::Char('é'));
        assert_eq!(k.text, "é");

        let thumbs = "👍🏽";
        let k = key(thumbs.as_bytes());
        assert_eq!(k.code, KeyCode::Extended);
        assert_eq!(k.text, thumbs);
    }

    #[test]
    fn truncated_utf8_waits() {
        let bytes = "€".as_bytes();
        assert_eq!(decode(&bytes[..2]), (1, raw(&bytes[..1])));
    }

    #[test]
    fn c1_bytes_are_ctrl_alt() {
        assert_eq!(
            key(b"\x81"),
            Key::with_mods(KeyCode::Char('A'), Modifiers::CTRL | Modifiers::ALT)
        );
    }

    // ── Mouse ──

    #[test]
    fn sgr_mouse_press_and_release() {
        assert_eq!(
            decode(b"\x1b[<0;5;10M"),
            (10, Event::MouseClick(mouse_at(4, 9, MouseButton::Left)))
        );
        assert_eq!(
            decode(b"\x1b[<0;5;10m"),
            (10, Event::MouseRelease(mouse_at(4, 9, MouseButton::Left)))
        );
        assert_eq!(
            decode(b"\x1b[<65;1;1M").1,
            Event::MouseWheel(mouse_at(0, 0, MouseButton::WheelDown))
        );
        assert_eq!(
            decode(b"\x1b[<35;3;4M").1,
            Event::MouseMotion(mouse_at(2, 3, MouseButton::None))
        );
    }

    #[test]
    fn x10_mouse_encoding() {
        assert_eq!(
            decode(b"\x1b[M\x20\x21\x21"),
            (6, Event::MouseClick(mouse_at(0, 0, MouseButton::Left)))
        );
        assert_eq!(
            decode(b"\x1b[M\x23\x2a\x25"),
            (6, Event::MouseRelease(mouse_at(9, 4, MouseButton::None)))
        );
        // Truncated payload waits.
        assert_eq!(decode(b"\x1b[M\x20"), (4, raw(b"\x1b[M\x20")));
    }

    #[test]
    fn x10_button_ordinals_follow_xterm() {
        let (x, y) = (7u8, 3u8);
        let seq = [0x1b, b'[', b'M', 0x20 + 1, 0x20 + x + 1, 0x20 + y + 1];
        assert_eq!(
            decode(&seq),
            (6, Event::MouseClick(mouse_at(7, 3, MouseButton::Middle)))
        );
        let seq = [0x1b, b'[', b'M', 0x20, 0x20 + x + 1, 0x20 + y + 1];
        assert_eq!(decode(&seq).1, Event::MouseClick(mouse_at(7, 3, MouseButton::Left)));
        let seq = [0x1b, b'[', b'M', 0x22, 0x21, 0x21];
        assert_eq!(decode(&seq).1, Event::MouseClick(mouse_at(0, 0, MouseButton::Right)));
    }

    // ── Reports ──

    #[test]
    fn cursor_position_reports() {
        assert_eq!(decode(b"\x1b[5;10R").1, Event::CursorPosition { x: 9, y: 4 });
        assert_eq!(decode(b"\x1b[?5;10R").1, Event::CursorPosition { x: 9, y: 4 });
        assert_eq!(
            decode(b"\x1b[1;5R").1,
            Event::Multi(vec![
                press(KeyCode::F(3), Modifiers::CTRL),
                Event::CursorPosition { x: 4, y: 0 },
            ])
        );
        assert_eq!(key(b"\x1b[R"), Key::new(KeyCode::F(3)));
    }

    #[test]
    fn device_attribute_reports() {
        assert_eq!(
            decode(b"\x1b[?62;22c").1,
            Event::PrimaryDeviceAttributes(vec![62, 22])
        );
        assert_eq!(
            decode(b"\x1b[>1;4000;0c").1,
            Event::SecondaryDeviceAttributes(vec![1, 4000, 0])
        );
        assert_eq!(
            decode(b"\x1bP!|7E565445\x1b\\").1,
            Event::TertiaryDeviceAttributes(vec![0x7E, 0x56, 0x54, 0x45])
        );
    }

    #[test]
    fn mode_and_flag_reports() {
        assert_eq!(
            decode(b"\x1b[?2026;2$y").1,
            Event::ModeReport {
                mode: Mode {
                    number: 2026,
                    dec: true
                },
                value: ModeSetting::Reset,
            }
        );
        assert_eq!(
            decode(b"\x1b[4;1$y").1,
            Event::ModeReport {
                mode: Mode {
                    number: 4,
                    dec: false
                },
                value: ModeSetting::Set,
            }
        );
        assert_eq!(decode(b"\x1b[?7u").1, Event::KeyboardEnhancements(7));
        assert_eq!(decode(b"\x1b[>4;2m").1, Event::ModifyOtherKeys(2));
        assert_eq!(decode(b"\x1b[?997;1n").1, Event::DarkColorScheme);
        assert_eq!(decode(b"\x1b[I").1, Event::Focus);
        assert_eq!(decode(b"\x1b[O").1, Event::Blur);
    }

    #[test]
    fn paste_markers() {
        assert_eq!(decode(b"\x1b[200~"), (6, Event::PasteStart));
        assert_eq!(decode(b"\x1b[201~"), (6, Event::PasteEnd));
    }

    #[test]
    fn window_reports() {
        assert_eq!(
            decode(b"\x1b[8;24;80t").1,
            Event::WindowSize {
                width: 80,
                height: 24
            }
        );
        assert_eq!(
            decode(b"\x1b[48;24;80;480;800t").1,
            Event::Multi(vec![
                Event::WindowSize {
                    width: 80,
                    height: 24
                },
                Event::PixelSize {
                    width: 800,
                    height: 480
                },
            ])
        );
        assert_eq!(
            decode(b"\x1b[1t").1,
            Event::WindowOp {
                op: 1,
                args: vec![]
            }
        );
    }

    #[test]
    fn osc_colors() {
        assert_eq!(
            decode(b"\x1b]11;rgb:ffff/0000/8080\x07").1,
            Event::BackgroundColor(Rgb::new(0xff, 0, 0x80))
        );
        assert_eq!(
            decode(b"\x1b]10;#abc\x1b\\").1,
            Event::ForegroundColor(Rgb::new(0xaa, 0xbb, 0xcc))
        );
        assert_eq!(
            decode(b"\x1b]11;nonsense\x07").1,
            Event::unknown(SequenceKind::Osc, b"\x1b]11;nonsense\x07")
        );
    }

    #[test]
    fn osc_clipboard() {
        assert_eq!(
            decode(b"\x1b]52;c;aGVsbG8=\x1b\\").1,
            Event::Clipboard {
                content: "hello".into(),
                selection: ClipboardSelection::System,
            }
        );
        assert_eq!(
            decode(b"\x1b]52;p;aGk=\x07").1,
            Event::Clipboard {
                content: "hi".into(),
                selection: ClipboardSelection::Primary,
            }
        );
    }

    #[test]
    fn cancelled_and_truncated_strings() {
        assert_eq!(
            decode(b"\x1b]11;foo\x18"),
            (9, Event::Ignored(b"\x1b]11;foo\x18".to_vec()))
        );
        assert_eq!(decode(b"\x1b]11;rgb:00"), (11, raw(b"\x1b]11;rgb:00")));
        assert_eq!(decode(b"\x1b]11;x\x1b"), (7, raw(b"\x1b]11;x\x1b")));
    }

    #[test]
    fn dcs_replies() {
        assert_eq!(
            decode(b"\x1bP>|kitty(0.31.0)\x1b\\").1,
            Event::TerminalVersion("kitty(0.31.0)".into())
        );
        assert_eq!(
            decode(b"\x1bP1+r5463=31;524742\x1b\\").1,
            Event::Capability("Tc=1;RGB".into())
        );
        assert_eq!(
            decode(b"\x1bP0+r5463\x1b\\").1,
            Event::unknown(SequenceKind::Dcs, b"\x1bP0+r5463\x1b\\")
        );
    }

    #[test]
    fn apc_kitty_graphics() {
        assert_eq!(
            decode(b"\x1b_Gi=31,m=1;OK\x1b\\").1,
            Event::KittyGraphics {
                options: vec![("i".into(), "31".into()), ("m".into(), "1".into())],
                payload: b"OK".to_vec(),
            }
        );
        assert_eq!(
            decode(b"\x1b_other\x1b\\").1,
            Event::unknown(SequenceKind::Apc, b"\x1b_other\x1b\\")
        );
    }

    #[test]
    fn incomplete_csi_is_raw() {
        assert_eq!(decode(b"\x1b[1;5"), (5, raw(b"\x1b[1;5")));
        assert_eq!(
            decode(b"\x1b[1;5\x01"),
            (5, Event::unknown(SequenceKind::Csi, b"\x1b[1;5"))
        );
        assert_eq!(decode(b"\x1b["), (2, alt_key(b'[')));
    }

    #[test]
    fn unknown_csi_is_consumed() {
        assert_eq!(
            decode(b"\x1b[5xa"),
            (4, Event::unknown(SequenceKind::Csi, b"\x1b[5x"))
        );
    }

    #[test]
    fn win32_input_mode_key() {
        match decode(b"\x1b[65;30;97;1;0;1_") {
            (17, Event::KeyPress(k)) => {
                assert_eq!(k.code, KeyCode::Char('a'));
                assert_eq!(k.text, "a");
            }
            other => panic!("{other:?}"),
        }
        match decode(b"\x1b[65;30;97;1;0;3_") {
            (_, Event::Multi(evs)) => assert_eq!(evs.len(), 3),
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn xcolor_forms() {
        assert_eq!(parse_xcolor(b"#fff"), Some(Rgb::new(255, 255, 255)));
        assert_eq!(parse_xcolor(b"#102030"), Some(Rgb::new(0x10, 0x20, 0x30)));
        assert_eq!(parse_xcolor(b"rgb:f/80/abc"), Some(Rgb::new(0xff, 0x80, 0xab)));
        assert_eq!(parse_xcolor(b"#12"), None);
        assert_eq!(parse_xcolor(b"rgb:1/2"), None);
    }

    proptest! {
        #[test]
        fn decode_is_total(bytes in proptest::collection::vec(any::<u8>(), 1..64)) {
            let mut d = EventDecoder::default();
            let (n, ev) = d.decode(&bytes);
            prop_assert!(ev.is_some());
            prop_assert!(n >= 1 && n <= bytes.len());
        }

        #[test]
        fn decode_is_total_on_escape_soup(
            bytes in proptest::collection::vec(
                prop::sample::select(b"\x1b[]PO_^X;:<?$~0159Mmu\x07\x9b\x9c\\".to_vec()),
                1..32,
            )
        ) {
            let mut d = EventDecoder::default();
            let mut rest = bytes.as_slice();
            while !rest.is_empty() {
                let (n, _) = d.decode(rest);
                prop_assert!(n >= 1 && n <= rest.len());
                rest = &rest[n..];
            }
        }
    }
}
