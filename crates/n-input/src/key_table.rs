// SPDX-License-Identifier: MIT
//
// Literal sequence → key lookup table.
//
// A flat map from exact byte strings to keys: the C0 controls, the
// VT100/VT220 cursor and editing keys, URxvt's `$ ^ @` shift/ctrl
// variants, and every XTerm `1 + modifier` permutation of the CSI, SS3
// and `~` families, each also in its ESC-prefixed alt form. The scanner
// consults it before running the general decoder on a complete buffer;
// every entry agrees with what the decoder would produce, so the table
// only saves work.
//
// Tables depend on the legacy-encoding flags alone, so one table per
// flag set is built lazily and shared for the life of the process.
// Capability-database entries (`kcuu1`, `kf13`, ...) can be layered on
// top with [`KeyTable::with_capabilities`], which builds a private copy.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::decoder::LegacyFlags;
use crate::key::{Key, KeyCode, Modifiers};

/// Exact-match sequence table.
#[derive(Debug, Clone, Default)]
pub struct KeyTable {
    map: HashMap<Vec<u8>, Key>,
}

impl KeyTable {
    /// Build a fresh table for the given legacy flags.
    #[must_use]
    pub fn build(legacy: LegacyFlags) -> Self {
        let mut t = Self::default();
        t.add_defaults(legacy);
        t
    }

    /// The process-wide table for `legacy`, built on first use.
    #[must_use]
    pub fn shared(legacy: LegacyFlags) -> Arc<Self> {
        static TABLES: OnceLock<Mutex<HashMap<u8, Arc<KeyTable>>>> = OnceLock::new();
        let tables = TABLES.get_or_init(|| Mutex::new(HashMap::new()));
        let mut guard = tables.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            guard
                .entry(legacy.bits())
                .or_insert_with(|| Arc::new(Self::build(legacy))),
        )
    }

    /// Defaults plus key sequences from a terminal capability database,
    /// given as `(capability name, sequence)` pairs. Unknown names and
    /// non-key capabilities are skipped.
    #[must_use]
    pub fn with_capabilities<I, N, S>(legacy: LegacyFlags, caps: I) -> Self
    where
        I: IntoIterator<Item = (N, S)>,
        N: AsRef<str>,
        S: AsRef<[u8]>,
    {
        let mut t = Self::build(legacy);
        for (name, seq) in caps {
            let (name, seq) = (name.as_ref(), seq.as_ref());
            if !name.starts_with('k') || seq.is_empty() {
                continue;
            }
            if let Some(key) = capability_key(name, legacy) {
                t.map.insert(seq.to_vec(), key);
            }
        }
        t
    }

    /// Look up an exact sequence.
    #[must_use]
    pub fn get(&self, seq: &[u8]) -> Option<&Key> {
        self.map.get(seq)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn put(&mut self, seq: impl Into<Vec<u8>>, key: Key) {
        self.map.insert(seq.into(), key);
    }

    fn add_defaults(&mut self, legacy: LegacyFlags) {
        let ctrl = |c: char| Key::with_mods(KeyCode::Char(c), Modifiers::CTRL);
        let plain = Key::new;
        let pick = |flag: LegacyFlags, yes: Key, no: Key| {
            if legacy.contains(flag) {
                yes
            } else {
                no
            }
        };

        let nul = pick(
            LegacyFlags::CTRL_AT,
            ctrl('@'),
            Key::with_mods(KeyCode::Space, Modifiers::CTRL),
        );
        let tab = pick(LegacyFlags::CTRL_I, ctrl('i'), plain(KeyCode::Tab));
        let enter = pick(LegacyFlags::CTRL_M, ctrl('m'), plain(KeyCode::Enter));
        let esc = pick(
            LegacyFlags::CTRL_OPEN_BRACKET,
            ctrl('['),
            plain(KeyCode::Escape),
        );
        let del = pick(
            LegacyFlags::BACKSPACE,
            plain(KeyCode::Delete),
            plain(KeyCode::Backspace),
        );
        let find = pick(LegacyFlags::FIND, plain(KeyCode::Find), plain(KeyCode::Home));
        let select = pick(LegacyFlags::SELECT, plain(KeyCode::Select), plain(KeyCode::End));

        // ── C0 ──
        self.put([0x00], nul);
        for b in 0x01..=0x1Au8 {
            let key = match b {
                0x08 => ctrl('h'),
                0x09 => tab.clone(),
                0x0D => enter.clone(),
                _ => ctrl(char::from(b + 0x60)),
            };
            self.put([b], key);
        }
        self.put([0x1B], esc);
        for b in 0x1C..=0x1Fu8 {
            self.put([b], ctrl(char::from(b + 0x40)));
        }
        self.put([b' '], Key::char(' '));
        self.put([0x7F], del);

        // ── CSI / SS3 letters ──
        let letters: [(u8, KeyCode); 11] = [
            (b'A', KeyCode::Up),
            (b'B', KeyCode::Down),
            (b'C', KeyCode::Right),
            (b'D', KeyCode::Left),
            (b'E', KeyCode::Begin),
            (b'F', KeyCode::End),
            (b'H', KeyCode::Home),
            (b'P', KeyCode::F(1)),
            (b'Q', KeyCode::F(2)),
            (b'R', KeyCode::F(3)),
            (b'S', KeyCode::F(4)),
        ];
        for (c, code) in letters {
            self.put([0x1B, b'[', c], plain(code));
            self.put([0x1B, b'O', c], plain(code));
        }
        self.put(*b"\x1b[Z", Key::with_mods(KeyCode::Tab, Modifiers::SHIFT));

        let arrows = [KeyCode::Up, KeyCode::Down, KeyCode::Right, KeyCode::Left];
        for (i, code) in arrows.into_iter().enumerate() {
            let off = u8::try_from(i).unwrap_or(0);
            self.put([0x1B, b'[', b'a' + off], Key::with_mods(code, Modifiers::SHIFT));
            self.put([0x1B, b'O', b'a' + off], Key::with_mods(code, Modifiers::CTRL));
        }

        // ── SS3 keypad ──
        let keypad = ss3_keypad();
        for (c, code) in &keypad {
            self.put([0x1B, b'O', *c], plain(*code));
        }

        // ── CSI ~ and the URxvt variants ──
        let tilde = tilde_keys(&find, &select);
        for (n, key) in &tilde {
            self.put(format!("\x1b[{n}~"), key.clone());
            let urxvt = [
                ('$', Modifiers::SHIFT),
                ('^', Modifiers::CTRL),
                ('@', Modifiers::CTRL | Modifiers::SHIFT),
            ];
            for (suffix, mods) in urxvt {
                let mut k = key.clone();
                k.mods = mods;
                self.put(format!("\x1b[{n}{suffix}"), k);
            }
        }

        // ── Alt: ESC-prefixed copies of everything so far ──
        let alts: Vec<(Vec<u8>, Key)> = self
            .map
            .iter()
            .map(|(seq, key)| {
                let mut s = Vec::with_capacity(seq.len() + 1);
                s.push(0x1B);
                s.extend_from_slice(seq);
                let mut k = key.clone();
                k.mods |= Modifiers::ALT;
                k.text.clear();
                (s, k)
            })
            .collect();
        self.map.extend(alts);

        // ── XTerm modifier permutations ──
        let other_keys = [
            (0x08, KeyCode::Backspace),
            (0x09, KeyCode::Tab),
            (0x0D, KeyCode::Enter),
            (0x1B, KeyCode::Escape),
            (0x7F, KeyCode::Backspace),
        ];
        for bits in 1..=15u16 {
            let mods = Modifiers::from_bits_truncate(bits);
            let xmod = bits + 1;
            // `CSI 1 ; m R` doubles as a cursor position report; the
            // decoder reports both readings.
            for (c, code) in letters.into_iter().filter(|(c, _)| *c != b'R') {
                self.put(
                    format!("\x1b[1;{xmod}{}", char::from(c)),
                    Key::with_mods(code, mods),
                );
            }
            for (c, code) in &keypad {
                self.put(
                    format!("\x1bO{xmod}{}", char::from(*c)),
                    Key::with_mods(*code, mods),
                );
            }
            for (n, key) in &tilde {
                let mut k = key.clone();
                k.mods = mods;
                self.put(format!("\x1b[{n};{xmod}~"), k);
            }
            for (n, code) in other_keys {
                self.put(format!("\x1b[27;{xmod};{n}~"), Key::with_mods(code, mods));
            }
        }
    }
}

fn ss3_keypad() -> [(u8, KeyCode); 18] {
    [
        (b'M', KeyCode::KpEnter),
        (b'X', KeyCode::KpEqual),
        (b'j', KeyCode::KpMultiply),
        (b'k', KeyCode::KpPlus),
        (b'l', KeyCode::KpComma),
        (b'm', KeyCode::KpMinus),
        (b'n', KeyCode::KpDecimal),
        (b'o', KeyCode::KpDivide),
        (b'p', KeyCode::Kp(0)),
        (b'q', KeyCode::Kp(1)),
        (b'r', KeyCode::Kp(2)),
        (b's', KeyCode::Kp(3)),
        (b't', KeyCode::Kp(4)),
        (b'u', KeyCode::Kp(5)),
        (b'v', KeyCode::Kp(6)),
        (b'w', KeyCode::Kp(7)),
        (b'x', KeyCode::Kp(8)),
        (b'y', KeyCode::Kp(9)),
    ]
}

fn tilde_keys(find: &Key, select: &Key) -> Vec<(u8, Key)> {
    let mut keys = vec![
        (1, find.clone()),
        (2, Key::new(KeyCode::Insert)),
        (3, Key::new(KeyCode::Delete)),
        (4, select.clone()),
        (5, Key::new(KeyCode::PageUp)),
        (6, Key::new(KeyCode::PageDown)),
        (7, Key::new(KeyCode::Home)),
        (8, Key::new(KeyCode::End)),
    ];
    let fkeys: [(u8, u8); 20] = [
        (11, 1),
        (12, 2),
        (13, 3),
        (14, 4),
        (15, 5),
        (17, 6),
        (18, 7),
        (19, 8),
        (20, 9),
        (21, 10),
        (23, 11),
        (24, 12),
        (25, 13),
        (26, 14),
        (28, 15),
        (29, 16),
        (31, 17),
        (32, 18),
        (33, 19),
        (34, 20),
    ];
    keys.extend(fkeys.iter().map(|&(n, f)| (n, Key::new(KeyCode::F(f)))));
    keys
}

/// Key for a terminfo-style capability name.
///
/// Modified cursor keys use the `kUP5`-style suffix, which is the xterm
/// modifier parameter (no suffix meaning shift). Function keys past F12
/// fold onto modified F1–F12 unless [`LegacyFlags::FKEYS`] is set.
fn capability_key(name: &str, legacy: LegacyFlags) -> Option<Key> {
    let simple = match name {
        "kcuu1" => Some(KeyCode::Up),
        "kcud1" => Some(KeyCode::Down),
        "kcub1" => Some(KeyCode::Left),
        "kcuf1" => Some(KeyCode::Right),
        "kich1" => Some(KeyCode::Insert),
        "kdch1" => Some(KeyCode::Delete),
        "khome" => Some(KeyCode::Home),
        "kend" => Some(KeyCode::End),
        "kpp" | "kprv" => Some(KeyCode::PageUp),
        "knp" | "knxt" => Some(KeyCode::PageDown),
        "kbs" => Some(KeyCode::Backspace),
        _ => None,
    };
    if let Some(code) = simple {
        return Some(Key::new(code));
    }
    if name == "kcbt" {
        return Some(Key::with_mods(KeyCode::Tab, Modifiers::SHIFT));
    }

    if let Some(n) = name.strip_prefix("kf").and_then(|n| n.parse::<u8>().ok()) {
        if !(1..=63).contains(&n) {
            return None;
        }
        if legacy.contains(LegacyFlags::FKEYS) || n <= 12 {
            return Some(Key::new(KeyCode::F(n)));
        }
        let groups = [
            Modifiers::SHIFT,
            Modifiers::CTRL,
            Modifiers::SHIFT | Modifiers::CTRL,
            Modifiers::ALT,
            Modifiers::SHIFT | Modifiers::ALT,
        ];
        let idx = usize::from((n - 1) / 12) - 1;
        let mods = *groups.get(idx)?;
        return Some(Key::with_mods(KeyCode::F((n - 1) % 12 + 1), mods));
    }

    let families = [
        ("kUP", KeyCode::Up),
        ("kDN", KeyCode::Down),
        ("kLFT", KeyCode::Left),
        ("kRIT", KeyCode::Right),
        ("kIC", KeyCode::Insert),
        ("kDC", KeyCode::Delete),
        ("kHOM", KeyCode::Home),
        ("kEND", KeyCode::End),
        ("kPRV", KeyCode::PageUp),
        ("kNXT", KeyCode::PageDown),
    ];
    for (prefix, code) in families {
        let Some(suffix) = name.strip_prefix(prefix) else {
            continue;
        };
        let mods = match suffix {
            "" => Modifiers::SHIFT,
            s => match s.parse::<i32>() {
                Ok(p @ 3..=8) => Modifiers::from_xterm(p),
                _ => return None,
            },
        };
        return Some(Key::with_mods(code, mods));
    }
    None
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::EventDecoder;
    use crate::event::Event;
    use pretty_assertions::assert_eq;

    fn table() -> KeyTable {
        KeyTable::build(LegacyFlags::empty())
    }

    #[test]
    fn cursor_keys() {
        let t = table();
        assert_eq!(t.get(b"\x1b[A"), Some(&Key::new(KeyCode::Up)));
        assert_eq!(t.get(b"\x1bOD"), Some(&Key::new(KeyCode::Left)));
        assert_eq!(
            t.get(b"\x1b[1;5C"),
            Some(&Key::with_mods(KeyCode::Right, Modifiers::CTRL))
        );
    }

    #[test]
    fn alt_prefixed_copies() {
        let t = table();
        assert_eq!(
            t.get(b"\x1b\x1b[A"),
            Some(&Key::with_mods(KeyCode::Up, Modifiers::ALT))
        );
        let space = t.get(b"\x1b ").unwrap();
        assert_eq!(space.mods, Modifiers::ALT);
        assert!(space.text.is_empty());
    }

    #[test]
    fn urxvt_variants() {
        let t = table();
        assert_eq!(
            t.get(b"\x1b[3$"),
            Some(&Key::with_mods(KeyCode::Delete, Modifiers::SHIFT))
        );
        assert_eq!(
            t.get(b"\x1b[11@"),
            Some(&Key::with_mods(KeyCode::F(1), Modifiers::CTRL | Modifiers::SHIFT))
        );
    }

    #[test]
    fn legacy_flags_change_entries() {
        let t = KeyTable::build(LegacyFlags::FIND | LegacyFlags::BACKSPACE);
        assert_eq!(t.get(b"\x1b[1~"), Some(&Key::new(KeyCode::Find)));
        assert_eq!(t.get(b"\x7f"), Some(&Key::new(KeyCode::Delete)));
    }

    #[test]
    fn shared_tables_are_reused() {
        let a = KeyTable::shared(LegacyFlags::empty());
        let b = KeyTable::shared(LegacyFlags::empty());
        assert!(Arc::ptr_eq(&a, &b));
        let c = KeyTable::shared(LegacyFlags::CTRL_I);
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn capability_entries() {
        let caps = [
            ("kcuu1", b"\x1bOA".as_slice()),
            ("kf15", b"\x1b[28~".as_slice()),
            ("kUP5", b"\x1b[1;5A".as_slice()),
            ("colors", b"256".as_slice()),
        ];
        let t = KeyTable::with_capabilities(LegacyFlags::empty(), caps);
        assert_eq!(
            t.get(b"\x1b[28~"),
            Some(&Key::with_mods(KeyCode::F(3), Modifiers::SHIFT))
        );
        assert_eq!(t.get(b"256"), None);

        let t = KeyTable::with_capabilities(LegacyFlags::FKEYS, [("kf15", "\x1b[28~")]);
        assert_eq!(t.get(b"\x1b[28~"), Some(&Key::new(KeyCode::F(15))));
    }

    #[test]
    fn capability_name_folding() {
        let f = |n| capability_key(n, LegacyFlags::empty());
        assert_eq!(f("kf25"), Some(Key::with_mods(KeyCode::F(1), Modifiers::CTRL)));
        assert_eq!(f("kf63"), Some(Key::with_mods(KeyCode::F(3), Modifiers::SHIFT | Modifiers::ALT)));
        assert_eq!(f("kDN"), Some(Key::with_mods(KeyCode::Down, Modifiers::SHIFT)));
        assert_eq!(f("kDC7"), Some(Key::with_mods(KeyCode::Delete, Modifiers::ALT | Modifiers::CTRL)));
        assert_eq!(f("kf64"), None);
        assert_eq!(f("kUP9"), None);
    }

    fn assert_agrees_with_decoder(legacy: LegacyFlags) {
        let t = KeyTable::build(legacy);
        let mut d = EventDecoder::new(legacy);
        for (seq, key) in &t.map {
            let (n, ev) = d.decode(seq);
            assert_eq!(n, seq.len(), "length for {seq:?}");
            let decoded = match ev {
                Some(Event::KeyPress(k)) => k,
                Some(Event::Multi(evs)) => match evs.first() {
                    Some(Event::KeyPress(k)) => k.clone(),
                    other => panic!("{seq:?} decoded to {other:?}"),
                },
                other => panic!("{seq:?} decoded to {other:?}"),
            };
            assert_eq!(decoded.code, key.code, "code for {seq:?}");
            assert_eq!(decoded.mods, key.mods, "mods for {seq:?}");
        }
    }

    #[test]
    fn every_escape_entry_agrees_with_decoder() {
        assert_agrees_with_decoder(LegacyFlags::empty());
    }

    #[test]
    fn entries_agree_with_decoder_under_every_legacy_flag() {
        assert_agrees_with_decoder(LegacyFlags::all());
        let t = KeyTable::build(LegacyFlags::all());
        assert_eq!(
            t.get(b"\x1b"),
            Some(&Key::with_mods(KeyCode::Char('['), Modifiers::CTRL))
        );
    }
}
