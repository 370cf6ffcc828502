// SPDX-License-Identifier: MIT
//
// Buffered event scanning.
//
// The scanner sits between raw reads and the decoder. It owns the byte
// buffer, so a sequence split across two reads is decoded once the rest
// arrives, and it owns the stream-level state the decoder doesn't:
//
// - ESC timeout: `ESC`, `ESC [`, `ESC O`... are both complete keys and
//   sequence prefixes. Until the caller says the timeout has expired,
//   short escape-led keys and incomplete sequences stay buffered.
// - Bracketed paste: between PasteStart and PasteEnd every key's text is
//   collected into one Paste event instead of being reported as keys.
// - Win32 normalization: zero-virtual-key records (IME input, pasted
//   text, surrogate pairs) are reassembled into UTF-8 text before
//   decoding; console records are serialized into the same escape form
//   the terminal's win32-input-mode would send.
//
// Each call to `scan` decodes as much of the buffer as it can and keeps
// the unconsumed tail for the next call.

use crate::decoder::{ESC, EventDecoder};
use crate::event::{Event, SequenceKind};
use crate::key::KeyCode;
use crate::win32::{ConsoleRecord, GraphemeAssembler, RecordEncoder};

/// Stream-level input scanner.
#[derive(Debug, Clone, Default)]
pub struct EventScanner {
    decoder: EventDecoder,
    buf: Vec<u8>,
    /// Paste contents while a bracketed paste is open.
    paste: Option<Vec<u8>>,
    graphemes: GraphemeAssembler,
    records: RecordEncoder,
}

impl EventScanner {
    #[must_use]
    pub fn new(decoder: EventDecoder) -> Self {
        Self {
            decoder,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn decoder(&self) -> &EventDecoder {
        &self.decoder
    }

    pub const fn decoder_mut(&mut self) -> &mut EventDecoder {
        &mut self.decoder
    }

    /// Append raw terminal bytes.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Append console input records, serialized to escape sequences.
    pub fn feed_records(&mut self, records: &[ConsoleRecord]) {
        for rec in records {
            self.records.encode(rec, &mut self.buf);
        }
    }

    /// Whether undecoded bytes are buffered.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.buf.is_empty()
    }

    /// Whether a bracketed paste is open.
    #[must_use]
    pub const fn is_pasting(&self) -> bool {
        self.paste.is_some()
    }

    /// Decode everything that can be decoded now. Pass `expired = true`
    /// once the ESC timeout has elapsed to force ambiguous and
    /// incomplete input out.
    pub fn scan(&mut self, expired: bool) -> Vec<Event> {
        self.normalize_win32();
        let mut events = Vec::new();
        if self.buf.is_empty() {
            return events;
        }

        // A whole-buffer literal match settles ambiguous prefixes early.
        if self.paste.is_none() && self.buf.len() > 2 && self.buf[0] == ESC {
            if let Some(k) = self.decoder.lookup(&self.buf) {
                events.push(Event::KeyPress(k.clone()));
                self.buf.clear();
                return events;
            }
        }

        let mut pos = 0;
        while pos < self.buf.len() {
            let rest = &self.buf[pos..];
            let esc = rest[0] == ESC;
            let (n, ev) = self.decoder.decode(rest);
            let Some(ev) = ev else { break };
            let n = n.max(1);
            let short_esc = esc && n <= 2 && !expired;

            if let Some(paste) = self.paste.as_mut() {
                if ev != Event::PasteEnd {
                    match ev {
                        Event::KeyPress(k) if !k.text.is_empty() => {
                            paste.extend_from_slice(k.text.as_bytes());
                        }
                        Event::KeyPress(k) => {
                            let seq = &rest[..n];
                            let win32 = seq.starts_with(b"\x1b[") && seq.ends_with(b"_");
                            let literal = Some(k.code) == k.base_code;
                            if win32 && literal && k.code == KeyCode::Enter {
                                paste.push(b'\n');
                            } else if win32 && literal {
                                if let Some(c) = k.code.as_char().filter(|c| c.is_control()) {
                                    let mut tmp = [0; 4];
                                    paste.extend_from_slice(c.encode_utf8(&mut tmp).as_bytes());
                                }
                            } else if !win32 {
                                if short_esc {
                                    break;
                                }
                                paste.extend_from_slice(seq);
                            }
                        }
                        Event::Multi(evs) => {
                            for e in evs {
                                if let Event::KeyPress(k) = e {
                                    paste.extend_from_slice(k.text.as_bytes());
                                }
                            }
                        }
                        Event::Unknown {
                            kind: SequenceKind::Raw,
                            ..
                        } if !expired => break,
                        _ => {}
                    }
                    pos += n;
                    continue;
                }
            }

            match ev {
                Event::Ignored(_) => {}
                Event::Unknown {
                    kind: SequenceKind::Raw,
                    bytes,
                } => {
                    if !expired {
                        break;
                    }
                    if let Some(k) = self.decoder.lookup(&rest[..n]) {
                        events.push(Event::KeyPress(k.clone()));
                    } else {
                        tracing::trace!(
                            bytes = ?String::from_utf8_lossy(&bytes),
                            "flushing undecodable input"
                        );
                        events.push(Event::Unknown {
                            kind: SequenceKind::Raw,
                            bytes,
                        });
                    }
                }
                ev => {
                    if short_esc {
                        break;
                    }
                    match ev {
                        Event::PasteStart => self.paste = Some(Vec::new()),
                        Event::PasteEnd => {
                            let bytes = self.paste.take().unwrap_or_default();
                            let text: String = String::from_utf8_lossy(&bytes)
                                .chars()
                                .filter(|c| *c != char::REPLACEMENT_CHARACTER)
                                .collect();
                            events.push(Event::Paste(text));
                        }
                        Event::Unknown { ref kind, ref bytes } => {
                            tracing::trace!(
                                ?kind,
                                bytes = ?String::from_utf8_lossy(bytes),
                                "unrecognized sequence"
                            );
                        }
                        _ => {}
                    }
                    match ev {
                        Event::Multi(evs) => events.extend(evs),
                        ev => events.push(ev),
                    }
                }
            }
            pos += n;
        }

        self.buf.drain(..pos);
        events
    }

    /// Decode everything, treating the ESC timeout as expired.
    pub fn flush(&mut self) -> Vec<Event> {
        self.scan(true)
    }

    /// Fold zero-virtual-key win32 records into text.
    ///
    /// Windows delivers IME and pasted input as key records with no
    /// virtual key, one UTF-16 unit each. Those records are removed and
    /// their text reinserted in place: key-downs as UTF-8, key-ups as
    /// Kitty release sequences.
    fn normalize_win32(&mut self) {
        if !self.buf.contains(&b'_') && self.graphemes.is_empty() {
            return;
        }

        let b = &self.buf;
        let mut out = Vec::with_capacity(b.len());
        let mut i = 0;
        while i < b.len() {
            match csi_span(&b[i..]) {
                CsiSpan::Complete(len) => {
                    let seq = &b[i..i + len];
                    if let Some((down, unit)) = text_record(seq) {
                        if unit != 0 {
                            self.graphemes.push(down, unit);
                        }
                    } else {
                        self.graphemes.drain_into(&mut out);
                        out.extend_from_slice(seq);
                    }
                    i += len;
                }
                CsiSpan::Incomplete => {
                    self.graphemes.drain_into(&mut out);
                    out.extend_from_slice(&b[i..]);
                    i = b.len();
                }
                CsiSpan::NotCsi => {
                    self.graphemes.drain_into(&mut out);
                    out.push(b[i]);
                    i += 1;
                }
            }
        }
        self.graphemes.drain_into(&mut out);
        self.buf = out;
    }
}

enum CsiSpan {
    NotCsi,
    Incomplete,
    Complete(usize),
}

/// Extent of a 7-bit CSI sequence at the start of `b`.
fn csi_span(b: &[u8]) -> CsiSpan {
    if !b.starts_with(b"\x1b[") {
        return if b == [ESC] {
            CsiSpan::Incomplete
        } else {
            CsiSpan::NotCsi
        };
    }
    match b[2..].iter().position(|c| !(0x20..=0x3F).contains(c)) {
        None => CsiSpan::Incomplete,
        Some(off) if (0x40..=0x7E).contains(&b[2 + off]) => CsiSpan::Complete(off + 3),
        Some(_) => CsiSpan::NotCsi,
    }
}

/// `(key_down, utf16_unit)` for a win32-input-mode record with no
/// virtual key: `CSI 0 ; sc ; uc ; kd ; cs ; rc _`.
fn text_record(seq: &[u8]) -> Option<(bool, u16)> {
    let body = seq.strip_prefix(b"\x1b[")?.strip_suffix(b"_")?;
    let fields = body
        .split(|&c| c == b';')
        .map(|f| {
            if f.is_empty() {
                Some(0)
            } else {
                std::str::from_utf8(f).ok()?.parse::<u32>().ok()
            }
        })
        .collect::<Option<Vec<u32>>>()?;
    if fields.len() != 6 || fields[0] != 0 {
        return None;
    }
    let unit = u16::try_from(fields[2]).ok()?;
    Some((fields[3] >= 1, unit))
}

// ─── Tests ──────────────────────────────────────────────────────────────────
