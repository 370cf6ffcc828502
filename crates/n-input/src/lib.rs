// SPDX-License-Identifier: MIT
//
// n-input — terminal input decoding for n-vt.
//
// Raw bytes from a terminal (or records from a Windows console) go in;
// typed events come out. Two layers:
//
// - `EventDecoder` decodes exactly one event from the front of a byte
//   slice: VT100/VT220 keys, XTerm modifier forms, URxvt variants, Kitty
//   keyboard protocol, SGR and X10 mouse, win32-input-mode records, and
//   the terminal's own replies (cursor position, device attributes,
//   colors, clipboard, capabilities...).
// - `EventScanner` owns the byte stream: it buffers split sequences,
//   resolves the ESC-key ambiguity with a caller-driven timeout,
//   assembles bracketed pastes, and normalizes Windows console input.
//
// Nothing here touches the terminal itself; reading and polling live in
// n-term.

pub mod decoder;
pub mod event;
pub mod key;
pub mod key_table;
pub mod mouse;
pub mod scanner;
pub mod win32;

pub use decoder::{EventDecoder, LegacyFlags};
pub use event::{ClipboardSelection, Event, Mode, ModeSetting, Rgb, SequenceKind};
pub use key::{Key, KeyCode, Modifiers};
pub use key_table::KeyTable;
pub use mouse::{Mouse, MouseButton};
pub use scanner::EventScanner;
pub use win32::{ConsoleRecord, KeyRecord, MouseRecord};
