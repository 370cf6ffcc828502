// SPDX-License-Identifier: MIT
//
// Configuration — environment lookup and session settings.
//
// `Environ` is a snapshot of `KEY=VALUE` strings rather than live process
// state, so color detection and capability selection can be tested
// without touching the real environment. `Config` gathers every knob a
// session needs in one plain struct with sensible defaults.

use std::time::Duration;

use n_input::{EventDecoder, EventScanner, LegacyFlags};

use crate::ansi::{KeyboardEnhancements, MouseMode};
use crate::caps::Capabilities;
use crate::color::ColorProfile;

// ─── Environ ─────────────────────────────────────────────────────────────────

/// A list of `KEY=VALUE` environment entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environ(Vec<String>);

impl Environ {
    #[must_use]
    pub const fn new(vars: Vec<String>) -> Self {
        Self(vars)
    }

    /// Snapshot of the current process environment. Entries that aren't
    /// valid UTF-8 are skipped.
    #[must_use]
    pub fn from_process() -> Self {
        Self(
            std::env::vars_os()
                .filter_map(|(k, v)| Some(format!("{}={}", k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        )
    }

    /// The value of `key`. When a key appears more than once, the last
    /// entry wins.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().rev().find_map(|entry| {
            let (k, v) = entry.split_once('=')?;
            (k == key).then_some(v)
        })
    }

    /// Like [`get`](Self::get) but empty when unset.
    #[must_use]
    pub fn var(&self, key: &str) -> &str {
        self.get(key).unwrap_or_default()
    }
}

impl<S: Into<String>> FromIterator<S> for Environ {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

// ─── Config ──────────────────────────────────────────────────────────────────

/// How long a lone ESC waits for the rest of a sequence.
pub const DEFAULT_ESC_TIMEOUT: Duration = Duration::from_millis(50);

/// Default event-loop tick (roughly 120 Hz).
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_micros(8333);

/// Session settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Terminal type, normally `$TERM`.
    pub term: String,
    /// Colors are downsampled to this profile before output.
    pub color_profile: ColorProfile,
    /// ESC disambiguation timeout.
    pub esc_timeout: Duration,
    /// Legacy key-encoding choices for the decoder.
    pub legacy: LegacyFlags,
    /// Whether the decoder tries the literal lookup table first.
    pub use_key_table: bool,
    /// Event-loop tick interval.
    pub tick_interval: Duration,
    /// Start in the alternate screen.
    pub alt_screen: bool,
    pub mouse_mode: MouseMode,
    pub bracketed_paste: bool,
    pub keyboard_enhancements: KeyboardEnhancements,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            term: String::new(),
            color_profile: ColorProfile::default(),
            esc_timeout: DEFAULT_ESC_TIMEOUT,
            legacy: LegacyFlags::empty(),
            use_key_table: true,
            tick_interval: DEFAULT_TICK_INTERVAL,
            alt_screen: false,
            mouse_mode: MouseMode::None,
            bracketed_paste: true,
            keyboard_enhancements: KeyboardEnhancements::DISAMBIGUATE_ESCAPE_CODES,
        }
    }
}

impl Config {
    /// Defaults adjusted for the given environment.
    ///
    /// Reads `TERM`, the color variables (`NO_COLOR`, `COLORTERM`), and
    /// `N_VT_ESC_TIMEOUT` (milliseconds). `is_tty` says whether output is a
    /// terminal at all.
    #[must_use]
    pub fn from_env(env: &Environ, is_tty: bool) -> Self {
        let term = env.var("TERM").to_string();
        let esc_timeout = env
            .get("N_VT_ESC_TIMEOUT")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map_or(DEFAULT_ESC_TIMEOUT, Duration::from_millis);

        Self {
            color_profile: ColorProfile::detect(env, is_tty),
            esc_timeout,
            term,
            ..Self::default()
        }
    }

    /// The capability profile implied by [`term`](Self::term).
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        Capabilities::for_term(&self.term)
    }

    /// A scanner built with these settings.
    #[must_use]
    pub fn scanner(&self) -> EventScanner {
        let decoder = EventDecoder::new(self.legacy);
        if self.use_key_table {
            EventScanner::new(decoder)
        } else {
            EventScanner::new(decoder.without_key_table())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn env(vars: &[&str]) -> Environ {
        vars.iter().copied().collect()
    }

    // ── Environ ─────────────────────────────────────────────────────────

    #[test]
    fn get_finds_values() {
        let e = env(&["TERM=xterm", "EMPTY=", "EQ=a=b"]);
        assert_eq!(e.get("TERM"), Some("xterm"));
        assert_eq!(e.get("EMPTY"), Some(""));
        assert_eq!(e.get("EQ"), Some("a=b"));
        assert_eq!(e.get("MISSING"), None);
        assert_eq!(e.var("MISSING"), "");
    }

    #[test]
    fn last_entry_wins() {
        let e = env(&["TERM=xterm", "TERM=kitty"]);
        assert_eq!(e.get("TERM"), Some("kitty"));
    }

    #[test]
    fn malformed_entries_are_ignored() {
        let e = env(&["garbage", "TERM=vt100"]);
        assert_eq!(e.get("garbage"), None);
        assert_eq!(e.get("TERM"), Some("vt100"));
    }

    // ── Config ──────────────────────────────────────────────────────────

    #[test]
    fn defaults() {
        let c = Config::default();
        assert_eq!(c.esc_timeout, Duration::from_millis(50));
        assert_eq!(c.mouse_mode, MouseMode::None);
        assert!(c.bracketed_paste);
        assert!(!c.alt_screen);
    }

    #[test]
    fn from_env_reads_term_and_colors() {
        let c = Config::from_env(&env(&["TERM=xterm-256color"]), true);
        assert_eq!(c.term, "xterm-256color");
        assert_eq!(c.color_profile, ColorProfile::Ansi256);
        assert!(!c.capabilities().contains(Capabilities::REP));
    }

    #[test]
    fn from_env_without_tty() {
        let c = Config::from_env(&env(&["TERM=kitty"]), false);
        assert_eq!(c.color_profile, ColorProfile::NoTty);
    }

    #[test]
    fn esc_timeout_override() {
        let c = Config::from_env(&env(&["N_VT_ESC_TIMEOUT=120"]), true);
        assert_eq!(c.esc_timeout, Duration::from_millis(120));
        let c = Config::from_env(&env(&["N_VT_ESC_TIMEOUT=soon"]), true);
        assert_eq!(c.esc_timeout, DEFAULT_ESC_TIMEOUT);
    }

    #[test]
    fn scanner_decodes_with_settings() {
        let mut s = Config::default().scanner();
        s.feed(b"a");
        assert_eq!(s.scan(true).len(), 1);
        assert!(s.decoder().has_key_table());
    }

    #[test]
    fn key_table_can_be_turned_off() {
        let cfg = Config {
            use_key_table: false,
            ..Config::default()
        };
        let mut s = cfg.scanner();
        assert!(!s.decoder().has_key_table());
        assert_eq!(s.decoder().lookup(b"\x1b[A"), None);
        s.feed(b"\x1b[A");
        assert_eq!(s.scan(false).len(), 1);
    }
}
