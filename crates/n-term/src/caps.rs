// SPDX-License-Identifier: MIT
//
// Capability profile — which optional sequences a terminal understands.
//
// Everything here is an optimization. A terminal with no capabilities gets
// correct output built from CUP, CUF/CUB, EL and plain text; each flag
// unlocks a shorter encoding. The profile comes from the family of $TERM
// (the part before the first '-'). HT and BS depend on the tty's termios
// settings rather than the terminal type, so they are never part of a
// TERM-derived profile.

use bitflags::bitflags;

bitflags! {
    /// Optional control sequences.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Capabilities: u16 {
        /// Vertical position absolute.
        const VPA = 1 << 0;
        /// Horizontal position absolute.
        const HPA = 1 << 1;
        /// Cursor horizontal absolute.
        const CHA = 1 << 2;
        /// Cursor forward tab.
        const CHT = 1 << 3;
        /// Cursor backward tab.
        const CBT = 1 << 4;
        /// Repeat previous character.
        const REP = 1 << 5;
        /// Erase characters.
        const ECH = 1 << 6;
        /// Insert and delete characters (ICH and DCH).
        const ICH = 1 << 7;
        /// Scroll down.
        const SD = 1 << 8;
        /// Scroll up.
        const SU = 1 << 9;
        /// Hard tabs move the cursor.
        const HT = 1 << 10;
        /// Backspace moves the cursor left.
        const BS = 1 << 11;

        /// Everything a modern xterm-compatible terminal does.
        const ALL = Self::VPA.bits() | Self::HPA.bits() | Self::CHA.bits()
            | Self::CHT.bits() | Self::CBT.bits() | Self::REP.bits()
            | Self::ECH.bits() | Self::ICH.bits() | Self::SD.bits()
            | Self::SU.bits();
    }
}

impl Capabilities {
    /// The profile for a terminal type such as `xterm-256color`.
    ///
    /// ```
    /// use n_term::caps::Capabilities;
    ///
    /// assert!(Capabilities::for_term("kitty").contains(Capabilities::REP));
    /// assert!(!Capabilities::for_term("xterm-256color").contains(Capabilities::REP));
    /// assert!(Capabilities::for_term("vt100").is_empty());
    /// ```
    #[must_use]
    pub fn for_term(term: &str) -> Self {
        let mut parts = term.split('-');
        let family = parts.next().unwrap_or_default();
        let variant = parts.next();

        match family {
            "contour" | "foot" | "ghostty" | "kitty" | "rio" | "st" | "tmux" | "wezterm" => {
                Self::ALL
            }
            "xterm" => match variant {
                Some("ghostty" | "kitty" | "rio") => Self::ALL,
                // Konsole and friends advertise xterm but lack HPA; CHA
                // does the same job.
                _ => Self::ALL - Self::HPA - Self::CHT - Self::REP,
            },
            "alacritty" => Self::ALL - Self::CHT,
            "screen" => Self::ALL - Self::REP,
            "linux" => Self::VPA | Self::CHA | Self::HPA | Self::ECH | Self::ICH,
            _ => Self::empty(),
        }
    }
}
