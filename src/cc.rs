//! The control-character codec.
//!
//! termios stores the special characters (EOF, erase, kill, interrupt
//! and friends, plus the VMIN/VTIME read parameters) in a fixed
//! `c_cc` array of `NCCS` slots.  [`ControlChars`] maps named keys to
//! slot values; every key addresses its slot through the `libc::V*`
//! index constant in *both* directions, so encode followed by decode
//! is a fixed point for every defined slot.  Slots with no named key
//! on this platform are zero-filled on encode and ignored on decode.

use libc::cc_t;
use std::collections::BTreeMap;

/// The raw `c_cc` array as the kernel sees it.
pub type RawControlChars = [cc_t; libc::NCCS];

/// Named control-character slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ControlChar {
    /// VEOF: end of file.
    EndOfFile,
    /// VEOL: additional end of line.
    EndOfLine,
    /// VEOL2: yet another end of line.
    EndOfLine2,
    /// VERASE: erase the previous character.
    Erase,
    /// VWERASE: erase the previous word.
    WordErase,
    /// VKILL: erase the whole line.
    Kill,
    /// VREPRINT: retype the pending input.
    Reprint,
    /// VINTR: interrupt signal.
    Interrupt,
    /// VQUIT: quit signal.
    Quit,
    /// VSUSP: suspend signal.
    Suspend,
    /// VDSUSP: delayed suspend signal.
    #[cfg(target_vendor = "apple")]
    DelayedSuspend,
    /// VSTART: restart output.
    Start,
    /// VSTOP: stop output.
    Stop,
    /// VLNEXT: literal next (quote the following character).
    LiteralNext,
    /// VDISCARD: discard pending output.
    Discard,
    /// VMIN: minimum bytes for a non-canonical read to return.
    Min,
    /// VTIME: inter-byte timeout for non-canonical reads, in tenths
    /// of a second.
    Time,
    /// VSTATUS: status request.
    #[cfg(target_vendor = "apple")]
    Status,
}

#[cfg(target_vendor = "apple")]
const CC_CATALOG: &[ControlChar] = &[
    ControlChar::EndOfFile,
    ControlChar::EndOfLine,
    ControlChar::EndOfLine2,
    ControlChar::Erase,
    ControlChar::WordErase,
    ControlChar::Kill,
    ControlChar::Reprint,
    ControlChar::Interrupt,
    ControlChar::Quit,
    ControlChar::Suspend,
    ControlChar::DelayedSuspend,
    ControlChar::Start,
    ControlChar::Stop,
    ControlChar::LiteralNext,
    ControlChar::Discard,
    ControlChar::Min,
    ControlChar::Time,
    ControlChar::Status,
];

#[cfg(not(target_vendor = "apple"))]
const CC_CATALOG: &[ControlChar] = &[
    ControlChar::EndOfFile,
    ControlChar::EndOfLine,
    ControlChar::EndOfLine2,
    ControlChar::Erase,
    ControlChar::WordErase,
    ControlChar::Kill,
    ControlChar::Reprint,
    ControlChar::Interrupt,
    ControlChar::Quit,
    ControlChar::Suspend,
    ControlChar::Start,
    ControlChar::Stop,
    ControlChar::LiteralNext,
    ControlChar::Discard,
    ControlChar::Min,
    ControlChar::Time,
];

impl ControlChar {
    /// Every named slot on this platform.
    pub fn catalog() -> &'static [Self] {
        CC_CATALOG
    }

    /// The `c_cc` index this key addresses.
    pub fn index(self) -> usize {
        match self {
            ControlChar::EndOfFile => libc::VEOF,
            ControlChar::EndOfLine => libc::VEOL,
            ControlChar::EndOfLine2 => libc::VEOL2,
            ControlChar::Erase => libc::VERASE,
            ControlChar::WordErase => libc::VWERASE,
            ControlChar::Kill => libc::VKILL,
            ControlChar::Reprint => libc::VREPRINT,
            ControlChar::Interrupt => libc::VINTR,
            ControlChar::Quit => libc::VQUIT,
            ControlChar::Suspend => libc::VSUSP,
            #[cfg(target_vendor = "apple")]
            ControlChar::DelayedSuspend => libc::VDSUSP,
            ControlChar::Start => libc::VSTART,
            ControlChar::Stop => libc::VSTOP,
            ControlChar::LiteralNext => libc::VLNEXT,
            ControlChar::Discard => libc::VDISCARD,
            ControlChar::Min => libc::VMIN,
            ControlChar::Time => libc::VTIME,
            #[cfg(target_vendor = "apple")]
            ControlChar::Status => libc::VSTATUS,
        }
    }
}

/// The named control characters of one termios snapshot.
///
/// An absent key encodes as zero in its slot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ControlChars {
    chars: BTreeMap<ControlChar, cc_t>,
}

impl ControlChars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a raw `c_cc` array.  Every named slot is captured,
    /// including zero values; unnamed slots are ignored.
    pub fn from_raw(raw: &RawControlChars) -> Self {
        let mut chars = BTreeMap::new();
        for &key in ControlChar::catalog() {
            chars.insert(key, raw[key.index()]);
        }
        Self { chars }
    }

    /// Encode into a zero-initialized raw array, writing each present
    /// key's value at its slot.
    pub fn to_raw(&self) -> RawControlChars {
        let mut raw: RawControlChars = [0; libc::NCCS];
        for (key, &value) in &self.chars {
            raw[key.index()] = value;
        }
        raw
    }

    pub fn get(&self, key: ControlChar) -> Option<cc_t> {
        self.chars.get(&key).copied()
    }

    pub fn set(&mut self, key: ControlChar, value: cc_t) {
        self.chars.insert(key, value);
    }

    pub fn unset(&mut self, key: ControlChar) {
        self.chars.remove(&key);
    }
}
