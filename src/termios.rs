//! The typed termios aggregate.

use crate::cc::{ControlChar, ControlChars};
use crate::flags::{ControlFlags, InputFlags, LocalFlag, LocalFlags, OutputFlags};
use crate::Result;
use libc::speed_t;
use std::mem;

/// A decomposed terminal control structure: the four flag categories,
/// the control characters, and the two line speeds.
///
/// Values of this type are plain data; they are snapshotted from a
/// file descriptor, mutated in memory, and committed back through
/// [`crate::terminal::unix::set_terminal_attributes`].  Speeds pass
/// through verbatim with no validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Termios {
    pub input_flags: InputFlags,
    pub output_flags: OutputFlags,
    pub control_flags: ControlFlags,
    pub local_flags: LocalFlags,
    pub control_chars: ControlChars,
    pub input_speed: speed_t,
    pub output_speed: speed_t,
}

impl Termios {
    /// Decompose a raw kernel structure.  Flag bits not covered by a
    /// catalog are dropped; see the coverage-mask note on
    /// [`crate::flags::FlagSet`].
    pub fn from_raw(raw: &libc::termios) -> Self {
        Self {
            input_flags: InputFlags::decompose(raw.c_iflag),
            output_flags: OutputFlags::decompose(raw.c_oflag),
            control_flags: ControlFlags::decompose(raw.c_cflag),
            local_flags: LocalFlags::decompose(raw.c_lflag),
            control_chars: ControlChars::from_raw(&raw.c_cc),
            input_speed: raw.c_ispeed,
            output_speed: raw.c_ospeed,
        }
    }

    /// Recompose into the raw shape expected by the tcsetattr family.
    pub fn to_raw(&self) -> libc::termios {
        let mut raw: libc::termios = unsafe { mem::zeroed() };
        raw.c_iflag = self.input_flags.recompose();
        raw.c_oflag = self.output_flags.recompose();
        raw.c_cflag = self.control_flags.recompose();
        raw.c_lflag = self.local_flags.recompose();
        raw.c_cc = self.control_chars.to_raw();
        raw.c_ispeed = self.input_speed;
        raw.c_ospeed = self.output_speed;
        raw
    }

    /// Snapshot the attributes of standard input and turn off the
    /// cooked-mode defaults: canonicalization and echo are disabled,
    /// and the read parameters are set to VMIN=0, VTIME=1 so that a
    /// blocking read returns each keystroke (or nothing) within a
    /// tenth of a second.
    pub fn raw_input_defaults() -> Result<Self> {
        let mut attributes =
            crate::terminal::unix::terminal_attributes(libc::STDIN_FILENO)?;
        attributes
            .local_flags
            .disable(&[LocalFlag::Canonicalize, LocalFlag::Echo]);
        attributes.control_chars.set(ControlChar::Min, 0);
        attributes.control_chars.set(ControlChar::Time, 1);
        Ok(attributes)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::flags::{ControlFlag, FlagSet, InputFlag};

    fn sample_raw() -> libc::termios {
        let mut raw: libc::termios = unsafe { mem::zeroed() };
        raw.c_iflag = libc::ICRNL | libc::IXON;
        raw.c_oflag = libc::OPOST | libc::ONLCR;
        raw.c_cflag = libc::CS8 | libc::CREAD | libc::HUPCL;
        raw.c_lflag = libc::ICANON | libc::ECHO | libc::ISIG;
        raw.c_cc[libc::VEOF] = 4;
        raw.c_cc[libc::VERASE] = 0x7f;
        raw.c_cc[libc::VMIN] = 1;
        raw.c_ispeed = 12345;
        raw.c_ospeed = 54321;
        raw
    }

    #[test]
    fn raw_round_trip_over_coverage_masks() {
        let raw = sample_raw();
        let termios = Termios::from_raw(&raw);
        let back = termios.to_raw();

        assert_eq!(
            back.c_iflag & FlagSet::<InputFlag>::coverage_mask(),
            raw.c_iflag & FlagSet::<InputFlag>::coverage_mask()
        );
        assert_eq!(
            back.c_cflag & FlagSet::<ControlFlag>::coverage_mask(),
            raw.c_cflag & FlagSet::<ControlFlag>::coverage_mask()
        );
        assert_eq!(back.c_lflag, raw.c_lflag);
        assert_eq!(back.c_cc[libc::VEOF], 4);
        assert_eq!(back.c_cc[libc::VERASE], 0x7f);
    }

    #[test]
    fn speeds_pass_through_verbatim() {
        // Deliberately not a valid Bxxx constant; no validation is
        // performed on speeds.
        let termios = Termios::from_raw(&sample_raw());
        assert_eq!(termios.input_speed, 12345);
        assert_eq!(termios.output_speed, 54321);
        let back = termios.to_raw();
        assert_eq!(back.c_ispeed, 12345);
        assert_eq!(back.c_ospeed, 54321);
    }

    #[test]
    fn structural_equality() {
        let a = Termios::from_raw(&sample_raw());
        let mut b = a.clone();
        assert_eq!(a, b);
        b.local_flags.disable(&[LocalFlag::Echo]);
        assert_ne!(a, b);
    }

    #[test]
    fn decompose_reports_expected_local_keys() {
        let termios = Termios::from_raw(&sample_raw());
        assert!(termios.local_flags.contains(LocalFlag::Canonicalize));
        assert!(termios.local_flags.contains(LocalFlag::Echo));
        assert!(termios.local_flags.contains(LocalFlag::EnableSignals));
        assert!(!termios.local_flags.contains(LocalFlag::EchoNewline));
    }
}
