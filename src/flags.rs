//! The termios flag-word model.
//!
//! The kernel `termios` structure carries four independent flag words
//! (input, output, control, local).  Each word is modelled here as a
//! closed catalog of named keys, every key bound to the
//! platform-canonical bit value from `libc`.  A [`FlagSet`] is a
//! presence set over one catalog: a key is either asserted with its
//! canonical value, or absent.  Keys from different categories are
//! distinct types, so an input flag cannot be mixed into a control
//! word at compile time.
//!
//! Decomposition is lossy by design: bits in a raw flag word that no
//! catalog entry covers are dropped, and recomposition can only ever
//! reconstruct bits inside [`FlagSet::coverage_mask`].  Within the
//! coverage mask the round trip is bit-exact.

use libc::tcflag_t;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// A key in one of the four closed flag catalogs.
///
/// Implementations are plain enums; `catalog` enumerates every key
/// available on this platform and `bits` returns the canonical value
/// for a key.  Some values are single bits, some are multi-bit masks
/// (character size), and one is the union of two other catalog
/// entries (CTS+RTS flow control on BSD-derived systems).
pub trait FlagKey: Copy + Eq + Ord + Debug + 'static {
    /// Every key in this category, in catalog order.
    fn catalog() -> &'static [Self];

    /// The platform-canonical bit value for this key.
    fn bits(self) -> tcflag_t;
}

/// A presence set over one flag catalog.
///
/// The stored value for a present key is always the catalog value,
/// never a caller-supplied pattern; `enable` and `from_keys` go
/// through [`FlagKey::bits`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagSet<K: FlagKey> {
    flags: BTreeMap<K, tcflag_t>,
}

impl<K: FlagKey> Default for FlagSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: FlagKey> FlagSet<K> {
    /// An empty set; no flags asserted.
    pub fn new() -> Self {
        Self {
            flags: BTreeMap::new(),
        }
    }

    /// A set with exactly the given keys asserted.
    pub fn from_keys(keys: &[K]) -> Self {
        let mut set = Self::new();
        set.enable(keys);
        set
    }

    /// Break a raw flag word into its known constituents.
    ///
    /// A key is included iff all of its bits are set in `raw`, so a
    /// multi-bit mask is only reported when the exact pattern is
    /// present, and a composite key only when every constituent bit
    /// is set.  Bits outside the catalog are discarded.
    pub fn decompose(raw: tcflag_t) -> Self {
        let mut flags = BTreeMap::new();
        for &key in K::catalog() {
            let bits = key.bits();
            if bits & raw == bits {
                flags.insert(key, bits);
            }
        }
        Self { flags }
    }

    /// OR together the stored values of every present key.
    ///
    /// Composite keys contribute their literal stored value; nothing
    /// is re-derived from constituents.
    pub fn recompose(&self) -> tcflag_t {
        self.flags.values().fold(0, |word, &bits| word | bits)
    }

    /// The union of every catalog value: the only bits this category
    /// can ever report or reconstruct.
    pub fn coverage_mask() -> tcflag_t {
        K::catalog().iter().fold(0, |mask, key| mask | key.bits())
    }

    /// Assert each key that is not already present.  No-op for keys
    /// already in the set.
    pub fn enable(&mut self, keys: &[K]) {
        for &key in keys {
            self.flags.entry(key).or_insert_with(|| key.bits());
        }
    }

    /// Clear each present key.  No-op for keys not in the set.
    pub fn disable(&mut self, keys: &[K]) {
        for key in keys {
            self.flags.remove(key);
        }
    }

    pub fn contains(&self, key: K) -> bool {
        self.flags.contains_key(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// The asserted keys, in catalog (ordinal) order.
    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.flags.keys().copied()
    }
}

pub type InputFlags = FlagSet<InputFlag>;
pub type OutputFlags = FlagSet<OutputFlag>;
pub type ControlFlags = FlagSet<ControlFlag>;
pub type LocalFlags = FlagSet<LocalFlag>;

/// Software input processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InputFlag {
    /// Ignore BREAK condition.
    IgnoreBreak,
    /// Map BREAK to an interrupt signal.
    BreakToInterrupt,
    /// Discard bytes with parity errors.
    IgnoreParityErrors,
    /// Mark parity and framing errors in the input stream.
    MarkParityErrors,
    /// Enable input parity checking.
    CheckParity,
    /// Strip the eighth bit off input bytes.
    StripHighBit,
    /// Map NL to CR on input.
    NewlineToCarriageReturn,
    /// Ignore CR.
    IgnoreCarriageReturn,
    /// Map CR to NL on input.
    CarriageReturnToNewline,
    /// Enable output flow control (XON/XOFF honored on output).
    OutputFlowControl,
    /// Enable input flow control (XON/XOFF sent on input).
    InputFlowControl,
    /// Any received byte restarts stopped output.
    AnyCharRestartsOutput,
    /// Ring the bell when the input queue is full.
    RingBellOnQueueFull,
    /// Maintain state for UTF-8 aware erase processing.
    Utf8Erase,
}

const INPUT_CATALOG: &[InputFlag] = &[
    InputFlag::IgnoreBreak,
    InputFlag::BreakToInterrupt,
    InputFlag::IgnoreParityErrors,
    InputFlag::MarkParityErrors,
    InputFlag::CheckParity,
    InputFlag::StripHighBit,
    InputFlag::NewlineToCarriageReturn,
    InputFlag::IgnoreCarriageReturn,
    InputFlag::CarriageReturnToNewline,
    InputFlag::OutputFlowControl,
    InputFlag::InputFlowControl,
    InputFlag::AnyCharRestartsOutput,
    InputFlag::RingBellOnQueueFull,
    InputFlag::Utf8Erase,
];

impl FlagKey for InputFlag {
    fn catalog() -> &'static [Self] {
        INPUT_CATALOG
    }

    fn bits(self) -> tcflag_t {
        match self {
            InputFlag::IgnoreBreak => libc::IGNBRK,
            InputFlag::BreakToInterrupt => libc::BRKINT,
            InputFlag::IgnoreParityErrors => libc::IGNPAR,
            InputFlag::MarkParityErrors => libc::PARMRK,
            InputFlag::CheckParity => libc::INPCK,
            InputFlag::StripHighBit => libc::ISTRIP,
            InputFlag::NewlineToCarriageReturn => libc::INLCR,
            InputFlag::IgnoreCarriageReturn => libc::IGNCR,
            InputFlag::CarriageReturnToNewline => libc::ICRNL,
            InputFlag::OutputFlowControl => libc::IXON,
            InputFlag::InputFlowControl => libc::IXOFF,
            InputFlag::AnyCharRestartsOutput => libc::IXANY,
            InputFlag::RingBellOnQueueFull => libc::IMAXBEL,
            InputFlag::Utf8Erase => libc::IUTF8,
        }
    }
}

/// Software output processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OutputFlag {
    /// Enable all following output processing.
    PostProcess,
    /// Map NL to CR-NL on output.
    NewlineToCarriageReturnNewline,
    /// Expand tabs to spaces on output.
    #[cfg(target_vendor = "apple")]
    ExpandTabs,
    /// Discard EOT (^D) on output.
    #[cfg(target_vendor = "apple")]
    DiscardEndOfTransmission,
}

#[cfg(target_vendor = "apple")]
const OUTPUT_CATALOG: &[OutputFlag] = &[
    OutputFlag::PostProcess,
    OutputFlag::NewlineToCarriageReturnNewline,
    OutputFlag::ExpandTabs,
    OutputFlag::DiscardEndOfTransmission,
];

#[cfg(not(target_vendor = "apple"))]
const OUTPUT_CATALOG: &[OutputFlag] = &[
    OutputFlag::PostProcess,
    OutputFlag::NewlineToCarriageReturnNewline,
];

impl FlagKey for OutputFlag {
    fn catalog() -> &'static [Self] {
        OUTPUT_CATALOG
    }

    fn bits(self) -> tcflag_t {
        match self {
            OutputFlag::PostProcess => libc::OPOST,
            OutputFlag::NewlineToCarriageReturnNewline => libc::ONLCR,
            #[cfg(target_vendor = "apple")]
            OutputFlag::ExpandTabs => libc::OXTABS,
            #[cfg(target_vendor = "apple")]
            OutputFlag::DiscardEndOfTransmission => libc::ONOEOT,
        }
    }
}

/// Hardware control of the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ControlFlag {
    /// Ignore these control flags entirely.
    #[cfg(target_vendor = "apple")]
    IgnoreControlFlags,
    /// Character size mask; spans the two size bits.
    CharacterSizeMask,
    /// 5 bit characters.  The canonical value is zero, so this key is
    /// reported by every decomposition.
    FiveBits,
    /// 6 bit characters.
    SixBits,
    /// 7 bit characters.
    SevenBits,
    /// 8 bit characters.
    EightBits,
    /// Send two stop bits.
    TwoStopBits,
    /// Enable the receiver.
    EnableReceiver,
    /// Enable parity generation and checking.
    EnableParity,
    /// Odd parity rather than even.
    OddParity,
    /// Hang up on last close.
    HangUpOnLastClose,
    /// Ignore modem status lines.
    IgnoreModemStatusLines,
    /// CTS flow control of output.
    #[cfg(target_vendor = "apple")]
    CtsOutputFlowControl,
    /// RTS flow control of input.
    #[cfg(target_vendor = "apple")]
    RtsInputFlowControl,
    /// Combined CTS output and RTS input flow control.  The stored
    /// value is the platform `CRTSCTS` constant, which on BSD-derived
    /// systems is the union of the two constituent keys above.
    HardwareFlowControl,
    /// DTR flow control of input.
    #[cfg(target_vendor = "apple")]
    DtrInputFlowControl,
    /// DSR flow control of output.
    #[cfg(target_vendor = "apple")]
    DsrOutputFlowControl,
    /// DCD (carrier) flow control of output.
    #[cfg(target_vendor = "apple")]
    CarrierOutputFlowControl,
    /// Old style modem flow control; historical alias of the carrier
    /// flow control bit.
    #[cfg(target_vendor = "apple")]
    ModemDataBuffered,
}

#[cfg(target_vendor = "apple")]
const CONTROL_CATALOG: &[ControlFlag] = &[
    ControlFlag::IgnoreControlFlags,
    ControlFlag::CharacterSizeMask,
    ControlFlag::FiveBits,
    ControlFlag::SixBits,
    ControlFlag::SevenBits,
    ControlFlag::EightBits,
    ControlFlag::TwoStopBits,
    ControlFlag::EnableReceiver,
    ControlFlag::EnableParity,
    ControlFlag::OddParity,
    ControlFlag::HangUpOnLastClose,
    ControlFlag::IgnoreModemStatusLines,
    ControlFlag::CtsOutputFlowControl,
    ControlFlag::RtsInputFlowControl,
    ControlFlag::HardwareFlowControl,
    ControlFlag::DtrInputFlowControl,
    ControlFlag::DsrOutputFlowControl,
    ControlFlag::CarrierOutputFlowControl,
    ControlFlag::ModemDataBuffered,
];

#[cfg(not(target_vendor = "apple"))]
const CONTROL_CATALOG: &[ControlFlag] = &[
    ControlFlag::CharacterSizeMask,
    ControlFlag::FiveBits,
    ControlFlag::SixBits,
    ControlFlag::SevenBits,
    ControlFlag::EightBits,
    ControlFlag::TwoStopBits,
    ControlFlag::EnableReceiver,
    ControlFlag::EnableParity,
    ControlFlag::OddParity,
    ControlFlag::HangUpOnLastClose,
    ControlFlag::IgnoreModemStatusLines,
    ControlFlag::HardwareFlowControl,
];

impl FlagKey for ControlFlag {
    fn catalog() -> &'static [Self] {
        CONTROL_CATALOG
    }

    fn bits(self) -> tcflag_t {
        match self {
            #[cfg(target_vendor = "apple")]
            ControlFlag::IgnoreControlFlags => libc::CIGNORE,
            ControlFlag::CharacterSizeMask => libc::CSIZE,
            ControlFlag::FiveBits => libc::CS5,
            ControlFlag::SixBits => libc::CS6,
            ControlFlag::SevenBits => libc::CS7,
            ControlFlag::EightBits => libc::CS8,
            ControlFlag::TwoStopBits => libc::CSTOPB,
            ControlFlag::EnableReceiver => libc::CREAD,
            ControlFlag::EnableParity => libc::PARENB,
            ControlFlag::OddParity => libc::PARODD,
            ControlFlag::HangUpOnLastClose => libc::HUPCL,
            ControlFlag::IgnoreModemStatusLines => libc::CLOCAL,
            #[cfg(target_vendor = "apple")]
            ControlFlag::CtsOutputFlowControl => libc::CCTS_OFLOW,
            #[cfg(target_vendor = "apple")]
            ControlFlag::RtsInputFlowControl => libc::CRTS_IFLOW,
            ControlFlag::HardwareFlowControl => libc::CRTSCTS,
            #[cfg(target_vendor = "apple")]
            ControlFlag::DtrInputFlowControl => libc::CDTR_IFLOW,
            #[cfg(target_vendor = "apple")]
            ControlFlag::DsrOutputFlowControl => libc::CDSR_OFLOW,
            #[cfg(target_vendor = "apple")]
            ControlFlag::CarrierOutputFlowControl => libc::CCAR_OFLOW,
            #[cfg(target_vendor = "apple")]
            ControlFlag::ModemDataBuffered => libc::MDMBUF,
        }
    }
}

/// Local modes; the dumping ground for everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LocalFlag {
    /// Visual erase for line kill.
    VisualLineKill,
    /// Visually erase characters.
    VisualErase,
    /// Echo NL after line kill.
    EchoNewlineAfterKill,
    /// Enable echoing.
    Echo,
    /// Echo NL even if echo is off.
    EchoNewline,
    /// Visual erase mode for hardcopy terminals.
    HardcopyErase,
    /// Echo control characters as ^X.
    EchoControlChars,
    /// Enable the INTR, QUIT and SUSP signal characters.
    EnableSignals,
    /// Canonicalize input lines.
    Canonicalize,
    /// Use the alternate word-erase algorithm.
    #[cfg(target_vendor = "apple")]
    AltWordErase,
    /// Enable the DISCARD and LNEXT extensions.
    ExtendedInput,
    /// Input is line-disciplined by an external process.
    ExternalProcessing,
    /// Stop background jobs that write to the terminal.
    StopBackgroundOutput,
    /// Output is being flushed (state bit).
    OutputBeingFlushed,
    /// Suppress kernel status output for VSTATUS.
    #[cfg(target_vendor = "apple")]
    NoKernelInfo,
    /// Pending input is to be retyped (state bit).
    RetypePendingInput,
    /// Don't flush queues after interrupt or quit.
    NoFlushAfterInterrupt,
}

#[cfg(target_vendor = "apple")]
const LOCAL_CATALOG: &[LocalFlag] = &[
    LocalFlag::VisualLineKill,
    LocalFlag::VisualErase,
    LocalFlag::EchoNewlineAfterKill,
    LocalFlag::Echo,
    LocalFlag::EchoNewline,
    LocalFlag::HardcopyErase,
    LocalFlag::EchoControlChars,
    LocalFlag::EnableSignals,
    LocalFlag::Canonicalize,
    LocalFlag::AltWordErase,
    LocalFlag::ExtendedInput,
    LocalFlag::ExternalProcessing,
    LocalFlag::StopBackgroundOutput,
    LocalFlag::OutputBeingFlushed,
    LocalFlag::NoKernelInfo,
    LocalFlag::RetypePendingInput,
    LocalFlag::NoFlushAfterInterrupt,
];

#[cfg(not(target_vendor = "apple"))]
const LOCAL_CATALOG: &[LocalFlag] = &[
    LocalFlag::VisualLineKill,
    LocalFlag::VisualErase,
    LocalFlag::EchoNewlineAfterKill,
    LocalFlag::Echo,
    LocalFlag::EchoNewline,
    LocalFlag::HardcopyErase,
    LocalFlag::EchoControlChars,
    LocalFlag::EnableSignals,
    LocalFlag::Canonicalize,
    LocalFlag::ExtendedInput,
    LocalFlag::ExternalProcessing,
    LocalFlag::StopBackgroundOutput,
    LocalFlag::OutputBeingFlushed,
    LocalFlag::RetypePendingInput,
    LocalFlag::NoFlushAfterInterrupt,
];

impl FlagKey for LocalFlag {
    fn catalog() -> &'static [Self] {
        LOCAL_CATALOG
    }

    fn bits(self) -> tcflag_t {
        match self {
            LocalFlag::VisualLineKill => libc::ECHOKE,
            LocalFlag::VisualErase => libc::ECHOE,
            LocalFlag::EchoNewlineAfterKill => libc::ECHOK,
            LocalFlag::Echo => libc::ECHO,
            LocalFlag::EchoNewline => libc::ECHONL,
            LocalFlag::HardcopyErase => libc::ECHOPRT,
            LocalFlag::EchoControlChars => libc::ECHOCTL,
            LocalFlag::EnableSignals => libc::ISIG,
            LocalFlag::Canonicalize => libc::ICANON,
            #[cfg(target_vendor = "apple")]
            LocalFlag::AltWordErase => libc::ALTWERASE,
            LocalFlag::ExtendedInput => libc::IEXTEN,
            LocalFlag::ExternalProcessing => libc::EXTPROC,
            LocalFlag::StopBackgroundOutput => libc::TOSTOP,
            LocalFlag::OutputBeingFlushed => libc::FLUSHO,
            #[cfg(target_vendor = "apple")]
            LocalFlag::NoKernelInfo => libc::NOKERNINFO,
            LocalFlag::RetypePendingInput => libc::PENDIN,
            LocalFlag::NoFlushAfterInterrupt => libc::NOFLSH,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn coverage_round_trip<K: FlagKey>(raw: tcflag_t) {
        let mask = FlagSet::<K>::coverage_mask();
        let set = FlagSet::<K>::decompose(raw);
        assert_eq!(
            set.recompose() & mask,
            raw & mask,
            "coverage round trip failed for {:#x}",
            raw
        );
    }

    #[test]
    fn round_trip_within_coverage_mask() {
        let samples: &[tcflag_t] = &[
            0,
            1,
            0x108,
            0x0000_ffff,
            0xffff_0000,
            !0,
            0x1234_5678,
            libc::ICANON | libc::ECHO,
            libc::CS8 | libc::CREAD | libc::CLOCAL,
        ];
        for &raw in samples {
            coverage_round_trip::<InputFlag>(raw);
            coverage_round_trip::<OutputFlag>(raw);
            coverage_round_trip::<ControlFlag>(raw);
            coverage_round_trip::<LocalFlag>(raw);
        }
    }

    #[test]
    fn bits_outside_coverage_are_dropped() {
        let mask = LocalFlags::coverage_mask();
        let raw = !0;
        let set = LocalFlags::decompose(raw);
        // Nothing outside the mask is ever reconstructed.
        assert_eq!(set.recompose() & !mask, 0);
    }

    #[test]
    fn canonicalize_and_echo_decompose_exactly() {
        let raw = LocalFlag::Canonicalize.bits() | LocalFlag::Echo.bits();
        let set = LocalFlags::decompose(raw);
        assert_eq!(set.len(), 2);
        assert!(set.contains(LocalFlag::Canonicalize));
        assert!(set.contains(LocalFlag::Echo));
        assert_eq!(set.recompose(), raw);
    }

    #[test]
    fn character_size_mask_requires_exact_pattern() {
        // CS8 is the full two-bit pattern; CS7 is only one of those
        // bits, so a CS7 word must not report the mask or CS8.
        let set = ControlFlags::decompose(libc::CS7);
        assert!(set.contains(ControlFlag::SevenBits));
        assert!(!set.contains(ControlFlag::EightBits));
        assert!(!set.contains(ControlFlag::CharacterSizeMask));
        // CS5 is zero and is always reported.
        assert!(set.contains(ControlFlag::FiveBits));

        let set = ControlFlags::decompose(libc::CS8);
        assert!(set.contains(ControlFlag::CharacterSizeMask));
        assert!(set.contains(ControlFlag::EightBits));
    }

    #[test]
    fn composite_flow_control_uses_literal_value() {
        let set = ControlFlags::from_keys(&[ControlFlag::HardwareFlowControl]);
        assert_eq!(set.recompose(), libc::CRTSCTS);

        let set = ControlFlags::decompose(libc::CRTSCTS);
        assert!(set.contains(ControlFlag::HardwareFlowControl));
    }

    #[cfg(target_vendor = "apple")]
    #[test]
    fn composite_requires_both_constituents() {
        let set = ControlFlags::decompose(libc::CCTS_OFLOW);
        assert!(set.contains(ControlFlag::CtsOutputFlowControl));
        assert!(!set.contains(ControlFlag::HardwareFlowControl));
    }

    #[test]
    fn enable_disable_round_trip() {
        let keys = [LocalFlag::Canonicalize, LocalFlag::Echo];
        let mut set = LocalFlags::new();
        set.enable(&keys);
        assert_eq!(set.len(), 2);
        set.disable(&keys);
        assert_eq!(set, LocalFlags::new());
    }

    #[test]
    fn enable_and_disable_are_idempotent() {
        let mut set = LocalFlags::from_keys(&[LocalFlag::Echo]);
        let before = set.clone();

        // enable on a present key is a no-op
        set.enable(&[LocalFlag::Echo]);
        assert_eq!(set, before);

        // disable on an absent key is a no-op
        set.disable(&[LocalFlag::Canonicalize]);
        assert_eq!(set, before);
    }
}
