//! Capability execution: cursor-goto expansion and padded output.
//!
//! Three chained steps, each individually fallible:
//!
//! 1. look up the capability's encoded template in the entry loaded
//!    for this terminal type — absence is the distinct success
//!    outcome [`CapOutcome::Absent`], not an error;
//! 2. substitute the target position into the template's `%` codes
//!    (the classic `tgoto` conventions);
//! 3. write the expanded sequence byte by byte, honoring the leading
//!    padding specification (the classic `tputs` conventions): a
//!    hardware terminal needs a delay proportional to the number of
//!    affected lines while it redraws.  The delay computation always
//!    runs, even when it comes out to zero on a virtual terminal.

use crate::caps::Database;
use crate::error::CapabilityError;
use log::trace;
use std::io::Write;
use std::time::Duration;

/// The supported capability identifiers, bound to their two-letter
/// database keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `cl`: clear the entire screen.
    ClearScreen,
    /// `cm`: move the cursor to a position.
    MoveCursor,
    /// `vi`: make the cursor invisible.
    HideCursor,
    /// `ve`: make the cursor visible again.
    ShowCursor,
    /// `rc`: move to the last saved cursor position.
    RestoreCursorPosition,
    /// `sc`: save the current cursor position.
    SaveCursorPosition,
    /// `col`: screen width (numeric).
    Columns,
    /// `li`: screen height (numeric).
    Rows,
    /// `us`: turn underlining on.
    UnderlineOn,
    /// `ue`: turn underlining off.
    UnderlineOff,
    /// `mr`: turn reverse video on.
    ReverseVideoOn,
    /// `me`: turn all appearance modes off.
    AppearanceModeOff,
}

impl Command {
    /// The two-letter database identifier.
    pub fn id(self) -> &'static str {
        match self {
            Command::ClearScreen => "cl",
            Command::MoveCursor => "cm",
            Command::HideCursor => "vi",
            Command::ShowCursor => "ve",
            Command::RestoreCursorPosition => "rc",
            Command::SaveCursorPosition => "sc",
            Command::Columns => "col",
            Command::Rows => "li",
            Command::UnderlineOn => "us",
            Command::UnderlineOff => "ue",
            Command::ReverseVideoOn => "mr",
            Command::AppearanceModeOff => "me",
        }
    }
}

/// A position on the screen; `x` is the column, `y` the line, both
/// zero based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0, y: 0 };

    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// One capability invocation: what to run, where, and how many lines
/// it touches (which drives the padding delay).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullCommand {
    pub command: Command,
    pub position: Position,
    pub affected_lines: usize,
}

impl From<(Command, Position, usize)> for FullCommand {
    fn from((command, position, affected_lines): (Command, Position, usize)) -> Self {
        Self {
            command,
            position,
            affected_lines,
        }
    }
}

/// The outcome of executing a single capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapOutcome {
    /// The sequence was written.
    Done,
    /// The terminal type has no such capability; nothing was written.
    /// This is routine, not a failure.
    Absent,
}

/// Substitute a position into a cursor-addressing template.
///
/// Arguments are consumed line first, column second; `%r` reverses
/// that order for terminals that want the column first.  The
/// recognised codes are `%d` `%2` `%3` `%.` `%+c` `%>c₁c₂` `%r` `%i`
/// `%%` `%B` `%D`; anything else is a malformed template.
///
/// The expansion is raw bytes: `%.` and `%+c` encode a coordinate as
/// one byte, which for coordinates past 127 is not a valid `char`.
pub fn expand_goto(
    template: &[u8],
    position: Position,
) -> std::result::Result<Vec<u8>, CapabilityError> {
    let malformed = |reason: &str| CapabilityError::MalformedTemplate {
        template: String::from_utf8_lossy(template).into_owned(),
        reason: reason.to_string(),
    };

    let mut args = [position.y as i64, position.x as i64];
    let mut next = 0usize;
    let mut out = Vec::with_capacity(template.len());
    let mut bytes = template.iter().copied();

    while let Some(b) = bytes.next() {
        if b != b'%' {
            out.push(b);
            continue;
        }
        match bytes.next().ok_or_else(|| malformed("truncated % code"))? {
            b'd' => {
                out.extend_from_slice(args[next].to_string().as_bytes());
                next = 1 - next;
            }
            b'2' => {
                out.extend_from_slice(format!("{:02}", args[next]).as_bytes());
                next = 1 - next;
            }
            b'3' => {
                out.extend_from_slice(format!("{:03}", args[next]).as_bytes());
                next = 1 - next;
            }
            b'.' => {
                out.push(args[next] as u8);
                next = 1 - next;
            }
            b'+' => {
                let base = bytes.next().ok_or_else(|| malformed("truncated %+"))?;
                out.push((args[next] + i64::from(base)) as u8);
                next = 1 - next;
            }
            b'>' => {
                let threshold = bytes.next().ok_or_else(|| malformed("truncated %>"))?;
                let increment = bytes.next().ok_or_else(|| malformed("truncated %>"))?;
                if args[next] > i64::from(threshold) {
                    args[next] += i64::from(increment);
                }
            }
            b'r' => args.swap(0, 1),
            b'i' => {
                args[0] += 1;
                args[1] += 1;
            }
            b'%' => out.push(b'%'),
            b'B' => args[next] = (args[next] / 10) * 16 + args[next] % 10,
            b'D' => args[next] -= 2 * (args[next] % 16),
            other => {
                return Err(malformed(&format!("unknown % code `{}`", other as char)));
            }
        }
    }

    Ok(out)
}

/// The leading padding specification of a capability string:
/// duration in tenths of a millisecond, whether it scales with the
/// affected line count, and where the sequence body begins.
fn parse_padding(bytes: &[u8]) -> (u64, bool, usize) {
    let mut tenths = 0u64;
    let mut idx = 0;

    while idx < bytes.len() && bytes[idx].is_ascii_digit() {
        tenths = tenths * 10 + u64::from(bytes[idx] - b'0');
        idx += 1;
    }
    if idx == 0 {
        return (0, false, 0);
    }
    tenths *= 10;
    if idx + 1 < bytes.len() && bytes[idx] == b'.' && bytes[idx + 1].is_ascii_digit() {
        tenths += u64::from(bytes[idx + 1] - b'0');
        idx += 2;
    }
    let per_line = idx < bytes.len() && bytes[idx] == b'*';
    if per_line {
        idx += 1;
    }
    (tenths, per_line, idx)
}

/// Write an expanded capability sequence through the padding
/// discipline: the body goes out byte by byte, then the computed
/// delay is applied.
pub fn put<W: Write>(
    out: &mut W,
    sequence: &[u8],
    affected_lines: usize,
) -> std::result::Result<(), CapabilityError> {
    let (tenths_ms, per_line, body) = parse_padding(sequence);

    for &byte in &sequence[body..] {
        out.write_all(&[byte])
            .map_err(CapabilityError::ExecutionFailed)?;
    }

    let total = if per_line {
        tenths_ms.saturating_mul(affected_lines as u64)
    } else {
        tenths_ms
    };
    let delay = Duration::from_micros(total * 100);
    if !delay.is_zero() {
        std::thread::sleep(delay);
    }
    Ok(())
}

/// Executes capability commands against the entry loaded for one
/// terminal type.
#[derive(Debug, Clone)]
pub struct TermcapRenderer {
    db: Database,
}

impl TermcapRenderer {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Screen width from the numeric `col` capability.
    pub fn columns(&self) -> Option<u32> {
        self.db.get_num(Command::Columns.id())
    }

    /// Screen height from the numeric `li` capability.
    pub fn rows(&self) -> Option<u32> {
        self.db.get_num(Command::Rows.id())
    }

    /// Run one command: look the capability up, expand the position
    /// into it, and write it with padding.  A terminal type without
    /// the capability yields `CapOutcome::Absent` and writes nothing.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        command: Command,
        position: Position,
        affected_lines: usize,
    ) -> std::result::Result<CapOutcome, CapabilityError> {
        let template = match self.db.get_str(command.id()) {
            Some(template) => template,
            None => {
                trace!("capability {} absent; nothing to execute", command.id());
                return Ok(CapOutcome::Absent);
            }
        };
        let sequence = expand_goto(&template, position)?;
        put(out, &sequence, affected_lines)?;
        Ok(CapOutcome::Done)
    }

    /// Run a list of commands in order, stopping at the first
    /// failure.  There is no partial-success aggregation; output
    /// already written stays written.
    pub fn execute_all<W: Write>(
        &self,
        out: &mut W,
        commands: &[FullCommand],
    ) -> std::result::Result<(), CapabilityError> {
        for full in commands {
            self.execute(out, full.command, full.position, full.affected_lines)?;
        }
        Ok(())
    }

    /// Clear the screen the conventional way: hide the cursor, clear,
    /// and park the cursor at the origin.
    pub fn clear_screen<W: Write>(
        &self,
        out: &mut W,
    ) -> std::result::Result<(), CapabilityError> {
        self.execute_all(
            out,
            &[
                (Command::HideCursor, Position::ORIGIN, 1).into(),
                (Command::ClearScreen, Position::ORIGIN, 1).into(),
                (Command::MoveCursor, Position::ORIGIN, 1).into(),
            ],
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SAMPLE: &str = "demo|demo terminal:\\\n\
        :co#80:li#24:\\\n\
        :cl=\\E[H\\E[J:cm=\\E[%i%d;%dH:\\\n\
        :vi=\\E[?25l:us=\\E[4m:\n";

    fn demo_renderer() -> TermcapRenderer {
        TermcapRenderer::new(Database::from_source(SAMPLE, "demo").unwrap())
    }

    #[test]
    fn goto_expansion_line_first() {
        let expanded = expand_goto(b"\x1b[%i%d;%dH", Position::new(4, 9)).unwrap();
        k9::assert_equal!(expanded, b"\x1b[10;5H".to_vec());
    }

    #[test]
    fn goto_reversed_and_padded_fields() {
        let expanded = expand_goto(b"%r%2;%3", Position::new(7, 3)).unwrap();
        k9::assert_equal!(expanded, b"07;003".to_vec());
    }

    #[test]
    fn goto_char_encodings() {
        // %+ adds the argument to a base character
        let expanded = expand_goto(b"\x1b=%+ %+ ", Position::new(2, 1)).unwrap();
        assert_eq!(expanded, b"\x1b=!\"".to_vec());

        // %. emits the argument as a raw byte
        let expanded = expand_goto(b"%.%.", Position::new(66, 65)).unwrap();
        assert_eq!(expanded, b"AB".to_vec());
    }

    #[test]
    fn goto_high_coordinates_encode_as_single_bytes() {
        // coordinates past 127 land above the ASCII range and must
        // still come out as exactly one byte each on the wire
        let expanded = expand_goto(b"\x1b=%+ %+ ", Position::new(200, 100)).unwrap();
        assert_eq!(expanded, vec![0x1b, b'=', 0x84, 0xe8]);

        let mut buf = Vec::new();
        put(&mut buf, &expanded, 1).unwrap();
        assert_eq!(buf, vec![0x1b, b'=', 0x84, 0xe8]);
    }

    #[test]
    fn goto_conditional_add() {
        // %>: add to the pending argument only above the threshold
        let expanded = expand_goto(b"%>z\x01%d", Position::new(0, 200)).unwrap();
        assert_eq!(expanded, b"201".to_vec());
        let expanded = expand_goto(b"%>z\x01%d", Position::new(0, 5)).unwrap();
        assert_eq!(expanded, b"5".to_vec());
    }

    #[test]
    fn goto_literal_percent() {
        let expanded = expand_goto(b"100%%", Position::ORIGIN).unwrap();
        assert_eq!(expanded, b"100%".to_vec());
    }

    #[test]
    fn goto_rejects_unknown_codes() {
        let err = expand_goto(b"\x1b[%q", Position::ORIGIN).unwrap_err();
        match err {
            CapabilityError::MalformedTemplate { reason, .. } => {
                assert!(reason.contains("%"), "reason: {}", reason)
            }
            other => panic!("unexpected error {:?}", other),
        }

        assert!(expand_goto(b"%", Position::ORIGIN).is_err());
        assert!(expand_goto(b"%+", Position::ORIGIN).is_err());
    }

    #[test]
    fn padding_specs() {
        assert_eq!(parse_padding(b"\x1b[K"), (0, false, 0));
        assert_eq!(parse_padding(b"5\x1b[K"), (50, false, 1));
        assert_eq!(parse_padding(b"50"), (500, false, 2));
        assert_eq!(parse_padding(b"3.5\x1b[K"), (35, false, 3));
        assert_eq!(parse_padding(b"5*\x1b[K"), (50, true, 2));
        assert_eq!(parse_padding(b"3.5*"), (35, true, 4));
    }

    #[test]
    fn put_strips_padding_from_output() {
        let mut buf = Vec::new();
        put(&mut buf, b"1.2*\x1b[K", 1).unwrap();
        assert_eq!(buf, b"\x1b[K");
    }

    #[test]
    fn execute_known_capability() {
        let renderer = demo_renderer();
        let mut buf = Vec::new();
        let outcome = renderer
            .execute(&mut buf, Command::MoveCursor, Position::new(2, 5), 1)
            .unwrap();
        assert_eq!(outcome, CapOutcome::Done);
        k9::assert_equal!(buf, b"\x1b[6;3H".to_vec());
    }

    #[test]
    fn high_byte_capability_writes_one_byte() {
        // an octal escape above 0177 must reach the wire as the single
        // raw byte, not a two-byte utf-8 encoding of it
        let source = "alt|alternate charset terminal:us=\\341:";
        let renderer = TermcapRenderer::new(Database::from_source(source, "alt").unwrap());
        let mut buf = Vec::new();
        renderer
            .execute(&mut buf, Command::UnderlineOn, Position::ORIGIN, 1)
            .unwrap();
        assert_eq!(buf, vec![0xe1]);
    }

    #[test]
    fn absent_capability_is_a_silent_no_op() {
        let renderer = demo_renderer();
        let mut buf = Vec::new();
        let outcome = renderer
            .execute(&mut buf, Command::ReverseVideoOn, Position::ORIGIN, 1)
            .unwrap();
        assert_eq!(outcome, CapOutcome::Absent);
        assert!(buf.is_empty());
    }

    #[test]
    fn execute_all_stops_at_first_failure() {
        let source = "bad|broken entry:cl=\\E[%q:vi=\\E[?25l:";
        let renderer = TermcapRenderer::new(Database::from_source(source, "bad").unwrap());
        let mut buf = Vec::new();

        let result = renderer.execute_all(
            &mut buf,
            &[
                (Command::HideCursor, Position::ORIGIN, 1).into(),
                (Command::ClearScreen, Position::ORIGIN, 1).into(),
                (Command::ShowCursor, Position::ORIGIN, 1).into(),
            ],
        );
        assert!(result.is_err());
        // the first command ran before the malformed one aborted
        assert_eq!(buf, b"\x1b[?25l");
    }

    #[test]
    fn clear_screen_composition() {
        let _ = env_logger::builder().is_test(true).try_init();
        let renderer = demo_renderer();
        let mut buf = Vec::new();
        renderer.clear_screen(&mut buf).unwrap();
        k9::assert_equal!(buf, b"\x1b[?25l\x1b[H\x1b[J\x1b[1;1H".to_vec());
    }

    #[test]
    fn clear_screen_without_the_capabilities_writes_nothing() {
        let source = "dumb|80-column dumb tty:co#80:\n";
        let renderer = TermcapRenderer::new(Database::from_source(source, "dumb").unwrap());
        let mut buf = Vec::new();
        renderer.clear_screen(&mut buf).unwrap();
        assert!(buf.is_empty());
    }

    #[test]
    fn numeric_capabilities() {
        let renderer = demo_renderer();
        assert_eq!(renderer.columns(), None); // entry uses `co`, not `col`
        assert_eq!(renderer.database().get_num("co"), Some(80));
        assert_eq!(renderer.rows(), Some(24));
    }

    #[test]
    fn write_failure_is_execution_failed() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let err = put(&mut Broken, b"\x1b[K", 1).unwrap_err();
        match err {
            CapabilityError::ExecutionFailed(_) => {}
            other => panic!("unexpected error {:?}", other),
        }
    }
}
