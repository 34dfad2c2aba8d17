//! The unix implementation of the terminal session.

use crate::caps::Database;
use crate::error::{ConfigurationError, SyscallError};
use crate::render::{FullCommand, TermcapRenderer};
use crate::terminal::SessionOptions;
use crate::termios::Termios;
use crate::Result;
use filedescriptor::FileDescriptor;
use log::trace;
use std::io::{Error as IoError, ErrorKind, Read, Write};
use std::mem;
use std::os::unix::io::{AsRawFd, RawFd};

/// When a tcsetattr-style attribute change takes effect.
pub enum SetAttributeWhen {
    /// Changes are applied immediately.
    Now,
    /// Apply once the current output queue has drained.
    AfterDrainOutputQueue,
    /// Wait for the current output queue to drain, then
    /// discard any unread input.
    AfterDrainOutputQueuePurgeInputQueue,
}

impl SetAttributeWhen {
    fn as_option(&self) -> libc::c_int {
        match self {
            SetAttributeWhen::Now => libc::TCSANOW,
            SetAttributeWhen::AfterDrainOutputQueue => libc::TCSADRAIN,
            SetAttributeWhen::AfterDrainOutputQueuePurgeInputQueue => libc::TCSAFLUSH,
        }
    }
}

/// Snapshot the attributes of a descriptor as a typed [`Termios`].
pub fn terminal_attributes(fd: RawFd) -> Result<Termios> {
    let mut raw: libc::termios = unsafe { mem::zeroed() };
    if unsafe { libc::tcgetattr(fd, &mut raw) } != 0 {
        return Err(SyscallError::last("tcgetattr").into());
    }
    Ok(Termios::from_raw(&raw))
}

/// Commit a typed [`Termios`] to a descriptor.
pub fn set_terminal_attributes(
    fd: RawFd,
    when: &SetAttributeWhen,
    termios: &Termios,
) -> Result<()> {
    let raw = termios.to_raw();
    if unsafe { libc::tcsetattr(fd, when.as_option(), &raw) } != 0 {
        return Err(SyscallError::last("tcsetattr").into());
    }
    Ok(())
}

#[derive(Debug)]
pub struct TtyReadHandle {
    fd: FileDescriptor,
}

impl TtyReadHandle {
    fn new(fd: FileDescriptor) -> Self {
        Self { fd }
    }
}

impl Read for TtyReadHandle {
    fn read(&mut self, buf: &mut [u8]) -> std::result::Result<usize, IoError> {
        let size =
            unsafe { libc::read(self.fd.as_raw_fd(), buf.as_mut_ptr() as *mut _, buf.len()) };
        if size == -1 {
            Err(IoError::last_os_error())
        } else {
            Ok(size as usize)
        }
    }
}

#[derive(Debug)]
pub struct TtyWriteHandle {
    fd: FileDescriptor,
}

impl TtyWriteHandle {
    fn new(fd: FileDescriptor) -> Self {
        Self { fd }
    }
}

impl Write for TtyWriteHandle {
    fn write(&mut self, buf: &[u8]) -> std::result::Result<usize, IoError> {
        self.fd.write(buf)
    }

    fn flush(&mut self) -> std::result::Result<(), IoError> {
        self.fd.flush()
    }
}

/// A unix terminal session.
///
/// Construction validates the terminal type and loads its capability
/// entry before touching the descriptor, so a configuration failure
/// never leaves the terminal in a modified state.
#[derive(Debug)]
pub struct UnixTerminal {
    read: TtyReadHandle,
    write: TtyWriteHandle,
    input_fd: RawFd,
    saved: Termios,
    term_type: String,
    caps: Database,
}

impl UnixTerminal {
    /// Open a session: resolve the terminal type from the
    /// environment, load its capability database entry, remember
    /// `attributes` as the restore point, and apply them to the
    /// input descriptor.
    pub fn open(
        attributes: Termios,
        when: SetAttributeWhen,
        options: SessionOptions,
    ) -> Result<UnixTerminal> {
        let term_type = options
            .environment
            .lookup(&options.term_var)
            .ok_or_else(|| ConfigurationError::MissingTerminalType(options.term_var.clone()))?;

        let caps = Database::for_terminal(&term_type, options.environment.as_ref())?
            .ok_or_else(|| ConfigurationError::UnknownTerminalType(term_type.clone()))?;
        trace!("opened capability entry for terminal type {}", term_type);

        let read = TtyReadHandle::new(dup_fd(options.input_fd)?);
        let write = TtyWriteHandle::new(dup_fd(options.output_fd)?);

        let session = UnixTerminal {
            input_fd: read.fd.as_raw_fd(),
            read,
            write,
            saved: attributes,
            term_type,
            caps,
        };
        session.apply_saved(&when)?;
        Ok(session)
    }

    /// Open against the conventional defaults: `TERM`, standard
    /// input/output, attribute change after output drains.
    pub fn with_defaults(attributes: Termios) -> Result<UnixTerminal> {
        Self::open(
            attributes,
            SetAttributeWhen::AfterDrainOutputQueue,
            SessionOptions::default(),
        )
    }

    /// The terminal type this session was validated against.
    pub fn terminal_type(&self) -> &str {
        &self.term_type
    }

    /// The capability entry loaded at open.
    pub fn capabilities(&self) -> &Database {
        &self.caps
    }

    /// A capability executor bound to this session's entry.
    pub fn renderer(&self) -> TermcapRenderer {
        TermcapRenderer::new(self.caps.clone())
    }

    /// Re-apply the attributes saved at open, e.g. to reassert raw
    /// mode after a suspend/resume.
    pub fn set_attributes(&mut self, when: SetAttributeWhen) -> Result<()> {
        self.apply_saved(&when)
    }

    /// Restore the attributes saved at open.  The saved snapshot is
    /// the only attribute state the session retains, so this is the
    /// same operation as [`UnixTerminal::set_attributes`]; it exists
    /// so that exit paths read as what they are.
    pub fn restore_saved_attributes(&mut self, when: SetAttributeWhen) -> Result<()> {
        self.apply_saved(&when)
    }

    fn apply_saved(&self, when: &SetAttributeWhen) -> Result<()> {
        set_terminal_attributes(self.input_fd, when, &self.saved)
    }

    /// Blocking read of raw bytes from the session's input.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.read.read(buf)?)
    }

    /// Write text to the session's output.
    pub fn print(&mut self, text: &str) -> Result<usize> {
        self.write_bytes(text.as_bytes())
    }

    /// Write raw bytes to the session's output.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<usize> {
        self.write.write_all(bytes)?;
        self.write.flush()?;
        Ok(bytes.len())
    }

    /// Run a list of capability commands against the session's
    /// output, stopping at the first failure.
    pub fn execute(&mut self, commands: &[FullCommand]) -> Result<()> {
        let renderer = self.renderer();
        renderer.execute_all(&mut self.write, commands)?;
        Ok(())
    }
}

fn dup_fd(fd: RawFd) -> Result<FileDescriptor> {
    FileDescriptor::dup(&fd)
        .map_err(|err| SyscallError::new("dup", IoError::new(ErrorKind::Other, err)).into())
}
