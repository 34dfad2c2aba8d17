//! An abstraction over the terminal device.
//!
//! A [`UnixTerminal`] is one session against one terminal device for
//! the lifetime of the process: it validates the terminal type named
//! by the environment, loads the capability database entry for it,
//! and applies the caller's attributes to the input descriptor while
//! remembering them as the session's restore point.
//!
//! The session never restores attributes implicitly.  The caller owns
//! the exit paths and must invoke
//! [`UnixTerminal::restore_saved_attributes`] on each of them before
//! the descriptor goes away.

use crate::builder;
use crate::env::{Environment, ProcessEnvironment};
use std::os::unix::io::RawFd;

pub mod unix;

pub use unix::{SetAttributeWhen, UnixTerminal};

builder! {
    /// Options for opening a terminal session.  The defaults describe
    /// the conventional interactive setup: terminal type from `TERM`,
    /// attributes applied to standard input, sequences written to
    /// standard output, environment read from the process.
    pub struct SessionOptions {
        /// Name of the environment variable that carries the
        /// terminal type.
        term_var: String = "TERM".to_string(),
        /// Descriptor the attributes are applied to and input is
        /// read from.
        input_fd: RawFd = libc::STDIN_FILENO,
        /// Descriptor capability sequences and output are written to.
        output_fd: RawFd = libc::STDOUT_FILENO,
        /// Environment provider consulted for the terminal type and
        /// the database location.
        environment: Box<dyn Environment> = Box::new(ProcessEnvironment),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_options_describe_the_conventional_setup() {
        let options = SessionOptions::default();
        assert_eq!(options.term_var, "TERM");
        assert_eq!(options.input_fd, libc::STDIN_FILENO);
        assert_eq!(options.output_fd, libc::STDOUT_FILENO);

        let options = options.term_var("MY_TERM".to_string());
        assert_eq!(options.term_var, "MY_TERM");
    }
}
