//! Error types.
use std::borrow::Cow;
use std::io::Error as IoError;
use thiserror::Error;

/// Convenient return type for functions.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Generic I/O error.
    #[error("i/o: {0}")]
    Io(#[from] IoError),

    /// Session construction failed; not retriable.
    #[error("configuration: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Capability resolution or execution failed.
    #[error("capability: {0}")]
    Capability(#[from] CapabilityError),

    /// A primitive OS operation failed.
    #[error("syscall: {0}")]
    Syscall(#[from] SyscallError),
}

/// Raised while constructing a terminal session.  These are fatal to
/// the session and are never retried.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// The terminal-type environment variable was not set.
    #[error("terminal type variable `{0}` is not set in the environment")]
    MissingTerminalType(String),

    /// The capability database has no entry for the terminal type.
    #[error("no capability database entry for terminal type `{0}`")]
    UnknownTerminalType(String),
}

/// Raised while resolving or executing a terminal capability.  An
/// absent capability is not an error; see `render::CapOutcome`.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// The capability template contained a substitution code we do
    /// not understand.
    #[error("malformed capability template `{template}`: {reason}")]
    MalformedTemplate { template: String, reason: String },

    /// Writing the expanded sequence to the terminal failed.
    #[error("failed to write capability sequence: {0}")]
    ExecutionFailed(#[source] IoError),
}

/// Wraps the errno from a failed OS call together with the name of
/// the call, for a human readable diagnostic.
#[derive(Debug, Error)]
#[error("{name} failed: {source}")]
pub struct SyscallError {
    name: Cow<'static, str>,
    source: IoError,
}

impl SyscallError {
    /// Capture `errno` from the calling thread for the named syscall.
    pub(crate) fn last(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            source: IoError::last_os_error(),
        }
    }

    pub(crate) fn new(name: impl Into<Cow<'static, str>>, source: IoError) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }
}
