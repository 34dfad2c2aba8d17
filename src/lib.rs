//! # ttycap
//!
//! This crate provides typed access to two closely related pieces of
//! classic Unix terminal plumbing:
//!
//! * The termios line-discipline attribute model.  The four flag words
//!   of the kernel `termios` structure are decomposed into closed,
//!   strongly typed catalogs of named behaviors ([`flags::FlagSet`]),
//!   so that callers can reason about "canonicalize input" or
//!   "enable echo" instead of raw bit patterns, and recompose them
//!   bit-exactly before committing them to a file descriptor.
//! * The termcap capability database.  [`caps::Database`] locates and
//!   parses the textual entry for a terminal type, and
//!   [`render::TermcapRenderer`] expands cursor-addressing templates
//!   and writes control sequences through the classic affected-line
//!   padding discipline.
//!
//! [`terminal::UnixTerminal`] ties the two together: it validates the
//! terminal type from the environment, saves a restore point for the
//! supplied attributes and applies them to the tty, giving the caller
//! per-keystroke raw input with an explicit, caller-driven restore.
//!
//! The decompose/recompose round trip is intentionally lossy outside
//! of each catalog's coverage mask: bits the catalog does not know
//! about are dropped.  Callers that need to preserve unknown bits must
//! carry them separately.

pub mod caps;
pub mod cc;
pub mod env;
pub mod error;
pub mod flags;
mod macros;
pub mod render;
pub mod terminal;
pub mod termios;

pub use error::{Error, Result};
