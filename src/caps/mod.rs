//! # Terminal capability database
//!
//! Capability lookup here speaks the classic `termcap` dialect: a
//! textual database of `:`-separated fields keyed by two-letter
//! identifiers, one entry per terminal type.  An entry is located by
//! consulting, in order:
//!
//! 1. the `TERMCAP` environment variable, whose value is either the
//!    entry text itself (anything containing a `:`) or the path of a
//!    database file;
//! 2. the system database at `/etc/termcap`.
//!
//! Entries may borrow from one another through the `tc=` capability;
//! borrowed capabilities never override ones the entry defines
//! itself.  Absence of a capability is an ordinary outcome, not an
//! error: not every terminal type supports every capability, and the
//! typed lookups all return `Option`/`bool` accordingly.
//!
//! The entry for a terminal type is loaded once, at session open, and
//! is read-only from then on.

use crate::env::Environment;
use crate::Result;
use log::{debug, trace};
use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::Path;

/// Default location of the system capability database.
pub const SYSTEM_DATABASE: &str = "/etc/termcap";

/// How deep a `tc=` chain may reach before we give up.
const MAX_TC_DEPTH: usize = 16;

/// The parsed capability entry for one terminal type.
#[derive(Debug, Clone, Default)]
pub struct Database {
    names: Vec<String>,
    strings: HashMap<String, String>,
    flags: HashSet<String>,
    numbers: HashMap<String, u32>,
}

impl Database {
    /// Locate and parse the entry for `term`, following the classic
    /// `TERMCAP` conventions described in the module docs.  `Ok(None)`
    /// means no entry exists for that terminal type; a missing
    /// database file is treated the same way.
    pub fn for_terminal(term: &str, env: &dyn Environment) -> Result<Option<Self>> {
        if let Some(termcap) = env.lookup("TERMCAP") {
            if termcap.contains(':') {
                trace!("using inline TERMCAP entry for {}", term);
                if let Some(db) = Self::from_source(&termcap, term) {
                    return Ok(Some(db));
                }
            // inline text that doesn't describe this terminal falls
            // through to the system database
            } else if !termcap.is_empty() {
                trace!("using TERMCAP database file {}", termcap);
                return Self::from_file(Path::new(&termcap), term);
            }
        }
        Self::from_file(Path::new(SYSTEM_DATABASE), term)
    }

    /// Parse the entry for `term` out of an on-disk database.
    pub fn from_file(path: &Path, term: &str) -> Result<Option<Self>> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("capability database {} does not exist", path.display());
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };
        Ok(Self::from_source(&text, term))
    }

    /// Parse the entry for `term` out of database text.
    pub fn from_source(source: &str, term: &str) -> Option<Self> {
        let entries: Vec<String> = logical_lines(source).collect();
        let raw = find_entry(&entries, term)?;

        let mut db = Database::default();
        let mut cancelled = HashSet::new();
        db.absorb(raw, &mut cancelled);

        // Chase tc= references breadth-last: each link may only add
        // capabilities the chain has not defined yet.
        let mut depth = 0;
        while let Some(base) = db.strings.remove("tc") {
            depth += 1;
            if depth > MAX_TC_DEPTH {
                debug!("tc= chain for {} exceeds depth {}", term, MAX_TC_DEPTH);
                break;
            }
            match find_entry(&entries, &base) {
                Some(raw) => db.absorb(raw, &mut cancelled),
                None => {
                    debug!("tc= reference `{}` not found", base);
                    break;
                }
            }
        }

        Some(db)
    }

    /// The names this entry answers to, including the trailing long
    /// description if the entry carries one.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Look up a string capability, decoding the `\E`/`^X`/octal
    /// escapes into the byte sequence to emit.  Any padding prefix is
    /// preserved for the executor to interpret.
    pub fn get_str(&self, id: &str) -> Option<Vec<u8>> {
        self.strings.get(id).map(|raw| decode_escapes(raw))
    }

    /// Look up a boolean capability.  Absent means `false`.
    pub fn get_flag(&self, id: &str) -> bool {
        self.flags.contains(id)
    }

    /// Look up a numeric capability.
    pub fn get_num(&self, id: &str) -> Option<u32> {
        self.numbers.get(id).copied()
    }

    /// Fold one raw entry's fields into this database.  Capabilities
    /// already defined (or cancelled with `xx@`) are left alone, which
    /// is what makes `tc=` chains non-overriding.
    fn absorb(&mut self, raw: &str, cancelled: &mut HashSet<String>) {
        let mut fields = split_fields(raw).into_iter();

        if let Some(name_field) = fields.next() {
            if self.names.is_empty() {
                self.names = name_field.split('|').map(|s| s.trim().to_string()).collect();
            }
        }

        for field in fields {
            let field = field.trim();
            if field.is_empty() {
                continue;
            }
            if let Some(eq) = field.find('=') {
                let (id, value) = (&field[..eq], &field[eq + 1..]);
                if !cancelled.contains(id) && !self.strings.contains_key(id) {
                    self.strings.insert(id.to_string(), value.to_string());
                }
            } else if let Some(hash) = field.find('#') {
                let (id, value) = (&field[..hash], &field[hash + 1..]);
                if cancelled.contains(id) || self.numbers.contains_key(id) {
                    continue;
                }
                if let Some(n) = parse_number(value) {
                    self.numbers.insert(id.to_string(), n);
                }
            } else if let Some(id) = field.strip_suffix('@') {
                // a later tc= link must not resurrect a cancelled id
                cancelled.insert(id.to_string());
            } else if !cancelled.contains(field) && !self.flags.contains(field) {
                self.flags.insert(field.to_string());
            }
        }
    }
}

/// Join continuation lines and drop comments, yielding one logical
/// line per entry.
fn logical_lines(source: &str) -> impl Iterator<Item = String> + '_ {
    let mut lines = source.lines();
    std::iter::from_fn(move || {
        let mut entry = String::new();
        for line in lines.by_ref() {
            let line = line.trim_end();
            if entry.is_empty() {
                let trimmed = line.trim_start();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    continue;
                }
            }
            if let Some(stripped) = line.strip_suffix('\\') {
                entry.push_str(stripped.trim_start());
            } else {
                entry.push_str(line.trim_start());
                return Some(entry);
            }
        }
        if entry.is_empty() {
            None
        } else {
            Some(entry)
        }
    })
}

/// Find the logical line describing `term` by exact match against any
/// of its `|`-separated names.
fn find_entry<'a>(entries: &'a [String], term: &str) -> Option<&'a str> {
    for entry in entries {
        let name_field = entry.split(':').next().unwrap_or("");
        if name_field.split('|').any(|name| name.trim() == term) {
            return Some(entry);
        }
    }
    None
}

/// Split an entry into `:`-separated fields, honoring backslash
/// escapes so that `\:` inside a capability value does not split.
fn split_fields(entry: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    for ch in entry.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
        } else if ch == '\\' {
            current.push(ch);
            escaped = true;
        } else if ch == ':' {
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() {
        fields.push(current);
    }
    fields
}

/// termcap numerics are decimal, or octal with a leading zero.
fn parse_number(value: &str) -> Option<u32> {
    if value.len() > 1 && value.starts_with('0') {
        u32::from_str_radix(&value[1..], 8).ok()
    } else {
        value.parse().ok()
    }
}

/// Decode the escape conventions used inside string capabilities.
/// The result is raw bytes; an octal escape like `\341` yields the
/// single byte 0xe1, which has no `char` representation.
fn decode_escapes(raw: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut bytes = raw.bytes().peekable();
    while let Some(b) = bytes.next() {
        match b {
            b'\\' => match bytes.next() {
                Some(b'E') | Some(b'e') => out.push(0x1b),
                Some(b'n') => out.push(b'\n'),
                Some(b'r') => out.push(b'\r'),
                Some(b't') => out.push(b'\t'),
                Some(b'b') => out.push(0x08),
                Some(b'f') => out.push(0x0c),
                Some(b's') => out.push(b' '),
                Some(b'^') => out.push(b'^'),
                Some(b'\\') => out.push(b'\\'),
                Some(b':') => out.push(b':'),
                Some(d) if (b'0'..=b'7').contains(&d) => {
                    let mut value = u32::from(d - b'0');
                    for _ in 0..2 {
                        match bytes.peek().copied().filter(|c| (b'0'..=b'7').contains(c)) {
                            Some(digit) => {
                                value = value * 8 + u32::from(digit - b'0');
                                bytes.next();
                            }
                            None => break,
                        }
                    }
                    out.push(value as u8);
                }
                Some(other) => out.push(other),
                None => {}
            },
            b'^' => match bytes.next() {
                Some(b'?') => out.push(0x7f),
                Some(c) => out.push(c & 0x1f),
                None => out.push(b'^'),
            },
            _ => out.push(b),
        }
    }
    out
}
