//! Environment variable access as an explicit, injectable provider.
//!
//! Session construction needs the terminal type (conventionally the
//! `TERM` variable) and the capability database location (`TERMCAP`).
//! Rather than reading ambient process state directly, those lookups
//! go through the [`Environment`] trait so that tests can supply a
//! deterministic environment.

use std::collections::HashMap;

/// A source of environment variable values.
pub trait Environment {
    /// Look up the value of a variable.  `None` means the variable is
    /// not set; an empty string is a legitimate set value.
    fn lookup(&self, name: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn lookup(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Fixed environments for tests and embedding applications.
impl Environment for HashMap<String, String> {
    fn lookup(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn map_environment() {
        let mut env = HashMap::new();
        env.insert("TERM".to_string(), "vt100".to_string());
        env.insert("EMPTY".to_string(), String::new());

        assert_eq!(env.lookup("TERM"), Some("vt100".to_string()));
        assert_eq!(env.lookup("EMPTY"), Some(String::new()));
        assert_eq!(env.lookup("TERMCAP"), None);
    }
}
