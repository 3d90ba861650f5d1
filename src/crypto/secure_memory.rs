//! Secure memory handling for volume passphrases
//!
//! The passphrase only ever travels to an external tool through its stdin
//! pipe. It is wiped from memory when dropped and never printed.

use std::fmt;

use zeroize::Zeroizing;

/// A passphrase that zeros its contents on drop
///
/// `Debug` and `Display` are redacted so a passphrase cannot leak into logs.
#[derive(Clone)]
pub struct Passphrase {
    inner: Zeroizing<String>,
}

impl Passphrase {
    /// Create a new Passphrase
    pub fn new(s: impl Into<String>) -> Self {
        Self {
            inner: Zeroizing::new(s.into()),
        }
    }

    /// Get the passphrase contents
    pub fn expose(&self) -> &str {
        self.inner.as_str()
    }

    /// Bytes to stream into a tool's stdin
    pub fn to_stdin(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.inner.as_bytes().to_vec())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl From<String> for Passphrase {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for Passphrase {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl PartialEq for Passphrase {
    fn eq(&self, other: &Self) -> bool {
        self.inner.as_str() == other.inner.as_str()
    }
}

impl Eq for Passphrase {}

// Don't print the contents in Debug output
impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Passphrase")
            .field("len", &self.inner.len())
            .finish()
    }
}

// Don't print the contents in Display output
impl fmt::Display for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED {} bytes]", self.inner.len())
    }
}
