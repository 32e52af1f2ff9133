//! Caller identities.

use serde::{Deserialize, Serialize};

/// An opaque caller identity.
///
/// Principals carry no structure: two principals are the same caller only
/// if their strings are byte-for-byte equal. There is no delegation and no
/// role beyond "is the recorded owner".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    /// Wrap an identity string as-is.
    pub fn new(identity: impl Into<String>) -> Self {
        Principal(identity.into())
    }

    /// The identity string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An empty principal names nobody and is rejected wherever an owner is
    /// required.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Principal {
    fn from(value: &str) -> Self {
        Principal::new(value)
    }
}

impl From<String> for Principal {
    fn from(value: String) -> Self {
        Principal(value)
    }
}
