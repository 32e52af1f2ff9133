//! Opaque proof blobs.

use serde::{Deserialize, Serialize};

use crate::hash::Hash32;

/// An opaque proof handed to a verifier. The registry never looks inside.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Proof(Vec<u8>);

impl Proof {
    /// Wrap raw proof bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Proof(bytes.into())
    }

    /// The raw proof bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for a zero-length proof.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// SHA-256 of the proof bytes.
    pub fn digest(&self) -> Hash32 {
        Hash32::compute(&self.0)
    }
}

// Proof bytes may be large and are not meant for logs.
impl std::fmt::Debug for Proof {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proof")
            .field("len", &self.0.len())
            .field("digest", &self.digest())
            .finish()
    }
}

impl From<Vec<u8>> for Proof {
    fn from(value: Vec<u8>) -> Self {
        Proof(value)
    }
}

impl From<&[u8]> for Proof {
    fn from(value: &[u8]) -> Self {
        Proof(value.to_vec())
    }
}
