//! Fixed-size content hashes for identifiers and commitments.
//!
//! Identifiers and commitments are both SHA-256 digests but are kept as
//! distinct types so one can never be passed where the other is expected.
//! Equality is byte-exact; hex input is accepted in either case and always
//! rendered lowercase.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{CoreError, Result};

/// A 32-byte SHA-256 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Hash32([u8; 32]);

impl Hash32 {
    /// Digest length in bytes.
    pub const LEN: usize = 32;

    /// Wrap raw digest bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Hash32(bytes)
    }

    /// Compute the SHA-256 hash of the given data.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Hash32(hasher.finalize().into())
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(input: &str) -> Result<Self> {
        let bytes = hex::decode(input).map_err(|e| CoreError::InvalidHex {
            input: input.to_string(),
            detail: e.to_string(),
        })?;
        let actual = bytes.len();
        let array: [u8; 32] = bytes.try_into().map_err(|_| CoreError::InvalidLength {
            expected: Self::LEN,
            actual,
        })?;
        Ok(Hash32(array))
    }

    /// Lowercase hex representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Leading eight bytes as an integer, used to spread keys over shards.
    pub fn prefix_u64(&self) -> u64 {
        let mut head = [0u8; 8];
        head.copy_from_slice(&self.0[..8]);
        u64::from_be_bytes(head)
    }
}

impl std::fmt::Display for Hash32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hash32({})", &self.to_hex()[..12])
    }
}

impl TryFrom<String> for Hash32 {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        Hash32::from_hex(&value)
    }
}

impl From<Hash32> for String {
    fn from(value: Hash32) -> Self {
        value.to_hex()
    }
}

/// Identifier of a registry record. Assigned by the registering caller and
/// never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(Hash32);

impl ArtifactId {
    /// Wrap an existing digest as an identifier.
    pub const fn new(hash: Hash32) -> Self {
        ArtifactId(hash)
    }

    /// Derive an identifier from a human-readable label (e.g. `"m1"`).
    pub fn derive(label: impl AsRef<[u8]>) -> Self {
        ArtifactId(Hash32::compute(label.as_ref()))
    }

    /// Parse 64 hex characters.
    pub fn from_hex(input: &str) -> Result<Self> {
        Hash32::from_hex(input).map(ArtifactId)
    }

    /// The underlying digest.
    pub fn hash(&self) -> &Hash32 {
        &self.0
    }
}

impl std::fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Content binding of an artifact, typically the hash of its encrypted bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Commitment(Hash32);

impl Commitment {
    /// Wrap an existing digest as a commitment.
    pub const fn new(hash: Hash32) -> Self {
        Commitment(hash)
    }

    /// Commit to the given artifact content.
    pub fn of(content: impl AsRef<[u8]>) -> Self {
        Commitment(Hash32::compute(content.as_ref()))
    }

    /// Parse 64 hex characters.
    pub fn from_hex(input: &str) -> Result<Self> {
        Hash32::from_hex(input).map(Commitment)
    }

    /// The underlying digest.
    pub fn hash(&self) -> &Hash32 {
        &self.0
    }
}

impl std::fmt::Display for Commitment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_deterministic() {
        let h1 = Hash32::compute(b"hello world");
        let h2 = Hash32::compute(b"hello world");
        assert_eq!(h1, h2);
    }

    #[test]
    fn hash_differs_for_different_data() {
        assert_ne!(Hash32::compute(b"hello"), Hash32::compute(b"world"));
    }

    #[test]
    fn hash_format() {
        // SHA-256 of empty input is well-known
        assert_eq!(
            Hash32::compute(b"").to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn hex_round_trip_is_case_insensitive() {
        let h = Hash32::compute(b"model weights");
        let upper = h.to_hex().to_uppercase();
        assert_eq!(Hash32::from_hex(&upper).unwrap(), h);
        assert_eq!(Hash32::from_hex(&h.to_hex()).unwrap().to_hex(), h.to_hex());
    }

    #[test]
    fn from_hex_rejects_bad_input() {
        assert!(matches!(
            Hash32::from_hex("zz"),
            Err(CoreError::InvalidHex { .. })
        ));
        assert_eq!(
            Hash32::from_hex("abcd"),
            Err(CoreError::InvalidLength {
                expected: 32,
                actual: 2
            })
        );
    }

    #[test]
    fn ids_and_commitments_serialize_as_hex() {
        let id = ArtifactId::derive("m1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.hash().to_hex()));
        let back: ArtifactId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);

        let bad: std::result::Result<Commitment, _> = serde_json::from_str("\"1234\"");
        assert!(bad.is_err());
    }

    #[test]
    fn derive_matches_compute() {
        assert_eq!(ArtifactId::derive("m1").hash(), &Hash32::compute(b"m1"));
        assert_eq!(Commitment::of(b"h0").hash(), &Hash32::compute(b"h0"));
    }

    #[test]
    fn debug_is_abbreviated() {
        let h = Hash32::compute(b"x");
        let dbg = format!("{h:?}");
        assert_eq!(dbg, format!("Hash32({})", &h.to_hex()[..12]));
    }
}
