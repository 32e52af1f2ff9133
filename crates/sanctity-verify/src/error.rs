//! Verifier error types.

/// Reasons a proof could not be checked.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    /// Zero-length proofs carry no evidence.
    #[error("proof is empty")]
    EmptyProof,

    /// Proof exceeds the accepted size.
    #[error("proof is {len} bytes, limit is {max}")]
    ProofTooLarge { len: usize, max: usize },

    /// Proof is structurally invalid for this verifier.
    #[error("malformed proof: {detail}")]
    Malformed { detail: String },
}

/// Result type alias for verifier operations.
pub type Result<T> = std::result::Result<T, VerifyError>;
