//! Structural checks applied before any proof is interpreted.

use sanctity_core::Proof;

use crate::error::{Result, VerifyError};

/// Reject proofs that are empty or longer than `max_len` bytes.
pub fn ensure_well_formed(proof: &Proof, max_len: usize) -> Result<()> {
    if proof.is_empty() {
        return Err(VerifyError::EmptyProof);
    }
    if proof.len() > max_len {
        return Err(VerifyError::ProofTooLarge {
            len: proof.len(),
            max: max_len,
        });
    }
    Ok(())
}
