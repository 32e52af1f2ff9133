//! Allow-list verifier keyed by proof digest.
//!
//! Each accepted proof is registered ahead of time together with the one
//! statement it proves. A proof presented for any other statement, or never
//! registered, is rejected. Lookups go by SHA-256 of the proof bytes, so the
//! table never holds proof contents.

use std::collections::HashMap;

use parking_lot::RwLock;
use sanctity_core::{Commitment, Hash32, Proof};

use crate::error::{Result, VerifyError};
use crate::structural::ensure_well_formed;
use crate::Verifier;

/// The statement a registered proof attests to.
#[derive(Debug, Clone, PartialEq)]
pub enum Grant {
    /// The artifact behind `commitment` is authentic.
    Identity { commitment: Commitment },
    /// `new` may replace `old`.
    Transition { old: Commitment, new: Commitment },
    /// The artifact behind `commitment` measured `bits` of entropy per byte.
    Entropy { commitment: Commitment, bits: f64 },
}

/// Content-addressed table of known-good proofs.
#[derive(Debug)]
pub struct ProofTable {
    grants: RwLock<HashMap<Hash32, Grant>>,
    max_proof_bytes: usize,
}

impl ProofTable {
    /// Default upper bound on accepted proof size.
    pub const DEFAULT_MAX_PROOF_BYTES: usize = 64 * 1024;

    /// An empty table with the default proof size cap.
    pub fn new() -> Self {
        Self::with_max_proof_bytes(Self::DEFAULT_MAX_PROOF_BYTES)
    }

    /// An empty table refusing proofs longer than `max_proof_bytes`.
    pub fn with_max_proof_bytes(max_proof_bytes: usize) -> Self {
        ProofTable {
            grants: RwLock::new(HashMap::new()),
            max_proof_bytes,
        }
    }

    /// Register `proof` as an identity proof for `commitment`.
    pub fn allow_identity(&self, proof: &Proof, commitment: Commitment) -> Result<()> {
        self.insert(proof, Grant::Identity { commitment })
    }

    /// Register `proof` as authorizing the transition `old -> new`.
    pub fn allow_transition(&self, proof: &Proof, old: Commitment, new: Commitment) -> Result<()> {
        if old == new {
            return Err(VerifyError::Malformed {
                detail: "transition must change the commitment".to_string(),
            });
        }
        self.insert(proof, Grant::Transition { old, new })
    }

    /// Register `proof` as attesting `bits` of entropy for `commitment`.
    pub fn allow_entropy(&self, proof: &Proof, commitment: Commitment, bits: f64) -> Result<()> {
        if !bits.is_finite() || bits < 0.0 {
            return Err(VerifyError::Malformed {
                detail: format!("entropy attestation must be finite and non-negative, got {bits}"),
            });
        }
        self.insert(proof, Grant::Entropy { commitment, bits })
    }

    /// Withdraw a proof. Returns whether it was registered.
    pub fn withdraw(&self, proof: &Proof) -> bool {
        self.grants.write().remove(&proof.digest()).is_some()
    }

    /// Number of granted proofs.
    pub fn len(&self) -> usize {
        self.grants.read().len()
    }

    /// True if no proof has been granted.
    pub fn is_empty(&self) -> bool {
        self.grants.read().is_empty()
    }

    fn insert(&self, proof: &Proof, grant: Grant) -> Result<()> {
        ensure_well_formed(proof, self.max_proof_bytes)?;
        self.grants.write().insert(proof.digest(), grant);
        Ok(())
    }

    fn lookup(&self, proof: &Proof) -> Result<Option<Grant>> {
        ensure_well_formed(proof, self.max_proof_bytes)?;
        Ok(self.grants.read().get(&proof.digest()).cloned())
    }
}

impl Default for ProofTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Verifier for ProofTable {
    fn check_identity(&self, proof: &Proof, commitment: &Commitment) -> Result<bool> {
        Ok(matches!(
            self.lookup(proof)?,
            Some(Grant::Identity { commitment: c }) if c == *commitment
        ))
    }

    fn check_transition(&self, proof: &Proof, old: &Commitment, new: &Commitment) -> Result<bool> {
        if old == new {
            return Ok(false);
        }
        Ok(matches!(
            self.lookup(proof)?,
            Some(Grant::Transition { old: o, new: n }) if o == *old && n == *new
        ))
    }

    fn check_entropy(
        &self,
        proof: &Proof,
        commitment: &Commitment,
        threshold: f64,
    ) -> Result<bool> {
        Ok(matches!(
            self.lookup(proof)?,
            Some(Grant::Entropy { commitment: c, bits }) if c == *commitment && bits >= threshold
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(tag: &str) -> Proof {
        Proof::new(tag.as_bytes().to_vec())
    }

    #[test]
    fn identity_grant_binds_commitment() {
        let table = ProofTable::new();
        let h0 = Commitment::of(b"h0");
        table.allow_identity(&p("id-h0"), h0).unwrap();

        assert!(table.check_identity(&p("id-h0"), &h0).unwrap());
        assert!(!table.check_identity(&p("id-h0"), &Commitment::of(b"h1")).unwrap());
        assert!(!table.check_identity(&p("unknown"), &h0).unwrap());
    }

    #[test]
    fn grants_do_not_cross_kinds() {
        let table = ProofTable::new();
        let h0 = Commitment::of(b"h0");
        let h1 = Commitment::of(b"h1");
        table.allow_transition(&p("t"), h0, h1).unwrap();

        assert!(table.check_transition(&p("t"), &h0, &h1).unwrap());
        assert!(!table.check_transition(&p("t"), &h1, &h0).unwrap());
        assert!(!table.check_identity(&p("t"), &h0).unwrap());
        assert!(!table.check_entropy(&p("t"), &h0, 0.0).unwrap());
    }

    #[test]
    fn same_commitment_transition_never_allowed() {
        let table = ProofTable::new();
        let h0 = Commitment::of(b"h0");
        assert!(table.allow_transition(&p("t"), h0, h0).is_err());
        assert!(!table.check_transition(&p("t"), &h0, &h0).unwrap());
    }

    #[test]
    fn entropy_meets_threshold() {
        let table = ProofTable::new();
        let h0 = Commitment::of(b"h0");
        table.allow_entropy(&p("e"), h0, 7.5).unwrap();

        assert!(table.check_entropy(&p("e"), &h0, 7.2).unwrap());
        assert!(table.check_entropy(&p("e"), &h0, 7.5).unwrap());
        assert!(!table.check_entropy(&p("e"), &h0, 7.6).unwrap());
        assert!(table.allow_entropy(&p("nan"), h0, f64::NAN).is_err());
    }

    #[test]
    fn withdraw_revokes_acceptance() {
        let table = ProofTable::new();
        let h0 = Commitment::of(b"h0");
        table.allow_identity(&p("id"), h0).unwrap();
        assert_eq!(table.len(), 1);

        assert!(table.withdraw(&p("id")));
        assert!(!table.withdraw(&p("id")));
        assert!(table.is_empty());
        assert!(!table.check_identity(&p("id"), &h0).unwrap());
    }

    #[test]
    fn structural_errors_surface() {
        let table = ProofTable::with_max_proof_bytes(4);
        let h0 = Commitment::of(b"h0");
        assert_eq!(
            table.check_identity(&Proof::new(Vec::new()), &h0),
            Err(VerifyError::EmptyProof)
        );
        assert_eq!(
            table.allow_identity(&p("too long"), h0),
            Err(VerifyError::ProofTooLarge { len: 8, max: 4 })
        );
    }
}
