//! A verifier with switchable verdicts, for tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use sanctity_core::{Commitment, Proof};

use crate::error::Result;
use crate::structural::ensure_well_formed;
use crate::Verifier;

/// Number of times each check has been consulted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// Calls to `check_identity`.
    pub identity: usize,
    /// Calls to `check_transition`.
    pub transition: usize,
    /// Calls to `check_entropy`.
    pub entropy: usize,
}

impl CallCounts {
    /// Calls across all three checks.
    pub fn total(&self) -> usize {
        self.identity + self.transition + self.entropy
    }
}

/// Returns a preset verdict for each kind of check, regardless of the proof
/// contents, and counts how often it was asked.
///
/// Contract rules still apply: empty proofs are an input error and a
/// transition onto the same commitment is always rejected.
#[derive(Debug)]
pub struct FixedVerifier {
    identity: AtomicBool,
    transition: AtomicBool,
    entropy: AtomicBool,
    identity_calls: AtomicUsize,
    transition_calls: AtomicUsize,
    entropy_calls: AtomicUsize,
}

impl FixedVerifier {
    /// A verifier answering each check with the given verdict.
    pub fn new(identity: bool, transition: bool, entropy: bool) -> Self {
        FixedVerifier {
            identity: AtomicBool::new(identity),
            transition: AtomicBool::new(transition),
            entropy: AtomicBool::new(entropy),
            identity_calls: AtomicUsize::new(0),
            transition_calls: AtomicUsize::new(0),
            entropy_calls: AtomicUsize::new(0),
        }
    }

    /// Accept every well-formed proof.
    pub fn accepting() -> Self {
        Self::new(true, true, true)
    }

    /// Reject every proof.
    pub fn rejecting() -> Self {
        Self::new(false, false, false)
    }

    /// Change the identity verdict.
    pub fn set_identity(&self, verdict: bool) {
        self.identity.store(verdict, Ordering::SeqCst);
    }

    /// Change the transition verdict.
    pub fn set_transition(&self, verdict: bool) {
        self.transition.store(verdict, Ordering::SeqCst);
    }

    /// Change the entropy verdict.
    pub fn set_entropy(&self, verdict: bool) {
        self.entropy.store(verdict, Ordering::SeqCst);
    }

    /// How often each check has been called so far.
    pub fn calls(&self) -> CallCounts {
        CallCounts {
            identity: self.identity_calls.load(Ordering::SeqCst),
            transition: self.transition_calls.load(Ordering::SeqCst),
            entropy: self.entropy_calls.load(Ordering::SeqCst),
        }
    }
}

impl Verifier for FixedVerifier {
    fn check_identity(&self, proof: &Proof, _commitment: &Commitment) -> Result<bool> {
        self.identity_calls.fetch_add(1, Ordering::SeqCst);
        ensure_well_formed(proof, usize::MAX)?;
        Ok(self.identity.load(Ordering::SeqCst))
    }

    fn check_transition(&self, proof: &Proof, old: &Commitment, new: &Commitment) -> Result<bool> {
        self.transition_calls.fetch_add(1, Ordering::SeqCst);
        ensure_well_formed(proof, usize::MAX)?;
        if old == new {
            return Ok(false);
        }
        Ok(self.transition.load(Ordering::SeqCst))
    }

    fn check_entropy(
        &self,
        proof: &Proof,
        _commitment: &Commitment,
        _threshold: f64,
    ) -> Result<bool> {
        self.entropy_calls.fetch_add(1, Ordering::SeqCst);
        ensure_well_formed(proof, usize::MAX)?;
        Ok(self.entropy.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VerifyError;

    fn proof() -> Proof {
        Proof::new(b"p".to_vec())
    }

    #[test]
    fn verdicts_follow_flags() {
        let v = FixedVerifier::new(true, false, true);
        let c = Commitment::of(b"h0");
        assert!(v.check_identity(&proof(), &c).unwrap());
        assert!(!v.check_transition(&proof(), &c, &Commitment::of(b"h1")).unwrap());
        assert!(v.check_entropy(&proof(), &c, 7.2).unwrap());

        v.set_identity(false);
        v.set_transition(true);
        v.set_entropy(false);
        assert!(!v.check_identity(&proof(), &c).unwrap());
        assert!(v.check_transition(&proof(), &c, &Commitment::of(b"h1")).unwrap());
        assert!(!v.check_entropy(&proof(), &c, 7.2).unwrap());
    }

    #[test]
    fn same_commitment_transition_rejected() {
        let v = FixedVerifier::accepting();
        let c = Commitment::of(b"h0");
        assert!(!v.check_transition(&proof(), &c, &c).unwrap());
    }

    #[test]
    fn empty_proof_is_input_error() {
        let v = FixedVerifier::accepting();
        let c = Commitment::of(b"h0");
        assert_eq!(
            v.check_identity(&Proof::new(Vec::new()), &c),
            Err(VerifyError::EmptyProof)
        );
    }

    #[test]
    fn counts_calls() {
        let v = FixedVerifier::rejecting();
        let c = Commitment::of(b"h0");
        let _ = v.check_identity(&proof(), &c);
        let _ = v.check_identity(&proof(), &c);
        let _ = v.check_entropy(&proof(), &c, 1.0);
        assert_eq!(
            v.calls(),
            CallCounts {
                identity: 2,
                transition: 0,
                entropy: 1
            }
        );
        assert_eq!(v.calls().total(), 3);
    }
}
