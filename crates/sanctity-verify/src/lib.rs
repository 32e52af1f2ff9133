//! Proof verification for the model-sanctity registry.
//!
//! The registry treats proof checking as an external oracle. This crate
//! defines that oracle's interface, [`Verifier`], along with the structural
//! checks every implementation shares and two in-process implementations:
//!
//! - [`FixedVerifier`]: switchable verdicts with call counters, for tests
//! - [`ProofTable`]: an allow-list of known-good proofs keyed by digest,
//!   for hosts that do not yet run a real proof system
//!
//! Verdicts are `Ok(true)` / `Ok(false)`. An `Err` means the proof could not
//! be checked at all (for example, it is empty) and is never a verdict.

pub mod error;
pub mod fixed;
pub mod structural;
pub mod table;

use std::sync::Arc;

use sanctity_core::{Commitment, Proof};

pub use error::{Result, VerifyError};
pub use fixed::{CallCounts, FixedVerifier};
pub use table::{Grant, ProofTable};

/// An oracle that checks proofs about artifact commitments.
///
/// Implementations must be deterministic for a given input and free of
/// side effects observable by the registry.
pub trait Verifier: Send + Sync {
    /// Check that the artifact behind `commitment` matches its registered form.
    fn check_identity(&self, proof: &Proof, commitment: &Commitment) -> Result<bool>;

    /// Check that `new` is an authorized successor of `old`. Must reject
    /// `old == new`.
    fn check_transition(&self, proof: &Proof, old: &Commitment, new: &Commitment) -> Result<bool>;

    /// Check that the artifact's measured entropy meets `threshold`.
    fn check_entropy(&self, proof: &Proof, commitment: &Commitment, threshold: f64)
        -> Result<bool>;
}

impl<V: Verifier + ?Sized> Verifier for Arc<V> {
    fn check_identity(&self, proof: &Proof, commitment: &Commitment) -> Result<bool> {
        (**self).check_identity(proof, commitment)
    }

    fn check_transition(&self, proof: &Proof, old: &Commitment, new: &Commitment) -> Result<bool> {
        (**self).check_transition(proof, old, new)
    }

    fn check_entropy(
        &self,
        proof: &Proof,
        commitment: &Commitment,
        threshold: f64,
    ) -> Result<bool> {
        (**self).check_entropy(proof, commitment, threshold)
    }
}

impl<V: Verifier + ?Sized> Verifier for &V {
    fn check_identity(&self, proof: &Proof, commitment: &Commitment) -> Result<bool> {
        (**self).check_identity(proof, commitment)
    }

    fn check_transition(&self, proof: &Proof, old: &Commitment, new: &Commitment) -> Result<bool> {
        (**self).check_transition(proof, old, new)
    }

    fn check_entropy(
        &self,
        proof: &Proof,
        commitment: &Commitment,
        threshold: f64,
    ) -> Result<bool> {
        (**self).check_entropy(proof, commitment, threshold)
    }
}
