//! Artifact records and their validity lifecycle.
//!
//! A record starts valid and can be invalidated exactly once. There is no
//! path back: a tombstone stays queryable for audit but never validates,
//! updates, or re-registers again.

use serde::{Deserialize, Serialize};

use sanctity_core::{ArtifactId, Commitment, Principal, Timestamp};

use crate::error::{RegistryError, Result};

/// Which proof check was run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    Identity,
    Entropy { threshold: f64 },
}

/// Why a record was invalidated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationReason {
    /// The verifier rejected an identity proof.
    IdentityProofFailed,
    /// The verifier rejected an entropy proof at this threshold.
    EntropyProofFailed { threshold: f64 },
    /// The owner revoked the record.
    Revoked,
}

impl InvalidationReason {
    /// The reason recorded when `check` fails.
    pub fn for_failed(check: Check) -> Self {
        match check {
            Check::Identity => InvalidationReason::IdentityProofFailed,
            Check::Entropy { threshold } => InvalidationReason::EntropyProofFailed { threshold },
        }
    }
}

impl std::fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidationReason::IdentityProofFailed => write!(f, "identity proof failed"),
            InvalidationReason::EntropyProofFailed { threshold } => {
                write!(f, "entropy proof failed at threshold {threshold}")
            }
            InvalidationReason::Revoked => write!(f, "revoked by owner"),
        }
    }
}

/// When and why a record stopped being valid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Invalidation {
    /// Why the record was invalidated.
    pub reason: InvalidationReason,
    /// When the invalidation took effect.
    pub at: Timestamp,
}

/// Registry metadata for one artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    /// Caller-assigned identifier, fixed for the record's lifetime.
    pub id: ArtifactId,
    /// Current content binding. Changes only through a proven update.
    pub commitment: Commitment,
    /// Controlling principal.
    pub owner: Principal,
    /// Time of registration.
    pub registered_at: Timestamp,
    /// Last successful identity or entropy check, or last update.
    pub last_verified_at: Timestamp,
    /// False once the record is a tombstone.
    pub valid: bool,
    /// Set together with `valid = false`; the first invalidation wins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalidation: Option<Invalidation>,
}

impl ArtifactRecord {
    pub(crate) fn new(
        id: ArtifactId,
        commitment: Commitment,
        owner: Principal,
        at: Timestamp,
    ) -> Self {
        ArtifactRecord {
            id,
            commitment,
            owner,
            registered_at: at,
            last_verified_at: at,
            valid: true,
            invalidation: None,
        }
    }

    /// Record a successful check at `at`, never moving before registration.
    /// Returns the stored timestamp.
    pub(crate) fn touch(&mut self, at: Timestamp) -> Timestamp {
        self.last_verified_at = at.max(self.registered_at);
        self.last_verified_at
    }

    /// Flip `valid` to false. Returns false if the record was already a
    /// tombstone, in which case nothing changes.
    pub(crate) fn invalidate(&mut self, reason: InvalidationReason, at: Timestamp) -> bool {
        if !self.valid {
            return false;
        }
        self.valid = false;
        self.invalidation = Some(Invalidation { reason, at });
        true
    }

    /// True if this is a tombstone left by revocation (as opposed to a
    /// failed proof).
    pub fn is_revoked(&self) -> bool {
        matches!(
            self.invalidation,
            Some(Invalidation {
                reason: InvalidationReason::Revoked,
                ..
            })
        )
    }

    /// Check the per-record invariants. Fails with
    /// [`RegistryError::Inconsistent`] describing the first violation found.
    pub fn check_invariants(&self) -> Result<()> {
        if self.last_verified_at < self.registered_at {
            return Err(self.inconsistent(format!(
                "last verified at {} precedes registration at {}",
                self.last_verified_at, self.registered_at
            )));
        }
        if self.valid != self.invalidation.is_none() {
            return Err(self.inconsistent(format!(
                "valid = {} disagrees with invalidation = {:?}",
                self.valid, self.invalidation
            )));
        }
        if self.owner.is_empty() {
            return Err(self.inconsistent("owner is empty".to_string()));
        }
        Ok(())
    }

    fn inconsistent(&self, detail: String) -> RegistryError {
        RegistryError::Inconsistent {
            id: self.id,
            detail,
        }
    }
}
