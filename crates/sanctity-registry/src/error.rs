//! Registry error types.

use sanctity_core::{ArtifactId, Principal};

use crate::record::InvalidationReason;

/// Errors that can occur during registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// No record with this id exists.
    #[error("artifact not found: {id}")]
    NotFound { id: ArtifactId },

    /// A record with this id was registered before. Ids are never reused.
    #[error("artifact already registered: {id}")]
    AlreadyExists { id: ArtifactId },

    /// The operation requires a valid record but this one is a tombstone.
    #[error("artifact {id} is no longer valid")]
    NotValid { id: ArtifactId },

    /// The caller is not the recorded owner.
    #[error("'{caller}' is not the owner of artifact {id}")]
    Unauthorized { id: ArtifactId, caller: Principal },

    /// Malformed input: empty or oversized proof, empty principal,
    /// unchanged commitment, bad threshold, or a proof the verifier could
    /// not parse.
    #[error("invalid argument: {detail}")]
    InvalidArgument { detail: String },

    /// The verifier refused a proposed transition. Nothing changed.
    #[error("transition proof rejected for artifact {id}")]
    ProofRejected { id: ArtifactId },

    /// The verifier refused an identity or entropy proof and the record has
    /// been invalidated. This error reports a committed state change.
    #[error("artifact {id} invalidated: {reason}")]
    Invalidated {
        id: ArtifactId,
        reason: InvalidationReason,
    },

    /// A record breaks one of its own invariants, e.g. a tombstone with no
    /// invalidation reason. Only reachable through restored or hand-built
    /// records.
    #[error("artifact {id} is inconsistent: {detail}")]
    Inconsistent { id: ArtifactId, detail: String },

    /// Invalid registry configuration.
    #[error("invalid configuration: {detail}")]
    Config { detail: String },

    /// A snapshot could not be restored.
    #[error("invalid snapshot: {detail}")]
    Snapshot { detail: String },

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RegistryError {
    /// True if returning this error also committed a state change.
    ///
    /// Only [`RegistryError::Invalidated`] qualifies; callers must not
    /// treat it as a rejected request that can simply be retried.
    pub fn is_state_changing(&self) -> bool {
        matches!(self, RegistryError::Invalidated { .. })
    }

    pub(crate) fn invalid_argument(detail: impl Into<String>) -> Self {
        RegistryError::InvalidArgument {
            detail: detail.into(),
        }
    }
}

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_invalidated_changes_state() {
        let id = ArtifactId::derive("m1");
        assert!(RegistryError::Invalidated {
            id,
            reason: InvalidationReason::IdentityProofFailed
        }
        .is_state_changing());
        assert!(!RegistryError::ProofRejected { id }.is_state_changing());
        assert!(!RegistryError::NotValid { id }.is_state_changing());
    }

    #[test]
    fn messages_name_the_artifact() {
        let id = ArtifactId::derive("m1");
        let err = RegistryError::Unauthorized {
            id,
            caller: Principal::from("bob"),
        };
        let msg = err.to_string();
        assert!(msg.contains("bob"));
        assert!(msg.contains(&id.to_string()));
    }
}
