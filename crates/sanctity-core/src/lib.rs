//! Core value types for the model-sanctity registry.
//!
//! Every registry record is keyed by an [`ArtifactId`] and bound to a
//! [`Commitment`], both fixed-size SHA-256 digests compared byte-for-byte.
//! Proofs are opaque [`Proof`] blobs handed to a verifier, and callers are
//! identified by an opaque [`Principal`]. Time flows through a [`Clock`] so
//! that tests can drive it deterministically.

pub mod error;
pub mod hash;
pub mod principal;
pub mod proof;
pub mod time;

pub use error::{CoreError, Result};
pub use hash::{ArtifactId, Commitment, Hash32};
pub use principal::Principal;
pub use proof::Proof;
pub use time::{Clock, ManualClock, SystemClock, Timestamp};
