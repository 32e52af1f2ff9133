//! Proof-gated registry of model artifacts.
//!
//! Each registered artifact is a record binding a caller-chosen
//! [`ArtifactId`](sanctity_core::ArtifactId) to a content
//! [`Commitment`](sanctity_core::Commitment) and an owning principal. Every
//! change that matters goes through a proof checked by an injected
//! [`Verifier`](sanctity_verify::Verifier):
//!
//! - **verify / check_entropy**: a passing proof refreshes the record; a
//!   failing one invalidates it for good
//! - **update**: swaps the commitment, but only with a transition proof;
//!   a rejected proof changes nothing
//! - **revoke / transfer_ownership**: owner-only, no proof needed
//!
//! Invalidated records are never deleted or revived. They stay queryable
//! as tombstones, and every committed transition is published to
//! subscribed [`EventSink`]s so an event log can later be replayed and
//! [`audit`]ed against the live registry.

pub mod audit;
pub mod config;
pub mod error;
pub mod events;
pub mod record;
pub mod registry;
pub mod snapshot;

// Re-exports for convenience.
pub use audit::{audit, format_report, Anomaly, AuditEntry, AuditReport, AuditSummary, Replay};
pub use config::RegistryConfig;
pub use error::{RegistryError, Result};
pub use events::{
    read_json_lines, EventKind, EventSink, JsonLinesEventLog, MemoryEventLog, RegistryEvent,
};
pub use record::{ArtifactRecord, Check, Invalidation, InvalidationReason};
pub use registry::{
    require_owner, Registry, RegistryBuilder, RegistryStats, Revoked, Transferred, Updated,
    Verified,
};
pub use snapshot::RegistrySnapshot;
