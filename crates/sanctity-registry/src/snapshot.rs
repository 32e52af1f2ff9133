//! Point-in-time registry snapshots.
//!
//! A snapshot holds every record, tombstones included, and the next event
//! sequence number so a restored registry continues the same event stream.
//! Snapshots are plain JSON on disk.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use sanctity_core::{ArtifactId, Timestamp};

use crate::error::{RegistryError, Result};
use crate::record::ArtifactRecord;

/// Serialized registry state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    /// Layout version, see [`RegistrySnapshot::FORMAT_VERSION`].
    pub format_version: u32,
    /// Clock reading when the snapshot was taken.
    pub taken_at: Timestamp,
    /// Sequence number the next emitted event will carry.
    pub next_seq: u64,
    /// All records, sorted by id.
    pub records: Vec<ArtifactRecord>,
}

impl RegistrySnapshot {
    /// Version written by this build and the only one it restores.
    pub const FORMAT_VERSION: u32 = 1;

    /// Look up a record by id.
    pub fn get(&self, id: &ArtifactId) -> Option<&ArtifactRecord> {
        self.records
            .binary_search_by(|r| r.id.cmp(id))
            .ok()
            .map(|i| &self.records[i])
    }

    /// Check that the snapshot can be restored: known format, unique ids,
    /// records sorted, and every record internally consistent.
    pub fn validate(&self) -> Result<()> {
        if self.format_version != Self::FORMAT_VERSION {
            return Err(RegistryError::Snapshot {
                detail: format!(
                    "unsupported format version {} (expected {})",
                    self.format_version,
                    Self::FORMAT_VERSION
                ),
            });
        }

        let mut seen = HashSet::with_capacity(self.records.len());
        for record in &self.records {
            if !seen.insert(record.id) {
                return Err(RegistryError::Snapshot {
                    detail: format!("duplicate record {}", record.id),
                });
            }
            record.check_invariants()?;
        }

        if self.records.windows(2).any(|w| w[0].id > w[1].id) {
            return Err(RegistryError::Snapshot {
                detail: "records are not sorted by id".to_string(),
            });
        }

        Ok(())
    }

    /// Write as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Read and validate a snapshot written by [`RegistrySnapshot::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let snapshot: RegistrySnapshot = serde_json::from_str(&data)?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Invalidation, InvalidationReason};
    use sanctity_core::{Commitment, Principal};

    fn record(label: &str) -> ArtifactRecord {
        ArtifactRecord {
            id: ArtifactId::derive(label),
            commitment: Commitment::of(label.as_bytes()),
            owner: Principal::from("alice"),
            registered_at: Timestamp::from_millis(1_000),
            last_verified_at: Timestamp::from_millis(2_000),
            valid: true,
            invalidation: None,
        }
    }

    fn snapshot(mut records: Vec<ArtifactRecord>) -> RegistrySnapshot {
        records.sort_by(|a, b| a.id.cmp(&b.id));
        RegistrySnapshot {
            format_version: RegistrySnapshot::FORMAT_VERSION,
            taken_at: Timestamp::from_millis(3_000),
            next_seq: 7,
            records,
        }
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");

        let mut tomb = record("m2");
        tomb.valid = false;
        tomb.invalidation = Some(Invalidation {
            reason: InvalidationReason::Revoked,
            at: Timestamp::from_millis(2_500),
        });
        let snap = snapshot(vec![record("m1"), tomb.clone()]);
        snap.save(&path).unwrap();

        let loaded = RegistrySnapshot::load(&path).unwrap();
        assert_eq!(loaded, snap);
        assert_eq!(loaded.get(&tomb.id), Some(&tomb));
        assert!(loaded.get(&ArtifactId::derive("m3")).is_none());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let mut snap = snapshot(vec![record("m1")]);
        snap.records.push(record("m1"));
        assert!(matches!(
            snap.validate(),
            Err(RegistryError::Snapshot { .. })
        ));
    }

    #[test]
    fn rejects_timestamp_inversion() {
        let mut r = record("m1");
        r.last_verified_at = Timestamp::from_millis(10);
        let err = snapshot(vec![r]).validate().unwrap_err();
        assert!(err.to_string().contains("precedes registration"));
    }

    #[test]
    fn rejects_invalid_without_reason() {
        let mut r = record("m1");
        r.valid = false;
        let id = r.id;
        match snapshot(vec![r]).validate() {
            Err(RegistryError::Inconsistent { id: bad, .. }) => assert_eq!(bad, id),
            other => panic!("expected Inconsistent, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_version() {
        let mut snap = snapshot(vec![]);
        snap.format_version = 99;
        assert!(snap.validate().is_err());
    }

    #[test]
    fn rejects_unsorted_records() {
        let mut snap = snapshot(vec![record("m1"), record("m2")]);
        snap.records.reverse();
        assert!(snap.validate().is_err());
    }
}
