//! Audit replay of registry event logs.
//!
//! A [`Replay`] rebuilds record state from an event stream, optionally
//! starting from a snapshot, and notes anything the stream could not have
//! produced (sequence gaps, a tombstone coming back to life, updates from a
//! commitment the record never had). [`audit`] then compares the rebuilt
//! state with a live registry record by record.

use std::collections::{BTreeMap, BTreeSet};

use sanctity_core::{ArtifactId, Principal};

use crate::events::{EventKind, RegistryEvent};
use crate::record::{ArtifactRecord, InvalidationReason};
use crate::registry::Registry;
use crate::snapshot::RegistrySnapshot;

/// Something in the event stream that a correct registry cannot emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anomaly {
    /// Sequence number of the offending event, or the expected next
    /// sequence number for stream-level issues.
    pub seq: u64,
    /// The artifact involved, if the anomaly concerns one.
    pub id: Option<ArtifactId>,
    /// Human-readable description.
    pub detail: String,
}

/// Record state rebuilt from events.
#[derive(Debug, Clone, Default)]
pub struct Replay {
    records: BTreeMap<ArtifactId, ArtifactRecord>,
    anomalies: Vec<Anomaly>,
    base_seq: u64,
    next_seq: u64,
}

impl Replay {
    /// Replay from an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replay on top of a snapshot. Events the snapshot already covers
    /// (`seq < snapshot.next_seq`) are skipped.
    pub fn from_snapshot(snapshot: &RegistrySnapshot) -> Self {
        Replay {
            records: snapshot
                .records
                .iter()
                .map(|r| (r.id, r.clone()))
                .collect(),
            anomalies: Vec::new(),
            base_seq: snapshot.next_seq,
            next_seq: snapshot.next_seq,
        }
    }

    /// Replay a complete event stream from an empty registry.
    pub fn from_events(events: &[RegistryEvent]) -> Self {
        let mut replay = Self::new();
        replay.apply_all(events);
        replay
    }

    /// Apply events in sequence order, regardless of slice order.
    pub fn apply_all(&mut self, events: &[RegistryEvent]) {
        let mut ordered: Vec<&RegistryEvent> = events.iter().collect();
        ordered.sort_by_key(|e| e.seq);
        for event in ordered {
            self.apply(event);
        }
    }

    /// Apply a single event.
    pub fn apply(&mut self, event: &RegistryEvent) {
        if event.seq < self.base_seq {
            return;
        }
        if event.seq < self.next_seq {
            self.flag(event, format!("sequence {} repeated", event.seq));
            return;
        }
        let Some(after) = event.seq.checked_add(1) else {
            self.flag(event, "sequence number overflow".to_string());
            return;
        };
        if event.seq > self.next_seq {
            let detail = format!("events {}..{} missing", self.next_seq, event.seq);
            self.anomalies.push(Anomaly {
                seq: self.next_seq,
                id: None,
                detail,
            });
        }
        self.next_seq = after;

        if let EventKind::Registered { owner, commitment } = &event.kind {
            if self.records.contains_key(&event.id) {
                self.flag(event, "registered twice".to_string());
            } else {
                self.records.insert(
                    event.id,
                    ArtifactRecord::new(event.id, *commitment, owner.clone(), event.at),
                );
            }
            return;
        }

        let Some(record) = self.records.get_mut(&event.id) else {
            self.flag(event, format!("{} for an unregistered artifact", event.kind.name()));
            return;
        };

        let mut issues = Vec::new();
        match &event.kind {
            EventKind::Registered { .. } => {}
            EventKind::Verified { .. } => {
                if record.valid {
                    record.touch(event.at);
                } else {
                    issues.push("verification of an invalidated artifact".to_string());
                }
            }
            EventKind::Invalidated { reason } => {
                if !record.invalidate(*reason, event.at) {
                    issues.push("invalidation of an already invalidated artifact".to_string());
                }
            }
            EventKind::Updated {
                previous,
                commitment,
            } => {
                if !record.valid {
                    issues.push("update of an invalidated artifact".to_string());
                } else {
                    if *previous != record.commitment {
                        issues.push(format!(
                            "update from {previous} but replayed commitment is {}",
                            record.commitment
                        ));
                    }
                    record.commitment = *commitment;
                    record.touch(event.at);
                }
            }
            EventKind::Revoked { by, was_valid } => {
                if *by != record.owner {
                    issues.push(format!("revoked by '{by}' but owner is '{}'", record.owner));
                }
                if *was_valid != record.valid {
                    issues.push(format!(
                        "revoke reports was_valid = {was_valid} but replayed valid = {}",
                        record.valid
                    ));
                }
                record.invalidate(InvalidationReason::Revoked, event.at);
            }
            EventKind::OwnershipTransferred { from, to } => {
                if *from != record.owner {
                    issues.push(format!(
                        "transfer from '{from}' but owner is '{}'",
                        record.owner
                    ));
                }
                record.owner = to.clone();
            }
        }

        for detail in issues {
            self.flag(event, detail);
        }
    }

    fn flag(&mut self, event: &RegistryEvent, detail: String) {
        self.anomalies.push(Anomaly {
            seq: event.seq,
            id: Some(event.id),
            detail,
        });
    }

    /// Rebuilt records, keyed by id.
    pub fn records(&self) -> &BTreeMap<ArtifactId, ArtifactRecord> {
        &self.records
    }

    /// The rebuilt record for `id`.
    pub fn get(&self, id: &ArtifactId) -> Option<&ArtifactRecord> {
        self.records.get(id)
    }

    /// Anomalies found so far, in the order they were seen.
    pub fn anomalies(&self) -> &[Anomaly] {
        &self.anomalies
    }

    /// Sequence number expected after the last applied event.
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }
}

/// An audit report comparing a live registry with a replayed event log.
#[derive(Debug, Clone)]
pub struct AuditReport {
    /// One entry per artifact known to either side, sorted by id.
    pub entries: Vec<AuditEntry>,
    /// Anomalies found while replaying, plus stream-level mismatches.
    pub anomalies: Vec<Anomaly>,
    /// Counts over the whole report.
    pub summary: AuditSummary,
}

/// Audit information for a single artifact.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    /// The audited artifact.
    pub id: ArtifactId,
    /// Live owner, if the registry holds the artifact.
    pub owner: Option<Principal>,
    /// Live validity, if the registry holds the artifact.
    pub valid: Option<bool>,
    /// Differences between live and replayed state.
    pub issues: Vec<String>,
}

/// Summary of the audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditSummary {
    /// Artifacts held by the live registry.
    pub total: usize,
    /// Live records that are still valid.
    pub valid: usize,
    /// Live records that are tombstones.
    pub tombstones: usize,
    /// Entries with at least one issue.
    pub with_issues: usize,
    /// Anomalies in the report.
    pub anomalies: usize,
    /// No issues and no anomalies.
    pub passed: bool,
}

/// Compare `registry` with the state rebuilt by `replay`.
pub fn audit(registry: &Registry, replay: &Replay) -> AuditReport {
    let live = registry.snapshot();
    let live_by_id: BTreeMap<ArtifactId, &ArtifactRecord> =
        live.records.iter().map(|r| (r.id, r)).collect();

    let ids: BTreeSet<ArtifactId> = live_by_id
        .keys()
        .chain(replay.records().keys())
        .copied()
        .collect();

    let mut entries = Vec::with_capacity(ids.len());
    for id in ids {
        let live_record = live_by_id.get(&id).copied();
        let issues = match (live_record, replay.get(&id)) {
            (Some(l), Some(r)) => compare(l, r),
            (Some(_), None) => vec!["no events recorded for this artifact".to_string()],
            (None, Some(_)) => vec!["in the event log but missing from the registry".to_string()],
            (None, None) => Vec::new(),
        };
        entries.push(AuditEntry {
            id,
            owner: live_record.map(|r| r.owner.clone()),
            valid: live_record.map(|r| r.valid),
            issues,
        });
    }

    let mut anomalies = replay.anomalies().to_vec();
    if replay.next_seq() != live.next_seq {
        anomalies.push(Anomaly {
            seq: replay.next_seq(),
            id: None,
            detail: format!(
                "event log ends before seq {} but the registry is at seq {}",
                replay.next_seq(),
                live.next_seq
            ),
        });
    }

    let total = live.records.len();
    let valid = live.records.iter().filter(|r| r.valid).count();
    let with_issues = entries.iter().filter(|e| !e.issues.is_empty()).count();
    let summary = AuditSummary {
        total,
        valid,
        tombstones: total - valid,
        with_issues,
        anomalies: anomalies.len(),
        passed: with_issues == 0 && anomalies.is_empty(),
    };

    AuditReport {
        entries,
        anomalies,
        summary,
    }
}

fn compare(live: &ArtifactRecord, replayed: &ArtifactRecord) -> Vec<String> {
    let mut issues = Vec::new();
    if live.commitment != replayed.commitment {
        issues.push(format!(
            "commitment is {} but the log says {}",
            live.commitment, replayed.commitment
        ));
    }
    if live.owner != replayed.owner {
        issues.push(format!(
            "owner is '{}' but the log says '{}'",
            live.owner, replayed.owner
        ));
    }
    if live.valid != replayed.valid {
        issues.push(format!(
            "valid is {} but the log says {}",
            live.valid, replayed.valid
        ));
    }
    if live.registered_at != replayed.registered_at {
        issues.push(format!(
            "registered at {} but the log says {}",
            live.registered_at, replayed.registered_at
        ));
    }
    if live.last_verified_at != replayed.last_verified_at {
        issues.push(format!(
            "last verified at {} but the log says {}",
            live.last_verified_at, replayed.last_verified_at
        ));
    }
    if live.invalidation != replayed.invalidation {
        issues.push(format!(
            "invalidation is {:?} but the log says {:?}",
            live.invalidation, replayed.invalidation
        ));
    }
    issues
}

/// Format an audit report as a human-readable string.
pub fn format_report(report: &AuditReport) -> String {
    let mut out = String::new();

    for entry in &report.entries {
        let owner = entry
            .owner
            .as_ref()
            .map(|o| o.as_str())
            .unwrap_or("(absent)");
        let state = match entry.valid {
            Some(true) => "valid",
            Some(false) => "tombstone",
            None => "missing",
        };
        out.push_str(&format!("  {}: {state}, owner: {owner}\n", entry.id));

        for issue in &entry.issues {
            out.push_str(&format!("    ! {issue}\n"));
        }
    }

    for anomaly in &report.anomalies {
        match &anomaly.id {
            Some(id) => out.push_str(&format!(
                "  ! seq {} ({id}): {}\n",
                anomaly.seq, anomaly.detail
            )),
            None => out.push_str(&format!("  ! seq {}: {}\n", anomaly.seq, anomaly.detail)),
        }
    }

    out.push('\n');
    out.push_str(&format!(
        "Summary: {} artifacts, {} valid, {} tombstones, {} with issues, {} anomalies\n",
        report.summary.total,
        report.summary.valid,
        report.summary.tombstones,
        report.summary.with_issues,
        report.summary.anomalies
    ));

    if report.summary.passed {
        out.push_str("Audit: PASSED\n");
    } else {
        out.push_str("Audit: ISSUES FOUND\n");
    }

    out
}
