//! Append-only observation channel for registry state changes.
//!
//! The registry hands every committed transition to its subscribed
//! [`EventSink`]s. Sinks cannot fail the operation that produced the
//! event: registry correctness never depends on an event being stored.
//!
//! Events for the same artifact are delivered in the order their
//! transitions were applied. `seq` is registry-wide and gap-free, so a gap
//! in a stored log means events were lost.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sanctity_core::{ArtifactId, Commitment, Principal, Timestamp};

use crate::error::Result;
use crate::record::{Check, InvalidationReason};

/// One committed registry transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryEvent {
    /// Registry-wide sequence number.
    pub seq: u64,
    /// Globally unique event id.
    pub event_id: Uuid,
    /// Time the transition took effect. Matches the timestamp stored on the
    /// record where the transition touches one.
    pub at: Timestamp,
    /// The artifact affected.
    pub id: ArtifactId,
    /// What happened to the artifact.
    pub kind: EventKind,
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventKind {
    Registered {
        owner: Principal,
        commitment: Commitment,
    },
    /// An identity or entropy check passed.
    Verified { check: Check },
    /// An identity or entropy check failed and the record was invalidated.
    Invalidated { reason: InvalidationReason },
    Updated {
        previous: Commitment,
        commitment: Commitment,
    },
    /// The owner revoked the record. `was_valid` is false when revoking a
    /// record that was already a tombstone.
    Revoked { by: Principal, was_valid: bool },
    OwnershipTransferred { from: Principal, to: Principal },
}

impl EventKind {
    /// Short name for logs and reports.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Registered { .. } => "registered",
            EventKind::Verified { .. } => "verified",
            EventKind::Invalidated { .. } => "invalidated",
            EventKind::Updated { .. } => "updated",
            EventKind::Revoked { .. } => "revoked",
            EventKind::OwnershipTransferred { .. } => "ownership_transferred",
        }
    }
}

/// Receiver of registry events.
///
/// `record` is called while the affected artifact's shard is write-locked,
/// so it should return quickly. A sink must not call back into the
/// [`Registry`](crate::Registry) that feeds it: the shard lock is not
/// re-entrant, and any read of the same shard (`get_details`, `list`,
/// `snapshot`, ...) from inside `record` deadlocks. Hand events off to
/// another thread if they need registry state.
pub trait EventSink: Send + Sync {
    fn record(&self, event: &RegistryEvent);
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn record(&self, event: &RegistryEvent) {
        (**self).record(event)
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemoryEventLog {
    events: Mutex<Vec<RegistryEvent>>,
}

impl MemoryEventLog {
    /// An empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all events received so far, in arrival order.
    pub fn events(&self) -> Vec<RegistryEvent> {
        self.events.lock().clone()
    }

    /// Events for a single artifact, in arrival order.
    pub fn for_artifact(&self, id: &ArtifactId) -> Vec<RegistryEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.id == *id)
            .cloned()
            .collect()
    }

    /// Number of events received.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// True if no event has been received.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for MemoryEventLog {
    fn record(&self, event: &RegistryEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Appends each event as one JSON object per line.
#[derive(Debug)]
pub struct JsonLinesEventLog {
    path: PathBuf,
    file: Mutex<File>,
    failures: AtomicU64,
}

impl JsonLinesEventLog {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(JsonLinesEventLog {
            path: path.to_path_buf(),
            file: Mutex::new(file),
            failures: AtomicU64::new(0),
        })
    }

    /// The file events are appended to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of events that could not be written.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    fn append(&self, event: &RegistryEvent) -> Result<()> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');
        self.file.lock().write_all(line.as_bytes())?;
        Ok(())
    }
}

impl EventSink for JsonLinesEventLog {
    fn record(&self, event: &RegistryEvent) {
        if let Err(e) = self.append(event) {
            self.failures.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                path = %self.path.display(),
                seq = event.seq,
                error = %e,
                "failed to append registry event"
            );
        }
    }
}

/// Read a log written by [`JsonLinesEventLog`]. Blank lines are skipped.
pub fn read_json_lines(path: &Path) -> Result<Vec<RegistryEvent>> {
    let reader = BufReader::new(File::open(path)?);
    let mut events = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        events.push(serde_json::from_str(&line)?);
    }
    Ok(events)
}
