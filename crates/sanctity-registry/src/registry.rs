//! The proof-gated artifact registry.
//!
//! Records live in a table split into independently locked shards. Every
//! operation on an id holds that id's shard lock for the whole
//! read-check-write sequence, including the verifier call and event
//! emission, so operations on the same id are serialized while ids in
//! different shards proceed in parallel.
//!
//! Check order for every operation: existence, ownership (owner-gated
//! operations only), validity, arguments, then the verifier.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use sanctity_core::{ArtifactId, Clock, Commitment, Principal, Proof, SystemClock, Timestamp};
use sanctity_verify::structural::ensure_well_formed;
use sanctity_verify::Verifier;

use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};
use crate::events::{EventKind, EventSink, RegistryEvent};
use crate::record::{ArtifactRecord, Check, InvalidationReason};
use crate::snapshot::RegistrySnapshot;

type Shard = RwLock<HashMap<ArtifactId, ArtifactRecord>>;

/// Result of a successful identity or entropy check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    /// The checked artifact.
    pub id: ArtifactId,
    /// Timestamp now stored on the record.
    pub last_verified_at: Timestamp,
}

/// Result of a successful update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Updated {
    /// The updated artifact.
    pub id: ArtifactId,
    /// Commitment before the update.
    pub previous: Commitment,
    /// Commitment now stored on the record.
    pub commitment: Commitment,
    /// Timestamp now stored on the record.
    pub last_verified_at: Timestamp,
}

/// Result of a revocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revoked {
    /// The revoked artifact.
    pub id: ArtifactId,
    /// False if the record was already a tombstone.
    pub was_valid: bool,
}

/// Result of an ownership transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transferred {
    /// The transferred artifact.
    pub id: ArtifactId,
    /// Owner before the transfer.
    pub previous_owner: Principal,
    /// Owner now stored on the record.
    pub owner: Principal,
}

/// Record counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// All records, tombstones included.
    pub total: usize,
    /// Records that are still valid.
    pub valid: usize,
    /// All tombstones, revoked ones included.
    pub invalidated: usize,
    /// Tombstones left by owner revocation.
    pub revoked: usize,
}

/// Fail with `Unauthorized` unless `caller` is the record's owner.
pub fn require_owner(record: &ArtifactRecord, caller: &Principal) -> Result<()> {
    if record.owner == *caller {
        Ok(())
    } else {
        Err(RegistryError::Unauthorized {
            id: record.id,
            caller: caller.clone(),
        })
    }
}

fn require_valid(record: &ArtifactRecord) -> Result<()> {
    if record.valid {
        Ok(())
    } else {
        Err(RegistryError::NotValid { id: record.id })
    }
}

/// Ledger of artifact records whose transitions are gated by a [`Verifier`].
pub struct Registry {
    shards: Box<[Shard]>,
    verifier: Arc<dyn Verifier>,
    clock: Arc<dyn Clock>,
    sinks: Vec<Arc<dyn EventSink>>,
    config: RegistryConfig,
    next_seq: AtomicU64,
}

impl Registry {
    /// An empty registry with default configuration, the system clock, and
    /// no event sinks. Use [`RegistryBuilder`] for anything else.
    pub fn new(verifier: impl Verifier + 'static) -> Self {
        Self::assemble(
            Arc::new(verifier),
            RegistryConfig::default(),
            Arc::new(SystemClock),
            Vec::new(),
        )
    }

    /// Start configuring a registry around `verifier`.
    pub fn builder(verifier: impl Verifier + 'static) -> RegistryBuilder {
        RegistryBuilder::new(verifier)
    }

    fn assemble(
        verifier: Arc<dyn Verifier>,
        config: RegistryConfig,
        clock: Arc<dyn Clock>,
        sinks: Vec<Arc<dyn EventSink>>,
    ) -> Self {
        let shards = (0..config.lock_shards.max(1))
            .map(|_| RwLock::new(HashMap::new()))
            .collect();
        Registry {
            shards,
            verifier,
            clock,
            sinks,
            config,
            next_seq: AtomicU64::new(0),
        }
    }

    /// The configuration this registry was built with.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn shard(&self, id: &ArtifactId) -> &Shard {
        let index = id.hash().prefix_u64() % self.shards.len() as u64;
        &self.shards[index as usize]
    }

    /// Must be called with the affected id's shard locked.
    fn emit(&self, id: ArtifactId, at: Timestamp, kind: EventKind) {
        let event = RegistryEvent {
            seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
            event_id: Uuid::new_v4(),
            at,
            id,
            kind,
        };
        for sink in &self.sinks {
            sink.record(&event);
        }
    }

    fn require_well_formed(&self, proof: &Proof) -> Result<()> {
        ensure_well_formed(proof, self.config.max_proof_bytes)
            .map_err(|e| RegistryError::invalid_argument(e.to_string()))
    }

    /// Create a record owned by `caller`. No proof is required; the first
    /// registrant of an id owns it.
    pub fn register(
        &self,
        id: ArtifactId,
        commitment: Commitment,
        caller: &Principal,
    ) -> Result<ArtifactRecord> {
        if caller.is_empty() {
            return Err(RegistryError::invalid_argument("caller identity is empty"));
        }

        let mut shard = self.shard(&id).write();
        let slot = match shard.entry(id) {
            Entry::Occupied(_) => {
                debug!(id = %id, caller = %caller, "duplicate registration refused");
                return Err(RegistryError::AlreadyExists { id });
            }
            Entry::Vacant(slot) => slot,
        };

        let now = self.clock.now();
        let record = slot
            .insert(ArtifactRecord::new(id, commitment, caller.clone(), now))
            .clone();

        info!(id = %id, owner = %caller, commitment = %commitment, "artifact registered");
        self.emit(
            id,
            now,
            EventKind::Registered {
                owner: caller.clone(),
                commitment,
            },
        );
        Ok(record)
    }

    /// Check an identity proof against the record's current commitment.
    ///
    /// A rejected proof invalidates the record permanently and returns
    /// [`RegistryError::Invalidated`].
    pub fn verify(&self, id: &ArtifactId, proof: &Proof) -> Result<Verified> {
        self.run_check(id, proof, Check::Identity)
    }

    /// Check an entropy proof at `threshold` bits per byte.
    ///
    /// A rejected proof invalidates the record permanently and returns
    /// [`RegistryError::Invalidated`].
    pub fn check_entropy(&self, id: &ArtifactId, proof: &Proof, threshold: f64) -> Result<Verified> {
        self.run_check(id, proof, Check::Entropy { threshold })
    }

    /// [`Registry::check_entropy`] at the configured default threshold.
    pub fn check_entropy_default(&self, id: &ArtifactId, proof: &Proof) -> Result<Verified> {
        self.check_entropy(id, proof, self.config.default_entropy_threshold)
    }

    fn run_check(&self, id: &ArtifactId, proof: &Proof, check: Check) -> Result<Verified> {
        let mut shard = self.shard(id).write();
        let record = shard
            .get_mut(id)
            .ok_or(RegistryError::NotFound { id: *id })?;
        require_valid(record)?;
        if let Check::Entropy { threshold } = check {
            if !threshold.is_finite() || threshold < 0.0 {
                return Err(RegistryError::invalid_argument(format!(
                    "entropy threshold must be finite and non-negative, got {threshold}"
                )));
            }
        }
        self.require_well_formed(proof)?;

        let verdict = match check {
            Check::Identity => self.verifier.check_identity(proof, &record.commitment),
            Check::Entropy { threshold } => {
                self.verifier
                    .check_entropy(proof, &record.commitment, threshold)
            }
        }
        .map_err(|e| RegistryError::invalid_argument(format!("proof not checkable: {e}")))?;

        let now = self.clock.now();
        if verdict {
            let at = record.touch(now);
            debug!(id = %id, check = ?check, "artifact verified");
            self.emit(*id, at, EventKind::Verified { check });
            return Ok(Verified {
                id: *id,
                last_verified_at: at,
            });
        }

        let reason = InvalidationReason::for_failed(check);
        record.invalidate(reason, now);
        warn!(id = %id, owner = %record.owner, %reason, "artifact invalidated");
        self.emit(*id, now, EventKind::Invalidated { reason });
        Err(RegistryError::Invalidated { id: *id, reason })
    }

    /// Replace the record's commitment with `new_commitment`, gated on a
    /// transition proof from the current commitment.
    ///
    /// A rejected proof returns [`RegistryError::ProofRejected`] and leaves
    /// the record untouched and valid; the owner may retry.
    pub fn update(
        &self,
        id: &ArtifactId,
        new_commitment: Commitment,
        proof: &Proof,
        caller: &Principal,
    ) -> Result<Updated> {
        let mut shard = self.shard(id).write();
        let record = shard
            .get_mut(id)
            .ok_or(RegistryError::NotFound { id: *id })?;
        require_owner(record, caller)?;
        require_valid(record)?;
        if new_commitment == record.commitment {
            return Err(RegistryError::invalid_argument(
                "new commitment equals the current commitment",
            ));
        }
        self.require_well_formed(proof)?;

        let accepted = self
            .verifier
            .check_transition(proof, &record.commitment, &new_commitment)
            .map_err(|e| RegistryError::invalid_argument(format!("proof not checkable: {e}")))?;
        if !accepted {
            debug!(id = %id, caller = %caller, "transition proof rejected");
            return Err(RegistryError::ProofRejected { id: *id });
        }

        let previous = std::mem::replace(&mut record.commitment, new_commitment);
        let at = record.touch(self.clock.now());
        info!(id = %id, previous = %previous, commitment = %new_commitment, "artifact updated");
        self.emit(
            *id,
            at,
            EventKind::Updated {
                previous,
                commitment: new_commitment,
            },
        );
        Ok(Updated {
            id: *id,
            previous,
            commitment: new_commitment,
            last_verified_at: at,
        })
    }

    /// Invalidate the record on the owner's request. Revoking a tombstone
    /// succeeds and keeps its original invalidation reason.
    pub fn revoke(&self, id: &ArtifactId, caller: &Principal) -> Result<Revoked> {
        let mut shard = self.shard(id).write();
        let record = shard
            .get_mut(id)
            .ok_or(RegistryError::NotFound { id: *id })?;
        require_owner(record, caller)?;

        let now = self.clock.now();
        let was_valid = record.invalidate(InvalidationReason::Revoked, now);
        if was_valid {
            info!(id = %id, owner = %caller, "artifact revoked");
        } else {
            debug!(id = %id, owner = %caller, "revoke of an invalidated artifact");
        }
        self.emit(
            *id,
            now,
            EventKind::Revoked {
                by: caller.clone(),
                was_valid,
            },
        );
        Ok(Revoked { id: *id, was_valid })
    }

    /// Hand the record to `new_owner`. Allowed on tombstones so audit
    /// responsibility can move.
    pub fn transfer_ownership(
        &self,
        id: &ArtifactId,
        new_owner: &Principal,
        caller: &Principal,
    ) -> Result<Transferred> {
        let mut shard = self.shard(id).write();
        let record = shard
            .get_mut(id)
            .ok_or(RegistryError::NotFound { id: *id })?;
        require_owner(record, caller)?;
        if new_owner.is_empty() {
            return Err(RegistryError::invalid_argument("new owner identity is empty"));
        }

        let previous_owner = std::mem::replace(&mut record.owner, new_owner.clone());
        let now = self.clock.now();
        info!(id = %id, from = %previous_owner, to = %new_owner, "ownership transferred");
        self.emit(
            *id,
            now,
            EventKind::OwnershipTransferred {
                from: previous_owner.clone(),
                to: new_owner.clone(),
            },
        );
        Ok(Transferred {
            id: *id,
            previous_owner,
            owner: new_owner.clone(),
        })
    }

    /// The full record, tombstones included.
    pub fn get_details(&self, id: &ArtifactId) -> Result<ArtifactRecord> {
        self.shard(id)
            .read()
            .get(id)
            .cloned()
            .ok_or(RegistryError::NotFound { id: *id })
    }

    /// True if a record (valid or not) exists for `id`.
    pub fn contains(&self, id: &ArtifactId) -> bool {
        self.shard(id).read().contains_key(id)
    }

    /// Number of records, tombstones included.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.read().len()).sum()
    }

    /// True if nothing has ever been registered.
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|s| s.read().is_empty())
    }

    /// All records sorted by id.
    pub fn list(&self) -> Vec<ArtifactRecord> {
        let mut records: Vec<ArtifactRecord> = self
            .shards
            .iter()
            .flat_map(|s| s.read().values().cloned().collect::<Vec<_>>())
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    /// Records currently owned by `owner`, sorted by id.
    pub fn owned_by(&self, owner: &Principal) -> Vec<ArtifactRecord> {
        self.list()
            .into_iter()
            .filter(|r| r.owner == *owner)
            .collect()
    }

    /// Count records by state. Shards are read one at a time, so counts
    /// taken under concurrent writes are approximate.
    pub fn stats(&self) -> RegistryStats {
        let mut stats = RegistryStats::default();
        for shard in self.shards.iter() {
            for record in shard.read().values() {
                stats.total += 1;
                if record.valid {
                    stats.valid += 1;
                } else {
                    stats.invalidated += 1;
                    if record.is_revoked() {
                        stats.revoked += 1;
                    }
                }
            }
        }
        stats
    }

    /// A consistent copy of every record. All shards are read-locked
    /// together, in index order, while the copy is taken.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let guards: Vec<_> = self.shards.iter().map(|s| s.read()).collect();
        let mut records: Vec<ArtifactRecord> = guards
            .iter()
            .flat_map(|g| g.values().cloned())
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        let next_seq = self.next_seq.load(Ordering::SeqCst);
        drop(guards);

        RegistrySnapshot {
            format_version: RegistrySnapshot::FORMAT_VERSION,
            taken_at: self.clock.now(),
            next_seq,
            records,
        }
    }

    fn restore(&mut self, snapshot: RegistrySnapshot) {
        let next_seq = snapshot.next_seq;
        for record in snapshot.records {
            let index = record.id.hash().prefix_u64() % self.shards.len() as u64;
            self.shards[index as usize]
                .get_mut()
                .insert(record.id, record);
        }
        *self.next_seq.get_mut() = next_seq;
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.config)
            .field("records", &self.len())
            .field("sinks", &self.sinks.len())
            .field("next_seq", &self.next_seq.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Configures and builds a [`Registry`].
pub struct RegistryBuilder {
    verifier: Arc<dyn Verifier>,
    config: RegistryConfig,
    clock: Arc<dyn Clock>,
    sinks: Vec<Arc<dyn EventSink>>,
    snapshot: Option<RegistrySnapshot>,
}

impl RegistryBuilder {
    /// A builder with default configuration, the system clock, and no sinks.
    pub fn new(verifier: impl Verifier + 'static) -> Self {
        RegistryBuilder {
            verifier: Arc::new(verifier),
            config: RegistryConfig::default(),
            clock: Arc::new(SystemClock),
            sinks: Vec::new(),
            snapshot: None,
        }
    }

    /// Use `config` instead of the defaults. Validated by [`Self::build`].
    pub fn config(mut self, config: RegistryConfig) -> Self {
        self.config = config;
        self
    }

    /// Read time from `clock` instead of the system clock.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Subscribe a sink to every event. Sinks are called in subscription
    /// order.
    pub fn sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sinks.push(Arc::new(sink));
        self
    }

    /// Start from a snapshot instead of an empty table.
    pub fn restore(mut self, snapshot: RegistrySnapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    /// Validate the configuration and any snapshot, then build.
    pub fn build(self) -> Result<Registry> {
        self.config.validate()?;
        let mut registry = Registry::assemble(self.verifier, self.config, self.clock, self.sinks);
        if let Some(snapshot) = self.snapshot {
            snapshot.validate()?;
            let count = snapshot.records.len();
            registry.restore(snapshot);
            info!(records = count, "registry restored from snapshot");
        }
        Ok(registry)
    }
}
