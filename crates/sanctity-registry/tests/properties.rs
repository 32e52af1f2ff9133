//! Property-based tests for registry invariants.
//!
//! Random operation sequences are run against a registry with a scriptable
//! verifier and a clock that may jump backwards. After every step the
//! registry must still satisfy its per-record invariants, and validity must
//! never come back once lost.

use std::collections::HashMap;
use std::sync::Arc;

use proptest::prelude::*;
use sanctity_core::{ArtifactId, Commitment, ManualClock, Principal, Proof, Timestamp};
use sanctity_registry::{MemoryEventLog, Registry, RegistryError, Replay};
use sanctity_verify::FixedVerifier;

const IDS: u8 = 4;
const PRINCIPALS: u8 = 3;

#[derive(Debug, Clone)]
enum Op {
    Register { id: u8, caller: u8, content: u8 },
    Verify { id: u8, accept: bool },
    Entropy { id: u8, accept: bool, threshold: f64 },
    Update { id: u8, caller: u8, content: u8, accept: bool },
    Revoke { id: u8, caller: u8 },
    Transfer { id: u8, caller: u8, to: u8 },
    SetClock { millis: u64 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let id = 0..IDS;
    let who = 0..PRINCIPALS;
    prop_oneof![
        (id.clone(), who.clone(), any::<u8>())
            .prop_map(|(id, caller, content)| Op::Register { id, caller, content }),
        (id.clone(), any::<bool>()).prop_map(|(id, accept)| Op::Verify { id, accept }),
        (id.clone(), any::<bool>(), 0.0..8.0f64).prop_map(|(id, accept, threshold)| {
            Op::Entropy {
                id,
                accept,
                threshold,
            }
        }),
        (id.clone(), who.clone(), 0u8..4, any::<bool>()).prop_map(
            |(id, caller, content, accept)| Op::Update {
                id,
                caller,
                content,
                accept
            }
        ),
        (id.clone(), who.clone()).prop_map(|(id, caller)| Op::Revoke { id, caller }),
        (id, who.clone(), who).prop_map(|(id, caller, to)| Op::Transfer { id, caller, to }),
        (0u64..100_000).prop_map(|millis| Op::SetClock { millis }),
    ]
}

fn artifact(n: u8) -> ArtifactId {
    ArtifactId::derive(&format!("model-{n}"))
}

fn principal(n: u8) -> Principal {
    Principal::new(format!("p{n}"))
}

fn proof() -> Proof {
    Proof::new(b"proof".to_vec())
}

struct Rig {
    registry: Registry,
    verifier: Arc<FixedVerifier>,
    clock: Arc<ManualClock>,
    log: Arc<MemoryEventLog>,
}

fn rig() -> Rig {
    let verifier = Arc::new(FixedVerifier::accepting());
    let clock = Arc::new(ManualClock::new(Timestamp::from_millis(50_000)));
    let log = Arc::new(MemoryEventLog::new());
    let registry = Registry::builder(Arc::clone(&verifier))
        .clock(Arc::clone(&clock))
        .sink(Arc::clone(&log))
        .build()
        .unwrap();
    Rig {
        registry,
        verifier,
        clock,
        log,
    }
}

fn apply(rig: &Rig, op: &Op) -> Option<Result<(), RegistryError>> {
    let r = &rig.registry;
    let result = match *op {
        Op::Register {
            id,
            caller,
            content,
        } => r
            .register(artifact(id), Commitment::of([content]), &principal(caller))
            .map(|_| ()),
        Op::Verify { id, accept } => {
            rig.verifier.set_identity(accept);
            r.verify(&artifact(id), &proof()).map(|_| ())
        }
        Op::Entropy {
            id,
            accept,
            threshold,
        } => {
            rig.verifier.set_entropy(accept);
            r.check_entropy(&artifact(id), &proof(), threshold)
                .map(|_| ())
        }
        Op::Update {
            id,
            caller,
            content,
            accept,
        } => {
            rig.verifier.set_transition(accept);
            r.update(
                &artifact(id),
                Commitment::of([content]),
                &proof(),
                &principal(caller),
            )
            .map(|_| ())
        }
        Op::Revoke { id, caller } => r.revoke(&artifact(id), &principal(caller)).map(|_| ()),
        Op::Transfer { id, caller, to } => r
            .transfer_ownership(&artifact(id), &principal(to), &principal(caller))
            .map(|_| ()),
        Op::SetClock { millis } => {
            rig.clock.set(Timestamp::from_millis(millis));
            return None;
        }
    };
    Some(result)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_second_registration_always_fails(
        first_owner in 0..PRINCIPALS,
        second_owner in 0..PRINCIPALS,
        first in any::<u8>(),
        second in any::<u8>(),
    ) {
        let rig = rig();
        let id = artifact(0);
        rig.registry
            .register(id, Commitment::of([first]), &principal(first_owner))
            .unwrap();

        let result = rig
            .registry
            .register(id, Commitment::of([second]), &principal(second_owner));
        prop_assert!(
            matches!(result, Err(RegistryError::AlreadyExists { .. })),
            "expected AlreadyExists"
        );

        let record = rig.registry.get_details(&id).unwrap();
        prop_assert_eq!(record.owner, principal(first_owner));
        prop_assert_eq!(record.commitment, Commitment::of([first]));
    }

    #[test]
    fn prop_validity_never_returns(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let rig = rig();
        let mut lost: HashMap<ArtifactId, bool> = HashMap::new();
        let mut known: HashMap<ArtifactId, bool> = HashMap::new();

        for op in &ops {
            if let Op::Register { id, .. } = op {
                let existed = known.contains_key(&artifact(*id));
                let result = apply(&rig, op);
                if existed {
                    prop_assert!(matches!(
                        result,
                        Some(Err(RegistryError::AlreadyExists { .. }))
                    ), "expected AlreadyExists");
                }
                known.insert(artifact(*id), true);
            } else {
                apply(&rig, op);
            }

            for record in rig.registry.list() {
                prop_assert!(record.check_invariants().is_ok(), "{:?}", record.check_invariants());
                if lost.get(&record.id).copied().unwrap_or(false) {
                    prop_assert!(!record.valid, "record {} came back to life", record.id);
                }
                if !record.valid {
                    lost.insert(record.id, true);
                }
            }
        }
    }

    #[test]
    fn prop_non_owner_changes_nothing(ops in prop::collection::vec(op_strategy(), 0..30)) {
        let rig = rig();
        for op in &ops {
            apply(&rig, op);
        }

        for record in rig.registry.list() {
            let outsider = (0..PRINCIPALS)
                .map(principal)
                .find(|p| *p != record.owner);
            let Some(outsider) = outsider else { continue };
            let events_before = rig.log.len();

            let update = rig.registry.update(
                &record.id,
                Commitment::of(b"elsewhere"),
                &proof(),
                &outsider,
            );
            let revoke = rig.registry.revoke(&record.id, &outsider);
            let transfer = rig
                .registry
                .transfer_ownership(&record.id, &outsider, &outsider);

            prop_assert!(matches!(update, Err(RegistryError::Unauthorized { .. })), "expected Unauthorized");
            prop_assert!(matches!(revoke, Err(RegistryError::Unauthorized { .. })), "expected Unauthorized");
            prop_assert!(matches!(transfer, Err(RegistryError::Unauthorized { .. })), "expected Unauthorized");
            prop_assert_eq!(rig.registry.get_details(&record.id).unwrap(), record);
            prop_assert_eq!(rig.log.len(), events_before);
        }
    }

    #[test]
    fn prop_event_log_replays_to_live_state(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let rig = rig();
        for op in &ops {
            apply(&rig, op);
        }

        let replay = Replay::from_events(&rig.log.events());
        prop_assert!(replay.anomalies().is_empty(), "{:?}", replay.anomalies());
        let report = sanctity_registry::audit(&rig.registry, &replay);
        prop_assert!(report.summary.passed, "{}", sanctity_registry::format_report(&report));
    }
}
