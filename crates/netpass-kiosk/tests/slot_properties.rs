//! Property-based tests for the slot table.
//!
//! Arbitrary sequences of scans, transfer completions, saves and environment
//! changes are replayed against an orchestrator whose network queue is
//! answered inline, and the slot invariants are checked after every tick.

use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;
use netpass_core::{Pass, ProfileBundle, SlotIndex, SlotState};
use netpass_hardware::TokenQueue;
use netpass_kiosk::{KioskConfig, Notification, Orchestrator, RejectMode, StaticEnvironment};
use netpass_network::{
    CompletedTask, NetworkQueue, Outcome, Request, TransferError, UploadStatus,
};
use proptest::prelude::*;

const SLOTS: usize = 3;

#[derive(Debug, Clone)]
enum Op {
    Scan(&'static str),
    Complete { succeed: bool },
    Save(usize),
    SetJoinOpen(bool),
    SetSlotEnabled(usize, bool),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => prop::sample::select(vec!["A", "B", "C", "D", "E"]).prop_map(Op::Scan),
        3 => any::<bool>().prop_map(|succeed| Op::Complete { succeed }),
        2 => (0..SLOTS).prop_map(Op::Save),
        1 => any::<bool>().prop_map(Op::SetJoinOpen),
        1 => (0..SLOTS, any::<bool>()).prop_map(|(slot, on)| Op::SetSlotEnabled(slot, on)),
    ]
}

fn reject_mode() -> impl Strategy<Value = RejectMode> {
    prop_oneof![Just(RejectMode::Continue), Just(RejectMode::DiscardRemaining)]
}

struct Harness {
    orchestrator: Orchestrator<Arc<StaticEnvironment>, Vec<Notification>>,
    env: Arc<StaticEnvironment>,
    tokens: Arc<TokenQueue>,
    network: Arc<NetworkQueue>,
}

impl Harness {
    fn new(reject_mode: RejectMode) -> Self {
        let config = KioskConfig {
            slots: SLOTS,
            reject_mode,
            download_timeout_ms: 0,
            ..KioskConfig::default()
        };
        let env = Arc::new(StaticEnvironment::new(SLOTS));
        let tokens = Arc::new(TokenQueue::new());
        let network = Arc::new(NetworkQueue::new());
        let orchestrator = Orchestrator::new(
            &config,
            Arc::clone(&tokens),
            Arc::clone(&network),
            Arc::clone(&env),
            Vec::new(),
        );
        Self {
            orchestrator,
            env,
            tokens,
            network,
        }
    }

    fn apply(&mut self, op: &Op) {
        match op {
            Op::Scan(id) => self.tokens.push(Pass::new(id).unwrap()),
            Op::Complete { succeed } => self.answer_pending(*succeed),
            Op::Save(slot) => {
                let _ = self
                    .orchestrator
                    .save_profile(SlotIndex::new(*slot), Bytes::from_static(b"<Stats v=\"2\"/>"));
            }
            Op::SetJoinOpen(open) => self.env.set_join_open(*open),
            Op::SetSlotEnabled(slot, on) => self.env.set_slot_enabled(SlotIndex::new(*slot), *on),
        }
        self.orchestrator.tick();
    }

    fn answer_pending(&self, succeed: bool) {
        for task in self.network.take_pending() {
            let outcome = match task.request {
                Request::Download { pass } if succeed => {
                    let editable = format!(r#"{{"display_name":"{}"}}"#, pass.id());
                    Outcome::Downloaded {
                        pass,
                        bundle: ProfileBundle::new("<Stats/>", Some(Bytes::from(editable))),
                    }
                }
                Request::Download { pass } => Outcome::DownloadFailed {
                    pass,
                    error: TransferError::connection("refused"),
                },
                Request::Upload { pass, .. } => Outcome::Uploaded {
                    pass,
                    status: if succeed {
                        UploadStatus::Accepted
                    } else {
                        UploadStatus::Failed("503".to_string())
                    },
                },
            };
            self.network.complete(CompletedTask {
                id: task.id,
                slot: task.slot,
                outcome,
            });
        }
    }
}

proptest! {
    /// Property: no two slots ever hold passes with equal identifiers.
    #[test]
    fn prop_no_duplicate_passes(
        mode in reject_mode(),
        ops in prop::collection::vec(op(), 1..60),
    ) {
        let mut harness = Harness::new(mode);
        for op in &ops {
            harness.apply(op);

            let held: Vec<_> = harness
                .orchestrator
                .snapshot()
                .into_iter()
                .filter_map(|slot| slot.pass)
                .collect();
            let unique: HashSet<_> = held.iter().collect();
            prop_assert_eq!(unique.len(), held.len(), "duplicate pass after {:?}", op);
        }
    }

    /// Property: a slot holds a pass exactly when it is not `Absent`.
    #[test]
    fn prop_pass_present_iff_occupied(
        mode in reject_mode(),
        ops in prop::collection::vec(op(), 1..60),
    ) {
        let mut harness = Harness::new(mode);
        for op in &ops {
            harness.apply(op);
            for slot in harness.orchestrator.snapshot() {
                prop_assert_eq!(slot.pass.is_some(), slot.state.is_occupied());
            }
        }
    }

    /// Property: the profile's name is shown exactly while the slot holds a
    /// profile (`Ready` or `Saving`); every other state shows the fallback.
    #[test]
    fn prop_label_follows_profile(
        ops in prop::collection::vec(op(), 1..60),
    ) {
        let mut harness = Harness::new(RejectMode::Continue);
        for op in &ops {
            harness.apply(op);
            for slot in harness.orchestrator.snapshot() {
                let expected = match (&slot.pass, slot.state.has_profile()) {
                    (Some(pass), true) => pass.to_string(),
                    _ => format!("Player {}", slot.slot.get() + 1),
                };
                prop_assert_eq!(&slot.label, &expected);
            }
        }
    }

    /// Property: every recorded transition is a legal edge and the history
    /// forms an unbroken chain starting at `Absent`.
    #[test]
    fn prop_only_legal_transitions(
        mode in reject_mode(),
        ops in prop::collection::vec(op(), 1..60),
    ) {
        let mut harness = Harness::new(mode);
        for op in &ops {
            harness.apply(op);
        }

        for slot in 0..SLOTS {
            let index = SlotIndex::new(slot);
            let mut current = SlotState::Absent;
            for transition in harness.orchestrator.transitions(index).unwrap() {
                prop_assert_eq!(transition.from, current);
                prop_assert!(transition.from.can_transition_to(&transition.to));
                current = transition.to;
            }
            prop_assert_eq!(current, harness.orchestrator.state(index).unwrap());
        }
    }

    /// Property: a save is accepted only from `Ready` and always submits
    /// exactly one upload.
    #[test]
    fn prop_save_only_from_ready(
        ops in prop::collection::vec(op(), 1..40),
        slot in 0..SLOTS,
    ) {
        let mut harness = Harness::new(RejectMode::Continue);
        for op in &ops {
            harness.apply(op);
        }

        let index = SlotIndex::new(slot);
        let before = harness.orchestrator.state(index).unwrap();
        let pending_before = harness.network.pending_len();
        let result = harness
            .orchestrator
            .save_profile(index, Bytes::from_static(b"<Stats/>"));

        if before == SlotState::Ready {
            prop_assert!(result.is_ok());
            prop_assert_eq!(harness.network.pending_len(), pending_before + 1);
            prop_assert_eq!(harness.orchestrator.state(index).unwrap(), SlotState::Saving);
        } else {
            prop_assert!(result.is_err());
            prop_assert_eq!(harness.network.pending_len(), pending_before);
            prop_assert_eq!(harness.orchestrator.state(index).unwrap(), before);
        }
    }
}
