//! Property-based tests for the slot state machine.

use netpass_core::{SlotMachine, SlotState};
use proptest::prelude::*;

fn state() -> impl Strategy<Value = SlotState> {
    prop::sample::select(SlotState::ALL.to_vec())
}

proptest! {
    /// Property: a transition succeeds exactly when the edge is legal, and a
    /// rejected transition leaves the machine unchanged.
    #[test]
    fn prop_transitions_follow_edge_table(targets in prop::collection::vec(state(), 1..80)) {
        let mut machine = SlotMachine::new();
        for target in targets {
            let before = machine.current_state();
            let history_len = machine.history().len();
            let result = machine.transition_to(target);

            if before.can_transition_to(&target) {
                prop_assert!(result.is_ok());
                prop_assert_eq!(machine.current_state(), target);
                prop_assert_eq!(machine.history().len(), history_len + 1);
            } else {
                prop_assert!(result.is_err());
                prop_assert_eq!(machine.current_state(), before);
                prop_assert_eq!(machine.history().len(), history_len);
            }
        }
    }

    /// Property: the recorded history is an unbroken chain of legal edges
    /// ending in the current state.
    #[test]
    fn prop_history_is_a_legal_chain(targets in prop::collection::vec(state(), 1..80)) {
        let mut machine = SlotMachine::new();
        for target in targets {
            let _ = machine.transition_to(target);
        }

        let history = machine.history();
        for pair in history.iter().collect::<Vec<_>>().windows(2) {
            prop_assert_eq!(pair[0].to, pair[1].from);
        }
        for transition in history {
            prop_assert!(transition.from.can_transition_to(&transition.to));
        }
        if let Some(last) = history.back() {
            prop_assert_eq!(last.to, machine.current_state());
        }
    }
}
