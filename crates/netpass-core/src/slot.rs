//! Per-player slot state machine.
//!
//! Every player slot moves through the association lifecycle below. The
//! machine rejects any other transition so a slot can never skip the
//! download or be marked ready without a profile.
//!
//! # States
//!
//! - `Absent`: no pass associated
//! - `Present`: a pass was accepted for this slot
//! - `Downloading`: the profile download task is in flight
//! - `Ready`: the profile is loaded and usable
//! - `Saving`: the profile upload task is in flight
//!
//! # Valid Transitions
//!
//! - Absent → Present → Downloading → Ready
//! - Ready → Saving → Ready | Absent
//! - Downloading → Absent (download failed or timed out)
//!
//! # Examples
//!
//! ```
//! use netpass_core::{SlotMachine, SlotState};
//!
//! let mut machine = SlotMachine::new();
//! machine.transition_to(SlotState::Present).unwrap();
//! machine.transition_to(SlotState::Downloading).unwrap();
//! assert!(machine.transition_to(SlotState::Saving).is_err());
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::constants::MAX_HISTORY_SIZE;
use crate::{Error, Result};

/// Index of a player slot.
///
/// Zero-based internally; displayed 1-based the way players read it
/// on the cabinet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotIndex(usize);

impl SlotIndex {
    #[must_use]
    pub const fn new(index: usize) -> Self {
        SlotIndex(index)
    }

    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }

    /// Check the index against a slot count.
    ///
    /// # Errors
    /// Returns `Error::SlotOutOfRange` when `index >= count`.
    pub fn checked(index: usize, count: usize) -> Result<Self> {
        if index >= count {
            return Err(Error::SlotOutOfRange { slot: index, count });
        }
        Ok(SlotIndex(index))
    }
}

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0 + 1)
    }
}

/// Association state of a player slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    /// No pass associated.
    #[default]
    Absent,

    /// A pass was accepted; the download has not been submitted yet.
    Present,

    /// Profile download in flight.
    Downloading,

    /// Profile upload in flight.
    Saving,

    /// Profile downloaded and attached.
    Ready,
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = match self {
            SlotState::Absent => "Absent",
            SlotState::Present => "Present",
            SlotState::Downloading => "Downloading",
            SlotState::Saving => "Saving",
            SlotState::Ready => "Ready",
        };
        write!(f, "{}", state_str)
    }
}

impl SlotState {
    /// All states, in declaration order.
    pub const ALL: [SlotState; 5] = [
        SlotState::Absent,
        SlotState::Present,
        SlotState::Downloading,
        SlotState::Saving,
        SlotState::Ready,
    ];

    /// Check if transition to target state is valid from this state.
    ///
    /// # Examples
    ///
    /// ```
    /// use netpass_core::SlotState;
    ///
    /// assert!(SlotState::Absent.can_transition_to(&SlotState::Present));
    /// assert!(!SlotState::Absent.can_transition_to(&SlotState::Ready));
    /// ```
    pub fn can_transition_to(&self, target: &SlotState) -> bool {
        matches!(
            (self, target),
            (SlotState::Absent, SlotState::Present)
                | (SlotState::Present, SlotState::Downloading)
                | (SlotState::Downloading, SlotState::Ready | SlotState::Absent)
                | (SlotState::Ready, SlotState::Saving)
                | (SlotState::Saving, SlotState::Ready | SlotState::Absent)
        )
    }

    /// A pass is associated with the slot in every state but `Absent`.
    pub fn is_occupied(&self) -> bool {
        !matches!(self, SlotState::Absent)
    }

    /// States in which the slot owns a profile bundle or one is in flight
    /// on its behalf.
    pub fn has_profile(&self) -> bool {
        matches!(self, SlotState::Ready | SlotState::Saving)
    }
}

/// A single slot state transition with timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotTransition {
    pub from: SlotState,
    pub to: SlotState,

    /// Not serialized; set to the deserialization time when read back.
    #[serde(skip, default = "Instant::now")]
    pub timestamp: Instant,
}

impl SlotTransition {
    pub fn new(from: SlotState, to: SlotState) -> Self {
        Self {
            from,
            to,
            timestamp: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.timestamp.elapsed()
    }
}

/// State machine for a single player slot.
///
/// Enforces the legal transition table, records a bounded history and
/// supports an optional timeout for the current state.
///
/// # Thread Safety
///
/// Not synchronized. The orchestrator is the single writer; other readers
/// see snapshots taken on the orchestrator's thread.
#[derive(Debug)]
pub struct SlotMachine {
    current_state: SlotState,
    state_entered_at: Instant,
    history: VecDeque<SlotTransition>,
    current_timeout: Option<Duration>,
}

impl SlotMachine {
    /// Create a new machine in the `Absent` state.
    pub fn new() -> Self {
        Self {
            current_state: SlotState::Absent,
            state_entered_at: Instant::now(),
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
            current_timeout: None,
        }
    }

    pub fn current_state(&self) -> SlotState {
        self.current_state
    }

    pub fn time_in_current_state(&self) -> Duration {
        self.state_entered_at.elapsed()
    }

    /// Returns `true` if a timeout is set and has been exceeded.
    pub fn has_timed_out(&self) -> bool {
        self.current_timeout
            .is_some_and(|timeout| self.time_in_current_state() >= timeout)
    }

    /// Remaining time before the current state times out, if a timeout is set.
    pub fn time_remaining(&self) -> Option<Duration> {
        self.current_timeout
            .and_then(|timeout| timeout.checked_sub(self.time_in_current_state()))
    }

    /// Set a timeout for the current state. Cleared on the next transition.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.current_timeout = Some(timeout);
    }

    /// Recent transitions, oldest first.
    pub fn history(&self) -> &VecDeque<SlotTransition> {
        &self.history
    }

    /// Transition to a new state, validating the transition.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidStateTransition` if the transition is not legal
    /// from the current state. The machine is left unchanged.
    pub fn transition_to(&mut self, new_state: SlotState) -> Result<SlotTransition> {
        if !self.current_state.can_transition_to(&new_state) {
            return Err(Error::InvalidStateTransition {
                from: self.current_state.to_string(),
                to: new_state.to_string(),
            });
        }

        let transition = SlotTransition::new(self.current_state, new_state);
        self.current_state = new_state;
        self.state_entered_at = Instant::now();
        self.current_timeout = None;

        self.history.push_back(transition.clone());
        if self.history.len() > MAX_HISTORY_SIZE {
            self.history.pop_front();
        }

        Ok(transition)
    }
}

impl Default for SlotMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::thread;

    #[rstest]
    #[case(SlotState::Absent, SlotState::Present)]
    #[case(SlotState::Present, SlotState::Downloading)]
    #[case(SlotState::Downloading, SlotState::Ready)]
    #[case(SlotState::Downloading, SlotState::Absent)]
    #[case(SlotState::Ready, SlotState::Saving)]
    #[case(SlotState::Saving, SlotState::Ready)]
    #[case(SlotState::Saving, SlotState::Absent)]
    fn test_valid_transitions(#[case] from: SlotState, #[case] to: SlotState) {
        assert!(from.can_transition_to(&to));
    }

    #[test]
    fn test_transition_table_is_closed() {
        let legal = [
            (SlotState::Absent, SlotState::Present),
            (SlotState::Present, SlotState::Downloading),
            (SlotState::Downloading, SlotState::Ready),
            (SlotState::Downloading, SlotState::Absent),
            (SlotState::Ready, SlotState::Saving),
            (SlotState::Saving, SlotState::Ready),
            (SlotState::Saving, SlotState::Absent),
        ];

        for from in SlotState::ALL {
            for to in SlotState::ALL {
                assert_eq!(
                    from.can_transition_to(&to),
                    legal.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn test_invalid_transition_leaves_state() {
        let mut machine = SlotMachine::new();
        let result = machine.transition_to(SlotState::Ready);

        assert!(matches!(result, Err(Error::InvalidStateTransition { .. })));
        assert_eq!(machine.current_state(), SlotState::Absent);
        assert!(machine.history().is_empty());
    }

    #[test]
    fn test_full_session_history() {
        let mut machine = SlotMachine::new();
        for state in [
            SlotState::Present,
            SlotState::Downloading,
            SlotState::Ready,
            SlotState::Saving,
            SlotState::Absent,
        ] {
            machine.transition_to(state).unwrap();
        }

        assert_eq!(machine.current_state(), SlotState::Absent);
        assert_eq!(machine.history().len(), 5);
        assert_eq!(machine.history()[0].from, SlotState::Absent);
        assert_eq!(machine.history()[4].to, SlotState::Absent);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut machine = SlotMachine::new();
        for _ in 0..MAX_HISTORY_SIZE {
            machine.transition_to(SlotState::Present).unwrap();
            machine.transition_to(SlotState::Downloading).unwrap();
            machine.transition_to(SlotState::Absent).unwrap();
        }
        assert_eq!(machine.history().len(), MAX_HISTORY_SIZE);
    }

    #[test]
    fn test_timeout_detection() {
        let mut machine = SlotMachine::new();
        machine.set_timeout(Duration::from_millis(20));
        assert!(!machine.has_timed_out());
        assert!(machine.time_remaining().is_some());

        thread::sleep(Duration::from_millis(30));
        assert!(machine.has_timed_out());
        assert!(machine.time_remaining().is_none());
    }

    #[test]
    fn test_timeout_cleared_on_transition() {
        let mut machine = SlotMachine::new();
        machine.set_timeout(Duration::from_secs(5));
        machine.transition_to(SlotState::Present).unwrap();

        assert!(!machine.has_timed_out());
        assert!(machine.time_remaining().is_none());
    }

    #[test]
    fn test_slot_index_display_and_bounds() {
        assert_eq!(SlotIndex::new(0).to_string(), "P1");
        assert_eq!(SlotIndex::checked(1, 2).unwrap().get(), 1);
        assert!(matches!(
            SlotIndex::checked(2, 2),
            Err(Error::SlotOutOfRange { slot: 2, count: 2 })
        ));
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_string(&SlotState::Downloading).unwrap();
        assert_eq!(json, "\"downloading\"");
    }
}
