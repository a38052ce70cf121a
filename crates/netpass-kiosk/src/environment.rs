//! Game-state queries consumed by the orchestrator.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use netpass_core::SlotIndex;

/// Answers the two questions the orchestrator asks the game each tick.
pub trait Environment {
    /// Whether new players may still register.
    fn can_players_join(&self) -> bool;

    /// Whether the given slot accepts a player.
    fn is_slot_enabled(&self, slot: SlotIndex) -> bool;
}

impl<E: Environment + ?Sized> Environment for &E {
    fn can_players_join(&self) -> bool {
        (**self).can_players_join()
    }

    fn is_slot_enabled(&self, slot: SlotIndex) -> bool {
        (**self).is_slot_enabled(slot)
    }
}

impl<E: Environment + ?Sized> Environment for Arc<E> {
    fn can_players_join(&self) -> bool {
        (**self).can_players_join()
    }

    fn is_slot_enabled(&self, slot: SlotIndex) -> bool {
        (**self).is_slot_enabled(slot)
    }
}

/// Environment backed by atomic flags, switchable from any thread.
///
/// Every slot starts enabled and the join window starts open.
#[derive(Debug)]
pub struct StaticEnvironment {
    join_open: AtomicBool,
    enabled: Vec<AtomicBool>,
}

impl StaticEnvironment {
    pub fn new(slots: usize) -> Self {
        Self {
            join_open: AtomicBool::new(true),
            enabled: (0..slots).map(|_| AtomicBool::new(true)).collect(),
        }
    }

    pub fn set_join_open(&self, open: bool) {
        self.join_open.store(open, Ordering::Release);
    }

    /// Enable or disable a slot. Unknown slots are ignored.
    pub fn set_slot_enabled(&self, slot: SlotIndex, enabled: bool) {
        if let Some(flag) = self.enabled.get(slot.get()) {
            flag.store(enabled, Ordering::Release);
        }
    }
}

impl Environment for StaticEnvironment {
    fn can_players_join(&self) -> bool {
        self.join_open.load(Ordering::Acquire)
    }

    fn is_slot_enabled(&self, slot: SlotIndex) -> bool {
        self.enabled
            .get(slot.get())
            .is_some_and(|flag| flag.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_open_and_enabled() {
        let env = StaticEnvironment::new(2);
        assert!(env.can_players_join());
        assert!(env.is_slot_enabled(SlotIndex::new(0)));
        assert!(env.is_slot_enabled(SlotIndex::new(1)));
        assert!(!env.is_slot_enabled(SlotIndex::new(2)));
    }

    #[test]
    fn test_toggles_through_shared_handle() {
        let env = Arc::new(StaticEnvironment::new(2));
        let shared: Arc<StaticEnvironment> = Arc::clone(&env);

        env.set_join_open(false);
        env.set_slot_enabled(SlotIndex::new(1), false);

        assert!(!shared.can_players_join());
        assert!(!shared.is_slot_enabled(SlotIndex::new(1)));
        assert!(shared.is_slot_enabled(SlotIndex::new(0)));
    }
}
