//! Slot table and per-tick orchestration.
//!
//! The [`Orchestrator`] owns one [`SlotMachine`] per player slot together with
//! the pass and profile bundle the slot holds. It runs on the real-time thread
//! and never blocks: tokens and completed transfers are taken from their
//! queues with a single swap each, and new transfers are only submitted.
//!
//! # Slot lifecycle
//!
//! ```text
//!          scan           submit          downloaded        save
//! Absent ───────► Present ───────► Downloading ────────► Ready ──────► Saving
//!   ▲                                   │                                │
//!   │        download failed / timeout  │              upload completed  │
//!   └───────────────────────────────────┴────────────────────────────────┘
//! ```
//!
//! # Tick order
//!
//! 1. Place newly scanned passes, or reject them with a reason.
//! 2. Apply completed transfers whose task id the slot is still waiting on.
//! 3. Release slots whose download exceeded the timeout.
//! 4. Emit one `RefreshAvailability` if anything changed.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use netpass_core::{EditableMetadata, Pass, PassId, ProfileBundle, SlotIndex, SlotMachine, SlotState, SlotTransition};
use netpass_hardware::TokenQueue;
use netpass_network::{CompletedTask, NetworkQueue, Outcome, Task, TaskId};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::{KioskConfig, RejectMode};
use crate::environment::Environment;
use crate::error::{KioskError, Result};
use crate::notify::{Notification, NotificationSink, RejectReason};

/// Caller-owned profile object that a downloaded bundle is merged into.
pub trait ProfileTarget {
    /// Merge the bundle downloaded for `pass`.
    ///
    /// # Errors
    /// Returns `KioskError::ProfileLoad` if the bundle cannot be applied.
    fn load_bundle(&mut self, pass: &Pass, bundle: &ProfileBundle) -> Result<()>;
}

impl ProfileTarget for ProfileBundle {
    fn load_bundle(&mut self, _pass: &Pass, bundle: &ProfileBundle) -> Result<()> {
        *self = bundle.clone();
        Ok(())
    }
}

impl ProfileTarget for EditableMetadata {
    fn load_bundle(&mut self, pass: &Pass, bundle: &ProfileBundle) -> Result<()> {
        let document = bundle.editable().ok_or_else(|| {
            KioskError::profile_load(format!("no editable document for pass {}", pass.id()))
        })?;
        *self = EditableMetadata::parse(document)
            .map_err(|e| KioskError::profile_load(format!("pass {}: {e}", pass.id())))?;
        Ok(())
    }
}

/// Read-only view of a slot for display collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotSnapshot {
    pub slot: SlotIndex,
    pub state: SlotState,
    pub pass: Option<PassId>,
    pub label: String,
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub placed: usize,
    pub rejected: usize,
    pub discarded: usize,
    pub completed: usize,
    pub stale: usize,
    pub timed_out: usize,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Default)]
struct Slot {
    machine: SlotMachine,
    pass: Option<Pass>,
    bundle: Option<ProfileBundle>,
    display_name: Option<String>,
    awaiting: Option<TaskId>,
}

impl Slot {
    fn state(&self) -> SlotState {
        self.machine.current_state()
    }

    fn holds(&self, id: &PassId) -> bool {
        self.pass.as_ref().is_some_and(|pass| pass.id() == id)
    }

    /// Profile display name while the slot holds a profile, including the
    /// upload in flight, else the numbered fallback.
    fn label(&self, index: SlotIndex, fallback: &str) -> String {
        self.display_name
            .as_ref()
            .filter(|_| self.state().has_profile())
            .cloned()
            .unwrap_or_else(|| fallback_label(fallback, index))
    }

    fn transition(&mut self, index: SlotIndex, to: SlotState) -> bool {
        match self.machine.transition_to(to) {
            Ok(transition) => {
                debug!(slot = %index, from = %transition.from, to = %transition.to, "slot transition");
                true
            }
            Err(e) => {
                error!(slot = %index, error = %e, "rejected slot transition");
                false
            }
        }
    }

    /// Drop the pass and bundle and return to `Absent`.
    fn release(&mut self, index: SlotIndex) -> bool {
        if !self.transition(index, SlotState::Absent) {
            return false;
        }
        self.pass = None;
        self.bundle = None;
        self.display_name = None;
        self.awaiting = None;
        true
    }
}

/// Ties the token queue, the network queue and the slot table together.
pub struct Orchestrator<E, S> {
    slots: Vec<Slot>,
    tokens: Arc<TokenQueue>,
    network: Arc<NetworkQueue>,
    environment: E,
    sink: S,
    reject_mode: RejectMode,
    download_timeout: Option<Duration>,
    fallback_label: String,
    refresh_pending: bool,
}

impl<E, S> Orchestrator<E, S>
where
    E: Environment,
    S: NotificationSink,
{
    /// Build an orchestrator with `config.slots` empty slots.
    pub fn new(
        config: &KioskConfig,
        tokens: Arc<TokenQueue>,
        network: Arc<NetworkQueue>,
        environment: E,
        sink: S,
    ) -> Self {
        Self {
            slots: (0..config.slots).map(|_| Slot::default()).collect(),
            tokens,
            network,
            environment,
            sink,
            reject_mode: config.reject_mode,
            download_timeout: config.download_timeout(),
            fallback_label: config.fallback_label.clone(),
            refresh_pending: false,
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn environment(&self) -> &E {
        &self.environment
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn tokens(&self) -> &Arc<TokenQueue> {
        &self.tokens
    }

    pub fn network(&self) -> &Arc<NetworkQueue> {
        &self.network
    }

    /// Run one orchestration step. Never blocks on I/O.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();

        self.ingest_tokens(&mut report);
        self.ingest_completed(&mut report);
        self.expire_downloads(&mut report);

        if self.refresh_pending {
            self.refresh_pending = false;
            self.sink.notify(Notification::RefreshAvailability);
        }

        if !report.is_idle() {
            debug!(?report, "tick");
        }
        report
    }

    fn ingest_tokens(&mut self, report: &mut TickReport) {
        let passes = self.tokens.take_if_changed();
        if passes.is_empty() {
            return;
        }

        let mut passes = passes.into_iter();
        while let Some(pass) = passes.next() {
            match self.place(pass) {
                Ok(_) => report.placed += 1,
                Err((pass, reason)) => {
                    report.rejected += 1;
                    info!(pass = %pass.id(), %reason, "pass rejected");
                    self.sink.notify(Notification::TooLate {
                        pass: pass.id().clone(),
                        reason,
                    });

                    if self.reject_mode == RejectMode::DiscardRemaining {
                        let dropped: Vec<_> = passes.by_ref().collect();
                        if !dropped.is_empty() {
                            warn!(count = dropped.len(), "discarding remaining scans in batch");
                            report.discarded += dropped.len();
                        }
                        break;
                    }
                }
            }
        }
    }

    /// Associate a pass with the first free enabled slot and submit its download.
    fn place(&mut self, pass: Pass) -> std::result::Result<SlotIndex, (Pass, RejectReason)> {
        if !self.environment.can_players_join() {
            return Err((pass, RejectReason::JoinClosed));
        }

        if self.slots.iter().any(|slot| slot.holds(pass.id())) {
            return Err((pass, RejectReason::Duplicate));
        }

        let Some(position) = self.slots.iter().enumerate().position(|(i, slot)| {
            slot.pass.is_none() && self.environment.is_slot_enabled(SlotIndex::new(i))
        }) else {
            return Err((pass, RejectReason::NoEligibleSlot));
        };

        let index = SlotIndex::new(position);
        let slot = &mut self.slots[position];
        if !slot.transition(index, SlotState::Present) {
            return Err((pass, RejectReason::NoEligibleSlot));
        }
        slot.pass = Some(pass.clone());

        let task = Task::download(index, pass.clone());
        slot.awaiting = Some(task.id);
        info!(slot = %index, pass = %pass.id(), task = %task.id, "pass placed, downloading profile");
        self.network.submit(task);

        slot.transition(index, SlotState::Downloading);
        if let Some(timeout) = self.download_timeout {
            slot.machine.set_timeout(timeout);
        }

        self.refresh_pending = true;
        self.sink.notify(Notification::Scanned {
            slot: index,
            pass: pass.id().clone(),
        });
        Ok(index)
    }

    fn ingest_completed(&mut self, report: &mut TickReport) {
        for completed in self.network.drain_completed() {
            if self.apply_completed(completed) {
                report.completed += 1;
            } else {
                report.stale += 1;
            }
        }
    }

    /// Apply a completion if its slot still waits on it. Returns `false` for
    /// late arrivals.
    fn apply_completed(&mut self, completed: CompletedTask) -> bool {
        let CompletedTask { id, slot: index, outcome } = completed;

        let Some(slot) = self.slots.get_mut(index.get()) else {
            warn!(slot = %index, task = %id, "completion for unknown slot");
            return false;
        };

        if slot.awaiting != Some(id) {
            warn!(slot = %index, task = %id, pass = %outcome.pass().id(), "discarding stale completion");
            return false;
        }
        slot.awaiting = None;

        let notification = match outcome {
            Outcome::Downloaded { bundle, .. } => {
                if !slot.transition(index, SlotState::Ready) {
                    return false;
                }
                slot.display_name = bundle.display_name();
                slot.bundle = Some(bundle);
                let display_name = slot.label(index, &self.fallback_label);
                info!(slot = %index, %display_name, "profile ready");
                Notification::Ready {
                    slot: index,
                    display_name,
                }
            }
            Outcome::DownloadFailed { pass, error } => {
                warn!(slot = %index, pass = %pass.id(), %error, "download failed, releasing slot");
                if !slot.release(index) {
                    return false;
                }
                Notification::DownloadFailed { slot: index }
            }
            Outcome::Uploaded { pass, status } => {
                if status.is_accepted() {
                    info!(slot = %index, pass = %pass.id(), "profile saved");
                } else {
                    warn!(slot = %index, pass = %pass.id(), ?status, "profile upload failed");
                }
                if !slot.release(index) {
                    return false;
                }
                Notification::Saved { slot: index }
            }
        };

        self.refresh_pending = true;
        self.sink.notify(notification);
        true
    }

    fn expire_downloads(&mut self, report: &mut TickReport) {
        for (position, slot) in self.slots.iter_mut().enumerate() {
            if slot.state() != SlotState::Downloading || !slot.machine.has_timed_out() {
                continue;
            }

            let index = SlotIndex::new(position);
            warn!(
                slot = %index,
                waited_ms = u64::try_from(slot.machine.time_in_current_state().as_millis())
                    .unwrap_or(u64::MAX),
                "download timed out, releasing slot"
            );
            if slot.release(index) {
                report.timed_out += 1;
                self.refresh_pending = true;
                self.sink.notify(Notification::DownloadFailed { slot: index });
            }
        }
    }

    fn slot(&self, index: SlotIndex) -> Result<&Slot> {
        self.slots.get(index.get()).ok_or(KioskError::InvalidSlot {
            slot: index.get(),
            count: self.slots.len(),
        })
    }

    /// Current state of a slot.
    ///
    /// # Errors
    /// Returns `KioskError::InvalidSlot` for an index outside the table.
    pub fn state(&self, index: SlotIndex) -> Result<SlotState> {
        Ok(self.slot(index)?.state())
    }

    /// Pass held by a slot, if any.
    ///
    /// # Errors
    /// Returns `KioskError::InvalidSlot` for an index outside the table.
    pub fn pass(&self, index: SlotIndex) -> Result<Option<&Pass>> {
        Ok(self.slot(index)?.pass.as_ref())
    }

    /// Recent transitions of a slot, oldest first.
    ///
    /// # Errors
    /// Returns `KioskError::InvalidSlot` for an index outside the table.
    pub fn transitions(&self, index: SlotIndex) -> Result<&VecDeque<SlotTransition>> {
        Ok(self.slot(index)?.machine.history())
    }

    /// Name to show for a slot: the profile's display name while it is
    /// `Ready` or `Saving`, otherwise the fallback label with the 1-based
    /// slot number.
    ///
    /// # Errors
    /// Returns `KioskError::InvalidSlot` for an index outside the table.
    pub fn display_label(&self, index: SlotIndex) -> Result<String> {
        Ok(self.slot(index)?.label(index, &self.fallback_label))
    }

    /// Merge the slot's downloaded profile into `target`.
    ///
    /// # Errors
    /// Returns `KioskError::NotReady` unless the slot is `Ready`, or the
    /// target's own error.
    pub fn load_profile<T>(&self, index: SlotIndex, target: &mut T) -> Result<()>
    where
        T: ProfileTarget + ?Sized,
    {
        let slot = self.slot(index)?;
        match (slot.state(), &slot.pass, &slot.bundle) {
            (SlotState::Ready, Some(pass), Some(bundle)) => target.load_bundle(pass, bundle),
            (state, ..) => Err(KioskError::NotReady { slot: index, state }),
        }
    }

    /// Upload new stats for a `Ready` slot.
    ///
    /// The bundle moves into the upload task and the slot enters `Saving`.
    /// When the upload completes the slot is released.
    ///
    /// # Errors
    /// Returns `KioskError::NotReady` unless the slot is `Ready`; nothing is
    /// submitted in that case.
    pub fn save_profile(&mut self, index: SlotIndex, stats: Bytes) -> Result<TaskId> {
        let state = self.state(index)?;
        if state != SlotState::Ready {
            return Err(KioskError::NotReady { slot: index, state });
        }

        let slot = &mut self.slots[index.get()];
        let (Some(pass), Some(bundle)) = (slot.pass.clone(), slot.bundle.take()) else {
            return Err(KioskError::NotReady { slot: index, state });
        };

        slot.machine.transition_to(SlotState::Saving)?;
        let task = Task::upload(index, pass, bundle.with_stats(stats));
        let id = task.id;
        slot.awaiting = Some(id);
        info!(slot = %index, task = %id, "saving profile");
        self.network.submit(task);
        self.refresh_pending = true;
        Ok(id)
    }

    /// Snapshot of every slot, in slot order.
    pub fn snapshot(&self) -> Vec<SlotSnapshot> {
        self.slots
            .iter()
            .enumerate()
            .map(|(position, slot)| {
                let index = SlotIndex::new(position);
                SlotSnapshot {
                    slot: index,
                    state: slot.state(),
                    pass: slot.pass.as_ref().map(|pass| pass.id().clone()),
                    label: slot.label(index, &self.fallback_label),
                }
            })
            .collect()
    }
}

fn fallback_label(prefix: &str, index: SlotIndex) -> String {
    format!("{prefix} {}", index.get() + 1)
}
