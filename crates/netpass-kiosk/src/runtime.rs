//! Explicitly constructed kiosk runtime.
//!
//! [`NetPassRuntime`] owns both workers and the orchestrator. Whoever drives
//! the real-time loop holds the runtime and calls [`tick`](NetPassRuntime::tick);
//! display collaborators query it through the same handle. There is no
//! process-wide instance.

use std::sync::Arc;

use bytes::Bytes;
use netpass_core::{SlotIndex, SlotState};
use netpass_hardware::{HardwareChannel, PollWorker};
use netpass_network::{NetworkQueue, NetworkWorker, TaskId, TransferClient};
use tracing::info;

use crate::config::KioskConfig;
use crate::environment::Environment;
use crate::error::Result;
use crate::notify::NotificationSink;
use crate::orchestrator::{Orchestrator, ProfileTarget, SlotSnapshot, TickReport};

/// The running kiosk: token reader, profile service worker and slot table.
pub struct NetPassRuntime<E, S> {
    orchestrator: Orchestrator<E, S>,
    poll: PollWorker,
    network: NetworkWorker,
}

impl<E, S> NetPassRuntime<E, S>
where
    E: Environment,
    S: NotificationSink,
{
    /// Validate the configuration, open the reader and start both workers.
    ///
    /// A missing reader is not an error: depending on
    /// `hardware.reconnect_on_startup` the poll worker keeps retrying or
    /// stays inactive.
    ///
    /// # Errors
    /// Returns `KioskError::InvalidConfig` for out-of-range settings, or the
    /// worker error if a thread cannot be spawned.
    pub fn start<C, T>(
        config: &KioskConfig,
        channel: C,
        client: T,
        environment: E,
        sink: S,
    ) -> Result<Self>
    where
        C: HardwareChannel + 'static,
        T: TransferClient + 'static,
    {
        config.validate()?;

        let poll = PollWorker::spawn(channel, config.poll_worker_config())?;
        let queue = Arc::new(NetworkQueue::new());
        let network = NetworkWorker::spawn(client, Arc::clone(&queue), config.network_heartbeat())?;
        let orchestrator = Orchestrator::new(config, poll.tokens(), queue, environment, sink);

        info!(
            slots = config.slots,
            reader = %poll.device_name(),
            reader_active = poll.is_active(),
            "kiosk runtime started"
        );

        Ok(Self {
            orchestrator,
            poll,
            network,
        })
    }

    /// Run one orchestration step.
    pub fn tick(&mut self) -> TickReport {
        self.orchestrator.tick()
    }

    /// # Errors
    /// Returns `KioskError::InvalidSlot` for an index outside the table.
    pub fn state(&self, slot: SlotIndex) -> Result<SlotState> {
        self.orchestrator.state(slot)
    }

    /// # Errors
    /// Returns `KioskError::InvalidSlot` for an index outside the table.
    pub fn display_label(&self, slot: SlotIndex) -> Result<String> {
        self.orchestrator.display_label(slot)
    }

    /// # Errors
    /// Returns `KioskError::NotReady` unless the slot is `Ready`.
    pub fn load_profile<T>(&self, slot: SlotIndex, target: &mut T) -> Result<()>
    where
        T: ProfileTarget + ?Sized,
    {
        self.orchestrator.load_profile(slot, target)
    }

    /// # Errors
    /// Returns `KioskError::NotReady` unless the slot is `Ready`.
    pub fn save_profile(&mut self, slot: SlotIndex, stats: Bytes) -> Result<TaskId> {
        self.orchestrator.save_profile(slot, stats)
    }

    pub fn snapshot(&self) -> Vec<SlotSnapshot> {
        self.orchestrator.snapshot()
    }

    pub fn orchestrator(&self) -> &Orchestrator<E, S> {
        &self.orchestrator
    }

    pub fn orchestrator_mut(&mut self) -> &mut Orchestrator<E, S> {
        &mut self.orchestrator
    }

    pub fn is_reader_active(&self) -> bool {
        self.poll.is_active()
    }

    pub fn is_reader_connected(&self) -> bool {
        self.poll.is_connected()
    }

    /// Stop both workers, waiting for the read and the transfer in flight.
    pub fn shutdown(&mut self) {
        self.poll.stop();
        self.network.stop();
        info!("kiosk runtime stopped");
    }
}
