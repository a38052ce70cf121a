//! Hardware poll worker.
//!
//! Owns a [`HardwareChannel`] on a dedicated thread, reads one token per
//! heartbeat and pushes valid passes onto a shared [`TokenQueue`]. A broken
//! channel is reopened through the [`Connection`] state machine with a
//! fixed backoff until it recovers or the worker is stopped.
//!
//! ```text
//! ┌──────────────┐  read_line  ┌────────────┐  take_if_changed  ┌──────────────┐
//! │ HardwareChan │────────────►│ TokenQueue │──────────────────►│ Orchestrator │
//! └──────────────┘             └────────────┘                   └──────────────┘
//! ```
//!
//! # Examples
//!
//! ```
//! use netpass_hardware::mock::MockChannel;
//! use netpass_hardware::{PollWorker, PollWorkerConfig};
//! use std::time::Duration;
//!
//! let (channel, handle) = MockChannel::new();
//! let mut worker = PollWorker::spawn(channel, PollWorkerConfig::default()).unwrap();
//!
//! handle.present("0004417023").unwrap();
//! let tokens = worker.tokens();
//! for _ in 0..200 {
//!     if !tokens.is_empty() {
//!         break;
//!     }
//!     std::thread::sleep(Duration::from_millis(10));
//! }
//!
//! let passes = worker.take_tokens();
//! assert_eq!(passes[0].id().as_str(), "0004417023");
//! worker.stop();
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use netpass_core::constants::DEFAULT_HARDWARE_HEARTBEAT_MS;
use netpass_core::{Pass, ShutdownSignal, SwapQueue, WorkerThread};
use tracing::{debug, info, warn};

use crate::channel::HardwareChannel;
use crate::connection::{Connection, ReconnectPolicy, StepOutcome};
use crate::error::{HardwareError, Result};

/// Passes read by the worker and not yet taken by the orchestrator.
///
/// The `changed` flag lets the real-time tick skip the lock entirely when
/// nothing was scanned since the last drain.
#[derive(Debug, Default)]
pub struct TokenQueue {
    passes: SwapQueue<Pass>,
    changed: AtomicBool,
}

impl TokenQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a pass and raise the changed flag.
    pub fn push(&self, pass: Pass) {
        self.passes.push(pass);
        self.changed.store(true, Ordering::Release);
    }

    pub fn is_changed(&self) -> bool {
        self.changed.load(Ordering::Acquire)
    }

    /// Clear the changed flag and take every queued pass in scan order.
    ///
    /// Returns an empty vector without touching the lock when the flag was
    /// not set. A pass pushed between the flag swap and the drain is either
    /// taken now or left with the flag raised for the next call.
    pub fn take_if_changed(&self) -> Vec<Pass> {
        if self.changed.swap(false, Ordering::AcqRel) {
            self.passes.drain()
        } else {
            Vec::new()
        }
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}

/// Configuration for the hardware poll worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollWorkerConfig {
    /// Pause between two read attempts.
    pub heartbeat: Duration,

    /// Backoff between reopen attempts.
    pub reconnect: ReconnectPolicy,

    /// Start the worker even when the first open fails.
    ///
    /// When disabled, a failed first open leaves the worker inactive for the
    /// lifetime of the process.
    pub reconnect_on_startup: bool,
}

impl Default for PollWorkerConfig {
    fn default() -> Self {
        Self {
            heartbeat: Duration::from_millis(DEFAULT_HARDWARE_HEARTBEAT_MS),
            reconnect: ReconnectPolicy::default(),
            reconnect_on_startup: true,
        }
    }
}

/// Reads tokens from a hardware channel on its own thread.
#[derive(Debug)]
pub struct PollWorker {
    device: String,
    tokens: Arc<TokenQueue>,
    connected: Arc<AtomicBool>,
    worker: Option<WorkerThread>,
}

impl PollWorker {
    /// Open the channel and start polling it.
    ///
    /// The first open happens on the calling thread. If it fails and
    /// `reconnect_on_startup` is off, the worker is returned inactive: no
    /// thread runs and no token will ever arrive.
    ///
    /// # Errors
    /// Returns `HardwareError::ConfigurationError` for a zero heartbeat and
    /// `HardwareError::Core` if the thread cannot be spawned.
    pub fn spawn<C>(channel: C, config: PollWorkerConfig) -> Result<Self>
    where
        C: HardwareChannel + 'static,
    {
        if config.heartbeat.is_zero() {
            return Err(HardwareError::configuration(
                "poll heartbeat must be greater than zero",
            ));
        }

        let device = channel.name().to_string();
        let tokens = Arc::new(TokenQueue::new());
        let connected = Arc::new(AtomicBool::new(false));

        let mut connection = Connection::new(channel, config.reconnect);
        connection.step();
        match connection.step() {
            StepOutcome::Connected => {
                connected.store(true, Ordering::Release);
                info!(device = %device, "token reader opened");
            }
            StepOutcome::ConnectFailed(e) if !config.reconnect_on_startup => {
                warn!(device = %device, error = %e, "token reader unavailable, polling disabled");
                return Ok(Self {
                    device,
                    tokens,
                    connected,
                    worker: None,
                });
            }
            StepOutcome::ConnectFailed(e) => {
                warn!(device = %device, error = %e, "token reader unavailable, will keep retrying");
            }
            other => debug!(device = %device, outcome = ?other, "unexpected startup step"),
        }

        let worker = {
            let tokens = Arc::clone(&tokens);
            let connected = Arc::clone(&connected);
            WorkerThread::spawn("netpass-poll", config.heartbeat, move |signal| {
                poll_once(&mut connection, &tokens, &connected, signal);
            })?
        };

        Ok(Self {
            device,
            tokens,
            connected,
            worker: Some(worker),
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device
    }

    /// Shared handle on the token queue, for the orchestrator.
    pub fn tokens(&self) -> Arc<TokenQueue> {
        Arc::clone(&self.tokens)
    }

    /// Take every pass scanned since the last call.
    pub fn take_tokens(&self) -> Vec<Pass> {
        self.tokens.take_if_changed()
    }

    /// Whether the polling thread is running.
    pub fn is_active(&self) -> bool {
        self.worker.as_ref().is_some_and(WorkerThread::is_running)
    }

    /// Whether the channel is currently open for reading.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Stop polling and wait for an in-flight read to return.
    ///
    /// Queued tokens stay available through [`tokens`](Self::tokens).
    pub fn stop(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.stop();
            self.connected.store(false, Ordering::Release);
            info!(device = %self.device, "token reader stopped");
        }
    }
}

impl Drop for PollWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One heartbeat: reconnect if needed, then read at most one token.
fn poll_once<C: HardwareChannel>(
    connection: &mut Connection<C>,
    tokens: &TokenQueue,
    connected: &AtomicBool,
    signal: &ShutdownSignal,
) {
    while !connection.is_reading() {
        if signal.is_requested() {
            return;
        }

        match connection.step() {
            StepOutcome::Connected => {
                connected.store(true, Ordering::Release);
                info!(
                    device = %connection.device_name(),
                    reconnects = connection.reconnects(),
                    "token reader reconnected"
                );
            }
            StepOutcome::ConnectFailed(e) => {
                connected.store(false, Ordering::Release);
                let attempt = connection.failed_attempts();
                if attempt == 1 {
                    warn!(device = %connection.device_name(), error = %e, "reopen failed");
                } else {
                    debug!(device = %connection.device_name(), attempt, error = %e, "reopen failed");
                }
                if signal.sleep(connection.backoff()) {
                    return;
                }
            }
            _ => {}
        }
    }

    match connection.step() {
        StepOutcome::Token(line) => match Pass::new(&line) {
            Ok(pass) => {
                debug!(pass = %pass.id(), "token read");
                tokens.push(pass);
            }
            Err(e) => warn!(error = %e, "discarding unreadable token"),
        },
        StepOutcome::ReadFailed(e) => {
            connected.store(false, Ordering::Release);
            warn!(device = %connection.device_name(), error = %e, "read failed, reconnecting");
        }
        _ => {}
    }
}
