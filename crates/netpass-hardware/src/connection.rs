//! Reader connection state machine.
//!
//! Wraps a [`HardwareChannel`] and advances it one step at a time through
//! an explicit lifecycle, so the reconnect policy can be tested without a
//! worker thread.
//!
//! # States
//!
//! ```text
//!            step: close            step: open ok
//! Disconnected ─────────► Connecting ─────────────► Reading
//!      ▲                      │                        │
//!      │   step: open failed  │    step: read failed   │
//!      └──────────────────────┴────────────────────────┘
//! ```
//!
//! Each call to [`Connection::step`] performs at most one blocking channel
//! operation and reports what happened as a [`StepOutcome`]. The owner
//! applies the [`ReconnectPolicy`] delay after a failed open.

use std::fmt;
use std::time::Duration;

use netpass_core::constants::DEFAULT_RECONNECT_DELAY_MS;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::channel::{HardwareChannel, ReadOutcome};
use crate::error::HardwareError;

/// Lifecycle state of a reader connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// The channel is closed or broken.
    Disconnected,

    /// The previous channel was closed; the next step tries to open it.
    Connecting,

    /// The channel is open and the next step reads from it.
    Reading,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Reading => write!(f, "Reading"),
        }
    }
}

/// Retry policy for reopening a failed channel.
///
/// Fixed backoff with no attempt limit: a kiosk keeps trying until the
/// reader comes back or the process shuts down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    delay: Duration,
}

impl ReconnectPolicy {
    pub fn fixed(delay: Duration) -> Self {
        Self { delay }
    }

    /// Delay to wait after a failed open.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS))
    }
}

/// What a single [`Connection::step`] did.
#[derive(Debug)]
pub enum StepOutcome {
    /// The broken channel was closed; the next step will try to open it.
    Closed,

    /// The channel opened; reads follow.
    Connected,

    /// The open attempt failed; back off before the next step.
    ConnectFailed(HardwareError),

    /// A token line was read.
    Token(String),

    /// The read timed out or produced a blank line.
    Idle,

    /// The read failed; the connection is now `Disconnected`.
    ReadFailed(HardwareError),
}

/// A hardware channel plus its connection state.
#[derive(Debug)]
pub struct Connection<C: HardwareChannel> {
    channel: C,
    state: ConnectionState,
    policy: ReconnectPolicy,
    failed_attempts: u32,
    connected_once: bool,
    reconnects: u64,
}

impl<C: HardwareChannel> Connection<C> {
    /// Wrap a channel. The connection starts `Disconnected`.
    pub fn new(channel: C, policy: ReconnectPolicy) -> Self {
        Self {
            channel,
            state: ConnectionState::Disconnected,
            policy,
            failed_attempts: 0,
            connected_once: false,
            reconnects: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_reading(&self) -> bool {
        self.state == ConnectionState::Reading
    }

    pub fn policy(&self) -> ReconnectPolicy {
        self.policy
    }

    /// Consecutive failed open attempts since the last successful open.
    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    /// Successful opens after the first one.
    pub fn reconnects(&self) -> u64 {
        self.reconnects
    }

    pub fn device_name(&self) -> &str {
        self.channel.name()
    }

    /// Delay to apply after the most recent failed open.
    pub fn backoff(&self) -> Duration {
        self.policy.delay()
    }

    /// Advance the connection by one step.
    pub fn step(&mut self) -> StepOutcome {
        let outcome = match self.state {
            ConnectionState::Disconnected => {
                self.channel.close();
                self.state = ConnectionState::Connecting;
                StepOutcome::Closed
            }
            ConnectionState::Connecting => match self.channel.open() {
                Ok(()) => {
                    if self.connected_once {
                        self.reconnects += 1;
                    }
                    self.connected_once = true;
                    self.failed_attempts = 0;
                    self.state = ConnectionState::Reading;
                    StepOutcome::Connected
                }
                Err(e) => {
                    self.failed_attempts = self.failed_attempts.saturating_add(1);
                    self.state = ConnectionState::Disconnected;
                    StepOutcome::ConnectFailed(e)
                }
            },
            ConnectionState::Reading => match self.channel.read_line() {
                Ok(ReadOutcome::Line(line)) if line.trim().is_empty() => StepOutcome::Idle,
                Ok(ReadOutcome::Line(line)) => StepOutcome::Token(line),
                Ok(ReadOutcome::NoData) => StepOutcome::Idle,
                Err(e) => {
                    self.state = ConnectionState::Disconnected;
                    StepOutcome::ReadFailed(e)
                }
            },
        };

        trace!(device = %self.channel.name(), state = %self.state, "connection step");
        outcome
    }
}

impl<C: HardwareChannel> Drop for Connection<C> {
    fn drop(&mut self) {
        if self.state != ConnectionState::Disconnected {
            self.channel.close();
        }
    }
}
