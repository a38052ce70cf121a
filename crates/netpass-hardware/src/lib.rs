//! Token reader access for the networked pass kiosk.
//!
//! This crate turns a blocking, failure-prone reader link into a steady
//! stream of [`Pass`](netpass_core::Pass) values:
//!
//! - [`HardwareChannel`]: the opaque byte-level link (`open`, `read_line`, `close`)
//! - [`Connection`]: the Disconnected → Connecting → Reading state machine
//!   with its [`ReconnectPolicy`]
//! - [`PollWorker`]: the dedicated thread that drives a connection and fills
//!   a [`TokenQueue`]
//! - [`mock::MockChannel`]: an in-process reader for tests and demos
//!
//! Reader failures are never fatal. A failed read or open is logged and
//! answered with a reopen after a fixed delay, forever, until the worker is
//! stopped.

pub mod channel;
pub mod connection;
pub mod error;
pub mod mock;
pub mod poll_worker;

pub use channel::{HardwareChannel, ReadOutcome};
pub use connection::{Connection, ConnectionState, ReconnectPolicy, StepOutcome};
pub use error::{HardwareError, Result};
pub use poll_worker::{PollWorker, PollWorkerConfig, TokenQueue};
