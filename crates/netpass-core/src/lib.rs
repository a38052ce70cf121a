//! Core types for the networked pass kiosk.
//!
//! This crate holds the vocabulary shared by the hardware, network and
//! kiosk crates:
//!
//! - [`Pass`] / [`PassId`]: a scanned token
//! - [`ProfileBundle`] / [`EditableMetadata`]: a downloaded player profile
//! - [`SlotState`] / [`SlotMachine`]: the per-slot association lifecycle
//! - [`SwapQueue`] / [`TaskQueue`]: lock-guarded hand-off between threads
//! - [`WorkerThread`] / [`ShutdownSignal`]: heartbeat worker scaffold

pub mod bundle;
pub mod constants;
pub mod error;
pub mod pass;
pub mod queue;
pub mod slot;
pub mod worker;

pub use bundle::{EditableMetadata, ProfileBundle};
pub use error::{Error, Result};
pub use pass::{Pass, PassId};
pub use queue::{SwapQueue, TaskQueue};
pub use slot::{SlotIndex, SlotMachine, SlotState, SlotTransition};
pub use worker::{ShutdownSignal, WorkerThread};

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
