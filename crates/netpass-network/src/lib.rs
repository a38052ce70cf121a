//! Profile transfers for the networked pass kiosk.
//!
//! The orchestrator never talks to the profile service directly. It submits
//! typed [`Task`]s onto a [`NetworkQueue`]; the [`NetworkWorker`] runs them on
//! its own thread through a [`TransferClient`] and pushes a [`CompletedTask`]
//! back for each one.
//!
//! ```text
//! Orchestrator ──Task──► [pending] ──► NetworkWorker ──► TransferClient
//!      ▲                                     │
//!      └────────CompletedTask── [completed] ◄┘
//! ```

pub mod client;
pub mod error;
pub mod mock;
pub mod task;
pub mod worker;

pub use client::TransferClient;
pub use error::{Result, TransferError};
pub use mock::MemoryTransferClient;
pub use task::{CompletedTask, Outcome, Request, Task, TaskId, UploadStatus};
pub use worker::{NetworkQueue, NetworkWorker, process_pending};
