//! Typed requests exchanged with the network worker.
//!
//! Every task owns its payload. The pass and bundle move into the task on
//! submission and move back out inside the [`CompletedTask`], so the
//! orchestrator and the worker never share a live bundle.

use std::fmt;

use netpass_core::{Pass, ProfileBundle, SlotIndex};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TransferError;

/// Correlates a submitted task with its completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        TaskId(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the worker is asked to do.
#[derive(Debug, Clone)]
pub enum Request {
    /// Fetch the profile for a pass.
    Download { pass: Pass },

    /// Store an updated profile for a pass.
    Upload { pass: Pass, bundle: ProfileBundle },
}

impl Request {
    pub fn pass(&self) -> &Pass {
        match self {
            Request::Download { pass } | Request::Upload { pass, .. } => pass,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Request::Download { .. } => "download",
            Request::Upload { .. } => "upload",
        }
    }
}

/// A request queued for the network worker.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub slot: SlotIndex,
    pub request: Request,
}

impl Task {
    pub fn download(slot: SlotIndex, pass: Pass) -> Self {
        Self {
            id: TaskId::new(),
            slot,
            request: Request::Download { pass },
        }
    }

    pub fn upload(slot: SlotIndex, pass: Pass, bundle: ProfileBundle) -> Self {
        Self {
            id: TaskId::new(),
            slot,
            request: Request::Upload { pass, bundle },
        }
    }
}

/// Acknowledgement of an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "reason")]
pub enum UploadStatus {
    Accepted,
    Failed(String),
}

impl UploadStatus {
    pub fn is_accepted(&self) -> bool {
        matches!(self, UploadStatus::Accepted)
    }
}

/// Result of a processed task.
#[derive(Debug)]
pub enum Outcome {
    /// The profile was fetched and is handed to the slot.
    Downloaded { pass: Pass, bundle: ProfileBundle },

    /// The stats document could not be fetched.
    DownloadFailed { pass: Pass, error: TransferError },

    /// The upload finished, successfully or not.
    Uploaded { pass: Pass, status: UploadStatus },
}

impl Outcome {
    pub fn pass(&self) -> &Pass {
        match self {
            Outcome::Downloaded { pass, .. }
            | Outcome::DownloadFailed { pass, .. }
            | Outcome::Uploaded { pass, .. } => pass,
        }
    }
}

/// A task after the worker processed it.
#[derive(Debug)]
pub struct CompletedTask {
    pub id: TaskId,
    pub slot: SlotIndex,
    pub outcome: Outcome,
}
