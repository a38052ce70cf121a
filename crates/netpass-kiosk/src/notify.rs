//! Notifications for presentation and audio collaborators.
//!
//! The orchestrator emits these fire-and-forget from inside the tick. A sink
//! must not block: it is called on the real-time thread.

use std::fmt;
use std::sync::mpsc;

use netpass_core::{PassId, SlotIndex};
use serde::Serialize;
use tracing::debug;

/// Why a scanned pass was not placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Player registration is closed.
    JoinClosed,

    /// The pass is already associated with a slot.
    Duplicate,

    /// Every enabled slot is occupied.
    NoEligibleSlot,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::JoinClosed => write!(f, "join closed"),
            Self::Duplicate => write!(f, "duplicate"),
            Self::NoEligibleSlot => write!(f, "no eligible slot"),
        }
    }
}

/// Event emitted by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
    /// A pass was accepted and its download submitted.
    Scanned { slot: SlotIndex, pass: PassId },

    /// A pass was rejected.
    TooLate { pass: PassId, reason: RejectReason },

    /// A profile is loaded and usable.
    Ready { slot: SlotIndex, display_name: String },

    /// A profile was uploaded and the slot released.
    Saved { slot: SlotIndex },

    /// The download failed or timed out and the slot was released.
    DownloadFailed { slot: SlotIndex },

    /// Slot availability changed; redraw credits and join prompts.
    RefreshAvailability,
}

/// Receives notifications from the orchestrator.
pub trait NotificationSink {
    fn notify(&mut self, notification: Notification);
}

impl NotificationSink for Vec<Notification> {
    fn notify(&mut self, notification: Notification) {
        self.push(notification);
    }
}

impl NotificationSink for mpsc::Sender<Notification> {
    fn notify(&mut self, notification: Notification) {
        if let Err(mpsc::SendError(lost)) = self.send(notification) {
            debug!(notification = ?lost, "notification receiver gone");
        }
    }
}

impl<F> NotificationSink for F
where
    F: FnMut(Notification),
{
    fn notify(&mut self, notification: Notification) {
        self(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn saved() -> Notification {
        Notification::Saved {
            slot: SlotIndex::new(0),
        }
    }

    #[test]
    fn test_vec_sink_collects() {
        let mut sink = Vec::new();
        sink.notify(saved());
        sink.notify(Notification::RefreshAvailability);
        assert_eq!(sink, vec![saved(), Notification::RefreshAvailability]);
    }

    #[test]
    fn test_channel_sink_survives_dropped_receiver() {
        let (mut tx, rx) = mpsc::channel();
        tx.notify(saved());
        assert_eq!(rx.recv().unwrap(), saved());

        drop(rx);
        tx.notify(saved());
    }

    #[test]
    fn test_closure_sink() {
        let mut count = 0;
        {
            let mut sink = |_: Notification| count += 1;
            sink.notify(saved());
            sink.notify(saved());
        }
        assert_eq!(count, 2);
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_string(&Notification::TooLate {
            pass: PassId::new("A").unwrap(),
            reason: RejectReason::Duplicate,
        })
        .unwrap();
        assert_eq!(json, r#"{"event":"too_late","pass":"A","reason":"duplicate"}"#);
    }
}
