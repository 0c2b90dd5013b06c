//! In-process event bus for administrator notifications.
//!
//! Notification rendering is somebody else's job; the core only announces
//! what happened.

use std::sync::mpsc::{channel, Receiver, Sender};

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdminEvent {
    /// A new pending unblock request was queued (duplicates are silent).
    UnblockRequested { site: String },
    /// A student report was ingested.
    StudentReported { student_id: String },
    /// A student's last heartbeat is older than the staleness threshold.
    StudentInactive { student_id: String, idle_ms: u64 },
}

#[derive(Clone)]
pub struct AdminEventBus {
    sender: Sender<AdminEvent>,
}

impl AdminEventBus {
    pub fn new_pair() -> (Self, Receiver<AdminEvent>) {
        let (sender, receiver) = channel();
        (Self { sender }, receiver)
    }

    /// Emit an event. Nobody listening is not an error.
    pub fn emit(&self, event: AdminEvent) {
        if self.sender.send(event).is_err() {
            debug!("admin event dropped: no listener");
        }
    }
}
