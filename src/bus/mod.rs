//! Command Bus
//!
//! Point-to-point, best-effort delivery between the administrator and
//! individual student contexts. Downstream ([`CommandBus`]) carries control
//! commands to tabs; upstream ([`Uplink`]) carries unblock requests and
//! heartbeats back. Neither direction retries or times out.

pub mod inprocess;

pub use inprocess::{AdminEnvelope, AdminMailbox, Envelope, InProcessBus, Mailbox};

use crate::protocol::{Command, UpstreamMessage};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Identity of one tab/process on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(pub u64);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tab-{}", self.0)
    }
}

/// A currently open tab as seen by the administrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub id: TargetId,
    /// Current URL, if the tab has one yet.
    pub url: Option<String>,
}

/// Why a message did not reach its destination.
///
/// Broadcast treats both variants as expected: a tab without a student agent
/// looks exactly like a tab that just closed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("No listener for {0}")]
    NoListener(String),

    #[error("Listener for {0} disconnected")]
    Disconnected(String),
}

/// Admin-to-student transport.
pub trait CommandBus: Send + Sync {
    /// Enumerate currently open tabs.
    fn targets(&self) -> Vec<Target>;

    /// Fire-and-forget delivery to one tab.
    fn deliver(&self, target: &TargetId, command: &Command) -> Result<(), DeliveryError>;
}

/// Student-to-admin transport.
pub trait Uplink: Send + Sync {
    fn send(&self, message: UpstreamMessage) -> Result<(), DeliveryError>;
}
