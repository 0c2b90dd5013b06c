//! Wire schema shared by the admin and student sides.
//!
//! Every payload here is JSON-shaped and round-trips through the durable
//! store or the command bus unchanged, so field names follow the camelCase
//! schema the extensions persist (`blockedSites`, `lastCommand`, ...).

use serde::{Deserialize, Serialize};

/// Durable store keys.
pub mod keys {
    /// Canonical block list (`string[]`).
    pub const BLOCKED_SITES: &str = "blockedSites";
    /// Unblock request queue (`UnblockRequest[]`).
    pub const UNBLOCK_REQUESTS: &str = "unblockRequests";
    /// Administrator code (`string`).
    pub const ADMIN_CODE: &str = "adminCode";
    /// Global monitoring flag (`bool`).
    pub const IS_MONITORING: &str = "isMonitoring";
    /// Student status records keyed by student id.
    pub const STUDENT_STATUSES: &str = "studentStatuses";
    /// Most recently broadcast command (`Command | null`).
    pub const LAST_COMMAND: &str = "lastCommand";
    /// Per-student lock mirror (`bool`).
    pub const IS_LOCKED: &str = "isLocked";
    /// Per-student identity (`string`).
    pub const STUDENT_ID: &str = "studentId";
}

/// Control command pushed from the administrator to student contexts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Command {
    LockScreen,
    UnlockScreen,
    Redirect {
        #[serde(default)]
        url: String,
    },
    CloseTabs,
    PlaySound,
    MuteAll,
    UpdateBlocks {
        #[serde(default)]
        sites: Vec<String>,
    },
    StartScreenCapture,
    StopScreenCapture,
}

impl Command {
    /// Wire name of the action, used for logging.
    pub fn action(&self) -> &'static str {
        match self {
            Command::LockScreen => "lockScreen",
            Command::UnlockScreen => "unlockScreen",
            Command::Redirect { .. } => "redirect",
            Command::CloseTabs => "closeTabs",
            Command::PlaySound => "playSound",
            Command::MuteAll => "muteAll",
            Command::UpdateBlocks { .. } => "updateBlocks",
            Command::StartScreenCapture => "startScreenCapture",
            Command::StopScreenCapture => "stopScreenCapture",
        }
    }

    /// Whether applying the command changes persistent student state.
    /// Everything else is a one-shot side effect.
    pub fn is_state_transition(&self) -> bool {
        matches!(
            self,
            Command::LockScreen | Command::UnlockScreen | Command::UpdateBlocks { .. }
        )
    }
}

/// Acknowledgment returned for every command and most upstream messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub success: bool,
}

impl CommandResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }

    pub fn failed() -> Self {
        Self { success: false }
    }
}

/// Lifecycle of an unblock request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    Denied,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Denied => "denied",
        }
    }
}

/// A student's request to have a blocked site opened up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnblockRequest {
    pub site: String,
    pub reason: String,
    pub timestamp: u64,
    #[serde(default)]
    pub status: RequestStatus,
}

impl UnblockRequest {
    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }
}

/// Heartbeat emitted by a student context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub student_id: String,
    pub url: String,
    pub hostname: String,
    pub title: String,
    pub locked: bool,
    pub timestamp: u64,
}

/// Admin-side record of the latest report from one student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentStatusRecord {
    #[serde(flatten)]
    pub report: StatusReport,
    pub last_update: u64,
}

/// Answer to a `getStatus` query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub is_locked: bool,
    pub blocked_sites: Vec<String>,
    pub url: String,
    pub title: String,
}

/// Messages a student context sends to the administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum UpstreamMessage {
    UnblockRequest { site: String, reason: String },
    UpdateStudentStatus { data: StatusReport },
    CheckAdminCode { code: String },
    GetBlockedSites,
}

impl UpstreamMessage {
    pub fn action(&self) -> &'static str {
        match self {
            UpstreamMessage::UnblockRequest { .. } => "unblockRequest",
            UpstreamMessage::UpdateStudentStatus { .. } => "updateStudentStatus",
            UpstreamMessage::CheckAdminCode { .. } => "checkAdminCode",
            UpstreamMessage::GetBlockedSites => "getBlockedSites",
        }
    }
}

/// Administrator replies to upstream messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged, rename_all = "camelCase")]
pub enum AdminReply {
    Ack(CommandResponse),
    AdminCode {
        #[serde(rename = "isValid")]
        is_valid: bool,
    },
    BlockedSites {
        #[serde(rename = "blockedSites")]
        blocked_sites: Vec<String>,
    },
}
