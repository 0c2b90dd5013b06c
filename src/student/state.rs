//! Per-context student state.

use crate::protocol::StatusSnapshot;
use serde::{Deserialize, Serialize};

/// Screen lock state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockState {
    #[default]
    Unlocked,
    Locked,
}

impl LockState {
    pub fn from_flag(locked: bool) -> Self {
        if locked {
            LockState::Locked
        } else {
            LockState::Unlocked
        }
    }

    pub fn is_locked(self) -> bool {
        self == LockState::Locked
    }
}

/// The page currently shown in this context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageInfo {
    pub url: String,
    pub title: String,
}

/// Block overlay shown over the current page. Orthogonal to [`LockState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockOverlay {
    /// Hostname of the blocked page.
    pub hostname: String,
    /// Block-list entry that matched it.
    pub matched: String,
}

#[derive(Debug, Clone, Default)]
pub struct StudentState {
    pub student_id: String,
    pub lock: LockState,
    /// Local mirror of the block list, duplicates removed.
    pub blocked_sites: Vec<String>,
    pub page: PageInfo,
    pub overlay: Option<BlockOverlay>,
}

impl StudentState {
    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    pub fn is_blocked(&self) -> bool {
        self.overlay.is_some()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            is_locked: self.is_locked(),
            blocked_sites: self.blocked_sites.clone(),
            url: self.page.url.clone(),
            title: self.page.title.clone(),
        }
    }
}

/// Drop repeated entries, keeping first occurrences in order.
pub fn dedup_sites(sites: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(sites.len());
    for site in sites {
        if !unique.contains(&site) {
            unique.push(site);
        }
    }
    unique
}
