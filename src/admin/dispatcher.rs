//! Command Dispatcher: administrator-side fan-out of control commands.
//!
//! Delivery has two independent paths:
//!
//! 1. Live push. `broadcast` sends the command to every eligible open tab.
//!    Sends are unordered, never retried, and failures are swallowed.
//! 2. Pull on init. `broadcast` first overwrites `lastCommand`; a student
//!    context that starts later reads it once and applies it itself.
//!
//! A context that is absent at broadcast time and starts only after a newer
//! command has overwritten `lastCommand` never sees the older one. There is
//! no history and no version number.

use crate::bus::{CommandBus, TargetId};
use crate::error::ApiError;
use crate::protocol::{keys, Command};
use crate::store::{get_json, set_json, DurableStore};
use std::sync::Arc;
use tracing::{debug, info};

/// URL prefixes of browser-internal and extension pages never targeted.
pub const DEFAULT_EXCLUDED_PREFIXES: &[&str] = &["chrome://", "chrome-extension://"];

/// Observational counts from one broadcast. Never surfaced as failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Tabs whose listener accepted the message.
    pub delivered: usize,
    /// Eligible tabs with no (or a departed) listener.
    pub unreachable: usize,
    /// Tabs skipped as internal, admin or URL-less pages.
    pub skipped: usize,
}

pub struct CommandDispatcher {
    store: Arc<dyn DurableStore>,
    bus: Arc<dyn CommandBus>,
    excluded_prefixes: Vec<String>,
}

impl CommandDispatcher {
    pub fn new(store: Arc<dyn DurableStore>, bus: Arc<dyn CommandBus>) -> Self {
        Self::with_exclusions(
            store,
            bus,
            DEFAULT_EXCLUDED_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
        )
    }

    pub fn with_exclusions(
        store: Arc<dyn DurableStore>,
        bus: Arc<dyn CommandBus>,
        excluded_prefixes: Vec<String>,
    ) -> Self {
        Self {
            store,
            bus,
            excluded_prefixes,
        }
    }

    /// Persist `command` as `lastCommand`, then push it to every eligible tab.
    pub fn broadcast(&self, command: &Command) -> Result<BroadcastReport, ApiError> {
        set_json(self.store.as_ref(), keys::LAST_COMMAND, command)?;

        let mut report = BroadcastReport::default();
        for target in self.bus.targets() {
            let eligible = target
                .url
                .as_deref()
                .map(|url| self.is_eligible(url))
                .unwrap_or(false);
            if !eligible {
                report.skipped += 1;
                continue;
            }
            match self.bus.deliver(&target.id, command) {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    debug!(target = %target.id, error = %err, "broadcast delivery dropped");
                    report.unreachable += 1;
                }
            }
        }

        info!(
            action = command.action(),
            delivered = report.delivered,
            unreachable = report.unreachable,
            skipped = report.skipped,
            "broadcast"
        );
        Ok(report)
    }

    /// The most recently broadcast command, if any.
    pub fn last_command(&self) -> Result<Option<Command>, ApiError> {
        Ok(get_json(self.store.as_ref(), keys::LAST_COMMAND)?)
    }

    /// Push `lastCommand` to one newly created tab. Returns whether a command
    /// was handed to the tab's listener.
    pub fn replay_to(&self, target: &TargetId) -> Result<bool, ApiError> {
        let Some(command) = self.last_command()? else {
            return Ok(false);
        };
        match self.bus.deliver(target, &command) {
            Ok(()) => Ok(true),
            Err(err) => {
                debug!(target = %target, error = %err, "replay to new tab dropped");
                Ok(false)
            }
        }
    }

    /// Whether a tab at `url` may receive commands.
    pub fn is_eligible(&self, url: &str) -> bool {
        !url.is_empty()
            && !self
                .excluded_prefixes
                .iter()
                .any(|prefix| url.starts_with(prefix.as_str()))
    }
}
