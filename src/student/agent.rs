//! Student Reconciliation Agent.
//!
//! One agent per student context. It folds four inputs into one local
//! state: what it persisted itself (`isLocked`, its block mirror, its id),
//! the shared `lastCommand` read once at startup, commands pushed over the
//! bus, and change notifications on the shared block list. Lock, unlock and
//! block updates are idempotent, so seeing the same command on more than one
//! path is harmless.
//!
//! "Once at startup" means once per initialization. A reloaded context
//! initializes again and replays `lastCommand` again, one-shot actions such
//! as `closeTabs`, `redirect` or `playSound` included.
//!
//! Two stores are involved. `local` is private to this context; `shared`
//! is the administrator's store, read for catch-up and never written.

use crate::bus::Uplink;
use crate::error::ApiError;
use crate::hostname::{matching_entry, page_hostname};
use crate::protocol::{
    keys, Command, CommandResponse, StatusReport, StatusSnapshot, UpstreamMessage,
};
use crate::store::{get_json, set_json, DurableStore, StoreChange};
use crate::student::effects::StudentEffects;
use crate::student::state::{dedup_sites, BlockOverlay, LockState, PageInfo, StudentState};
use crate::types::{new_student_id, Clock};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct StudentAgent {
    local: Arc<dyn DurableStore>,
    shared: Arc<dyn DurableStore>,
    uplink: Arc<dyn Uplink>,
    effects: Arc<dyn StudentEffects>,
    clock: Arc<dyn Clock>,
    state: StudentState,
}

impl StudentAgent {
    pub fn new(
        local: Arc<dyn DurableStore>,
        shared: Arc<dyn DurableStore>,
        uplink: Arc<dyn Uplink>,
        effects: Arc<dyn StudentEffects>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            local,
            shared,
            uplink,
            effects,
            clock,
            state: StudentState::default(),
        }
    }

    pub fn state(&self) -> &StudentState {
        &self.state
    }

    pub fn student_id(&self) -> &str {
        &self.state.student_id
    }

    /// Bring the context up to date with what was persisted before it
    /// existed, then evaluate the page it starts on.
    ///
    /// The shared block list, when readable, replaces the local mirror.
    /// `lastCommand` is replayed on every call, whatever its kind.
    pub fn initialize(&mut self, url: &str, title: &str) -> Result<(), ApiError> {
        self.state.student_id = self.load_or_create_id()?;
        self.install_local_defaults()?;

        // The administrator's list is canonical. The mirror only covers a
        // shared store that has no list or cannot be read.
        match get_json::<Vec<String>>(self.shared.as_ref(), keys::BLOCKED_SITES) {
            Ok(Some(sites)) => self.replace_blocks(sites),
            Ok(None) => self.restore_mirror()?,
            Err(e) => {
                warn!(error = %e, "shared block list unreadable, using local mirror");
                self.restore_mirror()?;
            }
        }

        let locked: bool = get_json(self.local.as_ref(), keys::IS_LOCKED)?.unwrap_or(false);
        self.state.lock = LockState::from_flag(locked);
        if self.state.is_locked() {
            self.effects.show_lock_overlay();
        }

        self.state.page = PageInfo {
            url: url.to_string(),
            title: title.to_string(),
        };

        let last: Option<Command> = match get_json(self.shared.as_ref(), keys::LAST_COMMAND) {
            Ok(last) => last,
            Err(e) => {
                warn!(error = %e, "ignoring unreadable lastCommand");
                None
            }
        };
        if let Some(command) = last {
            debug!(
                action = command.action(),
                one_shot = !command.is_state_transition(),
                "catching up on lastCommand"
            );
            self.handle_command(&command);
        }

        self.evaluate_page();
        info!(
            student_id = %self.state.student_id,
            locked = self.state.is_locked(),
            blocked = self.state.blocked_sites.len(),
            "student context initialized"
        );
        Ok(())
    }

    /// Apply one command. Every known action is acknowledged.
    pub fn handle_command(&mut self, command: &Command) -> CommandResponse {
        debug!(student_id = %self.state.student_id, action = command.action(), "command received");
        match command {
            Command::LockScreen => self.set_lock(LockState::Locked),
            Command::UnlockScreen => self.set_lock(LockState::Unlocked),
            Command::UpdateBlocks { sites } => self.replace_blocks(sites.clone()),
            Command::Redirect { url } => {
                if url.is_empty() {
                    warn!(student_id = %self.state.student_id, "redirect without url ignored");
                } else {
                    self.effects.navigate(url);
                }
            }
            Command::CloseTabs => self.effects.close_tab(),
            Command::PlaySound => self.effects.play_alert(),
            Command::MuteAll => self.effects.mute_media(),
            Command::StartScreenCapture => self.effects.start_capture(),
            Command::StopScreenCapture => self.effects.stop_capture(),
        }
        CommandResponse::ok()
    }

    /// Apply an undecoded payload. Unknown or malformed actions fail.
    pub fn handle_raw(&mut self, payload: Value) -> CommandResponse {
        match serde_json::from_value::<Command>(payload) {
            Ok(command) => self.handle_command(&command),
            Err(e) => {
                warn!(student_id = %self.state.student_id, error = %e, "unrecognized command");
                CommandResponse::failed()
            }
        }
    }

    /// React to a committed change of the shared block list.
    pub fn on_store_change(&mut self, change: StoreChange) {
        if change.key != keys::BLOCKED_SITES {
            return;
        }
        let sites = match change.new_value {
            Some(value) => match serde_json::from_value::<Vec<String>>(value) {
                Ok(sites) => sites,
                Err(e) => {
                    warn!(error = %e, "ignoring malformed block list change");
                    return;
                }
            },
            None => Vec::new(),
        };
        self.replace_blocks(sites);
    }

    /// A navigation in this context finished.
    pub fn navigation_completed(&mut self, url: &str, title: &str) {
        self.state.page = PageInfo {
            url: url.to_string(),
            title: title.to_string(),
        };
        self.evaluate_page();
    }

    /// Ask the administrator to unblock the page currently blocked.
    /// `Ok(false)` when the current page is not blocked.
    pub fn request_unblock(&self, reason: &str) -> Result<bool, ApiError> {
        let Some(overlay) = &self.state.overlay else {
            return Ok(false);
        };
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ApiError::EmptyReason);
        }
        self.uplink
            .send(UpstreamMessage::UnblockRequest {
                site: overlay.hostname.clone(),
                reason: reason.to_string(),
            })
            .map_err(|e| ApiError::Delivery(e.to_string()))?;
        info!(student_id = %self.state.student_id, site = %overlay.hostname, "unblock requested");
        Ok(true)
    }

    pub fn status_report(&self) -> StatusReport {
        StatusReport {
            student_id: self.state.student_id.clone(),
            url: self.state.page.url.clone(),
            hostname: page_hostname(&self.state.page.url).unwrap_or_default(),
            title: self.state.page.title.clone(),
            locked: self.state.is_locked(),
            timestamp: self.clock.now_millis(),
        }
    }

    /// Send one heartbeat upstream. Returns whether it left this context.
    pub fn emit_heartbeat(&self) -> bool {
        let message = UpstreamMessage::UpdateStudentStatus {
            data: self.status_report(),
        };
        match self.uplink.send(message) {
            Ok(()) => true,
            Err(e) => {
                debug!(student_id = %self.state.student_id, error = %e, "heartbeat dropped");
                false
            }
        }
    }

    pub fn status_snapshot(&self) -> StatusSnapshot {
        self.state.snapshot()
    }

    fn set_lock(&mut self, target: LockState) {
        if self.state.lock == target {
            return;
        }
        self.state.lock = target;
        match target {
            LockState::Locked => self.effects.show_lock_overlay(),
            LockState::Unlocked => self.effects.hide_lock_overlay(),
        }
        if let Err(e) = set_json(self.local.as_ref(), keys::IS_LOCKED, &target.is_locked()) {
            warn!(student_id = %self.state.student_id, error = %e, "could not persist lock state");
        }
        info!(student_id = %self.state.student_id, locked = target.is_locked(), "lock state changed");
    }

    fn replace_blocks(&mut self, sites: Vec<String>) {
        let sites = dedup_sites(sites);
        if let Err(e) = set_json(self.local.as_ref(), keys::BLOCKED_SITES, &sites) {
            warn!(student_id = %self.state.student_id, error = %e, "could not persist block mirror");
        }
        self.state.blocked_sites = sites;
        self.evaluate_page();
    }

    /// Enter or leave the block overlay for the current page.
    fn evaluate_page(&mut self) {
        let hostname = page_hostname(&self.state.page.url).unwrap_or_default();
        let matched = matching_entry(&hostname, &self.state.blocked_sites).map(str::to_string);

        match (matched, self.state.overlay.as_ref()) {
            (Some(matched), current) => {
                if current.map(|o| o.hostname.as_str()) != Some(hostname.as_str()) {
                    self.effects.show_block_overlay(&hostname);
                    info!(
                        student_id = %self.state.student_id,
                        hostname = %hostname,
                        matched = %matched,
                        "page blocked"
                    );
                }
                self.state.overlay = Some(BlockOverlay { hostname, matched });
            }
            (None, Some(_)) => {
                self.effects.hide_block_overlay();
                self.state.overlay = None;
                debug!(student_id = %self.state.student_id, "page no longer blocked");
            }
            (None, None) => {}
        }
    }

    fn restore_mirror(&mut self) -> Result<(), ApiError> {
        let mirror: Vec<String> =
            get_json(self.local.as_ref(), keys::BLOCKED_SITES)?.unwrap_or_default();
        self.state.blocked_sites = dedup_sites(mirror);
        Ok(())
    }

    fn load_or_create_id(&self) -> Result<String, ApiError> {
        if let Some(id) = get_json::<String>(self.local.as_ref(), keys::STUDENT_ID)? {
            if !id.is_empty() {
                return Ok(id);
            }
        }
        let id = new_student_id();
        set_json(self.local.as_ref(), keys::STUDENT_ID, &id)?;
        Ok(id)
    }

    fn install_local_defaults(&self) -> Result<(), ApiError> {
        self.local
            .transact(&[keys::IS_LOCKED, keys::BLOCKED_SITES], &mut |entries| {
                entries
                    .entry(keys::IS_LOCKED.to_string())
                    .or_insert(None)
                    .get_or_insert_with(|| json!(false));
                entries
                    .entry(keys::BLOCKED_SITES.to_string())
                    .or_insert(None)
                    .get_or_insert_with(|| json!([]));
            })?;
        Ok(())
    }
}
