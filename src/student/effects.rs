//! Side effects the agent asks of its page.
//!
//! Rendering overlays, playing audio and driving the tab belong to the
//! page, not to the reconciliation core. The agent only says what should
//! happen through [`StudentEffects`].

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

pub trait StudentEffects: Send + Sync {
    /// Cover the page and suppress keyboard, context menu, selection and
    /// drag defaults.
    fn show_lock_overlay(&self);
    fn hide_lock_overlay(&self);
    /// Replace the page with the block notice and its unblock-request form.
    fn show_block_overlay(&self, hostname: &str);
    fn hide_block_overlay(&self);
    fn navigate(&self, url: &str);
    fn close_tab(&self);
    fn play_alert(&self);
    fn mute_media(&self);
    /// Screen capture is not implemented; these only mark where it plugs in.
    fn start_capture(&self);
    fn stop_capture(&self);
}

/// Effects that only log. Used by the CLI simulation.
#[derive(Debug, Clone, Default)]
pub struct LoggingEffects {
    pub student_id: String,
}

impl LoggingEffects {
    pub fn new(student_id: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
        }
    }
}

impl StudentEffects for LoggingEffects {
    fn show_lock_overlay(&self) {
        info!(student_id = %self.student_id, "lock overlay shown");
    }

    fn hide_lock_overlay(&self) {
        info!(student_id = %self.student_id, "lock overlay removed");
    }

    fn show_block_overlay(&self, hostname: &str) {
        info!(student_id = %self.student_id, hostname, "block overlay shown");
    }

    fn hide_block_overlay(&self) {
        info!(student_id = %self.student_id, "block overlay removed");
    }

    fn navigate(&self, url: &str) {
        info!(student_id = %self.student_id, url, "redirecting");
    }

    fn close_tab(&self) {
        info!(student_id = %self.student_id, "closing tab");
    }

    fn play_alert(&self) {
        info!(student_id = %self.student_id, "playing alert");
    }

    fn mute_media(&self) {
        info!(student_id = %self.student_id, "muting media");
    }

    fn start_capture(&self) {
        info!(student_id = %self.student_id, "screen capture requested (not implemented)");
    }

    fn stop_capture(&self) {
        info!(student_id = %self.student_id, "screen capture stop requested (not implemented)");
    }
}

/// One recorded effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    ShowLockOverlay,
    HideLockOverlay,
    ShowBlockOverlay(String),
    HideBlockOverlay,
    Navigate(String),
    CloseTab,
    PlayAlert,
    MuteMedia,
    StartCapture,
    StopCapture,
}

/// Effects that record every call. Clones share one log.
#[derive(Debug, Clone, Default)]
pub struct RecordingEffects {
    log: Arc<Mutex<Vec<Effect>>>,
}

impl RecordingEffects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn effects(&self) -> Vec<Effect> {
        self.log.lock().clone()
    }

    /// Return and forget everything recorded so far.
    pub fn take(&self) -> Vec<Effect> {
        std::mem::take(&mut *self.log.lock())
    }

    fn record(&self, effect: Effect) {
        self.log.lock().push(effect);
    }
}

impl StudentEffects for RecordingEffects {
    fn show_lock_overlay(&self) {
        self.record(Effect::ShowLockOverlay);
    }

    fn hide_lock_overlay(&self) {
        self.record(Effect::HideLockOverlay);
    }

    fn show_block_overlay(&self, hostname: &str) {
        self.record(Effect::ShowBlockOverlay(hostname.to_string()));
    }

    fn hide_block_overlay(&self) {
        self.record(Effect::HideBlockOverlay);
    }

    fn navigate(&self, url: &str) {
        self.record(Effect::Navigate(url.to_string()));
    }

    fn close_tab(&self) {
        self.record(Effect::CloseTab);
    }

    fn play_alert(&self) {
        self.record(Effect::PlayAlert);
    }

    fn mute_media(&self) {
        self.record(Effect::MuteMedia);
    }

    fn start_capture(&self) {
        self.record(Effect::StartCapture);
    }

    fn stop_capture(&self) {
        self.record(Effect::StopCapture);
    }
}
