//! Administrator service: install defaults, admin code, monitoring toggle and
//! the upstream message handler that fronts the registry and aggregator.

use crate::admin::aggregator::StatusAggregator;
use crate::admin::dispatcher::CommandDispatcher;
use crate::admin::events::AdminEventBus;
use crate::admin::registry::SiteBlockRegistry;
use crate::bus::AdminMailbox;
use crate::error::ApiError;
use crate::protocol::{keys, AdminReply, Command, CommandResponse, UpstreamMessage};
use crate::store::{get_json, set_json, DurableStore};
use crate::types::Clock;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub struct AdminService {
    store: Arc<dyn DurableStore>,
    dispatcher: Arc<CommandDispatcher>,
    registry: SiteBlockRegistry,
    aggregator: Arc<StatusAggregator>,
}

impl AdminService {
    pub fn new(
        store: Arc<dyn DurableStore>,
        dispatcher: Arc<CommandDispatcher>,
        clock: Arc<dyn Clock>,
        events: AdminEventBus,
    ) -> Self {
        let registry = SiteBlockRegistry::new(
            store.clone(),
            dispatcher.clone(),
            events.clone(),
            clock.clone(),
        );
        let aggregator = Arc::new(StatusAggregator::new(store.clone(), clock, events));
        Self {
            store,
            dispatcher,
            registry,
            aggregator,
        }
    }

    pub fn registry(&self) -> &SiteBlockRegistry {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Arc<CommandDispatcher> {
        &self.dispatcher
    }

    pub fn aggregator(&self) -> &Arc<StatusAggregator> {
        &self.aggregator
    }

    /// Seed the admin keys that are still absent. Existing values, including
    /// a changed admin code, are left alone. Returns the keys written.
    pub fn install(&self, default_admin_code: &str) -> Result<Vec<String>, ApiError> {
        let defaults: [(&str, Value); 4] = [
            (keys::BLOCKED_SITES, json!([])),
            (keys::UNBLOCK_REQUESTS, json!([])),
            (keys::ADMIN_CODE, json!(default_admin_code)),
            (keys::IS_MONITORING, json!(false)),
        ];
        let watched: Vec<&str> = defaults.iter().map(|(key, _)| *key).collect();

        let mut written = Vec::new();
        self.store.transact(&watched, &mut |entries| {
            written.clear();
            for (key, value) in &defaults {
                let slot = entries.entry(key.to_string()).or_insert(None);
                if slot.is_none() {
                    *slot = Some(value.clone());
                    written.push(key.to_string());
                }
            }
        })?;

        info!(written = ?written, "admin defaults installed");
        Ok(written)
    }

    pub fn set_admin_code(&self, code: &str) -> Result<(), ApiError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(ApiError::InvalidAdminCode);
        }
        set_json(self.store.as_ref(), keys::ADMIN_CODE, &code)?;
        info!("admin code updated");
        Ok(())
    }

    /// Exact comparison against the stored code. No stored code means no
    /// code is valid.
    pub fn check_admin_code(&self, code: &str) -> Result<bool, ApiError> {
        let stored: Option<String> = get_json(self.store.as_ref(), keys::ADMIN_CODE)?;
        Ok(stored.as_deref() == Some(code))
    }

    pub fn is_monitoring(&self) -> Result<bool, ApiError> {
        Ok(get_json(self.store.as_ref(), keys::IS_MONITORING)?.unwrap_or(false))
    }

    /// Turn monitoring on and tell every student to start capturing.
    pub fn start_monitoring(&self) -> Result<(), ApiError> {
        set_json(self.store.as_ref(), keys::IS_MONITORING, &true)?;
        self.dispatcher.broadcast(&Command::StartScreenCapture)?;
        info!("monitoring started");
        Ok(())
    }

    pub fn stop_monitoring(&self) -> Result<(), ApiError> {
        set_json(self.store.as_ref(), keys::IS_MONITORING, &false)?;
        self.dispatcher.broadcast(&Command::StopScreenCapture)?;
        info!("monitoring stopped");
        Ok(())
    }

    pub fn reset_statuses(&self) -> Result<(), ApiError> {
        self.aggregator.reset()
    }

    /// Answer one upstream message. Failures become `success: false`; the
    /// sender never sees an error type.
    pub fn handle(&self, message: UpstreamMessage) -> AdminReply {
        let action = message.action();
        let outcome = match message {
            UpstreamMessage::UnblockRequest { site, reason } => self
                .registry
                .submit_unblock_request(&site, &reason)
                .map(|_| AdminReply::Ack(CommandResponse::ok())),
            UpstreamMessage::UpdateStudentStatus { data } => self
                .aggregator
                .ingest(data)
                .map(|_| AdminReply::Ack(CommandResponse::ok())),
            UpstreamMessage::CheckAdminCode { code } => self
                .check_admin_code(&code)
                .map(|is_valid| AdminReply::AdminCode { is_valid }),
            UpstreamMessage::GetBlockedSites => self
                .registry
                .blocked_sites()
                .map(|blocked_sites| AdminReply::BlockedSites { blocked_sites }),
        };
        outcome.unwrap_or_else(|e| {
            warn!(action, error = %e, "upstream message rejected");
            AdminReply::Ack(CommandResponse::failed())
        })
    }

    /// Serve the admin mailbox until `shutdown` flips to `true`, its sender
    /// is dropped, or every student handle is gone.
    pub async fn run(&self, mut mailbox: AdminMailbox, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                envelope = mailbox.recv() => {
                    let Some(envelope) = envelope else {
                        debug!("admin mailbox closed");
                        break;
                    };
                    let reply = self.handle(envelope.message);
                    if let Some(responder) = envelope.reply {
                        // The sender may have stopped waiting.
                        let _ = responder.send(reply);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("admin service stopped");
                        break;
                    }
                }
            }
        }
    }
}
