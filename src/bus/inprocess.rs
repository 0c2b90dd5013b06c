//! In-process bus: tabs and the administrator exchange messages over tokio
//! channels. Each student context owns one [`Mailbox`]; the administrator
//! owns one [`AdminMailbox`].

use crate::bus::{CommandBus, DeliveryError, Target, TargetId, Uplink};
use crate::protocol::{AdminReply, Command, CommandResponse, StatusSnapshot, UpstreamMessage};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tracing::debug;

/// Message delivered to a student context.
#[derive(Debug)]
pub enum Envelope {
    Command {
        command: Command,
        reply: Option<oneshot::Sender<CommandResponse>>,
    },
    /// Undecoded JSON payload; unknown actions are answered `success: false`.
    Raw {
        payload: Value,
        reply: Option<oneshot::Sender<CommandResponse>>,
    },
    GetStatus {
        reply: oneshot::Sender<StatusSnapshot>,
    },
}

/// Message delivered to the administrator.
#[derive(Debug)]
pub struct AdminEnvelope {
    pub message: UpstreamMessage,
    pub reply: Option<oneshot::Sender<AdminReply>>,
}

/// Receiving end for one student context.
pub struct Mailbox {
    target: TargetId,
    receiver: UnboundedReceiver<Envelope>,
}

impl Mailbox {
    pub fn target(&self) -> TargetId {
        self.target
    }

    pub async fn recv(&mut self) -> Option<Envelope> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.receiver.try_recv().ok()
    }
}

/// Receiving end for the administrator.
pub struct AdminMailbox {
    receiver: UnboundedReceiver<AdminEnvelope>,
}

impl AdminMailbox {
    pub async fn recv(&mut self) -> Option<AdminEnvelope> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<AdminEnvelope> {
        self.receiver.try_recv().ok()
    }
}

struct Endpoint {
    url: Option<String>,
    /// `None` for tabs where no student agent is loaded.
    listener: Option<UnboundedSender<Envelope>>,
}

#[derive(Default)]
struct BusState {
    next_id: u64,
    endpoints: BTreeMap<TargetId, Endpoint>,
    admin: Option<UnboundedSender<AdminEnvelope>>,
}

/// Shared handle to the in-process bus.
#[derive(Clone, Default)]
pub struct InProcessBus {
    state: Arc<Mutex<BusState>>,
}

impl InProcessBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a tab with no student agent listening.
    pub fn open_tab(&self, url: Option<String>) -> TargetId {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = TargetId(state.next_id);
        state.endpoints.insert(
            id,
            Endpoint {
                url,
                listener: None,
            },
        );
        id
    }

    /// Load a student agent into an open tab, replacing any previous listener.
    /// Returns `None` if the tab does not exist.
    pub fn attach(&self, target: TargetId) -> Option<Mailbox> {
        let mut state = self.state.lock();
        let endpoint = state.endpoints.get_mut(&target)?;
        let (sender, receiver) = mpsc::unbounded_channel();
        endpoint.listener = Some(sender);
        Some(Mailbox { target, receiver })
    }

    /// Open a tab and load a student agent into it.
    pub fn register(&self, url: impl Into<String>) -> Mailbox {
        let target = self.open_tab(Some(url.into()));
        let (sender, receiver) = mpsc::unbounded_channel();
        if let Some(endpoint) = self.state.lock().endpoints.get_mut(&target) {
            endpoint.listener = Some(sender);
        }
        Mailbox { target, receiver }
    }

    /// Record a navigation in a tab.
    pub fn set_url(&self, target: TargetId, url: impl Into<String>) {
        if let Some(endpoint) = self.state.lock().endpoints.get_mut(&target) {
            endpoint.url = Some(url.into());
        }
    }

    /// Close a tab; later deliveries report `NoListener`.
    pub fn close(&self, target: TargetId) {
        self.state.lock().endpoints.remove(&target);
    }

    /// Number of open tabs.
    pub fn tab_count(&self) -> usize {
        self.state.lock().endpoints.len()
    }

    /// Install the administrator's receiving end.
    pub fn attach_admin(&self) -> AdminMailbox {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.state.lock().admin = Some(sender);
        AdminMailbox { receiver }
    }

    /// Deliver a command and hand back the acknowledgment receiver.
    pub fn request(
        &self,
        target: &TargetId,
        command: Command,
    ) -> Result<oneshot::Receiver<CommandResponse>, DeliveryError> {
        let (reply, rx) = oneshot::channel();
        self.send_envelope(
            target,
            Envelope::Command {
                command,
                reply: Some(reply),
            },
        )?;
        Ok(rx)
    }

    /// Deliver an undecoded JSON payload and hand back the acknowledgment.
    pub fn request_raw(
        &self,
        target: &TargetId,
        payload: Value,
    ) -> Result<oneshot::Receiver<CommandResponse>, DeliveryError> {
        let (reply, rx) = oneshot::channel();
        self.send_envelope(
            target,
            Envelope::Raw {
                payload,
                reply: Some(reply),
            },
        )?;
        Ok(rx)
    }

    /// Ask a student context for its `getStatus` snapshot.
    pub fn query_status(
        &self,
        target: &TargetId,
    ) -> Result<oneshot::Receiver<StatusSnapshot>, DeliveryError> {
        let (reply, rx) = oneshot::channel();
        self.send_envelope(target, Envelope::GetStatus { reply })?;
        Ok(rx)
    }

    /// Send an upstream message and hand back the administrator's reply.
    pub fn ask_admin(
        &self,
        message: UpstreamMessage,
    ) -> Result<oneshot::Receiver<AdminReply>, DeliveryError> {
        let (reply, rx) = oneshot::channel();
        self.send_admin(AdminEnvelope {
            message,
            reply: Some(reply),
        })?;
        Ok(rx)
    }

    fn send_envelope(&self, target: &TargetId, envelope: Envelope) -> Result<(), DeliveryError> {
        let state = self.state.lock();
        let listener = state
            .endpoints
            .get(target)
            .and_then(|endpoint| endpoint.listener.as_ref())
            .ok_or_else(|| DeliveryError::NoListener(target.to_string()))?;
        listener
            .send(envelope)
            .map_err(|_| DeliveryError::Disconnected(target.to_string()))
    }

    fn send_admin(&self, envelope: AdminEnvelope) -> Result<(), DeliveryError> {
        let state = self.state.lock();
        let admin = state
            .admin
            .as_ref()
            .ok_or_else(|| DeliveryError::NoListener("admin".to_string()))?;
        admin
            .send(envelope)
            .map_err(|_| DeliveryError::Disconnected("admin".to_string()))
    }
}

impl CommandBus for InProcessBus {
    fn targets(&self) -> Vec<Target> {
        self.state
            .lock()
            .endpoints
            .iter()
            .map(|(id, endpoint)| Target {
                id: *id,
                url: endpoint.url.clone(),
            })
            .collect()
    }

    fn deliver(&self, target: &TargetId, command: &Command) -> Result<(), DeliveryError> {
        debug!(target = %target, action = command.action(), "delivering command");
        self.send_envelope(
            target,
            Envelope::Command {
                command: command.clone(),
                reply: None,
            },
        )
    }
}

impl Uplink for InProcessBus {
    fn send(&self, message: UpstreamMessage) -> Result<(), DeliveryError> {
        self.send_admin(AdminEnvelope {
            message,
            reply: None,
        })
    }
}
