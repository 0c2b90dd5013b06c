//! Event loop for one student context.
//!
//! A single task owns the agent and serializes everything that can touch
//! it: pushed commands, shared block-list changes, finished navigations and
//! the heartbeat timer. Nothing else holds the agent, so no locking is
//! needed around its state.

use crate::bus::{Envelope, Mailbox};
use crate::store::{StoreChange, Subscription};
use crate::student::agent::StudentAgent;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

/// A finished navigation reported by the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub url: String,
    pub title: String,
}

pub struct StudentRuntime {
    agent: StudentAgent,
    mailbox: Mailbox,
    blocks: Option<Subscription>,
    navigation: mpsc::UnboundedReceiver<Navigation>,
    heartbeat: Duration,
}

impl StudentRuntime {
    /// `blocks` is a subscription to the shared block list, if the context
    /// can see the administrator's store.
    pub fn new(
        agent: StudentAgent,
        mailbox: Mailbox,
        blocks: Option<Subscription>,
        navigation: mpsc::UnboundedReceiver<Navigation>,
        heartbeat: Duration,
    ) -> Self {
        Self {
            agent,
            mailbox,
            blocks,
            navigation,
            heartbeat,
        }
    }

    /// Run until shutdown or until the tab goes away. Hands the agent back
    /// for inspection.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> StudentAgent {
        let Self {
            mut agent,
            mut mailbox,
            blocks,
            mut navigation,
            heartbeat,
        } = self;

        let mut blocks_open = blocks.is_some();
        let mut blocks = blocks;
        let mut navigation_open = true;
        // The first tick fires immediately: report in as soon as we start.
        let mut ticker = tokio::time::interval(heartbeat);

        loop {
            tokio::select! {
                // Reconcile store changes and navigations before answering
                // anything queued behind them.
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                change = next_change(&mut blocks), if blocks_open => {
                    match change {
                        Some(change) => agent.on_store_change(change),
                        None => blocks_open = false,
                    }
                }
                nav = navigation.recv(), if navigation_open => {
                    match nav {
                        Some(nav) => agent.navigation_completed(&nav.url, &nav.title),
                        None => navigation_open = false,
                    }
                }
                envelope = mailbox.recv() => {
                    match envelope {
                        Some(envelope) => dispatch(&mut agent, envelope),
                        None => {
                            debug!(student_id = %agent.student_id(), "mailbox closed");
                            break;
                        }
                    }
                }
                _ = ticker.tick() => {
                    agent.emit_heartbeat();
                }
            }
        }

        info!(student_id = %agent.student_id(), "student context stopped");
        agent
    }
}

async fn next_change(blocks: &mut Option<Subscription>) -> Option<StoreChange> {
    match blocks {
        Some(subscription) => subscription.recv().await,
        None => None,
    }
}

fn dispatch(agent: &mut StudentAgent, envelope: Envelope) {
    match envelope {
        Envelope::Command { command, reply } => {
            let response = agent.handle_command(&command);
            if let Some(reply) = reply {
                let _ = reply.send(response);
            }
        }
        Envelope::Raw { payload, reply } => {
            let response = agent.handle_raw(payload);
            if let Some(reply) = reply {
                let _ = reply.send(response);
            }
        }
        Envelope::GetStatus { reply } => {
            let _ = reply.send(agent.status_snapshot());
        }
    }
}
