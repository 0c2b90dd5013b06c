//! In-process classroom: one administrator and any number of student
//! contexts wired over an [`InProcessBus`] and a shared store.
//!
//! Backs `vision simulate` and the end-to-end tests. Must be used from
//! inside a tokio runtime.

use crate::admin::{AdminEvent, AdminEventBus, AdminService, CommandDispatcher};
use crate::bus::{InProcessBus, TargetId};
use crate::config::VisionConfig;
use crate::error::ApiError;
use crate::protocol::{keys, StatusSnapshot};
use crate::store::{DurableStore, MemoryStore};
use crate::student::{LoggingEffects, Navigation, StudentAgent, StudentEffects, StudentRuntime};
use crate::types::{Clock, SystemClock};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// What one student context reported at the end of a simulation.
#[derive(Debug, Clone, Serialize)]
pub struct StudentSummary {
    pub target: String,
    pub student_id: String,
    /// Joined after the mid-run broadcast.
    pub late: bool,
    pub status: StatusSnapshot,
}

/// Result of `vision simulate`.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationSummary {
    pub students: Vec<StudentSummary>,
    pub events: Vec<AdminEvent>,
    pub locked_midway: bool,
}

struct StudentSlot {
    student_id: String,
    navigation: mpsc::UnboundedSender<Navigation>,
    task: JoinHandle<StudentAgent>,
}

pub struct Classroom {
    bus: InProcessBus,
    shared: Arc<dyn DurableStore>,
    admin: Arc<AdminService>,
    events: Receiver<AdminEvent>,
    clock: Arc<dyn Clock>,
    heartbeat: Duration,
    students: BTreeMap<TargetId, StudentSlot>,
    shutdown: watch::Sender<bool>,
    admin_tasks: Vec<JoinHandle<()>>,
}

impl Classroom {
    /// Install defaults in `shared`, then start the admin message loop and
    /// the staleness sweeper.
    pub fn start(shared: Arc<dyn DurableStore>, config: &VisionConfig) -> Result<Self, ApiError> {
        Self::start_with_clock(shared, config, Arc::new(SystemClock))
    }

    pub fn start_with_clock(
        shared: Arc<dyn DurableStore>,
        config: &VisionConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ApiError> {
        config.ensure_valid()?;

        let bus = InProcessBus::new();
        let (events, receiver) = AdminEventBus::new_pair();
        let dispatcher = Arc::new(CommandDispatcher::with_exclusions(
            shared.clone(),
            Arc::new(bus.clone()),
            config.admin.excluded_url_prefixes.clone(),
        ));
        let admin = Arc::new(AdminService::new(
            shared.clone(),
            dispatcher,
            clock.clone(),
            events,
        ));
        admin.install(&config.admin.default_admin_code)?;

        let (shutdown, shutdown_rx) = watch::channel(false);
        let mailbox = bus.attach_admin();
        let serving = {
            let admin = admin.clone();
            let shutdown_rx = shutdown_rx.clone();
            tokio::spawn(async move { admin.run(mailbox, shutdown_rx).await })
        };
        let sweeping = tokio::spawn(admin.aggregator().clone().run_sweeper(
            config.admin.sweep_interval(),
            config.admin.stale_threshold_ms,
            shutdown_rx,
        ));

        info!("classroom started");
        Ok(Self {
            bus,
            shared,
            admin,
            events: receiver,
            clock,
            heartbeat: config.student.heartbeat_interval(),
            students: BTreeMap::new(),
            shutdown,
            admin_tasks: vec![serving, sweeping],
        })
    }

    pub fn admin(&self) -> &Arc<AdminService> {
        &self.admin
    }

    pub fn bus(&self) -> &InProcessBus {
        &self.bus
    }

    pub fn targets(&self) -> Vec<TargetId> {
        self.students.keys().copied().collect()
    }

    pub fn student_id(&self, target: TargetId) -> Option<&str> {
        self.students.get(&target).map(|s| s.student_id.as_str())
    }

    /// Open a tab at `url` with a student agent that only logs its effects.
    pub fn join(&mut self, url: &str) -> Result<TargetId, ApiError> {
        self.join_with_effects(url, |label: &str| -> Arc<dyn StudentEffects> {
            Arc::new(LoggingEffects::new(label))
        })
    }

    /// Open a tab at `url` with a fresh student context. `effects` builds
    /// the page collaborator; it receives a provisional label since the
    /// student id is only known after initialization.
    pub fn join_with_effects<F>(&mut self, url: &str, effects: F) -> Result<TargetId, ApiError>
    where
        F: FnOnce(&str) -> Arc<dyn StudentEffects>,
    {
        let mailbox = self.bus.register(url);
        let target = mailbox.target();
        let effects = effects(&target.to_string());

        let mut agent = StudentAgent::new(
            Arc::new(MemoryStore::new()),
            self.shared.clone(),
            Arc::new(self.bus.clone()),
            effects,
            self.clock.clone(),
        );
        // Subscribe before the initial read so no change falls in between.
        let blocks = self.shared.subscribe(keys::BLOCKED_SITES)?;
        if let Err(e) = agent.initialize(url, "") {
            self.bus.close(target);
            return Err(e);
        }
        let student_id = agent.student_id().to_string();

        let (navigation, navigation_rx) = mpsc::unbounded_channel();
        let runtime = StudentRuntime::new(agent, mailbox, Some(blocks), navigation_rx, self.heartbeat);
        let task = tokio::spawn(runtime.run(self.shutdown.subscribe()));

        info!(target = %target, student_id = %student_id, "student joined");
        self.students.insert(
            target,
            StudentSlot {
                student_id,
                navigation,
                task,
            },
        );
        Ok(target)
    }

    /// A navigation in `target` finished.
    pub fn navigate(&self, target: TargetId, url: &str, title: &str) -> bool {
        let Some(slot) = self.students.get(&target) else {
            return false;
        };
        self.bus.set_url(target, url);
        slot.navigation
            .send(Navigation {
                url: url.to_string(),
                title: title.to_string(),
            })
            .is_ok()
    }

    /// Ask one student context for its `getStatus` snapshot.
    pub async fn status(&self, target: TargetId) -> Result<StatusSnapshot, ApiError> {
        let reply = self
            .bus
            .query_status(&target)
            .map_err(|e| ApiError::Delivery(e.to_string()))?;
        reply
            .await
            .map_err(|_| ApiError::Delivery(format!("{} did not answer", target)))
    }

    /// Close one tab and stop its agent.
    pub async fn leave(&mut self, target: TargetId) -> Option<StudentAgent> {
        let slot = self.students.remove(&target)?;
        self.bus.close(target);
        match slot.task.await {
            Ok(agent) => Some(agent),
            Err(e) => {
                warn!(target = %target, error = %e, "student task failed");
                None
            }
        }
    }

    /// Admin events emitted so far.
    pub fn drain_events(&self) -> Vec<AdminEvent> {
        self.events.try_iter().collect()
    }

    /// Stop every loop and hand back the student agents.
    pub async fn shutdown(self) -> Vec<StudentAgent> {
        let _ = self.shutdown.send(true);
        let mut agents = Vec::with_capacity(self.students.len());
        for (target, slot) in self.students {
            match slot.task.await {
                Ok(agent) => agents.push(agent),
                Err(e) => warn!(target = %target, error = %e, "student task failed"),
            }
        }
        for task in self.admin_tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "admin task failed");
            }
        }
        info!(students = agents.len(), "classroom stopped");
        agents
    }
}
