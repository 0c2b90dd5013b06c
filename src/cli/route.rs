//! CLI route: single route table and run context. Dispatches to the admin
//! services and presentation.

use crate::admin::{AdminEvent, AdminEventBus, AdminService, CommandDispatcher};
use crate::bus::InProcessBus;
use crate::classroom::{Classroom, SimulationSummary, StudentSummary};
use crate::cli::help::command_name;
use crate::cli::parse::{AdminCodeCommands, Commands, MonitorCommands, OutputFormat, SendCommands};
use crate::cli::presentation::{
    format_ack, format_admin_code_check, format_blocks, format_broadcast, format_install,
    format_requests, format_simulation, format_students,
};
use crate::config::{ConfigLoader, VisionConfig};
use crate::error::{ApiError, StorageError};
use crate::protocol::Command;
use crate::store::{DurableStore, SledStore};
use crate::types::SystemClock;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const SIMULATION_URL: &str = "https://classroom.example.edu/lesson";

/// Runtime context for CLI execution: workspace, config and the admin
/// services over the sled store.
pub struct RunContext {
    config: VisionConfig,
    store: Arc<SledStore>,
    admin: AdminService,
    events: Receiver<AdminEvent>,
}

impl RunContext {
    /// Create run context from workspace root and optional config path.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };
        config.ensure_valid()?;

        let store_path = resolve_store_path(&workspace_root, &config.system.store_path);
        std::fs::create_dir_all(&store_path)
            .map_err(|e| ApiError::StorageError(StorageError::IoError(e)))?;
        let store = Arc::new(SledStore::new(&store_path)?);
        debug!(path = %store_path.display(), "store opened");
        Ok(Self::with_store(config, store))
    }

    /// Build the context over a store that is already open.
    pub fn with_store(config: VisionConfig, store: Arc<SledStore>) -> Self {
        // No student contexts live in a one-shot process: broadcasts only
        // persist lastCommand for students to pick up when they start.
        let bus = InProcessBus::new();
        let dispatcher = Arc::new(CommandDispatcher::with_exclusions(
            store.clone(),
            Arc::new(bus),
            config.admin.excluded_url_prefixes.clone(),
        ));
        let (events, receiver) = AdminEventBus::new_pair();
        let admin = AdminService::new(store.clone(), dispatcher, Arc::new(SystemClock), events);

        Self {
            config,
            store,
            admin,
            events: receiver,
        }
    }

    pub fn config(&self) -> &VisionConfig {
        &self.config
    }

    pub fn admin(&self) -> &AdminService {
        &self.admin
    }

    /// Execute a CLI command.
    pub fn execute(&self, command: &Commands, format: OutputFormat) -> Result<String, ApiError> {
        let name = command_name(command);
        let started = Instant::now();
        info!(command = %name, "executing command");

        let result = self.handle(command, format);
        self.store.flush()?;
        for event in self.events.try_iter() {
            debug!(command = %name, event = ?event, "admin event");
        }

        info!(
            command = %name,
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis() as u64,
            "command finished"
        );
        result
    }

    fn handle(&self, command: &Commands, format: OutputFormat) -> Result<String, ApiError> {
        let registry = self.admin.registry();
        match command {
            Commands::Install => {
                let written = self.admin.install(&self.config.admin.default_admin_code)?;
                format_install(format, &written)
            }
            Commands::Block { url } => {
                let added = registry.block(url)?;
                format_ack(format, "block", url, added)
            }
            Commands::Unblock { domain } => {
                let removed = registry.unblock(domain)?;
                format_ack(format, "unblock", domain, removed)
            }
            Commands::ClearBlocks => {
                registry.clear_all()?;
                format_ack(format, "clear_blocks", "", true)
            }
            Commands::Blocks => format_blocks(format, &registry.blocked_sites()?),
            Commands::Requests => format_requests(format, &registry.unblock_requests()?),
            Commands::Request { site, reason } => {
                let queued = registry.submit_unblock_request(site, reason)?;
                format_ack(format, "request", site, queued)
            }
            Commands::Approve { index } => {
                let approved = registry.approve(*index)?;
                let subject = approved
                    .as_ref()
                    .map(|r| r.site.clone())
                    .unwrap_or_else(|| format!("#{}", index));
                format_ack(format, "approve", &subject, approved.is_some())
            }
            Commands::Deny { index } => {
                let denied = registry.deny(*index)?;
                let subject = denied
                    .as_ref()
                    .map(|r| r.site.clone())
                    .unwrap_or_else(|| format!("#{}", index));
                format_ack(format, "deny", &subject, denied.is_some())
            }
            Commands::Send { command } => {
                let command = to_command(command);
                let report = self.admin.dispatcher().broadcast(&command)?;
                format_broadcast(format, command.action(), &report)
            }
            Commands::Monitor { command } => match command {
                MonitorCommands::Start => {
                    self.admin.start_monitoring()?;
                    format_ack(format, "monitor", "start", true)
                }
                MonitorCommands::Stop => {
                    self.admin.stop_monitoring()?;
                    format_ack(format, "monitor", "stop", true)
                }
            },
            Commands::AdminCode { command } => match command {
                AdminCodeCommands::Set { code } => {
                    self.admin.set_admin_code(code)?;
                    format_ack(format, "admin_code.set", "", true)
                }
                AdminCodeCommands::Check { code } => {
                    format_admin_code_check(format, self.admin.check_admin_code(code)?)
                }
            },
            Commands::Students { stale } => {
                let aggregator = self.admin.aggregator();
                let records = aggregator.records()?;
                let inactive = aggregator.stale(self.config.admin.stale_threshold_ms)?;
                format_students(format, &records, &inactive, *stale)
            }
            Commands::ResetStudents => {
                self.admin.reset_statuses()?;
                format_ack(format, "reset_students", "", true)
            }
            Commands::Simulate {
                students,
                seconds,
                lock,
            } => {
                let summary = self.simulate(*students, Duration::from_secs(*seconds), *lock)?;
                format_simulation(format, &summary)
            }
        }
    }

    /// Run a classroom over the workspace store: `students` join at once,
    /// an optional lock goes out halfway, then one more student joins late.
    fn simulate(
        &self,
        students: usize,
        duration: Duration,
        lock: bool,
    ) -> Result<SimulationSummary, ApiError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| ApiError::StorageError(StorageError::IoError(e)))?;
        let shared: Arc<dyn DurableStore> = self.store.clone();

        runtime.block_on(async move {
            let mut classroom = Classroom::start(shared, &self.config)?;
            for _ in 0..students {
                classroom.join(SIMULATION_URL)?;
            }

            tokio::time::sleep(duration / 2).await;
            if lock {
                classroom.admin().dispatcher().broadcast(&Command::LockScreen)?;
            }
            let late = classroom.join(SIMULATION_URL)?;
            tokio::time::sleep(duration - duration / 2).await;

            let mut summaries = Vec::new();
            for target in classroom.targets() {
                let status = classroom.status(target).await?;
                summaries.push(StudentSummary {
                    target: target.to_string(),
                    student_id: classroom.student_id(target).unwrap_or_default().to_string(),
                    late: target == late,
                    status,
                });
            }
            let events = classroom.drain_events();
            classroom.shutdown().await;

            Ok::<_, ApiError>(SimulationSummary {
                students: summaries,
                events,
                locked_midway: lock,
            })
        })
    }
}

fn to_command(command: &SendCommands) -> Command {
    match command {
        SendCommands::Lock => Command::LockScreen,
        SendCommands::Unlock => Command::UnlockScreen,
        SendCommands::Redirect { url } => Command::Redirect { url: url.clone() },
        SendCommands::CloseTabs => Command::CloseTabs,
        SendCommands::PlaySound => Command::PlaySound,
        SendCommands::MuteAll => Command::MuteAll,
    }
}

fn resolve_store_path(workspace_root: &Path, store_path: &Path) -> PathBuf {
    if store_path.is_absolute() {
        store_path.to_path_buf()
    } else {
        workspace_root.join(store_path)
    }
}
