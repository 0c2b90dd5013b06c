//! CLI parse: clap types for Vision. No behavior; definitions only.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Vision CLI - classroom device control
#[derive(Parser)]
#[command(name = "vision")]
#[command(about = "Classroom device control: block sites, lock screens, watch student heartbeats")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    /// Enable verbose logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Seed the store with defaults (existing values are kept)
    Install,
    /// Block a site by URL or domain
    Block {
        /// URL or bare domain; only the hostname is kept
        url: String,
    },
    /// Unblock an exact block-list entry
    Unblock {
        domain: String,
    },
    /// Remove every block
    ClearBlocks,
    /// List blocked sites
    Blocks,
    /// List pending unblock requests
    Requests,
    /// Submit an unblock request as a student would
    Request {
        site: String,
        /// Why access is needed
        #[arg(long)]
        reason: String,
    },
    /// Approve the unblock request at INDEX (see `requests`)
    Approve {
        index: usize,
    },
    /// Deny the unblock request at INDEX (see `requests`)
    Deny {
        index: usize,
    },
    /// Broadcast a command to every student
    Send {
        #[command(subcommand)]
        command: SendCommands,
    },
    /// Start or stop monitoring
    Monitor {
        #[command(subcommand)]
        command: MonitorCommands,
    },
    /// Set or check the admin code
    AdminCode {
        #[command(subcommand)]
        command: AdminCodeCommands,
    },
    /// Show the latest status of every student
    Students {
        /// Only students whose last heartbeat is older than the threshold
        #[arg(long)]
        stale: bool,
    },
    /// Forget every student status record
    ResetStudents,
    /// Run an in-process classroom against the store
    Simulate {
        /// Students present from the start
        #[arg(long, default_value = "3")]
        students: usize,
        /// How long to run
        #[arg(long, default_value = "5")]
        seconds: u64,
        /// Broadcast lockScreen halfway through, before a late student joins
        #[arg(long)]
        lock: bool,
    },
}

#[derive(Subcommand)]
pub enum SendCommands {
    /// Lock every screen
    Lock,
    /// Unlock every screen
    Unlock,
    /// Send every student to URL
    Redirect { url: String },
    /// Close student tabs
    CloseTabs,
    /// Play the attention sound
    PlaySound,
    /// Mute all media
    MuteAll,
}

#[derive(Subcommand)]
pub enum MonitorCommands {
    /// Turn monitoring on (stale students are reported)
    Start,
    /// Turn monitoring off
    Stop,
}

#[derive(Subcommand)]
pub enum AdminCodeCommands {
    /// Replace the admin code
    Set { code: String },
    /// Check a code against the stored one
    Check { code: String },
}
