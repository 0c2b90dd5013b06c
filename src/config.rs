//! Configuration
//!
//! Layered configuration loaded with the `config` crate: built-in defaults,
//! then the global file, then workspace files, then `VISION_*` environment
//! variables. See [`ConfigLoader`].

use crate::admin::DEFAULT_EXCLUDED_PREFIXES;
use crate::error::ApiError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

mod loader;
mod merge;
mod sources;

pub use loader::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisionConfig {
    #[serde(default)]
    pub admin: AdminConfig,

    #[serde(default)]
    pub student: StudentConfig,

    #[serde(default)]
    pub system: SystemConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Administrator-side settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Written to the store at install time only, when no code exists yet.
    #[serde(default = "default_admin_code")]
    pub default_admin_code: String,

    /// A student whose last heartbeat is older than this is inactive.
    #[serde(default = "default_stale_threshold_ms")]
    pub stale_threshold_ms: u64,

    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,

    /// Tabs whose URL starts with one of these never receive commands.
    #[serde(default = "default_excluded_url_prefixes")]
    pub excluded_url_prefixes: Vec<String>,
}

fn default_admin_code() -> String {
    "admin123".to_string()
}

fn default_stale_threshold_ms() -> u64 {
    5 * 60 * 1000
}

fn default_sweep_interval_ms() -> u64 {
    60 * 1000
}

fn default_excluded_url_prefixes() -> Vec<String> {
    DEFAULT_EXCLUDED_PREFIXES
        .iter()
        .map(|p| p.to_string())
        .collect()
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            default_admin_code: default_admin_code(),
            stale_threshold_ms: default_stale_threshold_ms(),
            sweep_interval_ms: default_sweep_interval_ms(),
            excluded_url_prefixes: default_excluded_url_prefixes(),
        }
    }
}

impl AdminConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.default_admin_code.trim().is_empty() {
            return Err("Default admin code cannot be empty".to_string());
        }
        if self.stale_threshold_ms == 0 {
            return Err("Stale threshold must be greater than zero".to_string());
        }
        if self.sweep_interval_ms == 0 {
            return Err("Sweep interval must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Student-side settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentConfig {
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
}

fn default_heartbeat_interval_ms() -> u64 {
    30 * 1000
}

impl Default for StudentConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
        }
    }
}

impl StudentConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.heartbeat_interval_ms == 0 {
            return Err("Heartbeat interval must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// System-wide configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Directory of the sled database backing the administrator store.
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".vision/store")
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
        }
    }
}

impl SystemConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.store_path.as_os_str().is_empty() {
            return Err("Store path cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Admin(String),
    Student(String),
    System(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Admin(msg) => write!(f, "Admin: {}", msg),
            ValidationError::Student(msg) => write!(f, "Student: {}", msg),
            ValidationError::System(msg) => write!(f, "System: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl VisionConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.admin.validate() {
            errors.push(ValidationError::Admin(e));
        }
        if let Err(e) = self.student.validate() {
            errors.push(ValidationError::Student(e));
        }
        if let Err(e) = self.system.validate() {
            errors.push(ValidationError::System(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate, folding every problem into one `ApiError`.
    pub fn ensure_valid(&self) -> Result<(), ApiError> {
        self.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })
    }
}
