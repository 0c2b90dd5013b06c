//! Logging
//!
//! Structured logging through `tracing`. Level, format and destination come
//! from the `[logging]` config section and can be overridden with the
//! `VISION_LOG*` environment variables.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

const ENV_FILTER: &str = "VISION_LOG";
const ENV_FORMAT: &str = "VISION_LOG_FORMAT";
const ENV_OUTPUT: &str = "VISION_LOG_OUTPUT";
const ENV_MODULES: &str = "VISION_LOG_MODULES";

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// json or text
    #[serde(default = "default_format")]
    pub format: String,

    /// stdout, stderr or file
    #[serde(default = "default_output")]
    pub output: String,

    /// Used when `output` is `file`.
    #[serde(default = "default_log_file")]
    pub file: PathBuf,

    /// ANSI colors for text output on a terminal.
    #[serde(default = "default_true")]
    pub color: bool,

    /// Per-module levels, e.g. `vision::student = "debug"`.
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "stderr".to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from(".vision/vision.log")
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_format(),
            output: default_output(),
            file: default_log_file(),
            color: default_true(),
            modules: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogOutput {
    Stdout,
    Stderr,
    File,
}

/// Install the global subscriber.
///
/// Precedence, highest first: `VISION_LOG*` environment variables, the
/// given config, built-in defaults. Installing twice is an error.
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), ApiError> {
    let defaults = LoggingConfig::default();
    let config = config.unwrap_or(&defaults);

    let filter = build_env_filter(config)?;
    let format = determine_format(config)?;
    let output = determine_output(config)?;

    let writer = match output {
        LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
        LogOutput::File => BoxMakeWriter::new(Arc::new(open_log_file(config)?)),
    };
    let ansi = config.color && output != LogOutput::File;

    let registry = Registry::default().with(filter);
    let installed = match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(writer),
            )
            .try_init(),
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(ansi)
                    .with_writer(writer),
            )
            .try_init(),
    };
    installed.map_err(|e| ApiError::ConfigError(format!("Failed to install logger: {}", e)))
}

fn open_log_file(config: &LoggingConfig) -> Result<std::fs::File, ApiError> {
    if let Some(parent) = config.file.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ApiError::ConfigError(format!("Failed to create log directory: {}", e))
            })?;
        }
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.file)
        .map_err(|e| {
            ApiError::ConfigError(format!("Failed to open log file {:?}: {}", config.file, e))
        })
}

fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter, ApiError> {
    if let Ok(filter) = EnvFilter::try_from_env(ENV_FILTER) {
        return Ok(filter);
    }

    if config.level == "off" {
        return Ok(EnvFilter::new("off"));
    }

    let mut filter = EnvFilter::new(&config.level);
    for (module, level) in &config.modules {
        filter = filter.add_directive(parse_directive(module, level)?);
    }

    if let Ok(modules) = std::env::var(ENV_MODULES) {
        for directive in modules.split(',') {
            if let Some((module, level)) = directive.split_once('=') {
                filter = filter.add_directive(parse_directive(module.trim(), level.trim())?);
            }
        }
    }

    Ok(filter)
}

fn parse_directive(
    module: &str,
    level: &str,
) -> Result<tracing_subscriber::filter::Directive, ApiError> {
    format!("{}={}", module, level)
        .parse()
        .map_err(|e| ApiError::ConfigError(format!("Invalid log directive: {}", e)))
}

fn determine_format(config: &LoggingConfig) -> Result<LogFormat, ApiError> {
    let format = std::env::var(ENV_FORMAT).unwrap_or_else(|_| config.format.clone());
    parse_format(&format)
}

fn parse_format(format: &str) -> Result<LogFormat, ApiError> {
    match format {
        "text" => Ok(LogFormat::Text),
        "json" => Ok(LogFormat::Json),
        other => Err(ApiError::ConfigError(format!(
            "Invalid log format: {} (must be 'json' or 'text')",
            other
        ))),
    }
}

fn determine_output(config: &LoggingConfig) -> Result<LogOutput, ApiError> {
    let output = std::env::var(ENV_OUTPUT).unwrap_or_else(|_| config.output.clone());
    parse_output(&output)
}

fn parse_output(output: &str) -> Result<LogOutput, ApiError> {
    match output {
        "stdout" => Ok(LogOutput::Stdout),
        "stderr" => Ok(LogOutput::Stderr),
        "file" => Ok(LogOutput::File),
        other => Err(ApiError::ConfigError(format!(
            "Invalid log output: {} (must be 'stdout', 'stderr' or 'file')",
            other
        ))),
    }
}
