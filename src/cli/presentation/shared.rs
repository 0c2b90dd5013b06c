//! Formatting shared by every command family.

use crate::admin::BroadcastReport;
use crate::cli::parse::OutputFormat;
use crate::error::ApiError;
use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::json;

/// Pretty JSON for any serializable result.
pub fn format_json<T: Serialize>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::ConfigError(format!("Failed to render JSON: {}", e)))
}

/// Milliseconds since epoch as RFC 3339, or "-" for zero/out-of-range.
pub fn format_timestamp(millis: u64) -> String {
    i64::try_from(millis)
        .ok()
        .filter(|ms| *ms > 0)
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "-".to_string())
}

pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

/// One-line outcome of a mutation, `changed: false` marking a no-op.
pub fn format_ack(
    format: OutputFormat,
    action: &str,
    subject: &str,
    changed: bool,
) -> Result<String, ApiError> {
    match format {
        OutputFormat::Json => format_json(&json!({
            "action": action,
            "subject": subject,
            "changed": changed,
        })),
        OutputFormat::Text => {
            let status = if changed {
                format!("{}", "ok".green())
            } else {
                format!("{}", "no change".yellow())
            };
            if subject.is_empty() {
                Ok(format!("{}: {}", action, status))
            } else {
                Ok(format!("{} {}: {}", action, subject, status))
            }
        }
    }
}

pub fn format_broadcast(
    format: OutputFormat,
    action: &str,
    report: &BroadcastReport,
) -> Result<String, ApiError> {
    match format {
        OutputFormat::Json => format_json(&json!({
            "action": action,
            "delivered": report.delivered,
            "unreachable": report.unreachable,
            "skipped": report.skipped,
        })),
        OutputFormat::Text => Ok(format!(
            "{} broadcast: {} delivered, {} unreachable, {} skipped\n\
             Stored as lastCommand; students starting later will apply it.",
            action, report.delivered, report.unreachable, report.skipped
        )),
    }
}

pub fn format_install(format: OutputFormat, written: &[String]) -> Result<String, ApiError> {
    match format {
        OutputFormat::Json => format_json(&json!({ "installed": written })),
        OutputFormat::Text if written.is_empty() => {
            Ok("Already installed; existing values kept.".to_string())
        }
        OutputFormat::Text => Ok(format!("Installed defaults: {}", written.join(", "))),
    }
}

pub fn format_admin_code_check(format: OutputFormat, is_valid: bool) -> Result<String, ApiError> {
    match format {
        OutputFormat::Json => format_json(&json!({ "isValid": is_valid })),
        OutputFormat::Text if is_valid => Ok(format!("{}", "valid".green())),
        OutputFormat::Text => Ok(format!("{}", "invalid".red())),
    }
}
