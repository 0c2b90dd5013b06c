//! Block list and unblock request presentation.

use crate::cli::parse::OutputFormat;
use crate::cli::presentation::shared::{format_json, format_timestamp};
use crate::error::ApiError;
use crate::protocol::UnblockRequest;
use comfy_table::Table;
use serde_json::json;

pub fn format_blocks(format: OutputFormat, sites: &[String]) -> Result<String, ApiError> {
    if format == OutputFormat::Json {
        return format_json(&json!({ "blockedSites": sites, "total": sites.len() }));
    }
    if sites.is_empty() {
        return Ok("No sites blocked.".to_string());
    }
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Blocked site"]);
    for site in sites {
        table.add_row(vec![site]);
    }
    Ok(format!(
        "{}\nMatching is by substring: an entry blocks every hostname containing it.",
        table
    ))
}

pub fn format_requests(format: OutputFormat, requests: &[UnblockRequest]) -> Result<String, ApiError> {
    if format == OutputFormat::Json {
        return format_json(&json!({ "unblockRequests": requests, "total": requests.len() }));
    }
    if requests.is_empty() {
        return Ok("No pending unblock requests.".to_string());
    }
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["#", "Site", "Reason", "Requested", "Status"]);
    for (index, request) in requests.iter().enumerate() {
        table.add_row(vec![
            index.to_string(),
            request.site.clone(),
            request.reason.clone(),
            format_timestamp(request.timestamp),
            request.status.as_str().to_string(),
        ]);
    }
    Ok(table.to_string())
}
