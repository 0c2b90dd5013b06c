//! Student status presentation.

use crate::admin::{InactiveStudent, StatusTable};
use crate::cli::parse::OutputFormat;
use crate::cli::presentation::shared::{format_json, format_timestamp};
use crate::error::ApiError;
use comfy_table::Table;
use serde_json::json;
use std::collections::BTreeMap;

/// Every record, with stale ones flagged. With `stale_only`, only those.
pub fn format_students(
    format: OutputFormat,
    records: &StatusTable,
    stale: &[InactiveStudent],
    stale_only: bool,
) -> Result<String, ApiError> {
    let idle: BTreeMap<&str, u64> = stale
        .iter()
        .map(|s| (s.student_id.as_str(), s.idle_ms))
        .collect();
    let rows: Vec<_> = records
        .iter()
        .filter(|(id, _)| !stale_only || idle.contains_key(id.as_str()))
        .collect();

    if format == OutputFormat::Json {
        let students: Vec<_> = rows
            .iter()
            .map(|(id, record)| {
                json!({
                    "studentId": id,
                    "record": record,
                    "inactive": idle.contains_key(id.as_str()),
                    "idleMs": idle.get(id.as_str()),
                })
            })
            .collect();
        return format_json(&json!({ "students": students, "total": students.len() }));
    }

    if rows.is_empty() {
        return Ok(if stale_only {
            "No inactive students.".to_string()
        } else {
            "No student has reported yet.".to_string()
        });
    }
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Student", "Host", "Title", "Locked", "Last update", "State"]);
    for (id, record) in rows {
        let state = match idle.get(id.as_str()) {
            Some(ms) => format!("inactive {}s", ms / 1000),
            None => "active".to_string(),
        };
        table.add_row(vec![
            id.clone(),
            record.report.hostname.clone(),
            record.report.title.clone(),
            if record.report.locked { "yes" } else { "no" }.to_string(),
            format_timestamp(record.last_update),
            state,
        ]);
    }
    Ok(table.to_string())
}
