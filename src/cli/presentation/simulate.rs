//! Simulation summary presentation.

use crate::admin::AdminEvent;
use crate::classroom::SimulationSummary;
use crate::cli::parse::OutputFormat;
use crate::cli::presentation::shared::{format_json, format_section_heading};
use crate::error::ApiError;
use comfy_table::Table;

pub fn format_simulation(format: OutputFormat, summary: &SimulationSummary) -> Result<String, ApiError> {
    if format == OutputFormat::Json {
        return format_json(summary);
    }

    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Students")));
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Tab", "Student", "Joined", "Locked", "Blocked sites", "URL"]);
    for student in &summary.students {
        table.add_row(vec![
            student.target.clone(),
            student.student_id.clone(),
            if student.late { "late" } else { "start" }.to_string(),
            if student.status.is_locked { "yes" } else { "no" }.to_string(),
            student.status.blocked_sites.len().to_string(),
            student.status.url.clone(),
        ]);
    }
    out.push_str(&format!("{}\n\n", table));

    let reported = count(&summary.events, |e| matches!(e, AdminEvent::StudentReported { .. }));
    let inactive = count(&summary.events, |e| matches!(e, AdminEvent::StudentInactive { .. }));
    let requested = count(&summary.events, |e| matches!(e, AdminEvent::UnblockRequested { .. }));
    out.push_str(&format!("{}\n\n", format_section_heading("Admin events")));
    out.push_str(&format!(
        "heartbeats: {}  inactive: {}  unblock requests: {}",
        reported, inactive, requested
    ));
    if summary.locked_midway {
        out.push_str("\nlockScreen was broadcast midway; late students caught up from lastCommand.");
    }
    Ok(out)
}

fn count(events: &[AdminEvent], predicate: impl Fn(&AdminEvent) -> bool) -> usize {
    events.iter().filter(|e| predicate(e)).count()
}
