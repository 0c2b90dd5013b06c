//! CLI domain: parse, route, help, output, and presentation only.
//! No domain orchestration; single route table dispatches to the admin services.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::command_name;
pub use output::map_error;
pub use parse::{AdminCodeCommands, Cli, Commands, MonitorCommands, OutputFormat, SendCommands};
pub use presentation::{
    format_ack, format_admin_code_check, format_blocks, format_broadcast, format_install,
    format_json, format_requests, format_simulation, format_students, format_timestamp,
};
pub use route::RunContext;
