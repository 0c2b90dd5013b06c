//! CLI command-name contract used in log fields.

use crate::cli::parse::{AdminCodeCommands, Commands, MonitorCommands, SendCommands};

/// Dotted command name (e.g. "block", "send.lock", "admin_code.check").
pub fn command_name(command: &Commands) -> String {
    match command {
        Commands::Install => "install".to_string(),
        Commands::Block { .. } => "block".to_string(),
        Commands::Unblock { .. } => "unblock".to_string(),
        Commands::ClearBlocks => "clear_blocks".to_string(),
        Commands::Blocks => "blocks".to_string(),
        Commands::Requests => "requests".to_string(),
        Commands::Request { .. } => "request".to_string(),
        Commands::Approve { .. } => "approve".to_string(),
        Commands::Deny { .. } => "deny".to_string(),
        Commands::Send { command } => format!("send.{}", send_command_name(command)),
        Commands::Monitor { command } => format!("monitor.{}", monitor_command_name(command)),
        Commands::AdminCode { command } => {
            format!("admin_code.{}", admin_code_command_name(command))
        }
        Commands::Students { .. } => "students".to_string(),
        Commands::ResetStudents => "reset_students".to_string(),
        Commands::Simulate { .. } => "simulate".to_string(),
    }
}

pub fn send_command_name(command: &SendCommands) -> &'static str {
    match command {
        SendCommands::Lock => "lock",
        SendCommands::Unlock => "unlock",
        SendCommands::Redirect { .. } => "redirect",
        SendCommands::CloseTabs => "close_tabs",
        SendCommands::PlaySound => "play_sound",
        SendCommands::MuteAll => "mute_all",
    }
}

pub fn monitor_command_name(command: &MonitorCommands) -> &'static str {
    match command {
        MonitorCommands::Start => "start",
        MonitorCommands::Stop => "stop",
    }
}

pub fn admin_code_command_name(command: &AdminCodeCommands) -> &'static str {
    match command {
        AdminCodeCommands::Set { .. } => "set",
        AdminCodeCommands::Check { .. } => "check",
    }
}
