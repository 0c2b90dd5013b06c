//! Vision CLI Binary
//!
//! Command-line interface for the Vision classroom control core.

use clap::Parser;
use std::process;
use tracing::{error, info};
use vision::cli::{Cli, RunContext};
use vision::config::ConfigLoader;
use vision::logging::{init_logging, LoggingConfig};

fn main() {
    let cli = Cli::parse();

    // Build logging config from CLI args, env vars, and config file
    let logging_config = build_logging_config(&cli);

    // Initialize logging early
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("Vision CLI starting");

    let context = match RunContext::new(cli.workspace.clone(), cli.config.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Error initializing workspace: {}", e);
            eprintln!("{}", vision::cli::map_error(&e));
            process::exit(1);
        }
    };

    match context.execute(&cli.command, cli.format) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", vision::cli::map_error(&e));
            process::exit(1);
        }
    }
}

/// Build logging configuration from CLI args, environment, and config file.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let mut config = if let Some(ref config_path) = cli.config {
        ConfigLoader::load_from_file(config_path)
            .ok()
            .map(|c| c.logging)
            .unwrap_or_default()
    } else {
        ConfigLoader::load(&cli.workspace)
            .ok()
            .map(|c| c.logging)
            .unwrap_or_default()
    };

    if cli.verbose {
        config.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        config.output = output.clone();
    }
    if let Some(ref file) = cli.log_file {
        config.file = file.clone();
    }
    if config.file.is_relative() {
        config.file = cli.workspace.join(&config.file);
    }

    config
}
