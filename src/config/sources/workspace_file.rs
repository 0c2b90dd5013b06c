//! Workspace config files: config/config.toml, then config/{VISION_ENV}.toml.

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File};
use std::path::Path;
use tracing::debug;

const DEFAULT_ENV: &str = "development";

/// Add the workspace config files that exist under `workspace_root`.
pub fn add_to_builder(
    mut builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let config_dir = workspace_root.join("config");
    let env_name = std::env::var("VISION_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    for path in [
        config_dir.join("config.toml"),
        config_dir.join(format!("{}.toml", env_name)),
    ] {
        if path.exists() {
            debug!(config_path = %path.display(), "loading workspace config");
            builder = builder.add_source(File::from(path.as_path()).required(false));
        }
    }

    Ok(builder)
}
