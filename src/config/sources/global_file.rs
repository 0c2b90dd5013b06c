//! Global config file: $XDG_CONFIG_HOME/vision/config.toml or
//! ~/.config/vision/config.toml.

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File};
use std::path::PathBuf;
use tracing::debug;

/// Path of the global config file, whether or not it exists.
pub fn global_config_path() -> Option<PathBuf> {
    let base = match std::env::var_os("XDG_CONFIG_HOME") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => PathBuf::from(std::env::var_os("HOME")?).join(".config"),
    };
    Some(base.join("vision").join("config.toml"))
}

/// Add the global config file to the builder if it exists.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    match global_config_path() {
        Some(path) if path.exists() => {
            debug!(config_path = %path.display(), "loading global config");
            Ok(builder.add_source(File::from(path.as_path()).required(false)))
        }
        _ => Ok(builder),
    }
}
