//! Config loading entry points.

use crate::config::merge::builder_with_defaults;
use crate::config::sources::{environment, global_file, workspace_file};
use crate::config::VisionConfig;
use config::{ConfigError, File};
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load with full precedence: defaults, global file, workspace files
    /// under `workspace_root`, then environment.
    pub fn load(workspace_root: &Path) -> Result<VisionConfig, ConfigError> {
        let builder = builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder);
        builder.build()?.try_deserialize()
    }

    /// Load one explicit file over the defaults. No other layer applies.
    pub fn load_from_file(path: &Path) -> Result<VisionConfig, ConfigError> {
        builder_with_defaults()?
            .add_source(File::from(path).required(true))
            .build()?
            .try_deserialize()
    }

    /// Built-in defaults only.
    pub fn default() -> VisionConfig {
        VisionConfig::default()
    }
}
