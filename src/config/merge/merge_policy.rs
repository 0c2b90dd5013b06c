//! Built-in defaults, applied underneath every file and env source.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// A `Config` builder seeded with the defaults every layer overrides.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("admin.default_admin_code", "admin123")?
        .set_default("admin.stale_threshold_ms", 300_000_i64)?
        .set_default("admin.sweep_interval_ms", 60_000_i64)?
        .set_default("student.heartbeat_interval_ms", 30_000_i64)?
        .set_default("system.store_path", ".vision/store")
}
