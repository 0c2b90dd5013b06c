//! `VISION_`-prefixed environment variables, `__` between nesting levels:
//! `VISION_ADMIN__STALE_THRESHOLD_MS=120000`.

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment};

pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("VISION")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    )
}
