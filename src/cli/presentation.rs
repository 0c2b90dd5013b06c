//! CLI presentation: text and json formatters per command family.

mod blocks;
mod shared;
mod simulate;
mod students;

pub use blocks::{format_blocks, format_requests};
pub use shared::{
    format_ack, format_admin_code_check, format_broadcast, format_install, format_json,
    format_timestamp,
};
pub use simulate::format_simulation;
pub use students::format_students;
