//! Merge rules: built-in defaults and the override order.

mod merge_policy;

pub use merge_policy::builder_with_defaults;
