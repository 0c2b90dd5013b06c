//! Property-based tests

mod block_list;
mod hostname_policy;
