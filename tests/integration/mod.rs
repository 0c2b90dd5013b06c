//! Integration tests for the Vision classroom control core

mod agent_reconcile;
mod cli_commands;
mod config_integration;
mod dispatch_catchup;
mod registry_concurrency;
mod sled_store;
mod test_utils;
