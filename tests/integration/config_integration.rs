//! Integration tests for configuration loading

use std::fs;
use tempfile::TempDir;
use vision::cli::RunContext;
use vision::config::{ConfigLoader, VisionConfig};
use vision::error::ApiError;

fn write_workspace_config(root: &std::path::Path, name: &str, contents: &str) {
    let dir = root.join("config");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(name), contents).unwrap();
}

#[test]
fn test_defaults_without_any_file() {
    let workspace = TempDir::new().unwrap();
    let config = ConfigLoader::load(workspace.path()).unwrap();
    let defaults = VisionConfig::default();
    assert_eq!(config.admin.stale_threshold_ms, defaults.admin.stale_threshold_ms);
    assert_eq!(config.student.heartbeat_interval_ms, 30_000);
    assert!(config.validate().is_ok());
}

#[test]
fn test_environment_file_overrides_base_file() {
    let workspace = TempDir::new().unwrap();
    write_workspace_config(
        workspace.path(),
        "config.toml",
        "[admin]\nstale_threshold_ms = 60000\nsweep_interval_ms = 10000\n",
    );
    write_workspace_config(
        workspace.path(),
        "development.toml",
        "[admin]\nstale_threshold_ms = 90000\n",
    );

    let config = ConfigLoader::load(workspace.path()).unwrap();
    assert_eq!(config.admin.stale_threshold_ms, 90_000);
    assert_eq!(config.admin.sweep_interval_ms, 10_000);
}

#[test]
fn test_invalid_values_are_rejected_by_run_context() {
    let workspace = TempDir::new().unwrap();
    let config_file = workspace.path().join("vision.toml");
    fs::write(&config_file, "[student]\nheartbeat_interval_ms = 0\n").unwrap();

    let err = RunContext::new(workspace.path().to_path_buf(), Some(config_file)).err().unwrap();
    match err {
        ApiError::ConfigError(message) => assert!(message.contains("Heartbeat interval")),
        other => panic!("expected config error, got {:?}", other),
    }
}

#[test]
fn test_custom_store_path_is_used() {
    let workspace = TempDir::new().unwrap();
    let store_dir = TempDir::new().unwrap();
    let config_file = workspace.path().join("vision.toml");
    fs::write(
        &config_file,
        format!("[system]\nstore_path = {:?}\n", store_dir.path().join("db")),
    )
    .unwrap();

    let ctx = RunContext::new(workspace.path().to_path_buf(), Some(config_file)).unwrap();
    assert_eq!(ctx.config().system.store_path, store_dir.path().join("db"));
    assert!(store_dir.path().join("db").exists());
    assert!(!workspace.path().join(".vision/store").exists());
}
