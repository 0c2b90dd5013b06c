//! Integration tests for the CLI route table

use clap::Parser;
use std::sync::Arc;
use tempfile::TempDir;
use vision::cli::{Cli, OutputFormat, RunContext};
use vision::config::ConfigLoader;
use vision::store::SledStore;

/// One workspace whose database stays open across invocations.
struct Workspace {
    dir: TempDir,
    db: sled::Db,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let db = sled::open(dir.path().join("store")).unwrap();
        Self { dir, db }
    }
}

fn run(workspace: &Workspace, args: &[&str]) -> String {
    let ws = workspace.dir.path().to_string_lossy().to_string();
    let mut argv = vec!["vision", "--workspace", ws.as_str()];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).unwrap();
    let config = ConfigLoader::load(&cli.workspace).unwrap();
    let store = Arc::new(SledStore::from_db(workspace.db.clone()).unwrap());
    let ctx = RunContext::with_store(config, store);
    ctx.execute(&cli.command, cli.format).unwrap()
}

fn run_json(workspace: &Workspace, args: &[&str]) -> serde_json::Value {
    let mut argv = args.to_vec();
    argv.extend_from_slice(&["--format", "json"]);
    serde_json::from_str(&run(workspace, &argv)).unwrap()
}

#[test]
fn test_request_approve_flow_persists_between_invocations() {
    let workspace = Workspace::new();
    run(&workspace, &["install"]);
    run(&workspace, &["block", "https://videos.example/watch"]);
    run(&workspace, &["block", "games.example"]);
    run(&workspace, &["request", "videos.example", "--reason", "biology clip"]);

    let requests = run_json(&workspace, &["requests"]);
    assert_eq!(requests["total"], 1);
    assert_eq!(requests["unblockRequests"][0]["site"], "videos.example");

    let approved = run_json(&workspace, &["approve", "0"]);
    assert_eq!(approved["changed"], true);

    let blocks = run_json(&workspace, &["blocks"]);
    assert_eq!(blocks["blockedSites"], serde_json::json!(["games.example"]));
    assert_eq!(run_json(&workspace, &["requests"])["total"], 0);
}

#[test]
fn test_approve_out_of_range_is_a_no_op() {
    let workspace = Workspace::new();
    let out = run_json(&workspace, &["approve", "3"]);
    assert_eq!(out["changed"], false);
}

#[test]
fn test_admin_code_set_and_check() {
    let workspace = Workspace::new();
    run(&workspace, &["install"]);
    run(&workspace, &["admin-code", "set", "s3cret"]);

    assert_eq!(
        run_json(&workspace, &["admin-code", "check", "s3cret"])["isValid"],
        true
    );
    assert_eq!(
        run_json(&workspace, &["admin-code", "check", "admin123"])["isValid"],
        false
    );
}

#[test]
fn test_second_install_keeps_existing_values() {
    let workspace = Workspace::new();
    let first = run_json(&workspace, &["install"]);
    assert_eq!(first["installed"].as_array().unwrap().len(), 4);
    let second = run_json(&workspace, &["install"]);
    assert!(second["installed"].as_array().unwrap().is_empty());
}

#[test]
fn test_students_is_empty_before_any_heartbeat() {
    let workspace = Workspace::new();
    let out = run(&workspace, &["students"]);
    assert_eq!(out, "No student has reported yet.");
}

#[test]
fn test_simulate_late_student_catches_lock() {
    let workspace = Workspace::new();
    let summary = run_json(
        &workspace,
        &["simulate", "--students", "2", "--seconds", "1", "--lock"],
    );

    let students = summary["students"].as_array().unwrap();
    assert_eq!(students.len(), 3);
    assert!(students.iter().all(|s| s["status"]["isLocked"] == true));
    assert_eq!(students.iter().filter(|s| s["late"] == true).count(), 1);
}

#[test]
fn test_unknown_subcommand_is_rejected() {
    assert!(Cli::try_parse_from(["vision", "teleport"]).is_err());
    let cli = Cli::try_parse_from(["vision", "send", "redirect", "https://school.example"]).unwrap();
    assert_eq!(cli.format, OutputFormat::Text);
}
