//! Integration tests for student-side reconciliation across restarts

use super::test_utils::{admin_fixture, ManualClock};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use vision::bus::InProcessBus;
use vision::protocol::{keys, Command};
use vision::store::{get_json, set_json, DurableStore, MemoryStore, SledStore};
use vision::student::{Effect, RecordingEffects, StudentAgent};
use vision::types::SystemClock;

fn student(local: Arc<dyn DurableStore>, shared: Arc<dyn DurableStore>) -> (StudentAgent, RecordingEffects) {
    let effects = RecordingEffects::new();
    let agent = StudentAgent::new(
        local,
        shared,
        Arc::new(InProcessBus::new()),
        Arc::new(effects.clone()),
        Arc::new(SystemClock),
    );
    (agent, effects)
}

/// A locked student reopened from disk comes back locked with the same id.
#[test]
fn test_lock_and_identity_survive_restart_on_disk() {
    let local_dir = TempDir::new().unwrap();
    let db = sled::open(local_dir.path()).unwrap();
    let shared = Arc::new(MemoryStore::new());

    let first_id = {
        let local = Arc::new(SledStore::from_db(db.clone()).unwrap());
        let (mut agent, _effects) = student(local.clone(), shared.clone());
        agent.initialize("https://school.example/", "School").unwrap();
        agent.handle_command(&Command::LockScreen);
        local.flush().unwrap();
        agent.student_id().to_string()
    };

    let local = Arc::new(SledStore::from_db(db).unwrap());
    let (mut agent, effects) = student(local, shared);
    agent.initialize("https://school.example/", "School").unwrap();

    assert_eq!(agent.student_id(), first_id);
    assert!(agent.state().is_locked());
    assert_eq!(effects.effects(), vec![Effect::ShowLockOverlay]);
}

/// The administrator's list replaces whatever the mirror held.
#[test]
fn test_shared_list_wins_over_local_mirror() {
    let local = Arc::new(MemoryStore::new());
    let shared = Arc::new(MemoryStore::new());
    set_json(local.as_ref(), keys::BLOCKED_SITES, &vec!["mirror.example"]).unwrap();
    set_json(shared.as_ref(), keys::BLOCKED_SITES, &vec!["shared.example"]).unwrap();

    let (mut agent, _effects) = student(local.clone(), shared);
    agent.initialize("https://mirror.example/page", "").unwrap();

    assert_eq!(agent.state().blocked_sites, vec!["shared.example".to_string()]);
    assert!(!agent.state().is_blocked());
    let mirror: Vec<String> = get_json(local.as_ref(), keys::BLOCKED_SITES).unwrap().unwrap();
    assert_eq!(mirror, vec!["shared.example".to_string()]);
}

/// A student that went offline while a site was blocked, then came back
/// after the admin cleared the list and locked screens.
#[test]
fn test_stale_mirror_is_corrected_after_clear_and_lock() {
    let fixture = admin_fixture(ManualClock::at(1_000));
    let registry = fixture.admin.registry();
    assert!(registry.block("x.example").unwrap());

    let local = Arc::new(MemoryStore::new());
    set_json(local.as_ref(), keys::BLOCKED_SITES, &registry.blocked_sites().unwrap()).unwrap();

    registry.clear_all().unwrap();
    fixture.admin.dispatcher().broadcast(&Command::LockScreen).unwrap();

    let (mut agent, effects) = student(local.clone(), fixture.store.clone());
    agent.initialize("https://x.example/", "X").unwrap();

    assert!(agent.state().blocked_sites.is_empty());
    assert!(!agent.state().is_blocked());
    assert!(agent.state().is_locked());
    assert_eq!(effects.effects(), vec![Effect::ShowLockOverlay]);
    assert_eq!(local.get(keys::BLOCKED_SITES).unwrap(), Some(json!([])));
}

/// Corrupt shared bytes leave the student on its own mirror.
#[test]
fn test_unreadable_shared_list_falls_back_to_mirror() {
    let local = Arc::new(MemoryStore::new());
    let shared = Arc::new(MemoryStore::new());
    set_json(local.as_ref(), keys::BLOCKED_SITES, &vec!["mirror.example"]).unwrap();
    shared
        .set(keys::BLOCKED_SITES, json!({ "not": "a list" }))
        .unwrap();

    let (mut agent, _effects) = student(local, shared);
    agent.initialize("https://mirror.example/page", "").unwrap();

    assert_eq!(agent.state().blocked_sites, vec!["mirror.example".to_string()]);
    assert!(agent.state().is_blocked());
}

/// A context that never synced starts from the administrator's list.
#[test]
fn test_empty_mirror_falls_back_to_shared_list() {
    let local = Arc::new(MemoryStore::new());
    let shared = Arc::new(MemoryStore::new());
    set_json(local.as_ref(), keys::BLOCKED_SITES, &Vec::<String>::new()).unwrap();
    set_json(
        shared.as_ref(),
        keys::BLOCKED_SITES,
        &vec!["a.example", "a.example", "b.example"],
    )
    .unwrap();

    let (mut agent, _effects) = student(local, shared);
    agent.initialize("https://school.example/", "").unwrap();

    assert_eq!(
        agent.state().blocked_sites,
        vec!["a.example".to_string(), "b.example".to_string()]
    );
}

/// lastCommand replayed at startup goes through the same path as a push.
#[test]
fn test_last_update_blocks_is_applied_and_mirrored() {
    let local = Arc::new(MemoryStore::new());
    let shared = Arc::new(MemoryStore::new());
    set_json(
        shared.as_ref(),
        keys::LAST_COMMAND,
        &Command::UpdateBlocks {
            sites: vec!["games.example".to_string()],
        },
    )
    .unwrap();

    let (mut agent, effects) = student(local.clone(), shared);
    agent.initialize("https://games.example/arcade", "Arcade").unwrap();

    let mirror: Vec<String> = get_json(local.as_ref(), keys::BLOCKED_SITES).unwrap().unwrap();
    assert_eq!(mirror, vec!["games.example".to_string()]);
    assert_eq!(
        effects.effects(),
        vec![Effect::ShowBlockOverlay("games.example".to_string())]
    );
}

/// An unreadable lastCommand does not keep the student from starting.
#[test]
fn test_unreadable_last_command_is_ignored() {
    let local = Arc::new(MemoryStore::new());
    let shared = Arc::new(MemoryStore::new());
    shared
        .set(keys::LAST_COMMAND, json!({ "action": "selfDestruct" }))
        .unwrap();

    let (mut agent, effects) = student(local, shared);
    agent.initialize("https://school.example/", "").unwrap();

    assert!(!agent.state().is_locked());
    assert!(effects.effects().is_empty());
}

#[test]
fn test_redirect_without_url_is_ignored() {
    let (mut agent, effects) = student(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()));
    agent.initialize("https://school.example/", "").unwrap();

    assert!(agent
        .handle_command(&Command::Redirect { url: String::new() })
        .success);
    agent.handle_command(&Command::Redirect {
        url: "https://school.example/quiz".to_string(),
    });
    assert_eq!(
        effects.effects(),
        vec![Effect::Navigate("https://school.example/quiz".to_string())]
    );
}
