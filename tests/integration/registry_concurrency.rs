//! Integration tests for concurrent block-list mutations

use super::test_utils::{admin_fixture, ManualClock};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;
use vision::admin::{AdminEventBus, AdminService, CommandDispatcher};
use vision::bus::InProcessBus;
use vision::protocol::{keys, Command, RequestStatus};
use vision::store::{get_json, DurableStore, SledStore};
use vision::types::SystemClock;

fn sled_admin(dir: &TempDir) -> (Arc<AdminService>, Arc<SledStore>) {
    let store = Arc::new(SledStore::new(dir.path()).unwrap());
    let shared: Arc<dyn DurableStore> = store.clone();
    let dispatcher = Arc::new(CommandDispatcher::new(
        shared.clone(),
        Arc::new(InProcessBus::new()),
    ));
    let (events, _rx) = AdminEventBus::new_pair();
    let admin = Arc::new(AdminService::new(shared, dispatcher, Arc::new(SystemClock), events));
    admin.install("admin123").unwrap();
    (admin, store)
}

/// Two administrators blocking different sites at once both land.
#[test]
fn test_concurrent_blocks_are_not_lost() {
    let dir = TempDir::new().unwrap();
    let (admin, _store) = sled_admin(&dir);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let admin = admin.clone();
            thread::spawn(move || {
                for j in 0..10 {
                    admin
                        .registry()
                        .block(&format!("site{}-{}.example", i, j))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let sites = admin.registry().blocked_sites().unwrap();
    assert_eq!(sites.len(), 80);
    let unique: BTreeSet<_> = sites.iter().collect();
    assert_eq!(unique.len(), 80, "block list must never hold duplicates");
}

/// The same site blocked from many threads is stored once.
#[test]
fn test_concurrent_duplicate_blocks_dedup() {
    let dir = TempDir::new().unwrap();
    let (admin, _store) = sled_admin(&dir);

    let added: usize = (0..6)
        .map(|_| {
            let admin = admin.clone();
            thread::spawn(move || admin.registry().block("https://games.example/play").unwrap())
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|h| usize::from(h.join().unwrap()))
        .sum();

    assert_eq!(added, 1);
    assert_eq!(
        admin.registry().blocked_sites().unwrap(),
        vec!["games.example".to_string()]
    );
}

/// Approving removes the block and dequeues the request in one step, while
/// other blocks keep arriving.
#[test]
fn test_approve_is_atomic_with_concurrent_blocks() {
    let dir = TempDir::new().unwrap();
    let (admin, store) = sled_admin(&dir);
    let registry = admin.registry();
    registry.block("videos.example").unwrap();
    assert!(registry
        .submit_unblock_request("videos.example", "lab assignment")
        .unwrap());

    let blocker = {
        let admin = admin.clone();
        thread::spawn(move || {
            for i in 0..20 {
                admin.registry().block(&format!("other{}.example", i)).unwrap();
            }
        })
    };
    let approved = registry.approve(0).unwrap().unwrap();
    blocker.join().unwrap();

    assert_eq!(approved.site, "videos.example");
    assert_eq!(approved.status, RequestStatus::Approved);
    let sites = registry.blocked_sites().unwrap();
    assert!(!sites.contains(&"videos.example".to_string()));
    assert_eq!(sites.len(), 20);
    assert!(registry.unblock_requests().unwrap().is_empty());

    let last: Command = get_json(store.as_ref(), keys::LAST_COMMAND).unwrap().unwrap();
    assert!(matches!(last, Command::UpdateBlocks { .. }));
}

#[test]
fn test_deny_keeps_block_and_drops_request() {
    let fixture = admin_fixture(ManualClock::at(1_000));
    let registry = fixture.admin.registry();
    registry.block("chat.example").unwrap();
    registry.submit_unblock_request("chat.example", "group work").unwrap();

    let denied = registry.deny(0).unwrap().unwrap();
    assert_eq!(denied.status, RequestStatus::Denied);
    assert_eq!(registry.blocked_sites().unwrap(), vec!["chat.example".to_string()]);
    assert!(registry.unblock_requests().unwrap().is_empty());
}

#[test]
fn test_duplicate_pending_request_is_ignored() {
    let fixture = admin_fixture(ManualClock::at(1_000));
    let registry = fixture.admin.registry();
    assert!(registry.submit_unblock_request("x.example", "first").unwrap());
    assert!(!registry.submit_unblock_request("x.example", "second").unwrap());

    let requests = registry.unblock_requests().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].reason, "first");
    assert_eq!(requests[0].timestamp, 1_000);
}

#[test]
fn test_deny_removes_exactly_one_request() {
    let fixture = admin_fixture(ManualClock::at(1_000));
    let registry = fixture.admin.registry();
    for site in ["a.example", "b.example", "c.example"] {
        registry.submit_unblock_request(site, "reading").unwrap();
    }

    registry.deny(1).unwrap().unwrap();
    let remaining: Vec<_> = registry
        .unblock_requests()
        .unwrap()
        .into_iter()
        .map(|r| r.site)
        .collect();
    assert_eq!(remaining, vec!["a.example", "c.example"]);
}
