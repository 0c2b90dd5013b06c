//! Integration tests for the sled-backed durable store

use serde_json::json;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;
use vision::protocol::keys;
use vision::store::{get_json, set_json, update_json, DurableStore, SledStore};

#[test]
fn test_values_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let db = sled::open(dir.path()).unwrap();
    {
        let store = SledStore::from_db(db.clone()).unwrap();
        set_json(&store, keys::BLOCKED_SITES, &vec!["a.example"]).unwrap();
        set_json(&store, keys::IS_MONITORING, &true).unwrap();
        store.flush().unwrap();
    }

    let store = SledStore::from_db(db).unwrap();
    let sites: Vec<String> = get_json(&store, keys::BLOCKED_SITES).unwrap().unwrap();
    assert_eq!(sites, vec!["a.example".to_string()]);
    assert_eq!(get_json::<bool>(&store, keys::IS_MONITORING).unwrap(), Some(true));
    assert_eq!(
        store.keys().unwrap(),
        vec![keys::BLOCKED_SITES.to_string(), keys::IS_MONITORING.to_string()]
    );
}

#[test]
fn test_transact_commits_both_keys_or_neither() {
    let dir = TempDir::new().unwrap();
    let store = SledStore::new(dir.path()).unwrap();
    store.set(keys::BLOCKED_SITES, json!(["a.example"])).unwrap();

    let committed = store
        .transact(&[keys::BLOCKED_SITES, keys::UNBLOCK_REQUESTS], &mut |entries| {
            entries.insert(keys::BLOCKED_SITES.to_string(), Some(json!([])));
            entries.insert(keys::UNBLOCK_REQUESTS.to_string(), None);
        })
        .unwrap();

    assert_eq!(committed[keys::BLOCKED_SITES], Some(json!([])));
    assert_eq!(store.get(keys::BLOCKED_SITES).unwrap(), Some(json!([])));
    assert_eq!(store.get(keys::UNBLOCK_REQUESTS).unwrap(), None);
}

#[test]
fn test_concurrent_updates_are_serialized() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(SledStore::new(dir.path()).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            thread::spawn(move || {
                for _ in 0..25 {
                    update_json::<u64, _>(store.as_ref(), "counter", |n| *n += 1).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(get_json::<u64>(store.as_ref(), "counter").unwrap(), Some(100));
}

#[tokio::test]
async fn test_subscribers_see_committed_changes() {
    let dir = TempDir::new().unwrap();
    let store = SledStore::new(dir.path()).unwrap();
    let mut subscription = store.subscribe(keys::BLOCKED_SITES).unwrap();

    set_json(&store, keys::IS_MONITORING, &true).unwrap();
    set_json(&store, keys::BLOCKED_SITES, &vec!["a.example"]).unwrap();
    store.remove(keys::BLOCKED_SITES).unwrap();

    let first = subscription.recv().await.unwrap();
    assert_eq!(first.key, keys::BLOCKED_SITES);
    assert_eq!(first.new_value, Some(json!(["a.example"])));
    let second = subscription.recv().await.unwrap();
    assert_eq!(second.new_value, None);
    assert!(subscription.try_recv().is_none());
}

#[test]
fn test_corrupt_bytes_surface_as_serialization_error() {
    let dir = TempDir::new().unwrap();
    let store = SledStore::new(dir.path()).unwrap();
    store
        .db()
        .open_tree("vision_kv")
        .unwrap()
        .insert(keys::BLOCKED_SITES, &b"not json"[..])
        .unwrap();

    let err = store.get(keys::BLOCKED_SITES).unwrap_err();
    assert!(err.to_string().contains(keys::BLOCKED_SITES));
}
