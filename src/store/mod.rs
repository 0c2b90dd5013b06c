//! Durable Store
//!
//! The one shared mutable resource in the system: a persistent key-value
//! store holding JSON values, shared by the administrator and every student
//! context, with per-key change notification.
//!
//! All read-modify-write sequences go through [`DurableStore::transact`], which
//! commits every listed key together or not at all. Writes are otherwise
//! last-writer-wins.

pub mod memory;
pub mod persistence;

pub use memory::MemoryStore;
pub use persistence::SledStore;

use crate::error::StorageError;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Snapshot of the keys taking part in a transaction. `None` means absent.
pub type Entries = BTreeMap<String, Option<Value>>;

/// A committed change to one key.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreChange {
    pub key: String,
    pub new_value: Option<Value>,
}

/// Stream of changes for one key.
pub struct Subscription {
    key: String,
    receiver: UnboundedReceiver<StoreChange>,
}

impl Subscription {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Wait for the next change. `None` once the store is dropped.
    pub async fn recv(&mut self) -> Option<StoreChange> {
        self.receiver.recv().await
    }

    /// Next already-published change, without waiting.
    pub fn try_recv(&mut self) -> Option<StoreChange> {
        self.receiver.try_recv().ok()
    }
}

/// Durable Store interface
pub trait DurableStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Atomically read, modify and write `keys`.
    ///
    /// `apply` sees the current value of every key and edits the snapshot in
    /// place; only keys whose value changed are written and announced.
    /// `apply` may run more than once if the backend retries on conflict, so
    /// it must depend on nothing but its input. Keys not listed in `keys` are
    /// ignored. Returns the committed snapshot.
    fn transact(
        &self,
        keys: &[&str],
        apply: &mut dyn FnMut(&mut Entries),
    ) -> Result<Entries, StorageError>;

    fn subscribe(&self, key: &str) -> Result<Subscription, StorageError>;
}

/// Read a key and decode it.
pub fn get_json<T: DeserializeOwned>(
    store: &dyn DurableStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match store.get(key)? {
        Some(value) => from_value(key, value).map(Some),
        None => Ok(None),
    }
}

/// Encode a value and write it under `key`.
pub fn set_json<T: Serialize>(
    store: &dyn DurableStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    store.set(key, to_value(key, value)?)
}

/// Atomically update one typed key, starting from `T::default()` when absent.
/// Returns the committed value.
pub fn update_json<T, F>(store: &dyn DurableStore, key: &str, mut f: F) -> Result<T, StorageError>
where
    T: DeserializeOwned + Serialize + Default,
    F: FnMut(&mut T),
{
    let mut failure = None;
    let committed = store.transact(&[key], &mut |entries| {
        failure = None;
        let mut current: T = match decode_entry::<T>(entries, key) {
            Ok(v) => v.unwrap_or_default(),
            Err(e) => {
                failure = Some(e);
                return;
            }
        };
        f(&mut current);
        if let Err(e) = encode_entry(entries, key, &current) {
            failure = Some(e);
        }
    })?;
    if let Some(e) = failure {
        return Err(e);
    }
    Ok(decode_entry(&committed, key)?.unwrap_or_default())
}

/// Decode one key of a transaction snapshot.
pub fn decode_entry<T: DeserializeOwned>(
    entries: &Entries,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match entries.get(key) {
        Some(Some(value)) => from_value(key, value.clone()).map(Some),
        _ => Ok(None),
    }
}

/// Encode a value into one key of a transaction snapshot.
pub fn encode_entry<T: Serialize>(
    entries: &mut Entries,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    entries.insert(key.to_string(), Some(to_value(key, value)?));
    Ok(())
}

fn from_value<T: DeserializeOwned>(key: &str, value: Value) -> Result<T, StorageError> {
    serde_json::from_value(value).map_err(|e| StorageError::Serialization {
        key: key.to_string(),
        message: e.to_string(),
    })
}

fn to_value<T: Serialize>(key: &str, value: &T) -> Result<Value, StorageError> {
    serde_json::to_value(value).map_err(|e| StorageError::Serialization {
        key: key.to_string(),
        message: e.to_string(),
    })
}

/// Per-key subscriber lists shared by the store backends.
#[derive(Default)]
pub(crate) struct Watchers {
    senders: Mutex<HashMap<String, Vec<UnboundedSender<StoreChange>>>>,
}

impl Watchers {
    pub(crate) fn subscribe(&self, key: &str) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.senders
            .lock()
            .entry(key.to_string())
            .or_default()
            .push(sender);
        Subscription {
            key: key.to_string(),
            receiver,
        }
    }

    /// Announce committed changes, pruning subscribers that went away.
    pub(crate) fn publish(&self, changes: Vec<StoreChange>) {
        if changes.is_empty() {
            return;
        }
        let mut senders = self.senders.lock();
        for change in changes {
            if let Some(list) = senders.get_mut(&change.key) {
                list.retain(|sender| sender.send(change.clone()).is_ok());
                if list.is_empty() {
                    senders.remove(&change.key);
                }
            }
        }
    }
}

/// Diff a transaction snapshot against its starting point.
pub(crate) fn changed_keys(keys: &[&str], before: &Entries, after: &Entries) -> Vec<StoreChange> {
    keys.iter()
        .filter_map(|key| {
            let old = before.get(*key).cloned().flatten();
            let new = after.get(*key).cloned().flatten();
            (old != new).then(|| StoreChange {
                key: key.to_string(),
                new_value: new,
            })
        })
        .collect()
}
