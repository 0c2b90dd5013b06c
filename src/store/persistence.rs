//! Persistence layer for the Durable Store

use crate::error::StorageError;
use crate::store::{changed_keys, DurableStore, Entries, StoreChange, Subscription, Watchers};
use serde_json::Value;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use std::cell::RefCell;
use std::path::Path;
use std::sync::Arc;

const TREE_KV: &str = "vision_kv";

/// Sled-based implementation of DurableStore
///
/// Values are stored as JSON bytes in a dedicated tree. Change notification
/// covers every writer holding this handle; sled allows one process per
/// database, so that is every writer.
#[derive(Clone)]
pub struct SledStore {
    db: sled::Db,
    tree: sled::Tree,
    watchers: Arc<Watchers>,
}

impl SledStore {
    /// Open (or create) a store at the given directory.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Build a store on an already-open database.
    pub fn from_db(db: sled::Db) -> Result<Self, StorageError> {
        let tree = db.open_tree(TREE_KV)?;
        Ok(Self {
            db,
            tree,
            watchers: Arc::new(Watchers::default()),
        })
    }

    /// Get the underlying sled database (for advanced operations)
    pub fn db(&self) -> &sled::Db {
        &self.db
    }

    /// All keys currently stored, in byte order.
    pub fn keys(&self) -> Result<Vec<String>, StorageError> {
        let mut out = Vec::new();
        for item in self.tree.iter().keys() {
            let key = item?;
            out.push(String::from_utf8_lossy(&key).into_owned());
        }
        Ok(out)
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        self.tree.flush()?;
        Ok(())
    }
}

impl DurableStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let raw = self.tree.get(key.as_bytes())?;
        decode(key, raw.as_deref())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let bytes = encode(key, &value)?;
        let previous = self.tree.insert(key.as_bytes(), bytes)?;
        self.flush()?;
        if decode(key, previous.as_deref())?.as_ref() != Some(&value) {
            self.watchers.publish(vec![StoreChange {
                key: key.to_string(),
                new_value: Some(value),
            }]);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let previous = self.tree.remove(key.as_bytes())?;
        self.flush()?;
        if previous.is_some() {
            self.watchers.publish(vec![StoreChange {
                key: key.to_string(),
                new_value: None,
            }]);
        }
        Ok(())
    }

    fn transact(
        &self,
        keys: &[&str],
        apply: &mut dyn FnMut(&mut Entries),
    ) -> Result<Entries, StorageError> {
        // sled re-runs the closure on conflict and requires `Fn`.
        let apply = RefCell::new(apply);
        let outcome = self.tree.transaction(|tx| {
            let mut before = Entries::new();
            for key in keys {
                let raw = tx.get(key.as_bytes())?;
                let value = decode(key, raw.as_deref()).map_err(ConflictableTransactionError::Abort)?;
                before.insert(key.to_string(), value);
            }

            let mut after = before.clone();
            {
                let mut apply_fn = apply.borrow_mut();
                (*apply_fn)(&mut after);
            }
            after.retain(|key, _| keys.contains(&key.as_str()));

            let changes = changed_keys(keys, &before, &after);
            for change in &changes {
                match &change.new_value {
                    Some(value) => {
                        let bytes =
                            encode(&change.key, value).map_err(ConflictableTransactionError::Abort)?;
                        tx.insert(change.key.as_bytes(), bytes)?;
                    }
                    None => {
                        tx.remove(change.key.as_bytes())?;
                    }
                }
            }
            Ok::<_, ConflictableTransactionError<StorageError>>((after, changes))
        });

        let (committed, changes) = outcome.map_err(|e| match e {
            TransactionError::Abort(err) => err,
            TransactionError::Storage(err) => StorageError::from(err),
        })?;
        self.flush()?;
        self.watchers.publish(changes);
        Ok(committed)
    }

    fn subscribe(&self, key: &str) -> Result<Subscription, StorageError> {
        Ok(self.watchers.subscribe(key))
    }
}

fn decode(key: &str, raw: Option<&[u8]>) -> Result<Option<Value>, StorageError> {
    match raw {
        Some(bytes) => serde_json::from_slice(bytes)
            .map(Some)
            .map_err(|e| StorageError::Serialization {
                key: key.to_string(),
                message: e.to_string(),
            }),
        None => Ok(None),
    }
}

fn encode(key: &str, value: &Value) -> Result<Vec<u8>, StorageError> {
    serde_json::to_vec(value).map_err(|e| StorageError::Serialization {
        key: key.to_string(),
        message: e.to_string(),
    })
}
