//! In-memory Durable Store.
//!
//! Same semantics as the sled-backed store, minus persistence. Used for
//! student-local mirrors in simulations and as the fake in tests.

use crate::error::StorageError;
use crate::store::{changed_keys, DurableStore, Entries, StoreChange, Subscription, Watchers};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<HashMap<String, Value>>,
    watchers: Watchers,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently present.
    pub fn len(&self) -> usize {
        self.data.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.lock().is_empty()
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.data.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let changed = {
            let mut data = self.data.lock();
            let previous = data.insert(key.to_string(), value.clone());
            previous.as_ref() != Some(&value)
        };
        if changed {
            self.watchers.publish(vec![StoreChange {
                key: key.to_string(),
                new_value: Some(value),
            }]);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let removed = self.data.lock().remove(key).is_some();
        if removed {
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
        let (committed, changes) = {
            let mut data = self.data.lock();
            let before: Entries = keys
                .iter()
                .map(|key| (key.to_string(), data.get(*key).cloned()))
                .collect();
            let mut after = before.clone();
            apply(&mut after);
            after.retain(|key, _| keys.contains(&key.as_str()));

            let changes = changed_keys(keys, &before, &after);
            for change in &changes {
                match &change.new_value {
                    Some(value) => {
                        data.insert(change.key.clone(), value.clone());
                    }
                    None => {
                        data.remove(&change.key);
                    }
                }
            }
            (after, changes)
        };
        // Publish outside the data lock so subscribers may read back.
        self.watchers.publish(changes);
        Ok(committed)
    }

    fn subscribe(&self, key: &str) -> Result<Subscription, StorageError> {
        Ok(self.watchers.subscribe(key))
    }
}
