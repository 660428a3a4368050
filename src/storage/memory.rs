//! In-process key-value store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

use super::{ChangeFeed, KeyValueStore};
use crate::types::errors::StorageError;
use crate::types::storage::{CasOutcome, StorageArea, StorageChange, VersionedValue};

#[derive(Default)]
struct Entries {
    values: HashMap<String, VersionedValue>,
    last_version: u64,
}

impl Entries {
    fn write(&mut self, key: &str, value: Value) -> (Option<Value>, u64) {
        self.last_version += 1;
        let version = self.last_version;
        let old = self
            .values
            .insert(key.to_string(), VersionedValue { value, version })
            .map(|v| v.value);
        (old, version)
    }
}

/// Store kept entirely in memory. Used by tests and short-lived contexts.
pub struct MemoryStore {
    entries: Mutex<Entries>,
    feed: ChangeFeed,
}

impl MemoryStore {
    pub fn new(area: StorageArea) -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
            feed: ChangeFeed::new(area),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Entries>, StorageError> {
        self.entries
            .lock()
            .map_err(|_| StorageError::Database("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    fn area(&self) -> StorageArea {
        self.feed.area
    }

    async fn get(&self, key: &str) -> Result<Option<VersionedValue>, StorageError> {
        Ok(self.lock()?.values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<u64, StorageError> {
        let mut entries = self.lock()?;
        let (old, version) = entries.write(key, value.clone());
        self.feed.publish(key, old, Some(value));
        Ok(version)
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<u64>,
        value: Value,
    ) -> Result<CasOutcome, StorageError> {
        let mut entries = self.lock()?;
        let current = entries.values.get(key).map(|v| v.version);
        if current != expected {
            return Ok(CasOutcome::Conflict { current });
        }
        let (old, version) = entries.write(key, value.clone());
        // Published under the lock so subscribers see commit order.
        self.feed.publish(key, old, Some(value));
        Ok(CasOutcome::Committed { version })
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let mut entries = self.lock()?;
        let old = entries.values.remove(key).map(|v| v.value);
        let existed = old.is_some();
        self.feed.publish(key, old, None);
        Ok(existed)
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.feed.subscribe()
    }
}
