//! Key-value persistence shared between the background and popup contexts.
//!
//! Every store belongs to one [`StorageArea`], hands out version tokens with
//! each value so writers can compare-and-set, and broadcasts a
//! [`StorageChange`] for every write that changes a value.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::types::errors::StorageError;
use crate::types::storage::{CasOutcome, StorageArea, StorageChange, VersionedValue};

/// Buffered change notifications per subscriber before it starts lagging.
const CHANGE_FEED_CAPACITY: usize = 64;

/// Async key-value store with optimistic concurrency.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    fn area(&self) -> StorageArea;

    async fn get(&self, key: &str) -> Result<Option<VersionedValue>, StorageError>;

    /// Unconditional write. Returns the new version token.
    async fn set(&self, key: &str, value: Value) -> Result<u64, StorageError>;

    /// Write only if the current version equals `expected` (`None` = key absent).
    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<u64>,
        value: Value,
    ) -> Result<CasOutcome, StorageError>;

    /// Returns whether the key existed.
    async fn remove(&self, key: &str) -> Result<bool, StorageError>;

    fn subscribe(&self) -> broadcast::Receiver<StorageChange>;
}

/// Broadcast side of a store's change feed.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    area: StorageArea,
    sender: broadcast::Sender<StorageChange>,
}

impl ChangeFeed {
    pub fn new(area: StorageArea) -> Self {
        let (sender, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self { area, sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.sender.subscribe()
    }

    /// Publishes a change unless the value is unchanged.
    pub fn publish(&self, key: &str, old_value: Option<Value>, new_value: Option<Value>) {
        if old_value == new_value {
            return;
        }
        let change = StorageChange {
            area: self.area,
            key: key.to_string(),
            old_value,
            new_value,
        };
        // No subscribers is the normal state for a background context.
        let _ = self.sender.send(change);
    }
}
