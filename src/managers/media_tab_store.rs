//! Media Tab Store for tabplay.
//!
//! Reads and writes the shared media tab collection under the `mediaTabs` key.
//! Every mutation goes through [`MediaTabStore::update`], a read-modify-write
//! committed with compare-and-set so concurrent handlers cannot lose updates.

use std::sync::Arc;

use serde_json::Value;

use crate::storage::KeyValueStore;
use crate::types::errors::StorageError;
use crate::types::media_tab::{MediaTabs, StoredMediaTabs, TabId, TabRecord, MEDIA_TABS_SCHEMA};
use crate::types::storage::{CasOutcome, StorageArea, StorageChange};

/// Storage key holding the serialized collection.
pub const MEDIA_TABS_KEY: &str = "mediaTabs";

/// Handle to the shared media tab collection.
#[derive(Clone)]
pub struct MediaTabStore {
    store: Arc<dyn KeyValueStore>,
    max_retries: u32,
}

impl MediaTabStore {
    pub fn new(store: Arc<dyn KeyValueStore>, max_retries: u32) -> Self {
        Self {
            store,
            max_retries: max_retries.max(1),
        }
    }

    pub fn area(&self) -> StorageArea {
        self.store.area()
    }

    /// Whether a change notification concerns the collection.
    pub fn is_change(&self, change: &StorageChange) -> bool {
        change.concerns(self.store.area(), MEDIA_TABS_KEY)
    }

    /// Reads the current collection. A missing key is an empty collection.
    pub async fn load(&self) -> Result<MediaTabs, StorageError> {
        match self.store.get(MEDIA_TABS_KEY).await? {
            Some(entry) => decode(entry.value),
            None => Ok(MediaTabs::new()),
        }
    }

    /// Applies `mutate` atomically and returns its result.
    ///
    /// The closure may run more than once if another writer commits first.
    /// Nothing is written when the collection comes out unchanged.
    pub async fn update<F, R>(&self, mut mutate: F) -> Result<R, StorageError>
    where
        F: FnMut(&mut MediaTabs) -> R + Send,
        R: Send,
    {
        for attempt in 1..=self.max_retries {
            let entry = self.store.get(MEDIA_TABS_KEY).await?;
            let expected = entry.as_ref().map(|e| e.version);
            let before = match entry {
                Some(e) => decode(e.value)?,
                None => MediaTabs::new(),
            };

            let mut after = before.clone();
            let result = mutate(&mut after);
            if after == before {
                return Ok(result);
            }

            match self
                .store
                .compare_and_set(MEDIA_TABS_KEY, expected, encode(&after)?)
                .await?
            {
                CasOutcome::Committed { .. } => return Ok(result),
                CasOutcome::Conflict { current } => {
                    log::debug!(
                        "mediaTabs conflict on attempt {} (expected {:?}, found {:?})",
                        attempt,
                        expected,
                        current
                    );
                }
            }
        }

        Err(StorageError::Conflict {
            key: MEDIA_TABS_KEY.to_string(),
            attempts: self.max_retries,
        })
    }

    pub async fn upsert(&self, record: TabRecord) -> Result<(), StorageError> {
        self.update(move |tabs| {
            tabs.upsert(record.clone());
        })
        .await
    }

    /// Removes a tab. Returns whether it was tracked.
    pub async fn remove(&self, tab_id: TabId) -> Result<bool, StorageError> {
        self.update(|tabs| tabs.remove(tab_id).is_some()).await
    }
}

/// Serializes the collection with its schema tag.
pub fn encode(tabs: &MediaTabs) -> Result<Value, StorageError> {
    Ok(serde_json::to_value(StoredMediaTabs::from(tabs))?)
}

/// Decodes any known layout of the collection.
///
/// Accepts the current `{schema, tabs}` object as well as the unversioned
/// layouts written by earlier releases: a bare array of `[id, record]` pairs,
/// or that array serialized into a JSON string.
pub fn decode(value: Value) -> Result<MediaTabs, StorageError> {
    match value {
        Value::Null => Ok(MediaTabs::new()),
        Value::String(raw) => {
            let inner: Value = serde_json::from_str(&raw)?;
            if inner.is_string() {
                return Err(StorageError::Serialization(
                    "nested string in mediaTabs".to_string(),
                ));
            }
            decode(inner)
        }
        Value::Array(_) => {
            let pairs: Vec<(TabId, TabRecord)> = serde_json::from_value(value)?;
            Ok(StoredMediaTabs {
                schema: 0,
                tabs: pairs,
            }
            .into())
        }
        Value::Object(ref map) => {
            let schema = map
                .get("schema")
                .and_then(Value::as_u64)
                .ok_or_else(|| StorageError::Serialization("mediaTabs has no schema".to_string()))?
                as u32;
            if schema > MEDIA_TABS_SCHEMA {
                return Err(StorageError::UnsupportedSchema(schema));
            }
            let stored: StoredMediaTabs = serde_json::from_value(value)?;
            Ok(stored.into())
        }
        other => Err(StorageError::Serialization(format!(
            "unexpected mediaTabs value: {}",
            other
        ))),
    }
}
