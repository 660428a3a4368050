//! Tests for the shared media tab collection: read-modify-write through
//! compare-and-set, legacy layouts, and schema checks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::broadcast;

use tabplay::managers::media_tab_store::{decode, encode, MediaTabStore, MEDIA_TABS_KEY};
use tabplay::storage::{KeyValueStore, MemoryStore, SqliteStore};
use tabplay::types::errors::StorageError;
use tabplay::types::media_tab::{MediaTabs, TabRecord};
use tabplay::types::settings::StorageSettings;
use tabplay::types::storage::{CasOutcome, StorageArea, StorageChange, VersionedValue};

fn record(id: i64, title: &str, playing: bool) -> TabRecord {
    TabRecord {
        is_playing: playing,
        ..TabRecord::new(id, title)
    }
}

/// Lets another writer commit right before each of the first `interruptions`
/// compare-and-set calls.
struct InterferingStore {
    inner: MemoryStore,
    interruptions: AtomicUsize,
    next_foreign_id: AtomicUsize,
}

impl InterferingStore {
    fn new(interruptions: usize) -> Self {
        Self {
            inner: MemoryStore::new(StorageArea::Local),
            interruptions: AtomicUsize::new(interruptions),
            next_foreign_id: AtomicUsize::new(100),
        }
    }

    async fn foreign_write(&self) {
        let mut tabs = match self.inner.get(MEDIA_TABS_KEY).await.unwrap() {
            Some(entry) => tabplay::managers::media_tab_store::decode(entry.value).unwrap(),
            None => MediaTabs::new(),
        };
        let id = self.next_foreign_id.fetch_add(1, Ordering::SeqCst) as i64;
        tabs.upsert(record(id, "foreign", true));
        self.inner
            .set(MEDIA_TABS_KEY, encode(&tabs).unwrap())
            .await
            .unwrap();
    }
}

#[async_trait]
impl KeyValueStore for InterferingStore {
    fn area(&self) -> StorageArea {
        self.inner.area()
    }

    async fn get(&self, key: &str) -> Result<Option<VersionedValue>, StorageError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<u64, StorageError> {
        self.inner.set(key, value).await
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<u64>,
        value: Value,
    ) -> Result<CasOutcome, StorageError> {
        let left = self.interruptions.load(Ordering::SeqCst);
        if left > 0 {
            self.interruptions.store(left - 1, Ordering::SeqCst);
            self.foreign_write().await;
        }
        self.inner.compare_and_set(key, expected, value).await
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        self.inner.remove(key).await
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.inner.subscribe()
    }
}

fn memory_store() -> MediaTabStore {
    MediaTabStore::new(Arc::new(MemoryStore::new(StorageArea::Local)), 8)
}

#[tokio::test]
async fn test_load_missing_key_is_empty() {
    let store = memory_store();
    assert!(store.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_upsert_and_remove() {
    let store = memory_store();
    store.upsert(record(1, "Lo-fi radio", true)).await.unwrap();
    store.upsert(record(2, "Podcast", false)).await.unwrap();
    store.upsert(record(1, "Lo-fi radio (live)", false)).await.unwrap();

    let tabs = store.load().await.unwrap();
    assert_eq!(tabs.len(), 2);
    assert_eq!(tabs.get(1).unwrap().title, "Lo-fi radio (live)");
    assert!(!tabs.get(1).unwrap().is_playing);

    assert!(store.remove(1).await.unwrap());
    assert!(!store.remove(1).await.unwrap());
    assert!(!store.load().await.unwrap().contains(1));
}

#[tokio::test]
async fn test_unchanged_update_does_not_write() {
    let backing = Arc::new(MemoryStore::new(StorageArea::Local));
    let store = MediaTabStore::new(backing.clone(), 8);
    store.upsert(record(1, "Song", true)).await.unwrap();
    let before = backing.get(MEDIA_TABS_KEY).await.unwrap().unwrap().version;

    store.upsert(record(1, "Song", true)).await.unwrap();
    let missing = store.remove(42).await.unwrap();

    assert!(!missing);
    let after = backing.get(MEDIA_TABS_KEY).await.unwrap().unwrap().version;
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_update_retries_after_conflict_without_losing_writes() {
    let backing = Arc::new(InterferingStore::new(2));
    let store = MediaTabStore::new(backing.clone(), 8);

    store.upsert(record(1, "Mine", false)).await.unwrap();

    let tabs = store.load().await.unwrap();
    assert!(tabs.contains(1), "own write survives the retries");
    assert!(tabs.contains(100), "first foreign write is kept");
    assert!(tabs.contains(101), "second foreign write is kept");
}

#[tokio::test]
async fn test_update_gives_up_after_max_retries() {
    let backing = Arc::new(InterferingStore::new(usize::MAX));
    let store = MediaTabStore::new(backing, 3);

    let err = store.upsert(record(1, "Never", false)).await.unwrap_err();
    match err {
        StorageError::Conflict { key, attempts } => {
            assert_eq!(key, MEDIA_TABS_KEY);
            assert_eq!(attempts, 3);
        }
        other => panic!("expected conflict, got {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_updates_never_lose_records() {
    let store = MediaTabStore::new(
        Arc::new(MemoryStore::new(StorageArea::Local)),
        StorageSettings::default().cas_max_retries,
    );

    let handles: Vec<_> = (1..=16)
        .map(|id| {
            let store = store.clone();
            tokio::spawn(async move { store.upsert(record(id, "tab", id % 2 == 0)).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let tabs = store.load().await.unwrap();
    assert_eq!(tabs.len(), 16);
    assert_eq!(tabs.ids_where_playing(true).len(), 8);
}

async fn upsert_concurrently(store: &MediaTabStore, count: i64) {
    let handles: Vec<_> = (1..=count)
        .map(|id| {
            let store = store.clone();
            tokio::spawn(async move { store.upsert(record(id, "tab", true)).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
}

/// The newest notification on the feed must carry the committed collection,
/// so a subscriber that applies `new_value` ends up current.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_notification_matches_committed_collection() {
    for round in 0..200 {
        let backing: Arc<dyn KeyValueStore> = if round % 2 == 0 {
            Arc::new(MemoryStore::new(StorageArea::Local))
        } else {
            Arc::new(SqliteStore::open_in_memory(StorageArea::Local).unwrap())
        };
        let mut feed = backing.subscribe();
        let store = MediaTabStore::new(backing, StorageSettings::default().cas_max_retries);

        upsert_concurrently(&store, 16).await;

        let mut last = None;
        while let Ok(change) = feed.try_recv() {
            last = change.new_value;
        }
        let notified = decode(last.expect("no change was published")).unwrap();
        assert_eq!(notified, store.load().await.unwrap(), "round {}", round);
        assert_eq!(notified.len(), 16);
    }
}

#[tokio::test]
async fn test_legacy_pair_array_is_migrated_on_read() {
    let backing = Arc::new(MemoryStore::new(StorageArea::Local));
    backing
        .set(
            MEDIA_TABS_KEY,
            json!([[4, {"id": 4, "title": "Old", "isPlaying": true, "favIconUrl": "a.png"}]]),
        )
        .await
        .unwrap();
    let store = MediaTabStore::new(backing.clone(), 8);

    let tabs = store.load().await.unwrap();
    assert_eq!(tabs.get(4).unwrap().fav_icon_url.as_deref(), Some("a.png"));

    // The next write stores the tagged layout.
    store.upsert(record(5, "New", false)).await.unwrap();
    let raw = backing.get(MEDIA_TABS_KEY).await.unwrap().unwrap().value;
    assert_eq!(raw["schema"], json!(1));
    assert_eq!(raw["tabs"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_newer_schema_is_an_error() {
    let backing = Arc::new(MemoryStore::new(StorageArea::Local));
    backing
        .set(MEDIA_TABS_KEY, json!({"schema": 9, "tabs": []}))
        .await
        .unwrap();
    let store = MediaTabStore::new(backing, 8);

    assert!(matches!(
        store.load().await,
        Err(StorageError::UnsupportedSchema(9))
    ));
    assert!(store.upsert(record(1, "x", false)).await.is_err());
}

#[tokio::test]
async fn test_is_change_matches_area_and_key() {
    let store = memory_store();
    let change = |area, key: &str| StorageChange {
        area,
        key: key.to_string(),
        old_value: None,
        new_value: None,
    };
    assert!(store.is_change(&change(StorageArea::Local, MEDIA_TABS_KEY)));
    assert!(!store.is_change(&change(StorageArea::Sync, MEDIA_TABS_KEY)));
    assert!(!store.is_change(&change(StorageArea::Local, "theme")));
}
