use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Platform tab identifier.
pub type TabId = i64;

/// A browser tab known to contain media.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TabRecord {
    pub id: TabId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fav_icon_url: Option<String>,
    pub is_playing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f32>,
    /// Epoch milliseconds of the last user interaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<i64>,
}

impl TabRecord {
    pub fn new(id: TabId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            url: None,
            domain: None,
            fav_icon_url: None,
            is_playing: false,
            volume: None,
            last_accessed: None,
        }
    }
}

/// The shared collection of media tabs, keyed by tab id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaTabs {
    tabs: BTreeMap<TabId, TabRecord>,
}

impl MediaTabs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn contains(&self, tab_id: TabId) -> bool {
        self.tabs.contains_key(&tab_id)
    }

    pub fn get(&self, tab_id: TabId) -> Option<&TabRecord> {
        self.tabs.get(&tab_id)
    }

    pub fn get_mut(&mut self, tab_id: TabId) -> Option<&mut TabRecord> {
        self.tabs.get_mut(&tab_id)
    }

    /// Insert or replace the record under its own id.
    pub fn upsert(&mut self, record: TabRecord) -> Option<TabRecord> {
        self.tabs.insert(record.id, record)
    }

    pub fn remove(&mut self, tab_id: TabId) -> Option<TabRecord> {
        self.tabs.remove(&tab_id)
    }

    pub fn ids(&self) -> Vec<TabId> {
        self.tabs.keys().copied().collect()
    }

    pub fn records(&self) -> impl Iterator<Item = &TabRecord> {
        self.tabs.values()
    }

    /// Ids whose last-known playing state equals `playing`.
    pub fn ids_where_playing(&self, playing: bool) -> Vec<TabId> {
        self.tabs
            .values()
            .filter(|r| r.is_playing == playing)
            .map(|r| r.id)
            .collect()
    }

    /// Records ordered most recently accessed first; missing timestamps sort as oldest.
    pub fn sorted_by_recent(&self) -> Vec<&TabRecord> {
        let mut sorted: Vec<&TabRecord> = self.tabs.values().collect();
        sorted.sort_by(|a, b| {
            b.last_accessed
                .unwrap_or(0)
                .cmp(&a.last_accessed.unwrap_or(0))
        });
        sorted
    }
}

impl FromIterator<TabRecord> for MediaTabs {
    fn from_iter<I: IntoIterator<Item = TabRecord>>(iter: I) -> Self {
        let mut tabs = MediaTabs::new();
        for record in iter {
            tabs.upsert(record);
        }
        tabs
    }
}

/// Schema version written by this crate.
pub const MEDIA_TABS_SCHEMA: u32 = 1;

/// On-disk form of [`MediaTabs`]: ordered `(id, record)` pairs behind a schema tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMediaTabs {
    pub schema: u32,
    pub tabs: Vec<(TabId, TabRecord)>,
}

impl From<&MediaTabs> for StoredMediaTabs {
    fn from(tabs: &MediaTabs) -> Self {
        Self {
            schema: MEDIA_TABS_SCHEMA,
            tabs: tabs.tabs.iter().map(|(id, r)| (*id, r.clone())).collect(),
        }
    }
}

impl From<StoredMediaTabs> for MediaTabs {
    fn from(stored: StoredMediaTabs) -> Self {
        // The record id wins over the pair key if an old writer let them drift.
        stored.tabs.into_iter().map(|(_, record)| record).collect()
    }
}
