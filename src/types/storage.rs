use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which persistence area a key lives in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StorageArea {
    /// Extension-scoped, not synced across devices.
    Local,
    /// Synced across the user's devices.
    Sync,
}

impl StorageArea {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageArea::Local => "local",
            StorageArea::Sync => "sync",
        }
    }
}

/// A stored value together with its version token.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedValue {
    pub value: Value,
    pub version: u64,
}

/// Result of a compare-and-set write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    Committed { version: u64 },
    Conflict { current: Option<u64> },
}

/// Change notification delivered by a store's change feed.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StorageChange {
    pub area: StorageArea,
    pub key: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
}

impl StorageChange {
    pub fn concerns(&self, area: StorageArea, key: &str) -> bool {
        self.area == area && self.key == key
    }
}
