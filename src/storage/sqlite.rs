//! Key-value store persisted in SQLite, one row per `(area, key)`.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use tokio::sync::broadcast;

use super::{ChangeFeed, KeyValueStore};
use crate::database::Database;
use crate::types::errors::StorageError;
use crate::types::storage::{CasOutcome, StorageArea, StorageChange, VersionedValue};

/// SQLite-backed store for a single storage area.
pub struct SqliteStore {
    db: Mutex<Database>,
    feed: ChangeFeed,
}

impl SqliteStore {
    pub fn new(db: Database, area: StorageArea) -> Self {
        Self {
            db: Mutex::new(db),
            feed: ChangeFeed::new(area),
        }
    }

    /// Opens the database file at `path` and binds the store to `area`.
    pub fn open<P: AsRef<Path>>(path: P, area: StorageArea) -> Result<Self, StorageError> {
        Ok(Self::new(Database::open(path)?, area))
    }

    pub fn open_in_memory(area: StorageArea) -> Result<Self, StorageError> {
        Ok(Self::new(Database::open_in_memory()?, area))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Database>, StorageError> {
        self.db
            .lock()
            .map_err(|_| StorageError::Database("sqlite store lock poisoned".to_string()))
    }

    fn area_name(&self) -> &'static str {
        self.feed.area.as_str()
    }

    fn read(conn: &Connection, area: &str, key: &str) -> Result<Option<VersionedValue>, StorageError> {
        let row: Option<(String, i64)> = conn
            .query_row(
                "SELECT value, version FROM kv_entries WHERE area = ?1 AND key = ?2",
                params![area, key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((json, version)) => Ok(Some(VersionedValue {
                value: serde_json::from_str(&json)?,
                version: version as u64,
            })),
            None => Ok(None),
        }
    }

    fn write(
        conn: &Connection,
        area: &str,
        key: &str,
        value: &Value,
        version: u64,
    ) -> Result<(), StorageError> {
        let json = serde_json::to_string(value)?;
        conn.execute(
            "INSERT OR REPLACE INTO kv_entries (area, key, value, version, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![area, key, json, version as i64, chrono::Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    fn area(&self) -> StorageArea {
        self.feed.area
    }

    async fn get(&self, key: &str) -> Result<Option<VersionedValue>, StorageError> {
        let db = self.lock()?;
        Self::read(db.connection(), self.area_name(), key)
    }

    async fn set(&self, key: &str, value: Value) -> Result<u64, StorageError> {
        let mut db = self.lock()?;
        let tx = db.connection_mut().transaction()?;
        let old = Self::read(&tx, self.area_name(), key)?;
        let version = old.as_ref().map_or(1, |v| v.version + 1);
        Self::write(&tx, self.area_name(), key, &value, version)?;
        tx.commit()?;
        self.feed.publish(key, old.map(|v| v.value), Some(value));
        Ok(version)
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<u64>,
        value: Value,
    ) -> Result<CasOutcome, StorageError> {
        let mut db = self.lock()?;
        let tx = db.connection_mut().transaction()?;
        let old = Self::read(&tx, self.area_name(), key)?;
        let current = old.as_ref().map(|v| v.version);
        if current != expected {
            return Ok(CasOutcome::Conflict { current });
        }
        let version = current.map_or(1, |v| v + 1);
        Self::write(&tx, self.area_name(), key, &value, version)?;
        tx.commit()?;
        // The connection stays locked until the change is published.
        self.feed.publish(key, old.map(|v| v.value), Some(value));
        Ok(CasOutcome::Committed { version })
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let mut db = self.lock()?;
        let tx = db.connection_mut().transaction()?;
        let old = Self::read(&tx, self.area_name(), key)?.map(|v| v.value);
        tx.execute(
            "DELETE FROM kv_entries WHERE area = ?1 AND key = ?2",
            params![self.area_name(), key],
        )?;
        tx.commit()?;
        let existed = old.is_some();
        self.feed.publish(key, old, None);
        Ok(existed)
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.feed.subscribe()
    }
}
