use thiserror::Error;

use super::license::Feature;
use super::media_tab::TabId;

// === StorageError ===

/// Errors raised by the key-value stores and the media tab collection.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The SQLite backend failed.
    #[error("Storage database error: {0}")]
    Database(String),
    /// A stored value could not be encoded or decoded.
    #[error("Storage serialization error: {0}")]
    Serialization(String),
    /// The stored collection was written by a newer schema.
    #[error("Unsupported media tab schema: {0}")]
    UnsupportedSchema(u32),
    /// Concurrent writers kept winning the compare-and-set race.
    #[error("Update of '{key}' conflicted {attempts} times")]
    Conflict { key: String, attempts: u32 },
}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        StorageError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

// === HostError ===

/// Errors surfaced by the browser host's tab and scripting services.
#[derive(Debug, Error)]
pub enum HostError {
    /// Injection is disallowed on privileged schemes.
    #[error("Restricted page: {0}")]
    RestrictedPage(String),
    /// The tab no longer exists.
    #[error("Tab closed: {0}")]
    TabClosed(TabId),
    /// The injected script failed to run.
    #[error("Script injection failed: {0}")]
    Injection(String),
    /// The script returned something other than what was asked for.
    #[error("Unexpected script output for {0}")]
    UnexpectedOutput(String),
}

impl HostError {
    /// Restricted pages and closed tabs are routine and not worth a warning.
    pub fn is_expected(&self) -> bool {
        matches!(self, HostError::RestrictedPage(_) | HostError::TabClosed(_))
    }
}

// === MediaError ===

/// Errors from probing or controlling a single tab.
#[derive(Debug, Error)]
pub enum MediaError {
    /// The tab is not in the media tab collection.
    #[error("Tab is not tracked: {0}")]
    NotTracked(TabId),
    #[error(transparent)]
    Host(#[from] HostError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

// === LicenseError ===

/// Errors related to license activation.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// The key matches no known tier prefix.
    #[error("Invalid license key")]
    InvalidKey(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

// === ControlError ===

/// Errors returned by popup actions.
#[derive(Debug, Error)]
pub enum ControlError {
    /// The action needs a higher license tier.
    #[error("Upgrade required for {}", .0.name())]
    PremiumRequired(Feature),
    /// Volume outside `[0, 1]` or not a number.
    #[error("Invalid volume: {0}")]
    InvalidVolume(f32),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error(transparent)]
    License(#[from] LicenseError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

// === SettingsError ===

/// Errors related to settings management.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// An I/O error occurred while reading or writing settings.
    #[error("Settings I/O error: {0}")]
    IoError(String),
    /// Failed to serialize or deserialize settings.
    #[error("Settings serialization error: {0}")]
    SerializationError(String),
    /// The provided settings key is invalid.
    #[error("Invalid settings key: {0}")]
    InvalidKey(String),
    /// The provided settings value is invalid.
    #[error("Invalid settings value: {0}")]
    InvalidValue(String),
}
