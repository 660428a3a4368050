//! License Gate for tabplay.
//!
//! Holds the license tier, answers feature queries, and handles activation.
//! The state lives in the synced store so an activation on one device reaches
//! every other one through the change feed.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{broadcast, RwLock};

use crate::storage::KeyValueStore;
use crate::types::errors::{LicenseError, StorageError};
use crate::types::license::{Feature, LicenseState, Tier};
use crate::types::storage::StorageChange;

/// Storage key of the license record in the synced store.
pub const LICENSE_KEY: &str = "license";

const PREMIUM_PREFIX: &str = "TPC-PREM-";
const PRO_PREFIX: &str = "TPC-PRO-";

/// Maps a license key to its tier by prefix. No server validation.
pub fn tier_for_key(key: &str) -> Option<Tier> {
    if key.starts_with(PREMIUM_PREFIX) {
        Some(Tier::Premium)
    } else if key.starts_with(PRO_PREFIX) {
        Some(Tier::Pro)
    } else {
        None
    }
}

/// Whether `tier` unlocks the named feature.
///
/// Names that are not in the feature map are allowed.
pub fn tier_allows(tier: Tier, feature_name: &str) -> bool {
    match Feature::from_name(feature_name) {
        Some(feature) => tier.satisfies(feature.required_tier()),
        None => {
            log::debug!("feature '{}' is not gated, allowing", feature_name);
            true
        }
    }
}

fn decode(value: Value) -> Result<LicenseState, StorageError> {
    Ok(serde_json::from_value(value)?)
}

/// Tier state with an in-memory cache, one per context.
#[derive(Clone)]
pub struct LicenseGate {
    store: Arc<dyn KeyValueStore>,
    cache: Arc<RwLock<Option<LicenseState>>>,
}

impl LicenseGate {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Current license, read through the cache. Defaults to free when nothing is stored.
    pub async fn get(&self) -> Result<LicenseState, LicenseError> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            return Ok(cached.clone());
        }
        self.reload().await
    }

    /// Drops the cache and reads the store.
    pub async fn reload(&self) -> Result<LicenseState, LicenseError> {
        let state = match self.store.get(LICENSE_KEY).await? {
            Some(entry) => decode(entry.value).unwrap_or_else(|e| {
                log::warn!("stored license is unreadable, treating as free: {}", e);
                LicenseState::free()
            }),
            None => LicenseState::free(),
        };
        *self.cache.write().await = Some(state.clone());
        Ok(state)
    }

    pub async fn tier(&self) -> Result<Tier, LicenseError> {
        Ok(self.get().await?.tier)
    }

    pub async fn has_feature(&self, feature_name: &str) -> Result<bool, LicenseError> {
        Ok(tier_allows(self.tier().await?, feature_name))
    }

    pub async fn has(&self, feature: Feature) -> Result<bool, LicenseError> {
        Ok(self.tier().await?.satisfies(feature.required_tier()))
    }

    pub async fn is_paid(&self) -> Result<bool, LicenseError> {
        Ok(self.get().await?.is_paid())
    }

    /// Activates a key. The prefix is matched against the key exactly as
    /// given, so surrounding whitespace makes it invalid. An unrecognized key
    /// leaves the state untouched.
    pub async fn activate(&self, key: &str) -> Result<Tier, LicenseError> {
        let tier = tier_for_key(key).ok_or_else(|| LicenseError::InvalidKey(key.to_string()))?;
        let state = LicenseState {
            tier,
            key: Some(key.to_string()),
            activated_at: Some(chrono::Utc::now().timestamp_millis()),
            expires_at: None,
        };
        self.persist(state).await?;
        log::info!("license activated: {}", tier.as_str());
        Ok(tier)
    }

    /// Returns to the free tier.
    pub async fn deactivate(&self) -> Result<(), LicenseError> {
        self.persist(LicenseState::free()).await?;
        log::info!("license deactivated");
        Ok(())
    }

    async fn persist(&self, state: LicenseState) -> Result<(), LicenseError> {
        let value = serde_json::to_value(&state).map_err(StorageError::from)?;
        self.store.set(LICENSE_KEY, value).await?;
        *self.cache.write().await = Some(state);
        Ok(())
    }

    pub fn is_change(&self, change: &StorageChange) -> bool {
        change.concerns(self.store.area(), LICENSE_KEY)
    }

    /// Updates the cache from a change notification. Returns the new state if
    /// the change concerned the license.
    pub async fn apply_change(&self, change: &StorageChange) -> Option<LicenseState> {
        if !self.is_change(change) {
            return None;
        }
        let state = match change.new_value.clone() {
            Some(value) => match decode(value) {
                Ok(state) => state,
                Err(e) => {
                    log::warn!("ignoring unreadable license change: {}", e);
                    *self.cache.write().await = None;
                    return None;
                }
            },
            None => LicenseState::free(),
        };
        *self.cache.write().await = Some(state.clone());
        Some(state)
    }

    /// Subscribes to license changes made by any context or device.
    pub fn subscribe(&self) -> LicenseChanges {
        LicenseChanges {
            receiver: self.store.subscribe(),
            gate: self.clone(),
            pending: None,
        }
    }
}

/// Stream of license states, filtered from the synced store's change feed.
pub struct LicenseChanges {
    receiver: broadcast::Receiver<StorageChange>,
    gate: LicenseGate,
    pending: Option<Pending>,
}

/// Work taken off the feed but not yet folded into the cache.
enum Pending {
    Change(StorageChange),
    Reload,
}

impl LicenseChanges {
    /// Waits for the next license change. `None` once the store is gone.
    ///
    /// Cancel safe: a change received before the future is dropped is kept
    /// and applied by the next call.
    pub async fn next(&mut self) -> Option<LicenseState> {
        loop {
            if let Some(pending) = self.pending.as_ref() {
                let state = match pending {
                    Pending::Change(change) => self.gate.apply_change(change).await,
                    Pending::Reload => match self.gate.reload().await {
                        Ok(state) => Some(state),
                        Err(e) => {
                            log::warn!("license reload failed: {}", e);
                            None
                        }
                    },
                };
                self.pending = None;
                if state.is_some() {
                    return state;
                }
                continue;
            }

            self.pending = match self.receiver.recv().await {
                Ok(change) if self.gate.is_change(&change) => Some(Pending::Change(change)),
                Ok(_) => None,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::debug!("license feed lagged by {}, reloading", skipped);
                    Some(Pending::Reload)
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            };
        }
    }
}
