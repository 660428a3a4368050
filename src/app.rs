//! App Core for tabplay.
//!
//! Owns the stores, host handles and services of one extension instance.
//! Nothing is global: tests build as many isolated `App`s as they need.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::host::{ScriptInjector, TabService};
use crate::managers::media_tab_store::MediaTabStore;
use crate::services::control_surface::ControlSurface;
use crate::services::license_gate::LicenseGate;
use crate::services::media_probe::MediaProber;
use crate::services::playback::PlaybackController;
use crate::services::tab_monitor::TabMonitor;
use crate::storage::{KeyValueStore, MemoryStore, SqliteStore};
use crate::types::errors::{ControlError, StorageError};
use crate::types::events::BrowserEvent;
use crate::types::settings::ExtensionSettings;
use crate::types::storage::StorageArea;

/// Database file of the extension-local area.
pub const LOCAL_DB_FILE: &str = "local.db";
/// Database file of the synced area.
pub const SYNC_DB_FILE: &str = "sync.db";

/// Central application struct: the background context plus everything a
/// popup needs to open.
pub struct App {
    pub local: Arc<dyn KeyValueStore>,
    pub sync: Arc<dyn KeyValueStore>,
    pub tabs: Arc<dyn TabService>,
    pub injector: Arc<dyn ScriptInjector>,
    pub settings: ExtensionSettings,
    pub media_tabs: MediaTabStore,
    /// The background context's license gate.
    pub license: LicenseGate,
    pub prober: MediaProber,
    pub playback: PlaybackController,
    pub monitor: TabMonitor,
}

impl App {
    pub fn new(
        local: Arc<dyn KeyValueStore>,
        sync: Arc<dyn KeyValueStore>,
        tabs: Arc<dyn TabService>,
        injector: Arc<dyn ScriptInjector>,
        settings: ExtensionSettings,
    ) -> Self {
        let media_tabs = MediaTabStore::new(local.clone(), settings.storage.cas_max_retries);
        let prober = MediaProber::new(
            tabs.clone(),
            injector.clone(),
            media_tabs.clone(),
            settings.monitor.restricted_schemes.clone(),
        );
        let playback = PlaybackController::new(
            injector.clone(),
            media_tabs.clone(),
            settings.playback.resume_strategies.clone(),
        );
        let monitor = TabMonitor::new(
            tabs.clone(),
            media_tabs.clone(),
            prober.clone(),
            playback.clone(),
            settings.monitor.probe_on_create,
        );
        let license = LicenseGate::new(sync.clone());

        Self {
            local,
            sync,
            tabs,
            injector,
            settings,
            media_tabs,
            license,
            prober,
            playback,
            monitor,
        }
    }

    /// App over in-memory stores.
    pub fn in_memory(
        tabs: Arc<dyn TabService>,
        injector: Arc<dyn ScriptInjector>,
        settings: ExtensionSettings,
    ) -> Self {
        Self::new(
            Arc::new(MemoryStore::new(StorageArea::Local)),
            Arc::new(MemoryStore::new(StorageArea::Sync)),
            tabs,
            injector,
            settings,
        )
    }

    /// App over SQLite stores in `data_dir`, created if missing.
    pub fn open(
        data_dir: &Path,
        tabs: Arc<dyn TabService>,
        injector: Arc<dyn ScriptInjector>,
        settings: ExtensionSettings,
    ) -> Result<Self, StorageError> {
        fs::create_dir_all(data_dir).map_err(|e| {
            StorageError::Database(format!(
                "Failed to create data directory {}: {}",
                data_dir.display(),
                e
            ))
        })?;
        let local = SqliteStore::open(data_dir.join(LOCAL_DB_FILE), StorageArea::Local)?;
        let sync = SqliteStore::open(data_dir.join(SYNC_DB_FILE), StorageArea::Sync)?;
        log::info!("stores opened in {}", data_dir.display());
        Ok(Self::new(
            Arc::new(local),
            Arc::new(sync),
            tabs,
            injector,
            settings,
        ))
    }

    /// Headless host backed app, in memory.
    #[cfg(feature = "headless")]
    pub fn headless(
        browser: Arc<crate::host::headless::HeadlessBrowser>,
        settings: ExtensionSettings,
    ) -> Self {
        Self::in_memory(browser.clone(), browser, settings)
    }

    /// Routes a host event to the background monitor.
    pub async fn handle_event(&self, event: BrowserEvent) {
        self.monitor.handle_event(event).await;
    }

    /// Opens a popup. Each popup is its own context with its own license cache.
    pub async fn open_popup(&self) -> Result<ControlSurface, ControlError> {
        ControlSurface::open(
            self.media_tabs.clone(),
            self.local.clone(),
            LicenseGate::new(self.sync.clone()),
            self.prober.clone(),
            self.playback.clone(),
            self.tabs.clone(),
            self.settings.popup.clone(),
        )
        .await
    }
}
